//! Code lenses: analysis-reported notes and parameter types

use ariadne_core::AnalysisError;
use lsp_types::{CodeLens, Command};
use serde_json::Value;

use crate::analysis::LanguageState;
use crate::commands::ServerCommand;
use crate::convert::to_range;
use crate::symbols::UnitSymbol;

pub const REPAIR_COMMAND: &str = "repair";
pub const NOTE_COMMAND: &str = "note";

/// Lens for a code-lens-kind analysis error.
pub fn reported_lens(error: &AnalysisError) -> CodeLens {
    let (command, argument) = match &error.repair {
        Some(repair) => (REPAIR_COMMAND, repair.clone()),
        None => (NOTE_COMMAND, String::new()),
    };
    CodeLens {
        range: to_range(&error.position),
        command: Some(Command {
            title: error.message.clone(),
            command: command.to_string(),
            arguments: Some(vec![Value::String(argument)]),
        }),
        data: None,
    }
}

/// Lens listing the known parameter types of a function.
pub fn types_lens(symbol: &UnitSymbol, types: &[String]) -> Option<CodeLens> {
    if types.is_empty() {
        return None;
    }
    Some(CodeLens {
        range: to_range(&symbol.position),
        command: Some(Command {
            title: types.join(", "),
            command: ServerCommand::Types.name().to_string(),
            arguments: Some(vec![Value::String(symbol.name.clone())]),
        }),
        data: None,
    })
}

pub fn code_lenses(state: &LanguageState, url: &str) -> Vec<CodeLens> {
    state.code_lenses.get(url).cloned().unwrap_or_default()
}
