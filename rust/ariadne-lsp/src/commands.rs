//! `workspace/executeCommand` handlers

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::str::FromStr;

use ariadne_core::UriCanonicalizer;
use lsp_types::{ApplyWorkspaceEditParams, Diagnostic, TextEdit, Uri, WorkspaceEdit};
use serde_json::Value;

use crate::analysis::LanguageState;
use crate::code_actions::extract_fix;
use crate::convert::to_location;
use crate::documents::DocumentStore;
use crate::error::CommandError;
use crate::hover::position_to_type;
use crate::symbols::symbol_of_unit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerCommand {
    /// Callers of a function, by name.
    Calls,
    /// Parameter types of a function, by name.
    Types,
    /// Apply the fixes embedded in diagnostics.
    Fixes,
}

impl ServerCommand {
    pub const ALL: [ServerCommand; 3] = [Self::Calls, Self::Types, Self::Fixes];

    pub fn name(self) -> &'static str {
        match self {
            Self::Calls => "CALLS",
            Self::Types => "TYPES",
            Self::Fixes => "FIXES",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.name() == name)
    }
}

/// Result of a command, plus what the server has to send on its own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandOutcome {
    pub result: Value,
    /// `workspace/applyEdit` requests to issue.
    pub edits: Vec<ApplyWorkspaceEditParams>,
    /// Text for a `window/showMessageRequest`.
    pub message: Option<String>,
}

pub fn execute_command(
    states: &BTreeMap<String, LanguageState>,
    documents: &DocumentStore,
    uris: &UriCanonicalizer,
    name: &str,
    arguments: &[Value],
) -> Result<CommandOutcome, CommandError> {
    let command = ServerCommand::parse(name).ok_or_else(|| CommandError::Unsupported(name.to_string()))?;
    match command {
        ServerCommand::Calls => {
            let function = function_argument(command, arguments)?;
            Ok(callers(states.values(), uris, function))
        }
        ServerCommand::Types => {
            let function = function_argument(command, arguments)?;
            let types: BTreeSet<String> = states
                .values()
                .flat_map(|state| types_of(state, documents, function))
                .collect();
            Ok(CommandOutcome {
                result: Value::from(types.into_iter().collect::<Vec<_>>()),
                ..CommandOutcome::default()
            })
        }
        ServerCommand::Fixes => fixes(arguments),
    }
}

fn invalid(command: ServerCommand, message: impl Into<String>) -> CommandError {
    CommandError::InvalidArguments {
        command: command.name().to_string(),
        message: message.into(),
    }
}

fn function_argument(command: ServerCommand, arguments: &[Value]) -> Result<&str, CommandError> {
    arguments
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(command, "expected a function name"))
}

/// Sorted `"<snippet>: <type>"` strings for the first use of each parameter
/// of every function called `function`.
pub fn types_of(state: &LanguageState, documents: &DocumentStore, function: &str) -> Vec<String> {
    let graph = &state.result.call_graph;
    let mut types = BTreeSet::new();
    for (id, unit) in graph.units_named(function) {
        for parameter in &unit.parameters {
            let Some((call, slot)) = graph.first_use_of(id, parameter.value) else {
                continue;
            };
            let Some(position) = graph.operand_position_of(call, slot) else {
                continue;
            };
            types.extend(position_to_type(state, documents, position));
        }
    }
    types.into_iter().collect()
}

/// Locations of the functions calling `function`; callers without a symbol
/// are listed by name.
pub fn callers<'s>(
    states: impl Iterator<Item = &'s LanguageState>,
    uris: &UriCanonicalizer,
    function: &str,
) -> CommandOutcome {
    let mut found = Vec::new();
    let mut names = BTreeSet::new();
    for state in states {
        let graph = &state.result.call_graph;
        let mut seen = HashSet::new();
        for (callee, _) in graph.units_named(function) {
            for call in graph.callers_of(callee) {
                let Some(caller) = graph.unit(call.unit) else {
                    continue;
                };
                if !seen.insert(call.unit) {
                    continue;
                }
                names.insert(caller.name.clone());
                let location = symbol_of_unit(state, call.unit)
                    .and_then(|symbol| to_location(uris, &symbol.position));
                match location.map(serde_json::to_value) {
                    Some(Ok(location)) => found.push(location),
                    _ => found.push(Value::String(caller.name.clone())),
                }
            }
        }
    }

    let message = if names.is_empty() {
        format!("no callers of {function}")
    } else {
        format!(
            "callers of {function}: {}",
            names.into_iter().collect::<Vec<_>>().join(", ")
        )
    };
    CommandOutcome {
        result: Value::Array(found),
        edits: Vec::new(),
        message: Some(message),
    }
}

/// One edit per fixable diagnostic, replacing its range with the fix text.
fn fixes(arguments: &[Value]) -> Result<CommandOutcome, CommandError> {
    let command = ServerCommand::Fixes;
    let (uri, diagnostics) = arguments
        .split_first()
        .ok_or_else(|| invalid(command, "expected a document uri"))?;
    let uri = uri
        .as_str()
        .and_then(|text| Uri::from_str(text).ok())
        .ok_or_else(|| invalid(command, "expected a document uri"))?;

    let mut edits = Vec::new();
    for value in diagnostics {
        let diagnostic: Diagnostic = serde_json::from_value(value.clone())
            .map_err(|err| invalid(command, format!("not a diagnostic: {err}")))?;
        let Some(fix) = extract_fix(&diagnostic.message) else {
            continue;
        };
        let edit = TextEdit {
            range: diagnostic.range,
            new_text: fix.to_string(),
        };
        edits.push(ApplyWorkspaceEditParams {
            label: Some("fix".to_string()),
            edit: WorkspaceEdit {
                changes: Some([(uri.clone(), vec![edit])].into_iter().collect()),
                document_changes: None,
                change_annotations: None,
            },
        });
    }

    Ok(CommandOutcome {
        result: Value::Null,
        edits,
        message: None,
    })
}
