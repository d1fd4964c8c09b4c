//! Quick fixes carried inside diagnostic messages
//!
//! An engine can suggest a replacement for a diagnostic's range by ending its
//! message with `possible fix: <text>` followed by one closing character,
//! e.g. `"unknown name; possible fix: rename(foo)."`.

use lsp_types::{CodeActionOrCommand, Command, Diagnostic, Range, Uri};
use serde_json::Value;
use tracing::warn;

use crate::commands::ServerCommand;
use crate::convert::ranges_overlap;

pub const FIX_MARKER: &str = "possible fix:";

/// The replacement text embedded in a diagnostic message.
pub fn extract_fix(message: &str) -> Option<&str> {
    let start = message.find(FIX_MARKER)? + FIX_MARKER.len();
    let mut rest = message[start..].chars();
    rest.next();
    let mut fix = rest.as_str().chars();
    fix.next_back();
    let fix = fix.as_str();
    (!fix.is_empty()).then_some(fix)
}

/// At most one `FIXES` command, for the first fixable diagnostic overlapping `range`.
pub fn build_code_actions(
    uri: &Uri,
    range: &Range,
    diagnostics: &[Diagnostic],
) -> Vec<CodeActionOrCommand> {
    for diagnostic in diagnostics {
        if !ranges_overlap(&diagnostic.range, range) {
            continue;
        }
        let Some(fix) = extract_fix(&diagnostic.message) else {
            continue;
        };
        let diagnostic_json = match serde_json::to_value(diagnostic) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "cannot encode diagnostic for a fix command");
                continue;
            }
        };
        return vec![CodeActionOrCommand::Command(Command {
            title: fix.to_string(),
            command: ServerCommand::Fixes.name().to_string(),
            arguments: Some(vec![Value::String(uri.as_str().to_string()), diagnostic_json]),
        })];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Position;
    use std::str::FromStr;

    fn range(line: u32, start: u32, end: u32) -> Range {
        Range {
            start: Position { line, character: start },
            end: Position { line, character: end },
        }
    }

    fn diagnostic(range: Range, message: &str) -> Diagnostic {
        Diagnostic {
            range,
            message: message.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn fix_text_sits_between_marker_and_last_character() {
        assert_eq!(extract_fix("unknown name; possible fix: rename(foo)."), Some("rename(foo)"));
        assert_eq!(extract_fix("possible fix: x;"), Some("x"));
        assert_eq!(extract_fix("no marker here."), None);
        assert_eq!(extract_fix("possible fix: ."), None);
        assert_eq!(extract_fix("possible fix:"), None);
    }

    #[test]
    fn offers_one_command_for_an_overlapping_fix() {
        let uri = Uri::from_str("file:///a.py").unwrap();
        let diagnostics = vec![
            diagnostic(range(1, 0, 5), "plain complaint"),
            diagnostic(range(1, 0, 5), "bad name; possible fix: rename(foo)."),
            diagnostic(range(1, 0, 5), "also; possible fix: other(bar)."),
        ];

        let actions = build_code_actions(&uri, &range(1, 2, 3), &diagnostics);
        assert_eq!(actions.len(), 1);
        let CodeActionOrCommand::Command(command) = &actions[0] else {
            panic!("expected a command");
        };
        assert_eq!(command.title, "rename(foo)");
        assert_eq!(command.command, "FIXES");
        let arguments = command.arguments.as_ref().unwrap();
        assert_eq!(arguments[0], Value::String("file:///a.py".into()));
        assert_eq!(arguments[1]["message"], "bad name; possible fix: rename(foo).");
    }

    #[test]
    fn disjoint_ranges_offer_nothing() {
        let uri = Uri::from_str("file:///a.py").unwrap();
        let diagnostics = vec![diagnostic(range(1, 0, 5), "x; possible fix: y.")];
        assert!(build_code_actions(&uri, &range(4, 0, 1), &diagnostics).is_empty());
    }
}
