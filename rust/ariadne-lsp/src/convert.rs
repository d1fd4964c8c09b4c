//! Conversions between engine positions and protocol types

use std::str::FromStr;

use ariadne_core::{Severity, SourcePosition, UriCanonicalizer};
use lsp_types::{DiagnosticSeverity, Location, Position, Range, Uri};
use tracing::warn;

/// Protocol range of an engine position. Engine lines are 1-based.
pub fn to_range(position: &SourcePosition) -> Range {
    Range {
        start: Position {
            line: position.first_line.saturating_sub(1),
            character: position.first_col,
        },
        end: Position {
            line: position.last_line.saturating_sub(1),
            character: position.last_col,
        },
    }
}

/// Engine position covering a protocol range of `url`.
pub fn from_range(url: &str, range: &Range) -> SourcePosition {
    SourcePosition::new(
        url,
        range.start.line.saturating_add(1),
        range.start.character,
        range.end.line.saturating_add(1),
        range.end.character,
    )
}

/// Client-facing URI of a canonical identifier.
pub fn to_uri(uris: &UriCanonicalizer, canonical: &str) -> Option<Uri> {
    let original = uris.unmangle(canonical);
    match Uri::from_str(original) {
        Ok(uri) => Some(uri),
        Err(err) => {
            warn!(uri = original, error = %err, "cannot express document uri to the client");
            None
        }
    }
}

pub fn to_location(uris: &UriCanonicalizer, position: &SourcePosition) -> Option<Location> {
    Some(Location {
        uri: to_uri(uris, &position.url)?,
        range: to_range(position),
    })
}

pub fn to_severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Information => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

fn key(position: Position) -> (u32, u32) {
    (position.line, position.character)
}

/// Whether two protocol ranges share at least one point.
pub fn ranges_overlap(a: &Range, b: &Range) -> bool {
    key(a.start) <= key(b.end) && key(b.start) <= key(a.end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Range {
        Range {
            start: Position { line: sl, character: sc },
            end: Position { line: el, character: ec },
        }
    }

    #[test]
    fn engine_lines_shift_down_by_one() {
        let position = SourcePosition::new("file:///a.py", 2, 0, 3, 5);
        assert_eq!(to_range(&position), range(1, 0, 2, 5));
        assert_eq!(from_range("file:///a.py", &range(1, 0, 2, 5)), position);
    }

    #[test]
    fn overlap_includes_touching_ranges() {
        assert!(ranges_overlap(&range(1, 0, 1, 5), &range(1, 5, 1, 9)));
        assert!(ranges_overlap(&range(1, 2, 1, 2), &range(0, 0, 4, 0)));
        assert!(!ranges_overlap(&range(1, 0, 1, 4), &range(1, 5, 1, 9)));
        assert!(!ranges_overlap(&range(3, 0, 3, 1), &range(1, 0, 2, 80)));
    }

    #[test]
    fn synthetic_identifiers_map_back_to_client_uris() {
        let mut uris = UriCanonicalizer::new();
        let canonical = uris.mangle("not a uri");
        let position = SourcePosition::new(canonical, 1, 0, 1, 1);
        // the original string is not a valid URI either, so nothing is sent
        assert_eq!(to_location(&uris, &position), None);

        let position = SourcePosition::new("file:///b.py", 1, 0, 1, 1);
        let location = to_location(&uris, &position).unwrap();
        assert_eq!(location.uri.as_str(), "file:///b.py");
        assert_eq!(location.range, range(0, 0, 0, 1));
    }

    #[test]
    fn severities_map_one_to_one() {
        assert_eq!(to_severity(Severity::Error), DiagnosticSeverity::ERROR);
        assert_eq!(to_severity(Severity::Hint), DiagnosticSeverity::HINT);
    }
}
