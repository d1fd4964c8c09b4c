//! Go-to-definition support

use ariadne_core::{SourcePosition, UriCanonicalizer};
use lsp_types::{GotoDefinitionResponse, Location};

use crate::analysis::LanguageState;
use crate::convert::to_location;

/// Declarations of the instruction at `query`, when the engine supplied a
/// definition finder.
pub fn definitions(
    state: &LanguageState,
    uris: &UriCanonicalizer,
    query: &SourcePosition,
) -> Vec<Location> {
    let Some(finder) = state.result.definitions.as_deref() else {
        return Vec::new();
    };
    let Some((_, inst)) = state.facts.instruction_at(query) else {
        return Vec::new();
    };
    finder
        .find_definitions(*inst)
        .iter()
        .filter_map(|position| to_location(uris, position))
        .collect()
}

pub fn build_goto_definition(
    state: &LanguageState,
    uris: &UriCanonicalizer,
    query: &SourcePosition,
) -> Option<GotoDefinitionResponse> {
    let locations = definitions(state, uris, query);
    (!locations.is_empty()).then_some(GotoDefinitionResponse::Array(locations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ariadne_core::{CallGraph, CodeUnit, DefinitionFinder, Instruction, InstructionRef};

    use crate::facts::FactStore;

    const URL: &str = "file:///a.py";

    fn state(finder: Option<Box<dyn DefinitionFinder>>) -> LanguageState {
        let mut main = CodeUnit::new("main");
        main.instructions = vec![Instruction {
            position: Some(SourcePosition::new(URL, 4, 0, 4, 3)),
            ..Instruction::default()
        }];
        let mut state = LanguageState::new("python");
        state.result.call_graph = CallGraph::new(vec![main]);
        state.result.definitions = finder;
        state.facts = FactStore::populate(&state.result.call_graph);
        state
    }

    #[test]
    fn finder_results_become_locations() {
        let finder = |_: InstructionRef| vec![SourcePosition::new(URL, 1, 4, 1, 5)];
        let state = state(Some(Box::new(finder)));
        let uris = UriCanonicalizer::new();

        let found = definitions(&state, &uris, &SourcePosition::point(URL, 4, 1));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].range.start.line, 0);
        assert_eq!(found[0].range.start.character, 4);
        assert!(definitions(&state, &uris, &SourcePosition::point(URL, 9, 0)).is_empty());
    }

    #[test]
    fn without_a_finder_there_is_nothing_to_jump_to() {
        let state = state(None);
        let uris = UriCanonicalizer::new();
        assert!(build_goto_definition(&state, &uris, &SourcePosition::point(URL, 4, 1)).is_none());
    }
}
