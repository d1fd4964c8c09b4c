//! Document symbols and call-graph references

use std::collections::HashMap;

use ariadne_core::{CallGraph, SourcePosition, UnitId, UriCanonicalizer};
use lsp_types::{Location, SymbolInformation, SymbolKind};

use crate::analysis::LanguageState;
use crate::convert::to_location;

/// A function declared in source, as the outline shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSymbol {
    pub name: String,
    pub unit: UnitId,
    /// Where the function is declared: its name when known, else its body.
    pub position: SourcePosition,
}

/// One symbol per analyzable unit with a known body position, grouped by URL.
pub fn collect_symbols(graph: &CallGraph) -> HashMap<String, Vec<UnitSymbol>> {
    let mut symbols: HashMap<String, Vec<UnitSymbol>> = HashMap::new();
    for (id, unit) in graph.units() {
        if !unit.analyzable {
            continue;
        }
        let Some(body) = &unit.body_position else {
            continue;
        };
        let position = unit.name_position.as_ref().unwrap_or(body).clone();
        symbols.entry(body.url.clone()).or_default().push(UnitSymbol {
            name: unit.name.clone(),
            unit: id,
            position,
        });
    }
    for list in symbols.values_mut() {
        list.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
    }
    symbols
}

/// Flat outline of `url`.
pub fn document_symbols(
    state: &LanguageState,
    uris: &UriCanonicalizer,
    url: &str,
) -> Vec<SymbolInformation> {
    let Some(symbols) = state.symbols.get(url) else {
        return Vec::new();
    };
    symbols
        .iter()
        .filter_map(|symbol| {
            let location = to_location(uris, &symbol.position)?;
            #[allow(deprecated)]
            Some(SymbolInformation {
                name: symbol.name.clone(),
                kind: SymbolKind::FUNCTION,
                tags: None,
                deprecated: None,
                location,
                container_name: None,
            })
        })
        .collect()
}

/// The symbol declared exactly at `query`.
pub fn symbol_at<'s>(state: &'s LanguageState, query: &SourcePosition) -> Option<&'s UnitSymbol> {
    state.symbols.get(&query.url)?.iter().find(|symbol| {
        symbol.position.first_line == query.first_line && symbol.position.first_col == query.first_col
    })
}

/// The symbol standing for `unit`, in any document of the language.
pub fn symbol_of_unit(state: &LanguageState, unit: UnitId) -> Option<&UnitSymbol> {
    state
        .symbols
        .values()
        .flat_map(|list| list.iter())
        .find(|symbol| symbol.unit == unit)
}

/// Call sites of the function declared at `query`.
pub fn references(
    state: &LanguageState,
    uris: &UriCanonicalizer,
    query: &SourcePosition,
) -> Vec<Location> {
    let Some(symbol) = symbol_at(state, query) else {
        return Vec::new();
    };
    let graph = &state.result.call_graph;
    graph
        .callers_of(symbol.unit)
        .into_iter()
        .filter_map(|call| graph.source_position_of(call))
        .filter_map(|position| to_location(uris, position))
        .collect()
}
