//! Hover text assembled from the facts at a position

use std::collections::HashSet;

use ariadne_core::{HeapGraph, SourcePosition, ValueAnalysis, ValueHandle};
use lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind};

use crate::analysis::LanguageState;
use crate::convert::to_range;
use crate::documents::{compact, DocumentStore};

fn separator(markdown: bool) -> &'static str {
    if markdown {
        "\n\n"
    } else {
        "\n"
    }
}

fn label(name: &str, markdown: bool) -> String {
    if markdown {
        format!("_{name}_: ")
    } else {
        format!("{name}: ")
    }
}

/// Render `value`, or when no direct rendering exists, the fields of the
/// instances it points to as a record literal.
fn render_value(
    analysis: &dyn ValueAnalysis,
    heap: &HeapGraph,
    value: &ValueHandle,
    markdown: bool,
) -> Option<String> {
    if let Some(text) = analysis.render(value, markdown) {
        return Some(text);
    }

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for instance in heap.instances_of(value) {
        for field in heap.fields_of(*instance) {
            let ValueHandle::Field { field: name, .. } = &field else {
                continue;
            };
            if seen.contains(name) {
                continue;
            }
            if let Some(sub) = analysis.render(&field, markdown) {
                seen.insert(name.clone());
                let name = if markdown { format!("_{name}_") } else { name.clone() };
                entries.push(format!("{name}: {sub}"));
            }
        }
    }

    if entries.is_empty() {
        return None;
    }
    let joiner = if markdown { ",\n\n" } else { ",\n" };
    Some(format!("{{{}}}", entries.join(joiner)))
}

fn code_snippet(
    state: &LanguageState,
    documents: &DocumentStore,
    position: &SourcePosition,
    markdown: bool,
) -> Option<String> {
    let snippet = compact(&documents.snippet(position)?);
    if snippet.is_empty() {
        return None;
    }
    Some(if markdown {
        format!("```{}\n{}\n```", state.language, snippet)
    } else {
        snippet
    })
}

/// Text shown for `query`, with the range it applies to.
pub fn hover_text(
    state: &LanguageState,
    documents: &DocumentStore,
    query: &SourcePosition,
    markdown: bool,
) -> Option<(SourcePosition, String)> {
    let result = &state.result;
    let mut parts = Vec::new();
    let mut range = None;

    let value = state.facts.value_at(query);
    if let Some((at, handle)) = value {
        range = Some(at.clone());
        for analysis in &result.value_analyses {
            if let Some(text) = render_value(analysis.as_ref(), &result.heap, handle, markdown) {
                parts.push(format!("{}{}", label(analysis.name(), markdown), text));
            }
        }
    }

    if let Some((at, inst)) = state.facts.instruction_at(query) {
        range.get_or_insert_with(|| at.clone());
        for analysis in &result.instruction_analyses {
            if let Some(text) = analysis.render(*inst, markdown) {
                parts.push(format!("{}{}", label(analysis.name(), markdown), text));
            }
        }
    }

    if let Some((at, _)) = value {
        parts.extend(code_snippet(state, documents, at, markdown));
    }

    if let Some((at, reported)) = state.hovers.lookup(query) {
        range.get_or_insert_with(|| at.clone());
        parts.insert(0, reported.clone());
    }

    if parts.is_empty() {
        return None;
    }
    Some((range?, parts.join(separator(markdown))))
}

pub fn build_hover(
    state: &LanguageState,
    documents: &DocumentStore,
    query: &SourcePosition,
    markdown: bool,
) -> Option<Hover> {
    let (at, value) = hover_text(state, documents, query, markdown)?;
    let kind = if markdown {
        MarkupKind::Markdown
    } else {
        MarkupKind::PlainText
    };
    Some(Hover {
        contents: HoverContents::Markup(MarkupContent { kind, value }),
        range: Some(to_range(&at)),
    })
}

/// Unlabelled value renderings at `query`, prefixed with the source text of
/// the value: `"<snippet>: <rendering>"`.
pub fn position_to_type(
    state: &LanguageState,
    documents: &DocumentStore,
    query: &SourcePosition,
) -> Option<String> {
    let (at, handle) = state.facts.value_at(query)?;
    let result = &state.result;
    let renderings: Vec<String> = result
        .value_analyses
        .iter()
        .filter_map(|analysis| render_value(analysis.as_ref(), &result.heap, handle, false))
        .collect();
    if renderings.is_empty() {
        return None;
    }

    let snippet = documents.snippet(at).map(|s| compact(&s)).unwrap_or_default();
    Some(format!("{}: {}", snippet, renderings.join(", ")))
}
