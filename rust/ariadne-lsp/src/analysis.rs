//! One analysis run for one language.
//!
//! A run never touches committed state. It builds a complete
//! [`LanguageState`] from the engine's result, and the session swaps it in
//! as a whole, dropping every fact of the previous run with the old state.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use ariadne_core::{
    AnalysisEngine, AnalysisErrorKind, AnalysisResult, EngineError, FactIndex, UriCanonicalizer,
};
use lsp_types::{CodeLens, Diagnostic};
use tracing::{debug, info};

use crate::code_lens::{reported_lens, types_lens};
use crate::commands::types_of;
use crate::config::ClientOptions;
use crate::diagnostics::{assemble, AssemblyContext, DiagnosticMap};
use crate::documents::DocumentStore;
use crate::facts::FactStore;
use crate::symbols::{collect_symbols, UnitSymbol};

/// Everything the last completed run of a language produced.
#[derive(Debug)]
pub struct LanguageState {
    pub language: String,
    pub result: AnalysisResult,
    pub facts: FactStore,
    /// Analysis-reported hover texts, rendered for the client's format.
    pub hovers: FactIndex<String>,
    pub code_lenses: HashMap<String, Vec<CodeLens>>,
    pub symbols: HashMap<String, Vec<UnitSymbol>>,
    pub diagnostics: DiagnosticMap,
    /// URLs this language last published non-empty diagnostics for.
    pub published: BTreeSet<String>,
}

impl LanguageState {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            result: AnalysisResult::default(),
            facts: FactStore::new(),
            hovers: FactIndex::new(),
            code_lenses: HashMap::new(),
            symbols: HashMap::new(),
            diagnostics: DiagnosticMap::new(),
            published: BTreeSet::new(),
        }
    }
}

/// Session state a run reads.
pub struct RunContext<'a> {
    pub documents: &'a DocumentStore,
    pub uris: &'a UriCanonicalizer,
    pub options: ClientOptions,
    pub call_source: &'a str,
}

/// Analyze every open document of `language` and stage the resulting state.
pub fn run_analysis(
    language: &str,
    engine: &mut dyn AnalysisEngine,
    ctx: &RunContext<'_>,
) -> Result<LanguageState, EngineError> {
    let modules = ctx.documents.modules(language);
    let started = Instant::now();
    debug!(language, modules = modules.len(), "analysis started");

    let result = engine.analyze(&modules)?;

    let mut state = LanguageState::new(language);
    state.facts = FactStore::populate(&result.call_graph);
    state.symbols = collect_symbols(&result.call_graph);

    for error in &result.errors {
        match error.kind {
            AnalysisErrorKind::Diagnostic => {}
            AnalysisErrorKind::Hover => {
                let text = error.render(ctx.options.hover_markdown).to_string();
                state.hovers.put(error.position.clone(), text);
            }
            AnalysisErrorKind::CodeLens => {
                state
                    .code_lenses
                    .entry(error.position.url.clone())
                    .or_default()
                    .push(reported_lens(error));
            }
        }
    }

    let assembly = AssemblyContext {
        engine: &*engine,
        documents: ctx.documents,
        uris: ctx.uris,
        options: ctx.options,
        call_source: ctx.call_source,
    };
    state.diagnostics = assemble(&assembly, &state.facts, &result);
    state.result = result;

    let mut type_lenses = Vec::new();
    for (url, symbols) in &state.symbols {
        for symbol in symbols {
            let types = types_of(&state, ctx.documents, &symbol.name);
            if let Some(lens) = types_lens(symbol, &types) {
                type_lenses.push((url.clone(), lens));
            }
        }
    }
    for (url, lens) in type_lenses {
        state.code_lenses.entry(url).or_default().push(lens);
    }

    info!(
        language,
        modules = modules.len(),
        values = state.facts.value_count(),
        instructions = state.facts.instruction_count(),
        diagnostics = state.diagnostics.values().map(Vec::len).sum::<usize>(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "analysis finished"
    );
    Ok(state)
}

/// Diagnostics to push after committing `next`: its own, plus an empty list
/// for each open document and each URL the previous run published to.
/// Records the URLs `next` publishes to.
pub fn diagnostics_to_publish(
    previously_published: &BTreeSet<String>,
    next: &mut LanguageState,
    document_uris: &[String],
) -> Vec<(String, Vec<Diagnostic>)> {
    let mut targets = previously_published.clone();
    targets.extend(next.diagnostics.keys().cloned());
    targets.extend(document_uris.iter().cloned());

    next.published = next
        .diagnostics
        .iter()
        .filter(|(_, diagnostics)| !diagnostics.is_empty())
        .map(|(url, _)| url.clone())
        .collect();

    targets
        .into_iter()
        .map(|url| {
            let diagnostics = next.diagnostics.get(&url).cloned().unwrap_or_default();
            (url, diagnostics)
        })
        .collect()
}
