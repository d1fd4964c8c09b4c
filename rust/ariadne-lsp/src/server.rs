//! The session: open documents, registered engines and the committed
//! analysis state of every language.
//!
//! Handlers are grouped by role. Document events are the only writers of
//! the document store and the only triggers of analysis; queries read the
//! last committed [`LanguageState`] and never run an engine.

use std::collections::{BTreeMap, BTreeSet};

use ariadne_core::{AnalysisEngine, SourcePosition, UriCanonicalizer};
use lsp_types::{
    ClientCapabilities, CodeActionOrCommand, CodeActionParams, CodeLens, CodeLensParams,
    Diagnostic, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DidSaveTextDocumentParams, DocumentSymbolParams,
    DocumentSymbolResponse, ExecuteCommandParams, GotoDefinitionParams, GotoDefinitionResponse,
    Hover, HoverParams, InitializeParams, Location, PublishDiagnosticsParams, ReferenceParams,
    TextDocumentPositionParams, Uri,
};
use tracing::{debug, error, info, warn};

use crate::analysis::{diagnostics_to_publish, run_analysis, LanguageState, RunContext};
use crate::code_actions::build_code_actions;
use crate::code_lens::code_lenses;
use crate::commands::{execute_command, CommandOutcome};
use crate::config::{ClientOptions, ServerConfig};
use crate::convert::to_uri;
use crate::documents::{apply_text_document_changes, last_full_replacement, DocumentStore};
use crate::error::CommandError;
use crate::goto_definition::build_goto_definition;
use crate::hover::build_hover;
use crate::symbols::{document_symbols, references};

/// Lifecycle notifications. Each returns the diagnostics to push.
pub trait DocumentEvents {
    fn did_open(&mut self, params: DidOpenTextDocumentParams) -> Vec<PublishDiagnosticsParams>;
    fn did_change(&mut self, params: DidChangeTextDocumentParams) -> Vec<PublishDiagnosticsParams>;
    fn did_close(&mut self, params: DidCloseTextDocumentParams) -> Vec<PublishDiagnosticsParams>;
    fn did_save(&mut self, params: DidSaveTextDocumentParams) -> Vec<PublishDiagnosticsParams>;
}

/// Position and document queries over committed state.
pub trait QueryMethods {
    fn hover(&self, params: HoverParams) -> Option<Hover>;
    fn definition(&self, params: GotoDefinitionParams) -> Option<GotoDefinitionResponse>;
    fn references(&self, params: ReferenceParams) -> Vec<Location>;
    fn document_symbols(&self, params: DocumentSymbolParams) -> Option<DocumentSymbolResponse>;
    fn code_lens(&self, params: CodeLensParams) -> Vec<CodeLens>;
    fn code_action(&self, params: CodeActionParams) -> Vec<CodeActionOrCommand>;
}

pub trait WorkspaceEvents {
    fn execute_command(&self, params: ExecuteCommandParams) -> Result<CommandOutcome, CommandError>;
}

pub struct Server {
    config: ServerConfig,
    options: ClientOptions,
    uris: UriCanonicalizer,
    documents: DocumentStore,
    engines: BTreeMap<String, Box<dyn AnalysisEngine>>,
    languages: BTreeMap<String, LanguageState>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let options = config.client_options(&ClientCapabilities::default());
        Self {
            config,
            options,
            uris: UriCanonicalizer::new(),
            documents: DocumentStore::new(),
            engines: BTreeMap::new(),
            languages: BTreeMap::new(),
        }
    }

    /// Use `engine` for documents opened with `language` as language id.
    pub fn register_engine(&mut self, language: impl Into<String>, engine: impl AnalysisEngine + 'static) {
        let language = language.into();
        info!(language = %language, source = engine.source(), "engine registered");
        self.engines.insert(language, Box::new(engine));
    }

    /// Adopt the client's declared capabilities.
    pub fn initialize(&mut self, params: &InitializeParams) {
        self.options = self.config.client_options(&params.capabilities);
        info!(
            related_information = self.options.related_information,
            hover_markdown = self.options.hover_markdown,
            "client initialized"
        );
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn options(&self) -> ClientOptions {
        self.options
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn language_state(&self, language: &str) -> Option<&LanguageState> {
        self.languages.get(language)
    }

    /// Run the engine of `language` over its open documents and commit the
    /// result. On engine failure the previous state stays in place.
    pub fn analyze(&mut self, language: &str) -> Vec<PublishDiagnosticsParams> {
        let Some(engine) = self.engines.get_mut(language) else {
            debug!(language, "no engine registered; skipping analysis");
            return Vec::new();
        };
        let ctx = RunContext {
            documents: &self.documents,
            uris: &self.uris,
            options: self.options,
            call_source: &self.config.diagnostics.source,
        };
        let mut next = match run_analysis(language, engine.as_mut(), &ctx) {
            Ok(state) => state,
            Err(err) => {
                error!(language, error = %err, "analysis failed");
                return Vec::new();
            }
        };

        let previous = self
            .languages
            .get(language)
            .map(|state| state.published.clone())
            .unwrap_or_default();
        let batch = diagnostics_to_publish(&previous, &mut next, &self.documents.uris(language));
        self.languages.insert(language.to_string(), next);

        batch
            .into_iter()
            .filter_map(|(url, diagnostics)| self.publish_params(&url, diagnostics))
            .collect()
    }

    /// `url` moved out of `language`: re-run it over the documents it still
    /// has, or drop its state and clear what it published when none are left.
    /// Diagnostics of `url` now belong to its new language and are not touched.
    fn release(&mut self, language: &str, url: &str) -> Vec<PublishDiagnosticsParams> {
        if let Some(state) = self.languages.get_mut(language) {
            state.published.remove(url);
        }
        if self.documents.has_documents(language) {
            return self.analyze(language);
        }
        self.retire(language)
            .iter()
            .filter_map(|stale| self.publish_params(stale, Vec::new()))
            .collect()
    }

    /// Drop the committed state of `language`, returning the URLs it had
    /// published diagnostics for.
    fn retire(&mut self, language: &str) -> BTreeSet<String> {
        self.languages
            .remove(language)
            .map(|state| state.published)
            .unwrap_or_default()
    }

    fn publish_params(&self, url: &str, diagnostics: Vec<Diagnostic>) -> Option<PublishDiagnosticsParams> {
        Some(PublishDiagnosticsParams {
            uri: to_uri(&self.uris, url)?,
            diagnostics,
            version: None,
        })
    }

    fn canonical(&self, uri: &Uri) -> Option<String> {
        let canonical = self.uris.lookup(uri.as_str());
        if canonical.is_none() {
            warn!(uri = uri.as_str(), "unknown document uri");
        }
        canonical
    }

    /// Committed state answering queries about `url`: its document's
    /// language, else the first language whose facts cover it.
    fn state_for(&self, url: &str) -> Option<&LanguageState> {
        match self.documents.language_of(url) {
            Some(language) => self.languages.get(language),
            None => self.languages.values().find(|state| state.facts.covers(url)),
        }
    }

    fn point_query(&self, params: &TextDocumentPositionParams) -> Option<(&LanguageState, SourcePosition)> {
        let url = self.canonical(&params.text_document.uri)?;
        let state = self.state_for(&url)?;
        let query = SourcePosition::from_protocol_point(url, params.position.line, params.position.character);
        Some((state, query))
    }
}

impl DocumentEvents for Server {
    fn did_open(&mut self, params: DidOpenTextDocumentParams) -> Vec<PublishDiagnosticsParams> {
        let document = params.text_document;
        let url = self.uris.mangle(document.uri.as_str());
        info!(uri = %url, language = %document.language_id, "document opened");
        let registration = self
            .documents
            .add_or_replace(&document.language_id, &url, &document.text);

        let mut batch = Vec::new();
        if let Some(previous) = registration.moved_from {
            info!(uri = %url, from = %previous, to = %document.language_id, "document changed language");
            batch.extend(self.release(&previous, &url));
        }
        if registration.changed {
            batch.extend(self.analyze(&document.language_id));
        }
        batch
    }

    fn did_change(&mut self, params: DidChangeTextDocumentParams) -> Vec<PublishDiagnosticsParams> {
        let Some(url) = self.canonical(&params.text_document.uri) else {
            return Vec::new();
        };
        let Some(document) = self.documents.get(&url) else {
            warn!(uri = %url, "change for a document that is not open");
            return Vec::new();
        };

        let changes = &params.content_changes;
        let text = match apply_text_document_changes(&document.text, changes) {
            Some(text) => text,
            None => match last_full_replacement(changes) {
                Some(text) => {
                    warn!(uri = %url, "ranged change did not apply; using full replacement");
                    text.to_string()
                }
                None => {
                    warn!(uri = %url, "ranged change did not apply; change ignored");
                    return Vec::new();
                }
            },
        };
        debug!(uri = %url, changes = changes.len(), "document changed");
        self.documents.update_text(&url, text);
        self.publish_params(&url, Vec::new()).into_iter().collect()
    }

    fn did_close(&mut self, params: DidCloseTextDocumentParams) -> Vec<PublishDiagnosticsParams> {
        let Some(url) = self.canonical(&params.text_document.uri) else {
            return Vec::new();
        };
        let Some(document) = self.documents.remove(&url) else {
            return Vec::new();
        };
        info!(uri = %url, language = %document.language, "document closed");

        if self.documents.has_documents(&document.language) {
            return self.analyze(&document.language);
        }

        let mut cleared = self.retire(&document.language);
        cleared.insert(url);
        cleared
            .iter()
            .filter_map(|url| self.publish_params(url, Vec::new()))
            .collect()
    }

    fn did_save(&mut self, params: DidSaveTextDocumentParams) -> Vec<PublishDiagnosticsParams> {
        let Some(url) = self.canonical(&params.text_document.uri) else {
            return Vec::new();
        };
        let Some(language) = self.documents.language_of(&url).map(str::to_string) else {
            warn!(uri = %url, "save for a document that is not open");
            return Vec::new();
        };
        debug!(uri = %url, "document saved");
        self.analyze(&language)
    }
}

impl QueryMethods for Server {
    fn hover(&self, params: HoverParams) -> Option<Hover> {
        let (state, query) = self.point_query(&params.text_document_position_params)?;
        build_hover(state, &self.documents, &query, self.options.hover_markdown)
    }

    fn definition(&self, params: GotoDefinitionParams) -> Option<GotoDefinitionResponse> {
        let (state, query) = self.point_query(&params.text_document_position_params)?;
        build_goto_definition(state, &self.uris, &query)
    }

    fn references(&self, params: ReferenceParams) -> Vec<Location> {
        match self.point_query(&params.text_document_position) {
            Some((state, query)) => references(state, &self.uris, &query),
            None => Vec::new(),
        }
    }

    fn document_symbols(&self, params: DocumentSymbolParams) -> Option<DocumentSymbolResponse> {
        let url = self.canonical(&params.text_document.uri)?;
        let state = self.state_for(&url)?;
        Some(DocumentSymbolResponse::Flat(document_symbols(state, &self.uris, &url)))
    }

    fn code_lens(&self, params: CodeLensParams) -> Vec<CodeLens> {
        let Some(url) = self.canonical(&params.text_document.uri) else {
            return Vec::new();
        };
        self.state_for(&url)
            .map(|state| code_lenses(state, &url))
            .unwrap_or_default()
    }

    fn code_action(&self, params: CodeActionParams) -> Vec<CodeActionOrCommand> {
        build_code_actions(&params.text_document.uri, &params.range, &params.context.diagnostics)
    }
}

impl WorkspaceEvents for Server {
    fn execute_command(&self, params: ExecuteCommandParams) -> Result<CommandOutcome, CommandError> {
        debug!(command = %params.command, "execute command");
        execute_command(
            &self.languages,
            &self.documents,
            &self.uris,
            &params.command,
            &params.arguments,
        )
    }
}
