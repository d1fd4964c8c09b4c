//! Diagnostic assembly from analysis errors
//!
//! Every diagnostic-kind error becomes one protocol diagnostic under the URL
//! of its position. When the client shows related information, the
//! diagnostic is cross-referenced with the dependency slice of the value at
//! its position, then with the error's own related pairs. Identical
//! diagnostics for one URL are published once.
//!
//! Call sites additionally get informational diagnostics linking each call
//! to its possible callees and each callee back to its call sites.

use std::collections::BTreeMap;

use ariadne_core::{
    AnalysisEngine, AnalysisErrorKind, AnalysisResult, CodeUnit, SourcePosition, UnitId,
    UriCanonicalizer, ValueHandle,
};
use lsp_types::{Diagnostic, DiagnosticRelatedInformation, DiagnosticSeverity};
use tracing::warn;

use crate::config::ClientOptions;
use crate::convert::{to_location, to_range, to_severity};
use crate::documents::{compact, DocumentStore};
use crate::facts::FactStore;

pub const CALL_INFORMATION: &str = "call information";

/// Diagnostics per canonical URL.
pub type DiagnosticMap = BTreeMap<String, Vec<Diagnostic>>;

/// What diagnostic assembly reads besides the analysis result.
pub struct AssemblyContext<'a> {
    pub engine: &'a dyn AnalysisEngine,
    pub documents: &'a DocumentStore,
    pub uris: &'a UriCanonicalizer,
    pub options: ClientOptions,
    /// Source tag of the call-information diagnostics.
    pub call_source: &'a str,
}

pub fn assemble(ctx: &AssemblyContext<'_>, facts: &FactStore, result: &AnalysisResult) -> DiagnosticMap {
    let mut diagnostics = DiagnosticMap::new();

    for error in &result.errors {
        if error.kind != AnalysisErrorKind::Diagnostic {
            continue;
        }

        let mut related = Vec::new();
        if ctx.options.related_information {
            for info in slice_related(ctx, facts, result, &error.position) {
                push_related(&mut related, info);
            }
            for (position, message) in &error.related {
                if let Some(location) = to_location(ctx.uris, position) {
                    push_related(
                        &mut related,
                        DiagnosticRelatedInformation {
                            location,
                            message: message.clone(),
                        },
                    );
                }
            }
        }

        let source = error
            .source
            .clone()
            .unwrap_or_else(|| ctx.engine.source().to_string());
        let diagnostic = Diagnostic {
            range: to_range(&error.position),
            severity: Some(to_severity(error.severity)),
            source: Some(source),
            message: error.message.clone(),
            related_information: (!related.is_empty()).then_some(related),
            ..Default::default()
        };
        push_unique(&mut diagnostics, &error.position.url, diagnostic);
    }

    if ctx.options.related_information && ctx.options.call_information {
        for (url, diagnostic) in call_information(ctx, result) {
            push_unique(&mut diagnostics, &url, diagnostic);
        }
    }

    diagnostics
}

fn push_unique(diagnostics: &mut DiagnosticMap, url: &str, diagnostic: Diagnostic) {
    let bucket = diagnostics.entry(url.to_string()).or_default();
    if !bucket.contains(&diagnostic) {
        bucket.push(diagnostic);
    }
}

fn push_related(related: &mut Vec<DiagnosticRelatedInformation>, info: DiagnosticRelatedInformation) {
    if !related.contains(&info) {
        related.push(info);
    }
}

/// Source locations the value at `position` depends on, each labelled with
/// its compacted source text.
fn slice_related(
    ctx: &AssemblyContext<'_>,
    facts: &FactStore,
    result: &AnalysisResult,
    position: &SourcePosition,
) -> Vec<DiagnosticRelatedInformation> {
    let Some((_, ValueHandle::Local { unit, value })) = facts.value_at(position) else {
        return Vec::new();
    };
    let graph = &result.call_graph;
    let Some(root) = graph.definition_of(*unit, *value) else {
        return Vec::new();
    };

    let slice = match ctx.engine.dependency_slice(result, root) {
        Ok(slice) => slice,
        Err(err) => {
            warn!(%position, error = %err, "dependency slice failed");
            return Vec::new();
        }
    };

    slice
        .iter()
        .filter(|statement| graph.unit(statement.unit()).is_some_and(|u| u.analyzable))
        .filter_map(|statement| statement.position(graph))
        .filter_map(|at| {
            let location = to_location(ctx.uris, at)?;
            let message = ctx.documents.snippet(at).map(|s| compact(&s)).unwrap_or_default();
            Some(DiagnosticRelatedInformation { location, message })
        })
        .collect()
}

fn declaration(unit: &CodeUnit) -> Option<&SourcePosition> {
    unit.name_position.as_ref().or(unit.body_position.as_ref())
}

fn call_information(ctx: &AssemblyContext<'_>, result: &AnalysisResult) -> Vec<(String, Diagnostic)> {
    let graph = &result.call_graph;
    let mut out = Vec::new();
    let mut call_sites: BTreeMap<UnitId, Vec<DiagnosticRelatedInformation>> = BTreeMap::new();

    for (caller_id, caller) in graph.reachable_units() {
        if !caller.analyzable {
            continue;
        }
        for inst in caller.instructions.iter().filter(|inst| inst.is_call()) {
            let Some(site) = &inst.position else {
                continue;
            };
            let mut related = Vec::new();
            for target in &inst.targets {
                let Some(callee) = graph.unit(*target) else {
                    continue;
                };
                if let Some(location) = declaration(callee).and_then(|at| to_location(ctx.uris, at)) {
                    push_related(
                        &mut related,
                        DiagnosticRelatedInformation {
                            location,
                            message: format!("callee {}", callee.name),
                        },
                    );
                }
                if let Some(location) = to_location(ctx.uris, site) {
                    let text = ctx.documents.snippet(site).map(|s| compact(&s)).unwrap_or_default();
                    push_related(
                        call_sites.entry(*target).or_default(),
                        DiagnosticRelatedInformation {
                            location,
                            message: format!("call site {text}"),
                        },
                    );
                }
            }
            for call in graph.callers_of(caller_id) {
                let Some(location) = graph
                    .source_position_of(call)
                    .and_then(|at| to_location(ctx.uris, at))
                else {
                    continue;
                };
                let name = graph.unit(call.unit).map(|u| u.name.as_str()).unwrap_or_default();
                push_related(
                    &mut related,
                    DiagnosticRelatedInformation {
                        location,
                        message: format!("caller {name}"),
                    },
                );
            }
            if !related.is_empty() {
                out.push((site.url.clone(), info_diagnostic(ctx, site, related)));
            }
        }
    }

    for (callee, related) in call_sites {
        let Some(at) = graph.unit(callee).and_then(declaration) else {
            continue;
        };
        out.push((at.url.clone(), info_diagnostic(ctx, at, related)));
    }
    out
}

fn info_diagnostic(
    ctx: &AssemblyContext<'_>,
    position: &SourcePosition,
    related: Vec<DiagnosticRelatedInformation>,
) -> Diagnostic {
    Diagnostic {
        range: to_range(position),
        severity: Some(DiagnosticSeverity::INFORMATION),
        source: Some(ctx.call_source.to_string()),
        message: CALL_INFORMATION.to_string(),
        related_information: Some(related),
        ..Default::default()
    }
}
