//! Scripted engine and request builders shared by the integration tests.

#![allow(dead_code)]

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ariadne_core::{
    AnalysisEngine, AnalysisError, AnalysisResult, CallGraph, CodeUnit, EngineError, FnAnalysis,
    Instruction, InstructionRef, Operand, Parameter, SliceStatement, SourceModule,
    SourcePosition, UnitId, ValueHandle,
};
use lsp_types::{
    ClientCapabilities, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DidSaveTextDocumentParams, HoverClientCapabilities, HoverParams,
    InitializeParams, MarkupKind, Position, PublishDiagnosticsClientCapabilities,
    TextDocumentClientCapabilities, TextDocumentContentChangeEvent, TextDocumentIdentifier,
    TextDocumentItem, TextDocumentPositionParams, Uri, VersionedTextDocumentIdentifier,
};

pub const A_PY: &str = "file:///a.py";
pub const A_TEXT: &str = "x = 1\ny = x\n";

type Script = Box<dyn FnMut(usize, &[SourceModule]) -> Result<AnalysisResult, EngineError> + Send>;

/// Engine whose results come from a closure, counting its runs.
pub struct ScriptedEngine {
    runs: Arc<AtomicUsize>,
    script: Script,
    slice: Vec<SliceStatement>,
}

impl ScriptedEngine {
    /// `script` receives the zero-based run number and the module set.
    pub fn new(
        script: impl FnMut(usize, &[SourceModule]) -> Result<AnalysisResult, EngineError> + Send + 'static,
    ) -> (Self, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let engine = Self {
            runs: Arc::clone(&runs),
            script: Box::new(script),
            slice: Vec::new(),
        };
        (engine, runs)
    }

    /// Answer every dependency-slice request with `slice`.
    pub fn with_slice(mut self, slice: Vec<SliceStatement>) -> Self {
        self.slice = slice;
        self
    }
}

impl AnalysisEngine for ScriptedEngine {
    fn source(&self) -> &str {
        "scripted"
    }

    fn analyze(&mut self, modules: &[SourceModule]) -> Result<AnalysisResult, EngineError> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst);
        (self.script)(run, modules)
    }

    fn dependency_slice(
        &self,
        _result: &AnalysisResult,
        _root: InstructionRef,
    ) -> Result<Vec<SliceStatement>, EngineError> {
        Ok(self.slice.clone())
    }
}

pub fn runs(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

// ---------------------------------------------------------------------------
// Programs
// ---------------------------------------------------------------------------

pub fn pos(url: &str, line: u32, col: u32, end: u32) -> SourcePosition {
    SourcePosition::new(url, line, col, line, end)
}

/// `x = 1` / `y = x`: value 1 defined on line 1 and read at 2:4.
pub fn two_line_program() -> AnalysisResult {
    let mut script = CodeUnit::new("script");
    script.instructions = vec![
        Instruction {
            position: Some(pos(A_PY, 1, 0, 5)),
            def: Some(1),
            ..Instruction::default()
        },
        Instruction {
            position: Some(pos(A_PY, 2, 0, 5)),
            def: Some(2),
            operands: vec![Operand {
                value: 1,
                position: Some(pos(A_PY, 2, 4, 5)),
            }],
            ..Instruction::default()
        },
    ];

    let types = FnAnalysis::new("type", |value: &ValueHandle, markdown: bool| match value {
        ValueHandle::Local { value: 1, .. } if markdown => Some("`int`".to_string()),
        ValueHandle::Local { value: 1, .. } => Some("int".to_string()),
        _ => None,
    });
    AnalysisResult {
        call_graph: CallGraph::new(vec![script]),
        value_analyses: vec![Box::new(types)],
        ..AnalysisResult::default()
    }
}

pub const B_PY: &str = "file:///b.py";
pub const B_TEXT: &str = "def f(a):\n    return a\n\nf(1)\n";

/// `f` declared on line 1 and called from the script on line 4.
pub fn call_program() -> AnalysisResult {
    let mut f = CodeUnit::new("f");
    f.body_position = Some(SourcePosition::new(B_PY, 1, 0, 2, 12));
    f.name_position = Some(pos(B_PY, 1, 4, 5));
    f.parameters = vec![Parameter {
        value: 1,
        position: Some(pos(B_PY, 1, 6, 7)),
    }];
    f.instructions = vec![Instruction {
        position: Some(pos(B_PY, 2, 4, 12)),
        operands: vec![Operand {
            value: 1,
            position: Some(pos(B_PY, 2, 11, 12)),
        }],
        ..Instruction::default()
    }];

    let mut script = CodeUnit::new("script");
    script.instructions = vec![Instruction {
        position: Some(pos(B_PY, 4, 0, 4)),
        def: Some(3),
        operands: vec![Operand {
            value: 2,
            position: Some(pos(B_PY, 4, 2, 3)),
        }],
        targets: vec![UnitId(0)],
    }];

    let types = FnAnalysis::new("type", |value: &ValueHandle, _markdown: bool| match value {
        ValueHandle::Local { unit: UnitId(0), value: 1 } => Some("int".to_string()),
        _ => None,
    });
    let definitions = |inst: InstructionRef| {
        if inst == InstructionRef::new(UnitId(1), 0) {
            vec![pos(B_PY, 1, 4, 5)]
        } else {
            Vec::new()
        }
    };
    AnalysisResult {
        call_graph: CallGraph::new(vec![f, script]),
        value_analyses: vec![Box::new(types)],
        definitions: Some(Box::new(definitions)),
        ..AnalysisResult::default()
    }
}

pub fn with_errors(mut result: AnalysisResult, errors: Vec<AnalysisError>) -> AnalysisResult {
    result.errors = errors;
    result
}

// ---------------------------------------------------------------------------
// Protocol params
// ---------------------------------------------------------------------------

pub fn uri(text: &str) -> Uri {
    Uri::from_str(text).expect("test uri")
}

pub fn initialize_params(related_information: bool, markdown: bool) -> InitializeParams {
    let formats = if markdown {
        vec![MarkupKind::Markdown, MarkupKind::PlainText]
    } else {
        vec![MarkupKind::PlainText]
    };
    InitializeParams {
        capabilities: ClientCapabilities {
            text_document: Some(TextDocumentClientCapabilities {
                publish_diagnostics: Some(PublishDiagnosticsClientCapabilities {
                    related_information: Some(related_information),
                    ..Default::default()
                }),
                hover: Some(HoverClientCapabilities {
                    dynamic_registration: None,
                    content_format: Some(formats),
                }),
                ..Default::default()
            }),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn open(url: &str, language: &str, text: &str) -> DidOpenTextDocumentParams {
    DidOpenTextDocumentParams {
        text_document: TextDocumentItem {
            uri: uri(url),
            language_id: language.to_string(),
            version: 1,
            text: text.to_string(),
        },
    }
}

pub fn change(url: &str, changes: Vec<TextDocumentContentChangeEvent>) -> DidChangeTextDocumentParams {
    DidChangeTextDocumentParams {
        text_document: VersionedTextDocumentIdentifier {
            uri: uri(url),
            version: 2,
        },
        content_changes: changes,
    }
}

pub fn full_text(text: &str) -> TextDocumentContentChangeEvent {
    TextDocumentContentChangeEvent {
        range: None,
        range_length: None,
        text: text.to_string(),
    }
}

pub fn close(url: &str) -> DidCloseTextDocumentParams {
    DidCloseTextDocumentParams {
        text_document: TextDocumentIdentifier { uri: uri(url) },
    }
}

pub fn save(url: &str) -> DidSaveTextDocumentParams {
    DidSaveTextDocumentParams {
        text_document: TextDocumentIdentifier { uri: uri(url) },
        text: None,
    }
}

pub fn at(url: &str, line: u32, character: u32) -> TextDocumentPositionParams {
    TextDocumentPositionParams {
        text_document: TextDocumentIdentifier { uri: uri(url) },
        position: Position { line, character },
    }
}

pub fn hover_at(url: &str, line: u32, character: u32) -> HoverParams {
    HoverParams {
        text_document_position_params: at(url, line, character),
        work_done_progress_params: Default::default(),
    }
}
