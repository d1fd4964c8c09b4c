//! The analysis-engine boundary.
//!
//! An engine turns a set of source modules into a call graph, a heap graph
//! and a stream of [`AnalysisError`]s. Renderers for hover text and the
//! optional definition finder are produced by the same run, since they
//! usually close over its results.

use thiserror::Error;

use crate::model::{AnalysisError, CallGraph, HeapGraph, InstructionRef, UnitId, ValueHandle, ValueNumber};
use crate::position::SourcePosition;

/// Source tag used when an engine does not name itself.
pub const DEFAULT_SOURCE: &str = "Ariadne";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read module {module}: {source}")]
    Io {
        module: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed module {module}: {message}")]
    Malformed { module: String, message: String },
    #[error("analysis cancelled")]
    Cancelled,
    #[error("{0}")]
    Other(String),
}

/// One open document handed to an engine, under its canonical URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceModule {
    pub uri: String,
    pub text: String,
}

impl SourceModule {
    pub fn new(uri: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            text: text.into(),
        }
    }
}

/// Renders a value fact for hovers and type lenses.
pub trait ValueAnalysis: Send + Sync {
    fn name(&self) -> &str;
    fn render(&self, value: &ValueHandle, markdown: bool) -> Option<String>;
}

/// Renders an instruction fact for hovers.
pub trait InstructionAnalysis: Send + Sync {
    fn name(&self) -> &str;
    fn render(&self, instruction: InstructionRef, markdown: bool) -> Option<String>;
}

/// Finds the declarations an instruction refers to.
pub trait DefinitionFinder: Send + Sync {
    fn find_definitions(&self, instruction: InstructionRef) -> Vec<SourcePosition>;
}

impl<F> DefinitionFinder for F
where
    F: Fn(InstructionRef) -> Vec<SourcePosition> + Send + Sync,
{
    fn find_definitions(&self, instruction: InstructionRef) -> Vec<SourcePosition> {
        self(instruction)
    }
}

/// A named closure usable as either kind of renderer.
pub struct FnAnalysis<F> {
    name: String,
    render: F,
}

impl<F> FnAnalysis<F> {
    pub fn new(name: impl Into<String>, render: F) -> Self {
        Self {
            name: name.into(),
            render,
        }
    }
}

impl<F> ValueAnalysis for FnAnalysis<F>
where
    F: Fn(&ValueHandle, bool) -> Option<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, value: &ValueHandle, markdown: bool) -> Option<String> {
        (self.render)(value, markdown)
    }
}

impl<F> InstructionAnalysis for FnAnalysis<F>
where
    F: Fn(InstructionRef, bool) -> Option<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, instruction: InstructionRef, markdown: bool) -> Option<String> {
        (self.render)(instruction, markdown)
    }
}

/// Everything one engine run produced.
#[derive(Default)]
pub struct AnalysisResult {
    pub call_graph: CallGraph,
    pub heap: HeapGraph,
    pub errors: Vec<AnalysisError>,
    pub value_analyses: Vec<Box<dyn ValueAnalysis>>,
    pub instruction_analyses: Vec<Box<dyn InstructionAnalysis>>,
    pub definitions: Option<Box<dyn DefinitionFinder>>,
}

impl std::fmt::Debug for AnalysisResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisResult")
            .field("units", &self.call_graph.units.len())
            .field("errors", &self.errors.len())
            .field("value_analyses", &self.value_analyses.len())
            .field("instruction_analyses", &self.instruction_analyses.len())
            .field("definitions", &self.definitions.is_some())
            .finish()
    }
}

/// Element of a dependency slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceStatement {
    /// An ordinary instruction.
    Normal(InstructionRef),
    /// An actual argument `value` passed at a call instruction.
    ParamCaller { call: InstructionRef, value: ValueNumber },
    /// A formal parameter `value` of a unit.
    ParamCallee { unit: UnitId, value: ValueNumber },
    /// Any other statement kind; carries no source position.
    Other(UnitId),
}

impl SliceStatement {
    pub fn unit(&self) -> UnitId {
        match self {
            Self::Normal(inst) => inst.unit,
            Self::ParamCaller { call, .. } => call.unit,
            Self::ParamCallee { unit, .. } | Self::Other(unit) => *unit,
        }
    }

    /// Source range of the statement, when the call graph records one.
    pub fn position<'g>(&self, graph: &'g CallGraph) -> Option<&'g SourcePosition> {
        match self {
            Self::Normal(inst) => graph.source_position_of(*inst),
            Self::ParamCaller { call, value } => {
                let slot = graph
                    .instruction(*call)?
                    .operands
                    .iter()
                    .position(|op| op.value == *value)?;
                graph.operand_position_of(*call, slot)
            }
            Self::ParamCallee { unit, value } => graph.unit(*unit)?.parameter_position(*value),
            Self::Other(_) => None,
        }
    }
}

/// A static-analysis engine for one language.
pub trait AnalysisEngine: Send {
    fn source(&self) -> &str {
        DEFAULT_SOURCE
    }

    /// Analyze the full document set of a language.
    fn analyze(&mut self, modules: &[SourceModule]) -> Result<AnalysisResult, EngineError>;

    /// Statements the definition at `root` depends on.
    fn dependency_slice(
        &self,
        result: &AnalysisResult,
        root: InstructionRef,
    ) -> Result<Vec<SliceStatement>, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CodeUnit, Instruction, Operand, Parameter};

    fn pos(line: u32, col: u32, end: u32) -> SourcePosition {
        SourcePosition::new("file:///s.py", line, col, line, end)
    }

    #[test]
    fn slice_statements_resolve_their_positions() {
        let mut caller = CodeUnit::new("main");
        caller.instructions = vec![Instruction {
            position: Some(pos(3, 0, 9)),
            operands: vec![
                Operand { value: 2, position: Some(pos(3, 2, 3)) },
                Operand { value: 5, position: Some(pos(3, 5, 6)) },
            ],
            targets: vec![UnitId(1)],
            ..Instruction::default()
        }];
        let mut callee = CodeUnit::new("f");
        callee.parameters = vec![Parameter { value: 1, position: Some(pos(1, 6, 7)) }];
        let graph = CallGraph::new(vec![caller, callee]);
        let call = InstructionRef::new(UnitId(0), 0);

        assert_eq!(SliceStatement::Normal(call).position(&graph), Some(&pos(3, 0, 9)));
        assert_eq!(
            SliceStatement::ParamCaller { call, value: 5 }.position(&graph),
            Some(&pos(3, 5, 6))
        );
        assert_eq!(
            SliceStatement::ParamCallee { unit: UnitId(1), value: 1 }.position(&graph),
            Some(&pos(1, 6, 7))
        );
        assert_eq!(SliceStatement::Other(UnitId(1)).position(&graph), None);
        assert_eq!(SliceStatement::ParamCaller { call, value: 9 }.position(&graph), None);
    }

    #[test]
    fn closures_act_as_renderers() {
        let analysis = FnAnalysis::new("type", |value: &ValueHandle, markdown: bool| match value {
            ValueHandle::Local { value: 1, .. } if markdown => Some("`int`".to_string()),
            ValueHandle::Local { value: 1, .. } => Some("int".to_string()),
            _ => None,
        });
        let local = ValueHandle::local(UnitId(0), 1);
        assert_eq!(ValueAnalysis::name(&analysis), "type");
        assert_eq!(ValueAnalysis::render(&analysis, &local, true).as_deref(), Some("`int`"));
        assert_eq!(ValueAnalysis::render(&analysis, &ValueHandle::local(UnitId(0), 2), false), None);
    }
}
