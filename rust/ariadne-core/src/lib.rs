//! Ariadne Core
//!
//! Protocol-independent pieces of the Ariadne language server: source
//! positions and their total order, the position interval index, URI
//! canonicalization, and the data model exchanged with analysis engines.

pub mod engine;
pub mod index;
pub mod model;
pub mod position;
pub mod uri;

pub use engine::{
    AnalysisEngine, AnalysisResult, DefinitionFinder, EngineError, FnAnalysis,
    InstructionAnalysis, SliceStatement, SourceModule, ValueAnalysis, DEFAULT_SOURCE,
};
pub use index::{FactIndex, PositionIndex};
pub use model::{
    AnalysisError, AnalysisErrorKind, CallGraph, CodeUnit, CopyRecord, Fact, HeapGraph,
    InstanceId, Instruction, InstructionRef, Operand, Parameter, Severity, UnitId, ValueHandle,
    ValueNumber,
};
pub use position::{SourcePosition, UNKNOWN_OFFSET};
pub use uri::UriCanonicalizer;
