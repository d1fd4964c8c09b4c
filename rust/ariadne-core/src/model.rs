//! Engine-neutral view of one analysis run: call graph, heap graph, facts
//! and reported analysis errors.

use std::collections::HashMap;

use crate::position::SourcePosition;

/// SSA value number local to a code unit.
pub type ValueNumber = u32;

/// Index of a code unit in its [`CallGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub usize);

/// Index of an abstract heap instance in a [`HeapGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub usize);

/// A specific instruction of a specific code unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstructionRef {
    pub unit: UnitId,
    pub index: usize,
}

impl InstructionRef {
    pub fn new(unit: UnitId, index: usize) -> Self {
        Self { unit, index }
    }
}

/// Handle to a computed value: a local of a unit or a field of a heap instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueHandle {
    Local { unit: UnitId, value: ValueNumber },
    Field { instance: InstanceId, field: String },
}

impl ValueHandle {
    pub fn local(unit: UnitId, value: ValueNumber) -> Self {
        Self::Local { unit, value }
    }
}

/// What the position index records at a source range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fact {
    Value(ValueHandle),
    Instruction(InstructionRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub value: ValueNumber,
    pub position: Option<SourcePosition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instruction {
    pub position: Option<SourcePosition>,
    pub def: Option<ValueNumber>,
    pub operands: Vec<Operand>,
    /// Possible callees when this instruction is a call.
    pub targets: Vec<UnitId>,
}

impl Instruction {
    pub fn is_call(&self) -> bool {
        !self.targets.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub value: ValueNumber,
    pub position: Option<SourcePosition>,
}

/// A value the engine's SSA conversion copied away; the copy's instruction
/// position still names it in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyRecord {
    pub instruction: usize,
    pub value: ValueNumber,
}

/// A function, method or script body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeUnit {
    pub name: String,
    /// Source-level code (as opposed to synthetic or library models).
    pub analyzable: bool,
    /// Whether the unit is a node of the call graph.
    pub reachable: bool,
    pub body_position: Option<SourcePosition>,
    pub name_position: Option<SourcePosition>,
    pub parameters: Vec<Parameter>,
    pub instructions: Vec<Instruction>,
    pub copies: Vec<CopyRecord>,
}

impl CodeUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            analyzable: true,
            reachable: true,
            ..Self::default()
        }
    }

    /// The document URL this unit's body belongs to.
    pub fn url(&self) -> Option<&str> {
        self.body_position.as_ref().map(|p| p.url.as_str())
    }

    pub fn parameter_position(&self, value: ValueNumber) -> Option<&SourcePosition> {
        self.parameters
            .iter()
            .find(|p| p.value == value)
            .and_then(|p| p.position.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    pub units: Vec<CodeUnit>,
}

impl CallGraph {
    pub fn new(units: Vec<CodeUnit>) -> Self {
        Self { units }
    }

    pub fn unit(&self, id: UnitId) -> Option<&CodeUnit> {
        self.units.get(id.0)
    }

    pub fn units(&self) -> impl Iterator<Item = (UnitId, &CodeUnit)> {
        self.units.iter().enumerate().map(|(i, u)| (UnitId(i), u))
    }

    pub fn reachable_units(&self) -> impl Iterator<Item = (UnitId, &CodeUnit)> {
        self.units().filter(|(_, u)| u.reachable)
    }

    pub fn units_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (UnitId, &'a CodeUnit)> {
        self.units().filter(move |(_, u)| u.name == name)
    }

    pub fn instruction(&self, at: InstructionRef) -> Option<&Instruction> {
        self.unit(at.unit)?.instructions.get(at.index)
    }

    pub fn source_position_of(&self, at: InstructionRef) -> Option<&SourcePosition> {
        self.instruction(at)?.position.as_ref()
    }

    pub fn operand_position_of(&self, at: InstructionRef, operand: usize) -> Option<&SourcePosition> {
        self.instruction(at)?.operands.get(operand)?.position.as_ref()
    }

    /// The instruction defining `value` in `unit`.
    pub fn definition_of(&self, unit: UnitId, value: ValueNumber) -> Option<InstructionRef> {
        self.unit(unit)?
            .instructions
            .iter()
            .position(|inst| inst.def == Some(value))
            .map(|index| InstructionRef::new(unit, index))
    }

    /// The first instruction of `unit` that reads `value`, with the operand slot.
    pub fn first_use_of(&self, unit: UnitId, value: ValueNumber) -> Option<(InstructionRef, usize)> {
        let code = self.unit(unit)?;
        code.instructions.iter().enumerate().find_map(|(index, inst)| {
            inst.operands
                .iter()
                .position(|op| op.value == value)
                .map(|slot| (InstructionRef::new(unit, index), slot))
        })
    }

    /// Every reachable call instruction that may invoke `callee`.
    pub fn callers_of(&self, callee: UnitId) -> Vec<InstructionRef> {
        let mut calls = Vec::new();
        for (id, unit) in self.reachable_units() {
            for (index, inst) in unit.instructions.iter().enumerate() {
                if inst.targets.contains(&callee) {
                    calls.push(InstructionRef::new(id, index));
                }
            }
        }
        calls
    }
}

/// Points-to relation: values to abstract instances, instances to fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeapGraph {
    points_to: HashMap<ValueHandle, Vec<InstanceId>>,
    fields: HashMap<InstanceId, Vec<String>>,
}

impl HeapGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_points_to(&mut self, value: ValueHandle, instance: InstanceId) {
        let targets = self.points_to.entry(value).or_default();
        if !targets.contains(&instance) {
            targets.push(instance);
        }
    }

    pub fn add_field(&mut self, instance: InstanceId, field: impl Into<String>) {
        let field = field.into();
        let fields = self.fields.entry(instance).or_default();
        if !fields.contains(&field) {
            fields.push(field);
        }
    }

    pub fn contains(&self, value: &ValueHandle) -> bool {
        self.points_to.contains_key(value)
    }

    pub fn instances_of(&self, value: &ValueHandle) -> &[InstanceId] {
        self.points_to.get(value).map(Vec::as_slice).unwrap_or_default()
    }

    /// Field handles of an instance, in declaration order.
    pub fn fields_of(&self, instance: InstanceId) -> impl Iterator<Item = ValueHandle> + '_ {
        self.fields
            .get(&instance)
            .into_iter()
            .flatten()
            .map(move |field| ValueHandle::Field {
                instance,
                field: field.clone(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Information,
    Hint,
}

/// Where an analysis error is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnalysisErrorKind {
    #[default]
    Diagnostic,
    Hover,
    CodeLens,
}

/// A result reported by an analysis: a diagnostic, a hover text or a code lens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisError {
    pub kind: AnalysisErrorKind,
    pub position: SourcePosition,
    pub message: String,
    /// Markdown rendering, when it differs from the plain message.
    pub markdown: Option<String>,
    pub severity: Severity,
    /// Source tag; the reporting engine's tag when absent.
    pub source: Option<String>,
    pub related: Vec<(SourcePosition, String)>,
    pub repair: Option<String>,
}

impl AnalysisError {
    pub fn new(kind: AnalysisErrorKind, position: SourcePosition, message: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            message: message.into(),
            markdown: None,
            severity: Severity::default(),
            source: None,
            related: Vec::new(),
            repair: None,
        }
    }

    pub fn diagnostic(position: SourcePosition, message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::Diagnostic, position, message)
    }

    pub fn hover(position: SourcePosition, message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::Hover, position, message)
    }

    pub fn code_lens(position: SourcePosition, message: impl Into<String>) -> Self {
        Self::new(AnalysisErrorKind::CodeLens, position, message)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_markdown(mut self, markdown: impl Into<String>) -> Self {
        self.markdown = Some(markdown.into());
        self
    }

    pub fn with_related(mut self, position: SourcePosition, message: impl Into<String>) -> Self {
        self.related.push((position, message.into()));
        self
    }

    pub fn with_repair(mut self, repair: impl Into<String>) -> Self {
        self.repair = Some(repair.into());
        self
    }

    pub fn render(&self, markdown: bool) -> &str {
        match (&self.markdown, markdown) {
            (Some(text), true) => text,
            _ => &self.message,
        }
    }
}
