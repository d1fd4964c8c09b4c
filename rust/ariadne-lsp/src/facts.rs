//! Fact population from a fresh call graph

use ariadne_core::{CallGraph, Fact, FactIndex, InstructionRef, SourcePosition, ValueHandle};

/// Position indexes of the value and instruction facts of one analysis run.
#[derive(Debug, Default)]
pub struct FactStore {
    values: FactIndex<ValueHandle>,
    instructions: FactIndex<InstructionRef>,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the facts of every reachable unit of `graph`.
    pub fn populate(graph: &CallGraph) -> Self {
        let mut store = Self::new();
        for (id, unit) in graph.reachable_units() {
            for (index, inst) in unit.instructions.iter().enumerate() {
                let Some(position) = &inst.position else {
                    continue;
                };
                store.put(
                    position.clone(),
                    Fact::Instruction(InstructionRef::new(id, index)),
                );
                if let Some(def) = inst.def {
                    store.put(position.clone(), Fact::Value(ValueHandle::local(id, def)));
                }
                for operand in &inst.operands {
                    if let Some(at) = &operand.position {
                        store.put(at.clone(), Fact::Value(ValueHandle::local(id, operand.value)));
                    }
                }
            }

            for copy in &unit.copies {
                let position = unit
                    .instructions
                    .get(copy.instruction)
                    .and_then(|inst| inst.position.as_ref());
                if let Some(position) = position {
                    store.put(position.clone(), Fact::Value(ValueHandle::local(id, copy.value)));
                }
            }
        }
        store
    }

    pub fn put(&mut self, position: SourcePosition, fact: Fact) {
        match fact {
            Fact::Value(value) => {
                self.values.put(position, value);
            }
            Fact::Instruction(inst) => {
                self.instructions.put(position, inst);
            }
        }
    }

    pub fn value_at(&self, query: &SourcePosition) -> Option<(&SourcePosition, &ValueHandle)> {
        self.values.lookup(query)
    }

    pub fn instruction_at(
        &self,
        query: &SourcePosition,
    ) -> Option<(&SourcePosition, &InstructionRef)> {
        self.instructions.lookup(query)
    }

    /// Whether any fact was recorded for `url`.
    pub fn covers(&self, url: &str) -> bool {
        self.values.contains_url(url) || self.instructions.contains_url(url)
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ariadne_core::{CodeUnit, CopyRecord, Instruction, Operand, UnitId};

    const URL: &str = "file:///a.py";

    fn pos(line: u32, col: u32, end: u32) -> SourcePosition {
        SourcePosition::new(URL, line, col, line, end)
    }

    fn graph() -> CallGraph {
        let mut script = CodeUnit::new("script");
        script.instructions = vec![
            Instruction {
                position: Some(pos(1, 0, 5)),
                def: Some(1),
                ..Instruction::default()
            },
            Instruction {
                position: Some(pos(2, 0, 5)),
                def: Some(2),
                operands: vec![Operand {
                    value: 1,
                    position: Some(pos(2, 4, 5)),
                }],
                ..Instruction::default()
            },
            Instruction {
                position: Some(pos(3, 0, 5)),
                ..Instruction::default()
            },
            Instruction::default(),
        ];
        script.copies = vec![CopyRecord { instruction: 2, value: 2 }];

        let mut dead = CodeUnit::new("dead");
        dead.reachable = false;
        dead.instructions = vec![Instruction {
            position: Some(pos(7, 0, 3)),
            def: Some(1),
            ..Instruction::default()
        }];
        CallGraph::new(vec![script, dead])
    }

    #[test]
    fn records_instructions_definitions_and_uses() {
        let store = FactStore::populate(&graph());
        let unit = UnitId(0);

        let (at, inst) = store.instruction_at(&SourcePosition::point(URL, 2, 1)).unwrap();
        assert_eq!((at, *inst), (&pos(2, 0, 5), InstructionRef::new(unit, 1)));

        let (at, value) = store.value_at(&SourcePosition::point(URL, 2, 4)).unwrap();
        assert_eq!(at, &pos(2, 4, 5));
        assert_eq!(value, &ValueHandle::local(unit, 1));

        let (_, value) = store.value_at(&SourcePosition::point(URL, 2, 1)).unwrap();
        assert_eq!(value, &ValueHandle::local(unit, 2));
    }

    #[test]
    fn copies_name_their_source_value() {
        let store = FactStore::populate(&graph());
        let (_, value) = store.value_at(&SourcePosition::point(URL, 3, 2)).unwrap();
        assert_eq!(value, &ValueHandle::local(UnitId(0), 2));
    }

    #[test]
    fn unreachable_units_contribute_nothing() {
        let store = FactStore::populate(&graph());
        assert!(store.instruction_at(&SourcePosition::point(URL, 7, 1)).is_none());
        assert_eq!(store.instruction_count(), 3);
        assert_eq!(store.value_count(), 4);
        assert!(store.covers(URL));
        assert!(!store.covers("file:///other.py"));
    }

    #[test]
    fn populating_twice_yields_the_same_facts() {
        let first = FactStore::populate(&graph());
        let second = FactStore::populate(&graph());
        assert_eq!(first.value_count(), second.value_count());
        assert_eq!(first.instruction_count(), second.instruction_count());
    }
}
