use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::{Instruction, Kind, Name, Program, Span, Word, UNRESOLVED};

/// A reference to a label that is never declared. Resolution keeps going
/// and the operand is left at [`UNRESOLVED`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedLabel {
    pub name: Name,
    pub span: Span,
    /// Slot of the referring instruction.
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub program: Program,
    pub unresolved: Vec<UnresolvedLabel>,
}

impl Resolved {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Label declarations bucketed by name hash. Names are only compared
/// within a bucket.
struct LabelTable {
    buckets: BTreeMap<u32, Vec<(Name, Word)>>,
    len: usize,
}

impl LabelTable {
    fn collect(instructions: &[Instruction]) -> Self {
        let mut table = Self {
            buckets: BTreeMap::new(),
            len: 0,
        };
        for (index, instruction) in instructions.iter().enumerate() {
            if instruction.kind != Kind::Label {
                continue;
            }
            let (Some(name), Ok(index)) = (&instruction.name, Word::try_from(index)) else {
                continue;
            };
            table.declare(instruction.hash, name, index);
        }
        table
    }

    /// Redeclaring a label moves it.
    fn declare(&mut self, hash: u32, name: &Name, index: Word) {
        let bucket = self.buckets.entry(hash).or_default();
        match bucket.iter_mut().find(|(declared, _)| declared == name) {
            Some((_, target)) => {
                tracing::debug!(%name, previous = *target, index, "label redeclared");
                *target = index;
            }
            None => {
                bucket.push((name.clone(), index));
                self.len = self.len.saturating_add(1);
            }
        }
    }

    fn lookup(&self, hash: u32, name: &str) -> Option<Word> {
        self.buckets
            .get(&hash)?
            .iter()
            .find(|(declared, _)| declared.as_str() == name)
            .map(|(_, target)| *target)
    }

    fn len(&self) -> usize {
        self.len
    }
}

/// Bind every symbolic reference to the index of its label. Never fails
/// and never changes the number of instructions.
pub fn resolve(mut instructions: Vec<Instruction>) -> Resolved {
    let table = LabelTable::collect(&instructions);
    tracing::debug!(labels = table.len(), "collected labels");

    let mut unresolved = Vec::new();
    for (index, instruction) in instructions.iter_mut().enumerate() {
        if !instruction.is_reference() {
            continue;
        }
        let Some(name) = &instruction.name else {
            continue;
        };
        match table.lookup(instruction.hash, name) {
            Some(target) => instruction.operand = target,
            None => {
                instruction.operand = UNRESOLVED;
                unresolved.push(UnresolvedLabel {
                    name: name.clone(),
                    span: instruction.span,
                    index,
                });
            }
        }
    }

    Resolved {
        program: Program::new(instructions),
        unresolved,
    }
}

#[cfg(test)]
mod test;
