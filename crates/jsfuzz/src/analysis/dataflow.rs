use ahash::AHashSet as HashSet;

use crate::ir::{Instruction, Op, Variable};

/// Tracks which variables have been reassigned (to invalidate the builder's
/// literal-reuse caches) and which instruction indices are block beginnings
/// (to support splicing, `spec.md` §4.2, §4.4).
#[derive(Debug, Clone, Default)]
pub struct DataflowAnalyzer {
    reassigned: HashSet<Variable>,
    block_begins: Vec<u32>,
}

impl DataflowAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, instruction: &Instruction) {
        if instruction.op().is_block_begin() {
            self.block_begins.push(instruction.index());
        }
        match instruction.op() {
            Op::Reassign | Op::ReassignWithBinary(_) => {
                // First inout is the target variable being reassigned.
                if let Some(target) = instruction.inputs().first() {
                    self.reassigned.insert(*target);
                }
            }
            Op::DestructureArray(pattern) => {
                for (reassigns, var) in pattern.reassigns.iter().zip(instruction.outputs()) {
                    if *reassigns {
                        self.reassigned.insert(*var);
                    }
                }
            }
            _ => {}
        }
    }

    #[must_use]
    pub fn was_reassigned(&self, var: Variable) -> bool {
        self.reassigned.contains(&var)
    }

    #[must_use]
    pub fn block_begin_indices(&self) -> &[u32] {
        &self.block_begins
    }
}
