use smallvec::SmallVec;

use crate::ir::op::Op;
use crate::ir::variable::Variable;

/// An `Op` paired with its ordered inouts.
///
/// The inout list has exactly `numInputs + numOutputs + numInnerOutputs`
/// entries, laid out inputs-then-outputs-then-inner-outputs; helper accessors
/// slice into it rather than storing three separate vectors, since almost
/// every instruction has zero or one of each and a flat `SmallVec` avoids
/// three small heap allocations per instruction.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Instruction {
    op: Op,
    inouts: SmallVec<[Variable; 4]>,
    /// Index within the owning program's code; set by `Program`/`ProgramBuilder`
    /// on append, not by the caller.
    index: u32,
}

impl Instruction {
    #[must_use]
    pub fn new(op: Op, inouts: SmallVec<[Variable; 4]>, index: u32) -> Self {
        let expected = op.num_inputs() + op.num_outputs() + op.num_inner_outputs();
        assert_eq!(
            inouts.len() as u32,
            expected,
            "arity mismatch for {}: expected {expected} inouts, got {}",
            op.name(),
            inouts.len()
        );
        Self { op, inouts, index }
    }

    #[must_use]
    pub fn op(&self) -> &Op {
        &self.op
    }

    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub fn inputs(&self) -> &[Variable] {
        let n = self.op.num_inputs() as usize;
        &self.inouts[..n]
    }

    #[must_use]
    pub fn outputs(&self) -> &[Variable] {
        let start = self.op.num_inputs() as usize;
        let end = start + self.op.num_outputs() as usize;
        &self.inouts[start..end]
    }

    #[must_use]
    pub fn inner_outputs(&self) -> &[Variable] {
        let start = (self.op.num_inputs() + self.op.num_outputs()) as usize;
        &self.inouts[start..]
    }

    #[must_use]
    pub fn all_inouts(&self) -> &[Variable] {
        &self.inouts
    }

    #[must_use]
    pub fn all_outputs(&self) -> impl Iterator<Item = Variable> + '_ {
        self.outputs().iter().chain(self.inner_outputs()).copied()
    }
}
