//! Combine mutator (`spec.md` §4.6): appends an entire donor program (e.g. a
//! random corpus sample) after `parent`, wrapped in its own adoption frame so
//! the donor's internal variable numbering never collides with `parent`'s.
//! Like splice, this needs a second program and so doesn't fit the
//! single-parent `Mutator` trait.

use crate::builder::BuilderMode;
use crate::environment::Environment;
use crate::ir::Program;

#[derive(Debug, Default)]
pub struct CombineMutator;

impl CombineMutator {
    #[must_use]
    pub fn name(&self) -> &'static str {
        "Combine"
    }

    /// Appends all of `donor`'s instructions after all of `parent`'s.
    /// `donor`'s required context must be a subset of whatever's open at the
    /// end of `parent` (typically top-level script context), else `None`.
    pub fn combine(&self, parent: &Program, donor: &Program, env: &Environment, mode: BuilderMode) -> Option<Program> {
        let mut builder = crate::builder::ProgramBuilder::new(env, Some(parent.id()), mode);
        builder.push_adoption_frame();
        for instr in parent.code() {
            builder.adopt_instruction(instr, parent.types(), true);
        }
        builder.pop_adoption_frame();

        let required =
            donor.code().iter().fold(crate::ir::Context::EMPTY, |acc, i| acc.union(i.op().required_context()));
        if !builder.current_context().contains(required) {
            return None;
        }

        builder.push_adoption_frame();
        for instr in donor.code() {
            builder.adopt_instruction(instr, donor.types(), true);
        }
        builder.pop_adoption_frame();

        Some(builder.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;

    #[test]
    fn combine_concatenates_instruction_streams() {
        let env = Environment::minimal();
        let mut b1 = crate::builder::ProgramBuilder::new(&env, None, BuilderMode::Aggressive);
        b1.load_int(1);
        let parent = b1.finalize();

        let mut b2 = crate::builder::ProgramBuilder::new(&env, None, BuilderMode::Aggressive);
        b2.load_int(2);
        let donor = b2.finalize();

        let child = CombineMutator.combine(&parent, &donor, &env, BuilderMode::Aggressive).expect("combine");
        assert_eq!(child.len(), parent.len() + donor.len());
        assert!(child.check_invariants().is_ok());
    }
}
