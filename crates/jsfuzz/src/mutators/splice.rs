//! Splice mutator (`spec.md` §4.6, §4.4 "Splicing"): copies a dataflow-closed
//! slice of a donor program into a random point of `parent`, rather than
//! generating anything new. Needs a second program (the donor, typically a
//! random corpus sample), so it doesn't fit the single-parent `Mutator`
//! trait — callers draw the donor themselves (e.g. from `Corpus`).

use rand::Rng;

use crate::builder::BuilderMode;
use crate::environment::Environment;
use crate::ir::Program;

#[derive(Debug, Default)]
pub struct SpliceMutator;

impl SpliceMutator {
    #[must_use]
    pub fn name(&self) -> &'static str {
        "Splice"
    }

    /// Rebuilds `parent` up to a random insertion point, splices in a
    /// dataflow-closed slice of `donor` ending at a random instruction, then
    /// appends the rest of `parent`. Returns `None` if `donor` has nothing
    /// spliceable or the slice's required context doesn't fit at the chosen
    /// point.
    pub fn mutate_with_donor(
        &self,
        parent: &Program,
        donor: &Program,
        env: &Environment,
        mode: BuilderMode,
        rng: &mut impl Rng,
    ) -> Option<Program> {
        if donor.is_empty() {
            return None;
        }
        let insert_at = rng.gen_range(0..=parent.len());
        let donor_end = rng.gen_range(0..donor.len());

        let mut builder = crate::builder::ProgramBuilder::new(env, Some(parent.id()), mode);
        builder.push_adoption_frame();
        let mut spliced = false;
        for (idx, instr) in parent.code().iter().enumerate() {
            if idx == insert_at {
                spliced = builder.splice(donor, donor_end);
            }
            builder.adopt_instruction(instr, parent.types(), true);
        }
        if insert_at == parent.len() {
            spliced = builder.splice(donor, donor_end);
        }
        builder.pop_adoption_frame();

        if spliced {
            Some(builder.finalize())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::ir::BinaryOperator;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn program_with_add(env: &Environment) -> Program {
        let mut builder = crate::builder::ProgramBuilder::new(env, None, BuilderMode::Aggressive);
        let a = builder.load_int(1);
        let b = builder.load_int(2);
        builder.binary(BinaryOperator::Add, a, b);
        builder.finalize()
    }

    #[test]
    fn splicing_from_a_nonempty_donor_grows_the_program() {
        let env = Environment::minimal();
        let parent = program_with_add(&env);
        let donor = program_with_add(&env);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let child = SpliceMutator.mutate_with_donor(&parent, &donor, &env, BuilderMode::Aggressive, &mut rng);
        if let Some(child) = child {
            assert!(child.len() >= parent.len());
            assert!(child.check_invariants().is_ok());
        }
    }

    #[test]
    fn refuses_on_empty_donor() {
        let env = Environment::minimal();
        let parent = program_with_add(&env);
        let donor = Program::new(uuid::Uuid::new_v4(), vec![], None, None);
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert!(SpliceMutator.mutate_with_donor(&parent, &donor, &env, BuilderMode::Aggressive, &mut rng).is_none());
    }
}
