//! Insertion mutator (`spec.md` §4.6): runs `generate(n)` with `n ≈ small
//! random` at a random point in `parent`, using existing visible variables
//! where a generator calls for one, without touching anything else.

use rand::{Rng, RngCore};

use crate::builder::BuilderMode;
use crate::codegen::generators::named_generators;
use crate::environment::Environment;
use crate::ir::Program;
use crate::mutators::Mutator;

/// Upper bound on `n` in `generate(n)` — small enough that one insertion
/// attempt stays a local edit rather than growing the program substantially.
const MAX_INSERTION_BUDGET: u32 = 3;

#[derive(Debug, Default)]
pub struct InsertionMutator;

impl Mutator for InsertionMutator {
    fn name(&self) -> &'static str {
        "Insertion"
    }

    fn mutate(&self, parent: &Program, env: &Environment, mode: BuilderMode, rng: &mut dyn RngCore) -> Option<Program> {
        if parent.is_empty() {
            return None;
        }
        let insert_at = rng.gen_range(0..=parent.len());
        let budget = rng.gen_range(1..=MAX_INSERTION_BUDGET);
        let generators = named_generators();

        let mut builder = crate::builder::ProgramBuilder::new(env, Some(parent.id()), mode);
        builder.push_adoption_frame();
        for (idx, instr) in parent.code().iter().enumerate() {
            if idx == insert_at {
                builder.generate(budget, &generators, Some(parent), rng);
            }
            builder.adopt_instruction(instr, parent.types(), true);
        }
        if insert_at == parent.len() {
            builder.generate(budget, &generators, Some(parent), rng);
        }
        builder.pop_adoption_frame();
        Some(builder.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn never_shrinks_the_parent_and_stays_well_formed() {
        let env = Environment::minimal();
        let mut builder = crate::builder::ProgramBuilder::new(&env, None, BuilderMode::Aggressive);
        builder.load_int(1);
        builder.load_int(2);
        let parent = builder.finalize();

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let child = InsertionMutator.mutate(&parent, &env, BuilderMode::Aggressive, &mut rng).expect("insertion");
        assert!(child.len() >= parent.len());
        assert!(child.check_invariants().is_ok());
    }

    #[test]
    fn ten_attempts_produce_at_least_one_program_with_new_code() {
        let env = Environment::minimal();
        let mut builder = crate::builder::ProgramBuilder::new(&env, None, BuilderMode::Aggressive);
        builder.load_int(1);
        builder.load_int(2);
        let parent = builder.finalize();

        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let grew = (0..10).any(|_| {
            let child = InsertionMutator.mutate(&parent, &env, BuilderMode::Aggressive, &mut rng).expect("insertion");
            child.len() > parent.len()
        });
        assert!(grew, "expected at least one of 10 attempts to insert new code");
    }

    #[test]
    fn refuses_on_empty_program() {
        let env = Environment::minimal();
        let parent = Program::new(uuid::Uuid::new_v4(), vec![], None, None);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(InsertionMutator.mutate(&parent, &env, BuilderMode::Aggressive, &mut rng).is_none());
    }
}
