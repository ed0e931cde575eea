//! Code-generation mutator (`spec.md` §4.6): appends a small budget of
//! freshly generated code at a random point in `parent`, using the same
//! generator registry the generative engine draws from.

use rand::{Rng, RngCore};

use crate::builder::BuilderMode;
use crate::codegen::generators::named_generators;
use crate::environment::Environment;
use crate::ir::Program;
use crate::mutators::Mutator;

/// How many generator invocations to budget per mutation attempt.
const GENERATION_BUDGET: u32 = 3;

#[derive(Debug, Default)]
pub struct CodeGenerationMutator;

impl Mutator for CodeGenerationMutator {
    fn name(&self) -> &'static str {
        "CodeGeneration"
    }

    fn mutate(&self, parent: &Program, env: &Environment, mode: BuilderMode, rng: &mut dyn RngCore) -> Option<Program> {
        let generators = named_generators();
        let insert_at = rng.gen_range(0..=parent.len());

        let mut builder = crate::builder::ProgramBuilder::new(env, Some(parent.id()), mode);
        builder.push_adoption_frame();
        for (idx, instr) in parent.code().iter().enumerate() {
            if idx == insert_at {
                builder.generate(GENERATION_BUDGET, &generators, Some(parent), rng);
            }
            builder.adopt_instruction(instr, parent.types(), true);
        }
        if insert_at == parent.len() {
            builder.generate(GENERATION_BUDGET, &generators, Some(parent), rng);
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
    fn generated_program_is_at_least_as_long_as_the_parent() {
        let env = Environment::minimal();
        let mut builder = crate::builder::ProgramBuilder::new(&env, None, BuilderMode::Aggressive);
        builder.load_int(1);
        let parent = builder.finalize();

        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let child = CodeGenerationMutator.mutate(&parent, &env, BuilderMode::Aggressive, &mut rng).expect("mutation");
        assert!(child.len() >= parent.len());
        assert!(child.check_invariants().is_ok());
    }
}
