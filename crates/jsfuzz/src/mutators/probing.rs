//! Probing mutator (`spec.md` §4.6, optional exploration mutators): appends a
//! property probe — `LoadProperty` with a name drawn from a fixed probe
//! list — against a random visible variable, to explore what properties an
//! object (or a primitive's prototype chain) exposes. Doesn't require the
//! target to already be known to have that property; unlike the other
//! mutators this one is allowed to produce code the interpreter can't type,
//! since its whole purpose is probing the unknown.

use rand::{Rng, RngCore};

use crate::builder::BuilderMode;
use crate::environment::Environment;
use crate::ir::Program;
use crate::mutators::Mutator;

const PROBE_NAMES: &[&str] = &[
    "length", "constructor", "__proto__", "toString", "valueOf", "name", "prototype", "size", "message",
];

#[derive(Debug, Default)]
pub struct ProbingMutator;

impl Mutator for ProbingMutator {
    fn name(&self) -> &'static str {
        "Probing"
    }

    fn mutate(&self, parent: &Program, env: &Environment, mode: BuilderMode, rng: &mut dyn RngCore) -> Option<Program> {
        if parent.is_empty() {
            return None;
        }
        let insert_at = rng.gen_range(0..=parent.len());
        let probe_name = PROBE_NAMES[rng.gen_range(0..PROBE_NAMES.len())];

        let mut builder = crate::builder::ProgramBuilder::new(env, Some(parent.id()), mode);
        builder.push_adoption_frame();
        let mut probed = false;
        for (idx, instr) in parent.code().iter().enumerate() {
            if idx == insert_at {
                if let Some(target) = builder.rand_var(rng) {
                    builder.load_property(target, probe_name);
                    probed = true;
                }
            }
            builder.adopt_instruction(instr, parent.types(), true);
        }
        if insert_at == parent.len() && !probed {
            if let Some(target) = builder.rand_var(rng) {
                builder.load_property(target, probe_name);
                probed = true;
            }
        }
        builder.pop_adoption_frame();
        if probed {
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
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn probes_an_existing_variable() {
        let env = Environment::minimal();
        let mut builder = crate::builder::ProgramBuilder::new(&env, None, BuilderMode::Aggressive);
        builder.load_int(1);
        let parent = builder.finalize();

        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let child = ProbingMutator.mutate(&parent, &env, BuilderMode::Aggressive, &mut rng).expect("probe");
        assert!(child.len() > parent.len());
        assert!(child.check_invariants().is_ok());
    }

    #[test]
    fn refuses_on_empty_program() {
        let env = Environment::minimal();
        let parent = Program::new(uuid::Uuid::new_v4(), vec![], None, None);
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        assert!(ProbingMutator.mutate(&parent, &env, BuilderMode::Aggressive, &mut rng).is_none());
    }
}
