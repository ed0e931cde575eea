//! Input mutator (`spec.md` §4.6): swaps one input variable of an
//! instruction for another visible, type-compatible variable, leaving the op
//! and every other input/output untouched.

use rand::{Rng, RngCore};

use crate::builder::BuilderMode;
use crate::environment::Environment;
use crate::ir::Program;
use crate::mutators::Mutator;

/// Walks every instruction and, independently for each one with at least one
/// input, with probability `probability` swaps a random input slot for
/// another visible, type-compatible variable (`spec.md` §4.6: "walk
/// instructions; with small per-instruction probability, replace...").
#[derive(Debug, Clone, Copy)]
pub struct InputMutator {
    probability: f64,
}

impl Default for InputMutator {
    fn default() -> Self {
        Self::new(crate::config::MutationConfig::default().input_probability())
    }
}

impl InputMutator {
    #[must_use]
    pub fn new(probability: f64) -> Self {
        Self { probability }
    }
}

impl Mutator for InputMutator {
    fn name(&self) -> &'static str {
        "Input"
    }

    fn mutate(&self, parent: &Program, env: &Environment, mode: BuilderMode, rng: &mut dyn RngCore) -> Option<Program> {
        let mut builder = crate::builder::ProgramBuilder::new(env, Some(parent.id()), mode);
        builder.push_adoption_frame();
        let mut replaced = false;
        for (idx, instr) in parent.code().iter().enumerate() {
            if instr.inputs().is_empty() || !rng.gen_bool(self.probability) {
                builder.adopt_instruction(instr, parent.types(), true);
                continue;
            }

            let slot = rng.gen_range(0..instr.inputs().len());
            let required =
                parent.types().and_then(|t| t.type_of(idx, instr.inputs()[slot])).cloned().unwrap_or(crate::ir::Type::Unknown);
            if let Some(replacement) = builder.rand_var_of_type(&required, rng) {
                if replacement != builder_adopted_var(&mut builder, instr.inputs()[slot]) {
                    builder.adopt_instruction_custom(instr, instr.op().clone(), &[(slot, replacement)], parent.types(), true);
                    replaced = true;
                    continue;
                }
            }
            builder.adopt_instruction(instr, parent.types(), true);
        }
        builder.pop_adoption_frame();
        if replaced {
            Some(builder.finalize())
        } else {
            None
        }
    }
}

/// Resolves what `source_var` currently maps to in the builder's open
/// adoption frame, without creating a new mapping for it if one already
/// exists elsewhere — used only to compare against a freshly sampled
/// replacement so a same-variable "swap" is rejected as a no-op.
fn builder_adopted_var(builder: &mut crate::builder::ProgramBuilder<'_>, source_var: crate::ir::Variable) -> crate::ir::Variable {
    builder.adopt_var(source_var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::ir::BinaryOperator;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn swaps_an_input_for_another_visible_variable() {
        let env = Environment::minimal();
        let mut builder = crate::builder::ProgramBuilder::new(&env, None, BuilderMode::Aggressive);
        let a = builder.load_int(1);
        let b = builder.load_int(2);
        let c = builder.load_int(3);
        builder.binary(BinaryOperator::Add, a, b);
        let _ = c;
        let parent = builder.finalize();

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        if let Some(child) = InputMutator::new(1.0).mutate(&parent, &env, BuilderMode::Aggressive, &mut rng) {
            assert_eq!(child.len(), parent.len());
            assert!(child.check_invariants().is_ok());
        }
    }

    #[test]
    fn refuses_when_no_instruction_has_inputs() {
        let env = Environment::minimal();
        let mut builder = crate::builder::ProgramBuilder::new(&env, None, BuilderMode::Aggressive);
        builder.load_int(1);
        let parent = builder.finalize();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        assert!(InputMutator::new(1.0).mutate(&parent, &env, BuilderMode::Aggressive, &mut rng).is_none());
    }

    /// `v0=loadInt(42); v1=loadInt(1); v2=binary(v0,v1,Add); return v2` under
    /// five consecutive applications of the input mutator alone: `v2`'s
    /// defining instruction still exists and is still a binary op (an input
    /// mutation only ever repoints an input slot — it never removes an
    /// instruction or changes an op's variant), and the program stays
    /// well-formed throughout.
    #[test]
    fn five_consecutive_applications_keep_the_return_value_a_binary_op() {
        let env = Environment::minimal();
        let mut outer = crate::builder::ProgramBuilder::new(&env, None, BuilderMode::Aggressive);
        outer.build_plain_function(0, |inner, _params| {
            let v0 = inner.load_int(42);
            let v1 = inner.load_int(1);
            let v2 = inner.binary(BinaryOperator::Add, v0, v1);
            inner.append(crate::ir::Op::Return, &[v2]);
        });
        let mut program = outer.finalize();
        assert!(program.check_invariants().is_ok());
        let original_len = program.len();
        let returned_var = program
            .code()
            .iter()
            .find(|i| matches!(i.op(), crate::ir::Op::Binary(_)))
            .expect("seed program contains a binary instruction")
            .outputs()[0];

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..5 {
            if let Some(child) = InputMutator::new(1.0).mutate(&program, &env, BuilderMode::Aggressive, &mut rng) {
                program = child;
            }
            assert!(program.check_invariants().is_ok());
            assert_eq!(program.len(), original_len, "input mutation never adds or removes instructions");

            let defining = program
                .code()
                .iter()
                .find(|i| i.outputs().contains(&returned_var))
                .expect("the originally-returned variable's defining instruction must still exist");
            assert!(matches!(defining.op(), crate::ir::Op::Binary(_)), "input mutation never changes an op's variant");
        }
    }
}
