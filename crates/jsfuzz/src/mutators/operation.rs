//! Operation mutator (`spec.md` §4.6): replaces one instruction's op with a
//! same-arity, type-compatible alternative from the same operator family,
//! leaving every input/output variable untouched: swap the variant, keep
//! the operands.

use rand::{Rng, RngCore};
use strum::IntoEnumIterator;

use crate::builder::BuilderMode;
use crate::environment::Environment;
use crate::ir::{BinaryOperator, Comparator, Op, Program, UnaryOperator};
use crate::mutators::Mutator;

/// Walks every instruction and, independently for each, with probability
/// `probability` replaces its op with a same-arity, type-compatible
/// alternative (`spec.md` §4.6: "walk instructions; with small
/// per-instruction probability, replace...").
#[derive(Debug, Clone, Copy)]
pub struct OperationMutator {
    probability: f64,
}

impl Default for OperationMutator {
    fn default() -> Self {
        Self::new(crate::config::MutationConfig::default().operation_probability())
    }
}

impl OperationMutator {
    #[must_use]
    pub fn new(probability: f64) -> Self {
        Self { probability }
    }
}

impl Mutator for OperationMutator {
    fn name(&self) -> &'static str {
        "Operation"
    }

    fn mutate(&self, parent: &Program, env: &Environment, mode: BuilderMode, rng: &mut dyn RngCore) -> Option<Program> {
        let mut replacements: Vec<Option<Op>> = vec![None; parent.len()];
        let mut any = false;
        for idx in 0..parent.len() {
            if !rng.gen_bool(self.probability) {
                continue;
            }
            if let Some(replacement) = replacement_for(parent.code()[idx].op(), rng) {
                replacements[idx] = Some(replacement);
                any = true;
            }
        }
        if !any {
            return None;
        }

        let mut builder = crate::builder::ProgramBuilder::new(env, Some(parent.id()), mode);
        builder.push_adoption_frame();
        for (idx, instr) in parent.code().iter().enumerate() {
            if let Some(replacement) = replacements[idx].take() {
                builder.adopt_instruction_with_op(instr, replacement, parent.types(), false);
            } else {
                builder.adopt_instruction(instr, parent.types(), true);
            }
        }
        builder.pop_adoption_frame();
        Some(builder.finalize())
    }
}

/// Returns a different, same-arity op from `op`'s own family, or `None` if
/// `op` doesn't belong to a swappable family.
fn replacement_for(op: &Op, rng: &mut dyn RngCore) -> Option<Op> {
    match op {
        Op::Binary(current) => {
            let choices: Vec<BinaryOperator> = BinaryOperator::iter().filter(|o| o != current).collect();
            Some(Op::Binary(choices[rng.gen_range(0..choices.len())]))
        }
        Op::Unary(current) => {
            let choices: Vec<UnaryOperator> = UnaryOperator::iter().filter(|o| o != current).collect();
            Some(Op::Unary(choices[rng.gen_range(0..choices.len())]))
        }
        Op::Compare(current) => {
            let choices: Vec<Comparator> = Comparator::iter().filter(|o| o != current).collect();
            Some(Op::Compare(choices[rng.gen_range(0..choices.len())]))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn swaps_binary_operator_keeping_operands() {
        let env = Environment::minimal();
        let mut builder = crate::builder::ProgramBuilder::new(&env, None, BuilderMode::Aggressive);
        let a = builder.load_int(1);
        let b = builder.load_int(2);
        builder.binary(BinaryOperator::Add, a, b);
        let parent = builder.finalize();

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let child = OperationMutator::new(1.0).mutate(&parent, &env, BuilderMode::Aggressive, &mut rng).expect("mutation");
        assert_eq!(child.len(), parent.len());
        assert!(child.check_invariants().is_ok());
        let swapped = child.code().iter().any(|i| matches!(i.op(), Op::Binary(op) if *op != BinaryOperator::Add));
        assert!(swapped);
    }

    #[test]
    fn refuses_when_nothing_is_swappable() {
        let env = Environment::minimal();
        let mut builder = crate::builder::ProgramBuilder::new(&env, None, BuilderMode::Aggressive);
        builder.load_int(1);
        let parent = builder.finalize();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(OperationMutator::new(1.0).mutate(&parent, &env, BuilderMode::Aggressive, &mut rng).is_none());
    }
}
