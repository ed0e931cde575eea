//! Program templates (`spec.md` §4.8): larger scaffolds that lay out a whole
//! program shape (e.g. a JIT-stress loop) and delegate the filler code to the
//! generator registry.

use rand::RngCore;

use crate::builder::ProgramBuilder;
use crate::codegen::generators::named_generators;
use crate::ir::{BinaryOperator, Comparator};

/// A named scaffold producing a whole program body. Tracks `(valid, invalid)`
/// counts the same way `CodeGenerator` does.
pub struct ProgramTemplate {
    pub name: &'static str,
    pub run: fn(&mut ProgramBuilder<'_>, &mut dyn RngCore),
}

/// Builds a hot loop around a function body full of generated filler code,
/// the classic shape for provoking JIT tier-up bugs: a `for`-style counting
/// loop, long enough to get compiled, wrapping arithmetic and property
/// accesses on function parameters.
fn jit_stress_loop(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    use rand::Rng;

    let generators = named_generators();
    let func = builder.build_plain_function(2, |builder, _params| {
        builder.generate(8, &generators, None, &mut *rng);
    });

    let counter = builder.load_int(0);
    let bound = builder.load_int(1000);
    let condition = builder.compare(Comparator::LessThan, counter, bound);
    builder.build_while_loop(condition, |builder| {
        let a = builder.load_int(rng.gen_range(-50..=50));
        let b = builder.load_int(rng.gen_range(-50..=50));
        builder.call_function(func, &[a, b]);
        builder.unary(crate::ir::UnaryOperator::PreInc, counter);
    });
}

/// Builds a deopt-bait shape: a function specialized by many uniform calls,
/// then called once more with a type-confusing argument, to probe inline
/// caches and speculative optimizations invalidated by a late type change.
fn deopt_bait(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    let func = builder.build_plain_function(1, |builder, params| {
        let doubled = builder.binary(BinaryOperator::Add, params[0], params[0]);
        let _ = doubled;
    });
    for _ in 0..20 {
        let arg = builder.load_int(1);
        builder.call_function(func, &[arg]);
    }
    let confusing_arg = builder.load_string("confuse-me");
    builder.call_function(func, &[confusing_arg]);
    let _ = rng;
}

#[must_use]
pub fn default_templates() -> Vec<ProgramTemplate> {
    vec![
        ProgramTemplate { name: "JitStressLoop", run: jit_stress_loop },
        ProgramTemplate { name: "DeoptBait", run: deopt_bait },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BuilderMode;
    use crate::environment::Environment;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn every_template_produces_a_valid_program() {
        let env = Environment::minimal();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for template in default_templates() {
            let mut builder = ProgramBuilder::new(&env, None, BuilderMode::Aggressive);
            (template.run)(&mut builder, &mut rng);
            let program = builder.finalize();
            assert!(!program.is_empty(), "{} produced no code", template.name);
            assert!(program.check_invariants().is_ok(), "{} produced an invalid program", template.name);
        }
    }
}
