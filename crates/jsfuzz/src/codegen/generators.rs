//! Code generators (`spec.md` §4.8): named micro-recipes that each append a
//! small, self-contained piece of code to an open `ProgramBuilder`.

use rand::RngCore;

use crate::builder::ProgramBuilder;
use crate::ir::{BinaryOperator, Comparator, Context, Type, UnaryOperator};

/// Boundary and edge-case integers worth preferring over arbitrary random
/// ones: zero, the sign boundary, 32-bit wraparound points, and the largest
/// integer exactly representable as an `f64` (`spec.md` §4.8).
pub const INTERESTING_INTEGERS: &[i64] = &[
    0,
    1,
    -1,
    i32::MIN as i64,
    i32::MAX as i64,
    u32::MAX as i64,
    (1i64 << 53) - 1,
    -(1i64 << 53) + 1,
    i64::MIN,
    i64::MAX,
];

/// Boundary and edge-case floats: signed zero, NaN, the infinities, and one
/// ordinary fractional value to contrast with the edge cases.
pub const INTERESTING_FLOATS: &[f64] = &[0.0, -0.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY, 1.5, -1.5];

/// A named generator: the context it requires to run, the input types it
/// consumes (empty for a pure leaf generator), and the function that emits
/// its code. `(valid, invalid)` counts are tracked via the caller-owned
/// `GeneratorStats` map.
pub struct CodeGenerator {
    pub name: &'static str,
    pub required_context: Context,
    pub input_types: Vec<Type>,
    /// Relative likelihood of selection among the other generators eligible
    /// in the current context (`spec.md` §4.4: "weighted random
    /// CodeGenerator"). Not a probability; only meaningful relative to the
    /// other weights in the same registry.
    pub weight: u32,
    pub run: fn(&mut ProgramBuilder<'_>, &mut dyn RngCore),
}

pub fn interesting_integer(rng: &mut dyn RngCore) -> i64 {
    INTERESTING_INTEGERS[(rng.next_u32() as usize) % INTERESTING_INTEGERS.len()]
}

pub fn interesting_float(rng: &mut dyn RngCore) -> f64 {
    INTERESTING_FLOATS[(rng.next_u32() as usize) % INTERESTING_FLOATS.len()]
}

fn gen_integer_literal(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    builder.load_int(interesting_integer(rng));
}

fn gen_float_literal(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    builder.load_float(interesting_float(rng));
}

fn gen_string_literal(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    let samples = ["", "a", "0", "\u{0}", "toString"];
    let s = samples[(rng.next_u32() as usize) % samples.len()];
    builder.load_string(s);
}

fn gen_array_literal(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    let n = (rng.next_u32() % 3) as usize;
    let elements: Vec<_> = (0..n).map(|_| builder.load_int(interesting_integer(rng))).collect();
    builder.create_array(&elements);
}

fn gen_binary_expression(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    use rand::Rng;
    let lhs = builder.generate_variable(&Type::Integer, rng);
    let rhs = builder.generate_variable(&Type::Integer, rng);
    let ops = [
        BinaryOperator::Add,
        BinaryOperator::Sub,
        BinaryOperator::Mul,
        BinaryOperator::Div,
        BinaryOperator::Mod,
        BinaryOperator::BitAnd,
        BinaryOperator::BitOr,
        BinaryOperator::LShift,
    ];
    let op = ops[rng.gen_range(0..ops.len())];
    builder.binary(op, lhs, rhs);
}

fn gen_unary_expression(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    use rand::Rng;
    let operand = builder.generate_variable(&Type::Integer, rng);
    let ops =
        [UnaryOperator::Plus, UnaryOperator::Minus, UnaryOperator::BitwiseNot, UnaryOperator::PreInc, UnaryOperator::PostDec];
    let op = ops[rng.gen_range(0..ops.len())];
    builder.unary(op, operand);
}

fn gen_comparison(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    use rand::Rng;
    let lhs = builder.generate_variable(&Type::Unknown, rng);
    let rhs = builder.generate_variable(&Type::Unknown, rng);
    let comps = [
        Comparator::Equal,
        Comparator::StrictEqual,
        Comparator::LessThan,
        Comparator::GreaterThanOrEqual,
    ];
    let comp = comps[rng.gen_range(0..comps.len())];
    builder.compare(comp, lhs, rhs);
}

fn gen_property_load(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    let names = ["length", "constructor", "x", "0", "__proto__"];
    let base = builder.generate_variable(&Type::object("Object"), rng);
    let name = names[(rng.next_u32() as usize) % names.len()];
    builder.load_property(base, name);
}

fn gen_function_call(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    use rand::Rng;
    let callee = builder.generate_variable(&Type::Function(None), rng);
    let argc = rng.gen_range(0..3);
    let args: Vec<_> = (0..argc).map(|_| builder.generate_variable(&Type::Unknown, rng)).collect();
    builder.call_function(callee, &args);
}

/// Budget passed to the nested `generate_recursive` call inside each
/// block-opening generator below; kept small so one generation step doesn't
/// balloon into a deeply nested program.
const NESTED_BODY_BUDGET: u32 = 3;

fn gen_generator_function(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    use rand::Rng;
    let num_parameters = rng.gen_range(0..2);
    builder.build_generator_function(num_parameters, |inner, _params| {
        inner.generate_recursive(NESTED_BODY_BUDGET, 1, &leaf_generators(), None, rng);
        let value = inner.generate_variable(&Type::Integer, rng);
        inner.yield_value(value);
    });
}

fn gen_class_definition(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    use rand::Rng;
    let num_methods = 1 + rng.gen_range(0..2);
    builder.build_class_definition(None, |inner| {
        for i in 0..num_methods {
            inner.build_method_definition(format!("m{i}"), false, 0, |inner, _params| {
                inner.generate_recursive(NESTED_BODY_BUDGET, 1, &leaf_generators(), None, rng);
            });
        }
    });
}

fn gen_switch(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    use rand::Rng;
    let discriminant = builder.generate_variable(&Type::Integer, rng);
    builder.build_switch(discriminant, |inner, discriminant| {
        let num_cases = 1 + rng.gen_range(0..2);
        for _ in 0..num_cases {
            inner.build_switch_case(false, |inner| {
                let case_value = inner.load_int(interesting_integer(rng));
                inner.compare(Comparator::StrictEqual, discriminant, case_value);
                inner.generate_recursive(NESTED_BODY_BUDGET, 1, &leaf_generators(), None, rng);
            });
        }
        inner.build_switch_case(true, |inner| {
            inner.generate_recursive(NESTED_BODY_BUDGET, 1, &leaf_generators(), None, rng);
        });
    });
}

fn gen_for_of_loop(builder: &mut ProgramBuilder<'_>, rng: &mut dyn RngCore) {
    let iterable = builder.generate_variable(&Type::object("Array"), rng);
    builder.build_for_of_loop(iterable, |inner, _loop_var| {
        inner.generate_recursive(NESTED_BODY_BUDGET, 1, &leaf_generators(), None, rng);
    });
}

/// The leaf (non-block-opening) generators, safe to hand to a nested
/// `generate_recursive` call without risking runaway recursive nesting, since
/// none of them can themselves open another nested block.
fn leaf_generators() -> Vec<CodeGenerator> {
    vec![
        CodeGenerator { name: "IntegerLiteral", required_context: Context::SCRIPT, input_types: vec![], weight: 6, run: gen_integer_literal },
        CodeGenerator { name: "FloatLiteral", required_context: Context::SCRIPT, input_types: vec![], weight: 3, run: gen_float_literal },
        CodeGenerator { name: "StringLiteral", required_context: Context::SCRIPT, input_types: vec![], weight: 3, run: gen_string_literal },
        CodeGenerator { name: "ArrayLiteral", required_context: Context::SCRIPT, input_types: vec![], weight: 3, run: gen_array_literal },
        CodeGenerator {
            name: "BinaryExpression",
            required_context: Context::SCRIPT,
            input_types: vec![Type::Integer, Type::Integer],
            weight: 6,
            run: gen_binary_expression,
        },
        CodeGenerator {
            name: "UnaryExpression",
            required_context: Context::SCRIPT,
            input_types: vec![Type::Integer],
            weight: 4,
            run: gen_unary_expression,
        },
        CodeGenerator {
            name: "Comparison",
            required_context: Context::SCRIPT,
            input_types: vec![Type::Unknown, Type::Unknown],
            weight: 4,
            run: gen_comparison,
        },
        CodeGenerator {
            name: "PropertyLoad",
            required_context: Context::SCRIPT,
            input_types: vec![Type::object("Object")],
            weight: 4,
            run: gen_property_load,
        },
        CodeGenerator {
            name: "FunctionCall",
            required_context: Context::SCRIPT,
            input_types: vec![Type::Function(None)],
            weight: 4,
            run: gen_function_call,
        },
    ]
}

/// The full named-recipe registry `ProgramBuilder::generate` draws from: the
/// context-free leaf expressions plus the block-opening recipes that nest a
/// bounded `generate_recursive` call into their own freshly opened scope.
#[must_use]
pub fn named_generators() -> Vec<CodeGenerator> {
    let mut generators = leaf_generators();
    generators.extend([
        CodeGenerator {
            name: "GeneratorFunction",
            required_context: Context::SCRIPT,
            input_types: vec![],
            weight: 1,
            run: gen_generator_function,
        },
        CodeGenerator {
            name: "ClassDefinition",
            required_context: Context::SCRIPT,
            input_types: vec![],
            weight: 1,
            run: gen_class_definition,
        },
        CodeGenerator { name: "Switch", required_context: Context::SCRIPT, input_types: vec![Type::Integer], weight: 1, run: gen_switch },
        CodeGenerator {
            name: "ForOfLoop",
            required_context: Context::SCRIPT,
            input_types: vec![Type::object("Array")],
            weight: 1,
            run: gen_for_of_loop,
        },
    ]);
    generators
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BuilderMode;
    use crate::environment::Environment;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn every_named_generator_appends_at_least_one_instruction() {
        let env = Environment::minimal();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for generator in named_generators() {
            let mut builder = ProgramBuilder::new(&env, None, BuilderMode::Aggressive);
            (generator.run)(&mut builder, &mut rng);
            let program = builder.finalize();
            assert!(!program.is_empty(), "{} produced no code", generator.name);
            assert!(program.check_invariants().is_ok(), "{} produced an invalid program", generator.name);
        }
    }

    #[test]
    fn interesting_integers_cover_sign_and_width_boundaries() {
        assert!(INTERESTING_INTEGERS.contains(&0));
        assert!(INTERESTING_INTEGERS.contains(&i64::from(i32::MIN)));
        assert!(INTERESTING_INTEGERS.contains(&i64::from(i32::MAX)));
    }
}
