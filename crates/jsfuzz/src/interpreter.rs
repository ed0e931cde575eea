//! Forward type-inference pass over IR ops (`spec.md` §4.3).
//!
//! Advisory only: no correctness depends on it (`spec.md` §9 "Advisory type
//! state"). Deterministic given the same program and environment (I6).

use ahash::AHashMap as HashMap;

use crate::environment::Environment;
use crate::ir::{BinaryOperator, Comparator, FunctionSignature, Instruction, Op, Type, Variable};

/// Per-variable type map, threaded through one instruction at a time.
pub type TypeMap = HashMap<Variable, Type>;

/// A single `(variable, newType)` update produced by inferring one instruction.
#[derive(Debug, Clone)]
pub struct TypeUpdate {
    pub variable: Variable,
    pub ty: Type,
}

/// Forward type-inference pass. Holds no mutable program state itself —
/// `infer` is a pure function of `(instruction, current types, environment)`,
/// which is what makes determinism (I6) trivial to guarantee.
#[derive(Debug, Default)]
pub struct AbstractInterpreter;

impl AbstractInterpreter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Infers the type updates caused by appending `instruction`, given the
    /// types known to hold immediately before it.
    #[must_use]
    pub fn infer(&self, instruction: &Instruction, before: &TypeMap, env: &Environment) -> Vec<TypeUpdate> {
        let op = instruction.op();
        let outputs = instruction.outputs();
        let inner_outputs = instruction.inner_outputs();

        let mut updates = Vec::new();
        match op {
            Op::LoadProperty { name } => {
                if let (Some(&base), Some(&out)) = (instruction.inputs().first(), outputs.first()) {
                    let base_ty = before.get(&base).cloned().unwrap_or(Type::Unknown);
                    let ty = env.type_of_property(&base_ty, name).unwrap_or(Type::Unknown);
                    updates.push(TypeUpdate { variable: out, ty });
                }
            }
            Op::StoreProperty { name } => {
                // Widens the base's known property set rather than replacing its type outright.
                if let Some(&base) = instruction.inputs().first() {
                    let base_ty = before.get(&base).cloned().unwrap_or(Type::Unknown);
                    let widened = widen_with_property(&base_ty, name);
                    updates.push(TypeUpdate { variable: base, ty: widened });
                }
            }
            Op::CallFunction { .. } | Op::CallMethod { .. } | Op::CallComputedMethod { .. } => {
                if let (Some(&callee), Some(&out)) = (instruction.inputs().first(), outputs.first()) {
                    let callee_ty = before.get(&callee).cloned().unwrap_or(Type::Unknown);
                    let ty = return_type_of(&callee_ty);
                    updates.push(TypeUpdate { variable: out, ty });
                }
            }
            Op::Construct { .. } => {
                if let Some(&out) = outputs.first() {
                    updates.push(TypeUpdate { variable: out, ty: Type::object("Object") });
                }
            }
            Op::Binary(operator) => {
                if let Some(&out) = outputs.first() {
                    let lhs = instruction.inputs().first().and_then(|v| before.get(v)).cloned().unwrap_or(Type::Unknown);
                    let rhs = instruction.inputs().get(1).and_then(|v| before.get(v)).cloned().unwrap_or(Type::Unknown);
                    updates.push(TypeUpdate { variable: out, ty: binary_result_type(*operator, &lhs, &rhs) });
                }
            }
            Op::Compare(_) | Op::InstanceOf | Op::In => {
                if let Some(&out) = outputs.first() {
                    updates.push(TypeUpdate { variable: out, ty: Type::Boolean });
                }
            }
            Op::Dup => {
                if let (Some(&src), Some(&out)) = (instruction.inputs().first(), outputs.first()) {
                    let ty = before.get(&src).cloned().unwrap_or(Type::Unknown);
                    updates.push(TypeUpdate { variable: out, ty });
                }
            }
            Op::BeginCatch => {
                if let Some(&out) = inner_outputs.first() {
                    updates.push(TypeUpdate { variable: out, ty: Type::object("Error") });
                }
            }
            _ => {
                let hint = op.output_type_hint();
                for &out in outputs {
                    updates.push(TypeUpdate { variable: out, ty: hint.clone() });
                }
                for &inner in inner_outputs {
                    updates.push(TypeUpdate { variable: inner, ty: Type::Unknown });
                }
            }
        }
        updates
    }

    /// Merges per-variable types at a control-flow join (end of if/else, end
    /// of loop). Monotone and deterministic per `spec.md` §9's open question:
    /// simple pointwise union, `Unknown` for anything only one side knows.
    #[must_use]
    pub fn merge(branches: &[TypeMap]) -> TypeMap {
        let mut merged = TypeMap::default();
        let mut all_vars: std::collections::BTreeSet<Variable> = std::collections::BTreeSet::new();
        for branch in branches {
            all_vars.extend(branch.keys().copied());
        }
        for var in all_vars {
            let mut acc: Option<Type> = None;
            let mut seen_in_all = true;
            for branch in branches {
                match branch.get(&var) {
                    Some(ty) => {
                        acc = Some(match acc {
                            Some(existing) => existing.union(ty.clone()),
                            None => ty.clone(),
                        });
                    }
                    None => seen_in_all = false,
                }
            }
            let ty = if seen_in_all { acc.unwrap_or(Type::Unknown) } else { Type::Unknown };
            merged.insert(var, ty);
        }
        merged
    }

    #[must_use]
    pub fn type_of_property(&self, base: &Type, property: &str, env: &Environment) -> Type {
        env.type_of_property(base, property).unwrap_or(Type::Unknown)
    }

    #[must_use]
    pub fn current_super_type(&self, class_stack: &[Type]) -> Type {
        class_stack.last().cloned().unwrap_or(Type::Unknown)
    }

    #[must_use]
    pub fn infer_method_signature(&self, base: &Type, method: &str, env: &Environment) -> Option<FunctionSignature> {
        env.signature_of_method(base, method)
    }
}

fn return_type_of(callee: &Type) -> Type {
    match callee {
        Type::Function(Some(sig)) | Type::Constructor(Some(sig)) => (*sig.returns).clone(),
        _ => Type::Unknown,
    }
}

fn widen_with_property(base: &Type, name: &str) -> Type {
    match base {
        Type::Object(shape) => {
            let mut shape = shape.clone();
            shape.properties.insert(name.to_owned());
            Type::Object(shape)
        }
        Type::Unknown => Type::object_with_properties("Object", [name.to_owned()]),
        other => other.clone(),
    }
}

fn binary_result_type(operator: BinaryOperator, lhs: &Type, rhs: &Type) -> Type {
    use BinaryOperator::{
        Add, BitAnd, BitOr, BitXor, Div, LShift, LogicalAnd, LogicalOr, Mod, Mul, NullishCoalesce, Pow, RShift, Sub,
        UnsignedRShift,
    };
    match operator {
        Add => {
            if matches!(lhs, Type::String) || matches!(rhs, Type::String) {
                Type::String
            } else if matches!(lhs, Type::Float) || matches!(rhs, Type::Float) {
                Type::Float
            } else if matches!(lhs, Type::Integer) && matches!(rhs, Type::Integer) {
                Type::Integer
            } else {
                Type::Unknown
            }
        }
        Sub | Mul | Mod | Pow => {
            if matches!(lhs, Type::Float) || matches!(rhs, Type::Float) {
                Type::Float
            } else if matches!(lhs, Type::Integer) && matches!(rhs, Type::Integer) {
                Type::Integer
            } else {
                Type::Unknown
            }
        }
        Div => Type::Float,
        BitAnd | BitOr | BitXor | LShift | RShift | UnsignedRShift => Type::Integer,
        LogicalAnd | LogicalOr | NullishCoalesce => lhs.clone().union(rhs.clone()),
    }
}

/// Convenience used by the operation mutator to pick a comparator swap set:
/// all comparators are mutually interchangeable (same arity, boolean result).
#[must_use]
pub fn comparator_family() -> Vec<Comparator> {
    use strum::IntoEnumIterator;
    Comparator::iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Instruction, Variable};
    use smallvec::smallvec;

    #[test]
    fn literal_load_sets_exact_type() {
        let interp = AbstractInterpreter::new();
        let env = Environment::minimal();
        let v0 = Variable::new(0);
        let instr = Instruction::new(Op::LoadInt(42), smallvec![v0], 0);
        let updates = interp.infer(&instr, &TypeMap::default(), &env);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].ty, Type::Integer);
    }

    #[test]
    fn merge_is_union_when_seen_everywhere() {
        let v0 = Variable::new(0);
        let mut a = TypeMap::default();
        a.insert(v0, Type::Integer);
        let mut b = TypeMap::default();
        b.insert(v0, Type::String);
        let merged = AbstractInterpreter::merge(&[a, b]);
        let ty = merged.get(&v0).unwrap();
        assert!(Type::Integer.is(ty));
        assert!(Type::String.is(ty));
    }

    #[test]
    fn merge_is_unknown_when_not_seen_everywhere() {
        let v0 = Variable::new(0);
        let mut a = TypeMap::default();
        a.insert(v0, Type::Integer);
        let b = TypeMap::default();
        let merged = AbstractInterpreter::merge(&[a, b]);
        assert!(merged.get(&v0).unwrap().is_unknown());
    }

    #[test]
    fn determinism_same_instruction_same_result() {
        let interp = AbstractInterpreter::new();
        let env = Environment::minimal();
        let v0 = Variable::new(0);
        let instr = Instruction::new(Op::LoadInt(7), smallvec![v0], 0);
        let first = interp.infer(&instr, &TypeMap::default(), &env);
        let second = interp.infer(&instr, &TypeMap::default(), &env);
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].ty, second[0].ty);
    }
}
