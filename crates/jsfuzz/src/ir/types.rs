use std::collections::BTreeSet;

use ahash::AHashMap as HashMap;

/// A parameter in a `FunctionSignature`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Parameter {
    Plain(Type),
    Opt(Type),
    Rest(Type),
}

/// `(params, returns)` for a function/constructor-typed value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionSignature {
    pub params: Vec<Parameter>,
    pub returns: Box<Type>,
}

impl FunctionSignature {
    #[must_use]
    pub fn new(params: Vec<Parameter>, returns: Type) -> Self {
        Self { params, returns: Box::new(returns) }
    }
}

/// Structural facet describing an object-shaped type.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct ObjectShape {
    pub group: Option<String>,
    pub properties: BTreeSet<String>,
    pub methods: BTreeSet<String>,
}

/// Orthogonal modifiers a `Type` can carry alongside its shape.
///
/// Kept separate from the `Type` enum itself (rather than as extra enum
/// variants) since any leaf or structural type can carry any combination of
/// these. Not yet threaded through every `Type` constructor below (only
/// `iterable` matters to the interpreter today); kept as a building block
/// for generators that need `optional`/`varargs` on function parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct TypeFlags(u8);

impl TypeFlags {
    pub const NONE: Self = Self(0);
    pub const ITERABLE: Self = Self(1 << 0);
    pub const OPTIONAL: Self = Self(1 << 1);
    pub const VARARGS: Self = Self(1 << 2);

    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// The type lattice over JS values.
///
/// Primitive leaves, flag bits, and structural facets combine via union (`|`)
/// and intersection (`&`); `Is` checks subtyping. `Unknown` is the bottom
/// element (distinct from the absence of a type entry), `Anything` is top.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Type {
    /// Bottom: nothing is known. Advisory components must treat this the
    /// same as "no information", never as an error.
    Unknown,
    /// Top: any value.
    Anything,
    Undefined,
    Boolean,
    Integer,
    Float,
    BigInt,
    String,
    RegExp,
    Object(ObjectShape),
    Function(Option<FunctionSignature>),
    Constructor(Option<FunctionSignature>),
    /// Union of two or more types, normalized to have no nested unions.
    Union(Vec<Type>),
    /// Intersection of two or more types.
    Intersection(Vec<Type>),
}

impl Type {
    #[must_use]
    pub fn object(group: impl Into<String>) -> Self {
        Self::Object(ObjectShape { group: Some(group.into()), ..Default::default() })
    }

    #[must_use]
    pub fn object_with_properties(group: impl Into<String>, properties: impl IntoIterator<Item = String>) -> Self {
        Self::Object(ObjectShape {
            group: Some(group.into()),
            properties: properties.into_iter().collect(),
            methods: BTreeSet::new(),
        })
    }

    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if self == other {
            return self;
        }
        if matches!(self, Self::Anything) || matches!(other, Self::Anything) {
            return Self::Anything;
        }
        if matches!(self, Self::Unknown) {
            return other;
        }
        if matches!(other, Self::Unknown) {
            return self;
        }
        let mut members = match self {
            Self::Union(members) => members,
            other => vec![other],
        };
        match other {
            Self::Union(more) => members.extend(more),
            single => members.push(single),
        }
        members.sort_by_key(ToString::to_string);
        members.dedup();
        if members.len() == 1 {
            members.pop().unwrap()
        } else {
            Self::Union(members)
        }
    }

    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        if self == other {
            return self;
        }
        if matches!(self, Self::Unknown) || matches!(other, Self::Unknown) {
            return Self::Unknown;
        }
        if matches!(self, Self::Anything) {
            return other;
        }
        if matches!(other, Self::Anything) {
            return self;
        }
        if self.is(&other) {
            return self;
        }
        if other.is(&self) {
            return other;
        }
        Self::Intersection(vec![self, other])
    }

    /// Subtyping: does `self` satisfy a requirement of type `required`?
    #[must_use]
    pub fn is(&self, required: &Self) -> bool {
        match (self, required) {
            (_, Self::Anything) => true,
            (Self::Anything, _) => false,
            (Self::Unknown, _) | (_, Self::Unknown) => false,
            (a, b) if a == b => true,
            (Self::Union(members), required) => members.iter().all(|m| m.is(required)),
            (value, Self::Union(members)) => members.iter().any(|m| value.is(m)),
            (value, Self::Intersection(members)) => members.iter().all(|m| value.is(m)),
            (Self::Intersection(members), required) => members.iter().any(|m| m.is(required)),
            (Self::Object(a), Self::Object(b)) => {
                (b.group.is_none() || a.group == b.group)
                    && b.properties.is_subset(&a.properties)
                    && b.methods.is_subset(&a.methods)
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Anything => write!(f, "anything"),
            Self::Undefined => write!(f, "undefined"),
            Self::Boolean => write!(f, "boolean"),
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::BigInt => write!(f, "bigint"),
            Self::String => write!(f, "string"),
            Self::RegExp => write!(f, "regexp"),
            Self::Object(shape) => write!(f, "object({})", shape.group.as_deref().unwrap_or("?")),
            Self::Function(_) => write!(f, "function"),
            Self::Constructor(_) => write!(f, "constructor"),
            Self::Union(members) => {
                let parts: Vec<String> = members.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join("|"))
            }
            Self::Intersection(members) => {
                let parts: Vec<String> = members.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join("&"))
            }
        }
    }
}

/// A named, process-wide record of an object's known properties/methods.
///
/// Registered once at startup (`Environment::minimal` or a full builtin
/// table) and never mutated afterward. `register` checks the invariant that
/// `instance_type`'s group/properties/methods agree with this record.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectGroup {
    pub name: String,
    pub properties: HashMap<String, Type>,
    pub methods: HashMap<String, FunctionSignature>,
    pub instance_type: Type,
}

impl ObjectGroup {
    /// Builds a group, deriving `instance_type` from the name/properties/methods
    /// so the registration invariant holds by construction.
    #[must_use]
    pub fn new(name: impl Into<String>, properties: HashMap<String, Type>, methods: HashMap<String, FunctionSignature>) -> Self {
        let name = name.into();
        let instance_type = Type::Object(ObjectShape {
            group: Some(name.clone()),
            properties: properties.keys().cloned().collect(),
            methods: methods.keys().cloned().collect(),
        });
        Self { name, properties, methods, instance_type }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_absorbs_anything() {
        assert_eq!(Type::Integer.union(Type::Anything), Type::Anything);
    }

    #[test]
    fn union_absorbs_unknown() {
        assert_eq!(Type::Integer.union(Type::Unknown), Type::Integer);
    }

    #[test]
    fn subtyping_through_union() {
        let t = Type::Integer.union(Type::String);
        assert!(Type::Integer.is(&t));
        assert!(!t.is(&Type::Integer));
    }

    #[test]
    fn object_subtyping_checks_properties() {
        let base = Type::object_with_properties("Object", ["x".to_owned(), "y".to_owned()]);
        let required = Type::object_with_properties("Object", ["x".to_owned()]);
        assert!(base.is(&required));
        assert!(!required.is(&base));
    }

    #[test]
    fn anything_is_top() {
        assert!(Type::Integer.is(&Type::Anything));
        assert!(!Type::Anything.is(&Type::Integer));
    }
}
