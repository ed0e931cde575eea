//! The immutable type tables described in `spec.md` §3, §6: builtin
//! inventory and `ObjectGroup` registry. Built once at startup, read-only
//! after initialization (`spec.md` §5 "Shared-resource policy").
//!
//! A full ECMA-262 builtin inventory is out of scope (`spec.md` §1): this
//! module only specifies the `Environment` interface the rest of the core
//! depends on, plus a `minimal()` table sufficient to exercise the builder
//! and interpreter in tests.

use ahash::AHashMap as HashMap;

use crate::ir::{FunctionSignature, ObjectGroup, Parameter, Type};

/// Process-wide, read-only table of registered `ObjectGroup`s and builtin
/// global types. Construct once (`Environment::minimal` or a caller-supplied
/// full inventory), then pass `&Environment` everywhere — never a global.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    groups: HashMap<String, ObjectGroup>,
    globals: HashMap<String, Type>,
}

impl Environment {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registers `group`, checking the invariant from `spec.md` §3: the
    /// instance type's group/properties/methods must match the record.
    ///
    /// # Panics
    /// Panics if `group.instance_type` disagrees with its own
    /// properties/methods — this is a programmer error in environment setup,
    /// never reachable from fuzzed input.
    pub fn register(&mut self, group: ObjectGroup) {
        if let Type::Object(shape) = &group.instance_type {
            assert!(
                shape.group.as_deref() == Some(group.name.as_str()),
                "ObjectGroup {} instance_type.group mismatch",
                group.name
            );
            let prop_keys: std::collections::BTreeSet<String> = group.properties.keys().cloned().collect();
            assert_eq!(shape.properties, prop_keys, "ObjectGroup {} properties mismatch", group.name);
            let method_keys: std::collections::BTreeSet<String> = group.methods.keys().cloned().collect();
            assert_eq!(shape.methods, method_keys, "ObjectGroup {} methods mismatch", group.name);
        } else {
            panic!("ObjectGroup {} instance_type must be Type::Object", group.name);
        }
        self.groups.insert(group.name.clone(), group);
    }

    pub fn register_global(&mut self, name: impl Into<String>, ty: Type) {
        self.globals.insert(name.into(), ty);
    }

    #[must_use]
    pub fn group(&self, name: &str) -> Option<&ObjectGroup> {
        self.groups.get(name)
    }

    #[must_use]
    pub fn global(&self, name: &str) -> Option<&Type> {
        self.globals.get(name)
    }

    #[must_use]
    pub fn groups(&self) -> impl Iterator<Item = &ObjectGroup> {
        self.groups.values()
    }

    #[must_use]
    pub fn type_of_property(&self, base: &Type, property: &str) -> Option<Type> {
        if let Type::Object(shape) = base {
            if let Some(group_name) = &shape.group {
                if let Some(group) = self.groups.get(group_name) {
                    return group.properties.get(property).cloned();
                }
            }
        }
        None
    }

    #[must_use]
    pub fn signature_of_method(&self, base: &Type, method: &str) -> Option<FunctionSignature> {
        if let Type::Object(shape) = base {
            if let Some(group_name) = &shape.group {
                if let Some(group) = self.groups.get(group_name) {
                    return group.methods.get(method).cloned();
                }
            }
        }
        None
    }

    /// A tiny built-in inventory: `Object`, `Array`, `Function` groups, and a
    /// couple of global constructors. Enough for tests to exercise
    /// `generateVariable`/property lookups without a full ECMA-262 table.
    #[must_use]
    pub fn minimal() -> Self {
        let mut env = Self::default();

        let mut array_methods = HashMap::default();
        array_methods.insert(
            "push".to_owned(),
            FunctionSignature::new(vec![Parameter::Rest(Type::Anything)], Type::Integer),
        );
        array_methods.insert(
            "map".to_owned(),
            FunctionSignature::new(vec![Parameter::Plain(Type::Function(None))], Type::object("Array")),
        );
        let array_group = ObjectGroup::new("Array", HashMap::default(), array_methods);
        env.register(array_group);

        let mut object_properties = HashMap::default();
        object_properties.insert("constructor".to_owned(), Type::Function(None));
        let object_group = ObjectGroup::new("Object", object_properties, HashMap::default());
        env.register(object_group);

        let error_group = ObjectGroup::new(
            "Error",
            {
                let mut props = HashMap::default();
                props.insert("message".to_owned(), Type::String);
                props.insert("name".to_owned(), Type::String);
                props
            },
            HashMap::default(),
        );
        env.register(error_group);

        env.register_global("Object", Type::Constructor(None));
        env.register_global("Array", Type::Constructor(None));
        env.register_global("Math", Type::object("Object"));
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_environment_resolves_array_push() {
        let env = Environment::minimal();
        let arr = Type::object("Array");
        let sig = env.signature_of_method(&arr, "push");
        assert!(sig.is_some());
    }

    #[test]
    #[should_panic(expected = "properties mismatch")]
    fn register_rejects_inconsistent_group() {
        use crate::ir::ObjectShape;
        let mut env = Environment::empty();
        let bogus = ObjectGroup {
            name: "Bogus".to_owned(),
            properties: HashMap::default(),
            methods: HashMap::default(),
            instance_type: Type::Object(ObjectShape {
                group: Some("Bogus".to_owned()),
                properties: ["x".to_owned()].into_iter().collect(),
                methods: Default::default(),
            }),
        };
        env.register(bogus);
    }
}
