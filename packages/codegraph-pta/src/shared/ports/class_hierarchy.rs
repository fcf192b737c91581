//! Type hierarchy lookup
//!
//! The analysis consults the hierarchy for dispatch (`resolve_method`), for
//! type filters (`is_subtype`) and for the merge policy
//! (`has_only_primitive_fields`). Front-ends with a richer class model can
//! implement [`ClassHierarchy`] directly; [`SimpleClassHierarchy`] is built
//! from the declarations carried in a [`Program`].

use crate::shared::models::{ClassDecl, FieldRef, MethodRef, ProcedureId, Program, TypeRef};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Implicit supertype of every class and array
pub const ROOT_TYPE: &str = "Object";

const PRIMITIVE_TYPES: &[&str] = &[
    "boolean", "byte", "char", "short", "int", "long", "float", "double",
];

/// Whether `ty` names a primitive (non-reference) type
#[inline]
pub fn is_primitive(ty: &TypeRef) -> bool {
    PRIMITIVE_TYPES.contains(&ty.name())
}

/// Read-only view of the program's type hierarchy
pub trait ClassHierarchy {
    /// Whether `ty` is known (arrays, closures and the root are always known)
    fn is_declared(&self, ty: &TypeRef) -> bool;

    /// Direct superclass
    fn superclass(&self, ty: &TypeRef) -> Option<TypeRef>;

    /// Find the implementation of `selector` for receivers of type `ty`,
    /// walking up the superclass chain
    fn resolve_method(&self, ty: &TypeRef, selector: &str) -> Option<ProcedureId>;

    /// Resolve a statically bound method reference
    fn resolve_static(&self, method: &MethodRef) -> Option<ProcedureId>;

    /// The declaration `field` refers to: the nearest class in the
    /// superclass chain of `field.declaring` (then its interfaces) that
    /// declares a field of that name
    fn resolve_field(&self, field: &FieldRef) -> Option<FieldRef>;

    /// All declared types that are subtypes of `ty` (including `ty`), sorted
    fn subclasses_of(&self, ty: &TypeRef) -> Vec<TypeRef>;

    /// Reflexive, transitive subtype test over classes, interfaces and arrays
    fn is_subtype(&self, sub: &TypeRef, sup: &TypeRef) -> bool;

    /// Whether no instance field of `ty` (inherited included) holds references
    fn has_only_primitive_fields(&self, ty: &TypeRef) -> bool;

    /// Every declared static field holding references
    fn static_fields(&self) -> Vec<FieldRef>;

    /// Reference-typed instance fields of `ty`, inherited included
    fn instance_fields(&self, ty: &TypeRef) -> Vec<FieldRef>;
}

/// Hierarchy backed by the class declarations of a [`Program`]
#[derive(Debug, Clone, Default)]
pub struct SimpleClassHierarchy {
    classes: FxHashMap<TypeRef, ClassDecl>,
}

impl SimpleClassHierarchy {
    pub fn from_program(program: &Program) -> Self {
        let classes = program
            .classes
            .iter()
            .map(|class| (class.name.clone(), class.clone()))
            .collect();
        Self { classes }
    }

    fn is_root(ty: &TypeRef) -> bool {
        ty.name() == ROOT_TYPE
    }

    /// Superclass chain starting at `ty` itself; stops on cycles
    fn ancestors(&self, ty: &TypeRef) -> Vec<&ClassDecl> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        let mut current = self.classes.get(ty);
        while let Some(class) = current {
            if !seen.insert(&class.name) {
                break;
            }
            chain.push(class);
            current = class
                .superclass
                .as_ref()
                .and_then(|superclass| self.classes.get(superclass));
        }
        chain
    }
}

impl ClassHierarchy for SimpleClassHierarchy {
    fn is_declared(&self, ty: &TypeRef) -> bool {
        ty.is_array()
            || Self::is_root(ty)
            || *ty == TypeRef::function()
            || is_primitive(ty)
            || self.classes.contains_key(ty)
    }

    fn superclass(&self, ty: &TypeRef) -> Option<TypeRef> {
        if ty.is_array() {
            return Some(TypeRef::new(ROOT_TYPE));
        }
        self.classes
            .get(ty)
            .and_then(|class| class.superclass.clone())
    }

    fn resolve_method(&self, ty: &TypeRef, selector: &str) -> Option<ProcedureId> {
        // Arrays dispatch like the root type
        let lookup = if ty.is_array() {
            TypeRef::new(ROOT_TYPE)
        } else {
            ty.clone()
        };
        self.ancestors(&lookup)
            .into_iter()
            .find_map(|class| class.methods.get(selector).copied())
    }

    fn resolve_static(&self, method: &MethodRef) -> Option<ProcedureId> {
        self.resolve_method(&method.declaring, &method.selector)
    }

    fn resolve_field(&self, field: &FieldRef) -> Option<FieldRef> {
        let declares = |class: &ClassDecl| class.fields.iter().any(|f| f.name == field.name);
        let chain = self.ancestors(&field.declaring);
        if let Some(class) = chain.iter().find(|class| declares(**class)) {
            return Some(FieldRef::new(class.name.clone(), field.name.clone()));
        }
        // Interface constants, breadth-first from the nearest class
        let mut seen = FxHashSet::default();
        let mut queue: VecDeque<&TypeRef> = chain
            .iter()
            .flat_map(|class| class.interfaces.iter())
            .collect();
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name) {
                continue;
            }
            if let Some(interface) = self.classes.get(name) {
                if declares(interface) {
                    return Some(FieldRef::new(interface.name.clone(), field.name.clone()));
                }
                queue.extend(interface.interfaces.iter());
            }
        }
        None
    }

    fn subclasses_of(&self, ty: &TypeRef) -> Vec<TypeRef> {
        let mut result: Vec<TypeRef> = self
            .classes
            .keys()
            .filter(|candidate| self.is_subtype(candidate, ty))
            .cloned()
            .collect();
        if Self::is_root(ty) || (ty.is_array() && !self.classes.contains_key(ty)) {
            if !result.contains(ty) {
                result.push(ty.clone());
            }
        }
        result.sort();
        result
    }

    fn is_subtype(&self, sub: &TypeRef, sup: &TypeRef) -> bool {
        if sub == sup || Self::is_root(sup) {
            return true;
        }
        if sub.is_array() || sup.is_array() {
            return match (sub.element_type(), sup.element_type()) {
                (Some(sub_elem), Some(sup_elem)) => {
                    if is_primitive(&sub_elem) || is_primitive(&sup_elem) {
                        sub_elem == sup_elem
                    } else {
                        self.is_subtype(&sub_elem, &sup_elem)
                    }
                }
                _ => false,
            };
        }

        // Breadth-first over superclasses and interfaces
        let mut seen = FxHashSet::default();
        let mut queue = vec![sub.clone()];
        while let Some(current) = queue.pop() {
            if &current == sup {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(class) = self.classes.get(&current) {
                queue.extend(class.superclass.iter().cloned());
                queue.extend(class.interfaces.iter().cloned());
            }
        }
        false
    }

    fn has_only_primitive_fields(&self, ty: &TypeRef) -> bool {
        if let Some(element) = ty.element_type() {
            return is_primitive(&element);
        }
        self.ancestors(ty).into_iter().all(|class| {
            class
                .fields
                .iter()
                .filter(|field| !field.is_static)
                .all(|field| !field.is_reference)
        })
    }

    fn static_fields(&self) -> Vec<FieldRef> {
        let mut fields: Vec<FieldRef> = self
            .classes
            .values()
            .flat_map(|class| {
                class
                    .fields
                    .iter()
                    .filter(|field| field.is_static && field.is_reference)
                    .map(move |field| FieldRef::new(class.name.clone(), field.name.clone()))
            })
            .collect();
        fields.sort();
        fields
    }

    fn instance_fields(&self, ty: &TypeRef) -> Vec<FieldRef> {
        self.ancestors(ty)
            .into_iter()
            .flat_map(|class| {
                class
                    .fields
                    .iter()
                    .filter(|field| !field.is_static && field.is_reference)
                    .map(move |field| FieldRef::new(class.name.clone(), field.name.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ProgramBuilder;

    fn hierarchy() -> (SimpleClassHierarchy, ProcedureId, ProcedureId) {
        let mut b = ProgramBuilder::new();
        b.class("I");
        b.class("A").implements("I").field("next");
        b.class("B").extends("A").primitive_field("count");
        b.class("P").primitive_field("x").static_field("INSTANCE");
        let a_m = b.declare_method("A", "m()");
        let b_m = b.declare_method("B", "m()");
        b.declare_method("A", "n()");
        (
            SimpleClassHierarchy::from_program(&b.build()),
            a_m,
            b_m,
        )
    }

    #[test]
    fn test_resolve_method_walks_superclasses() {
        let (cha, a_m, b_m) = hierarchy();
        assert_eq!(cha.resolve_method(&"A".into(), "m()"), Some(a_m));
        assert_eq!(cha.resolve_method(&"B".into(), "m()"), Some(b_m));
        assert!(cha.resolve_method(&"B".into(), "n()").is_some());
        assert_eq!(cha.resolve_method(&"B".into(), "missing()"), None);
    }

    #[test]
    fn test_resolve_field_finds_declaring_class() {
        let mut b = ProgramBuilder::new();
        b.class("K").static_field("LIMIT");
        b.class("A").field("f").static_field("s");
        b.class("B").extends("A").implements("K");
        b.class("C").extends("B").field("f");
        let cha = SimpleClassHierarchy::from_program(&b.build());

        let resolve = |ty: &str, name: &str| cha.resolve_field(&FieldRef::new(ty, name));
        assert_eq!(resolve("B", "f"), Some(FieldRef::new("A", "f")));
        assert_eq!(resolve("B", "s"), Some(FieldRef::new("A", "s")));
        // shadowing: the nearest declaration wins
        assert_eq!(resolve("C", "f"), Some(FieldRef::new("C", "f")));
        assert_eq!(resolve("C", "LIMIT"), Some(FieldRef::new("K", "LIMIT")));
        assert_eq!(resolve("B", "missing"), None);
        assert_eq!(resolve("Nowhere", "f"), None);
    }

    #[test]
    fn test_subtyping() {
        let (cha, _, _) = hierarchy();
        assert!(cha.is_subtype(&"B".into(), &"A".into()));
        assert!(cha.is_subtype(&"B".into(), &"I".into()));
        assert!(cha.is_subtype(&"B".into(), &ROOT_TYPE.into()));
        assert!(!cha.is_subtype(&"A".into(), &"B".into()));
        assert!(cha.is_subtype(&"B[]".into(), &"A[]".into()));
        assert!(!cha.is_subtype(&"int[]".into(), &"long[]".into()));
        assert_eq!(
            cha.subclasses_of(&"A".into()),
            vec![TypeRef::new("A"), TypeRef::new("B")]
        );
    }

    #[test]
    fn test_primitive_holders() {
        let (cha, _, _) = hierarchy();
        assert!(cha.has_only_primitive_fields(&"P".into()));
        assert!(!cha.has_only_primitive_fields(&"B".into()));
        assert!(cha.has_only_primitive_fields(&"int[]".into()));
        assert!(!cha.has_only_primitive_fields(&"A[]".into()));
    }

    #[test]
    fn test_fields() {
        let (cha, _, _) = hierarchy();
        assert_eq!(cha.static_fields(), vec![FieldRef::new("P", "INSTANCE")]);
        assert_eq!(cha.instance_fields(&"B".into()), vec![FieldRef::new("A", "next")]);
    }
}
