//! Hierarchy queries over resolved handles
//!
//! Every function takes the oracle that owns its arguments. Queries on
//! unloaded or primitive handles are precondition violations.
//!
//! Subtype checks use the two-tier scheme the code generator also emits:
//! a class eligible as a primary super is found (or conclusively missed) by
//! one load from the subtype's display at the supertype's check slot;
//! anything else falls back to a scan of the subtype's secondary supers.

use crate::error::{HeapError, OracleResult};
use crate::handle::{CheckSlot, LoadedClass, TypeKind, TypeRef};
use crate::heap::HeapIdentity;
use crate::oracle::TypeOracle;

/// Is `a` a subtype of `b` (classes, interfaces and arrays)
pub fn is_subtype_of(oracle: &TypeOracle, a: TypeRef, b: TypeRef) -> OracleResult<bool> {
    let sub = oracle.get(a)?.loaded("is_subtype_of")?;
    let sup = oracle.get(b)?.loaded("is_subtype_of")?;
    if a == b {
        return Ok(true);
    }
    Ok(check_subtype(sub, sup))
}

/// Subtype check on two snapshots
pub(crate) fn check_subtype(sub: &LoadedClass, sup: &LoadedClass) -> bool {
    if sub.identity == sup.identity {
        return true;
    }

    match sup.hierarchy.check_slot() {
        CheckSlot::Primary(depth) => sub.hierarchy.primary_super_of_depth(depth) == Some(sup.identity),
        CheckSlot::Secondary => {
            tracing::trace!(
                sub = %sub.identity,
                sup = %sup.identity,
                secondary = sub.hierarchy.secondary_supers().len(),
                "subtype check scanning secondary supers"
            );
            sub.hierarchy.secondary_supers().contains(&sup.identity)
        }
    }
}

/// Is `b` on the superclass chain of `a` (or `a` itself)
///
/// Interfaces are never class ancestors.
pub fn is_subclass_of(oracle: &TypeOracle, a: TypeRef, b: TypeRef) -> OracleResult<bool> {
    let sub = oracle.get(a)?.loaded("is_subclass_of")?;
    let sup = oracle.get(b)?.loaded("is_subclass_of")?;
    if a == b {
        return Ok(true);
    }
    Ok(check_subclass(sub, sup))
}

fn check_subclass(sub: &LoadedClass, sup: &LoadedClass) -> bool {
    if sub.identity == sup.identity {
        return true;
    }
    if sup.kind == TypeKind::Interface {
        return false;
    }
    sub.hierarchy.class_chain().contains(&sup.identity)
}

/// Ancestor of `a` in primary display slot `depth`
///
/// `None` when the slot is past the end of the display.
pub fn super_of_depth(
    oracle: &mut TypeOracle,
    a: TypeRef,
    depth: usize,
) -> OracleResult<Option<TypeRef>> {
    let ancestor = oracle
        .get(a)?
        .loaded("super_of_depth")?
        .hierarchy
        .primary_super_of_depth(depth);

    match ancestor {
        Some(id) => oracle.resolve(id).map(Some),
        None => Ok(None),
    }
}

/// Nearest common ancestor of `a` and `b` on their class chains
///
/// Returns `a` or `b` itself when one is an ancestor of the other.
pub fn least_common_ancestor(oracle: &mut TypeOracle, a: TypeRef, b: TypeRef) -> OracleResult<TypeRef> {
    let common = {
        let first = oracle.get(a)?.loaded("least_common_ancestor")?;
        let second = oracle.get(b)?.loaded("least_common_ancestor")?;
        if a == b || check_subclass(first, second) {
            return Ok(b);
        }
        if check_subclass(second, first) {
            return Ok(a);
        }
        common_class_ancestor(first, second)?
    };
    oracle.resolve(common)
}

/// Walk both chains from the root while they agree
fn common_class_ancestor(a: &LoadedClass, b: &LoadedClass) -> Result<HeapIdentity, HeapError> {
    let chain_a = a.hierarchy.class_chain().iter().chain(Some(&a.identity));
    let chain_b = b.hierarchy.class_chain().iter().chain(Some(&b.identity));

    chain_a
        .zip(chain_b)
        .take_while(|(x, y)| x == y)
        .last()
        .map(|(x, _)| *x)
        .ok_or_else(|| {
            HeapError::StoreFailure(format!(
                "{} and {} share no root class",
                a.identity, b.identity
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use crate::heap::{ArrayElement, BasicType, ClassDef, ClassTable};
    use std::sync::Arc;

    struct Fixture {
        table: Arc<ClassTable>,
        oracle: TypeOracle,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_capacity(8)
        }

        fn with_capacity(capacity: usize) -> Self {
            let table = Arc::new(ClassTable::with_display_capacity("Object", capacity).unwrap());
            let oracle = TypeOracle::new(table.clone());
            Self { table, oracle }
        }

        fn class(&mut self, name: &str, parent: Option<TypeRef>) -> TypeRef {
            let mut def = ClassDef::class(name);
            if let Some(parent) = parent {
                def = def.extends(self.oracle[parent].identity().unwrap());
            }
            let id = self.table.define(def).unwrap();
            self.oracle.resolve(id).unwrap()
        }

        fn root(&mut self) -> TypeRef {
            self.oracle.resolve(self.table.root()).unwrap()
        }

        fn array(&mut self, element: TypeRef) -> TypeRef {
            let id = self.oracle[element].identity().unwrap();
            let array = self.table.array_of(ArrayElement::Class(id), &[]).unwrap();
            self.oracle.resolve(array).unwrap()
        }
    }

    #[test]
    fn test_subtype_along_class_chain() {
        let mut f = Fixture::new();
        let object = f.root();
        let a = f.class("A", None);
        let b = f.class("B", Some(a));

        assert!(is_subtype_of(&f.oracle, b, a).unwrap());
        assert!(is_subtype_of(&f.oracle, b, object).unwrap());
        assert!(!is_subtype_of(&f.oracle, a, b).unwrap());
        assert!(is_subtype_of(&f.oracle, a, a).unwrap());
    }

    #[test]
    fn test_interfaces_take_the_secondary_path() {
        let mut f = Fixture::new();
        let object = f.root();
        let runnable = f.table.define(ClassDef::interface("Runnable")).unwrap();
        let task = f
            .table
            .define(ClassDef::class("Task").implements([runnable]))
            .unwrap();
        let other = f.class("Other", None);

        let runnable = f.oracle.resolve(runnable).unwrap();
        let task = f.oracle.resolve(task).unwrap();

        assert!(is_subtype_of(&f.oracle, task, runnable).unwrap());
        assert!(!is_subtype_of(&f.oracle, other, runnable).unwrap());
        assert!(is_subtype_of(&f.oracle, runnable, object).unwrap());
        // Interfaces are not class ancestors
        assert!(!is_subclass_of(&f.oracle, task, runnable).unwrap());
        assert!(is_subclass_of(&f.oracle, task, object).unwrap());
    }

    #[test]
    fn test_array_covariance() {
        let mut f = Fixture::new();
        let object = f.root();
        let a = f.class("A", None);
        let b = f.class("B", Some(a));
        let a_id = f.oracle[a].identity().unwrap();
        let b_id = f.oracle[b].identity().unwrap();

        let a_array = f.table.array_of(ArrayElement::Class(a_id), &[]).unwrap();
        let b_array = f.table.array_of(ArrayElement::Class(b_id), &[]).unwrap();
        let ints = f.table.array_of(ArrayElement::Primitive(BasicType::Int), &[]).unwrap();
        let a_array = f.oracle.resolve(a_array).unwrap();
        let b_array = f.oracle.resolve(b_array).unwrap();
        let ints = f.oracle.resolve(ints).unwrap();

        assert!(is_subtype_of(&f.oracle, b_array, a_array).unwrap());
        assert!(!is_subtype_of(&f.oracle, a_array, b_array).unwrap());
        assert!(is_subtype_of(&f.oracle, ints, object).unwrap());
        assert!(!is_subtype_of(&f.oracle, ints, a_array).unwrap());
        assert_eq!(
            least_common_ancestor(&mut f.oracle, ints, b_array).unwrap(),
            object
        );
    }

    #[test]
    fn test_array_relations_ignore_creation_order() {
        let mut f = Fixture::new();
        let object = f.root();
        let a = f.class("A", None);
        let b = f.class("B", Some(a));
        let d = f.class("D", Some(a));

        // Subclass arrays exist before the superclass array is asked for
        let b_array = f.array(b);
        let a_array = f.array(a);
        let d_array = f.array(d);
        let objects = f.array(object);

        assert!(is_subtype_of(&f.oracle, b_array, a_array).unwrap());
        assert!(is_subtype_of(&f.oracle, d_array, a_array).unwrap());
        assert!(is_subtype_of(&f.oracle, b_array, objects).unwrap());
        assert!(!is_subtype_of(&f.oracle, b_array, d_array).unwrap());

        assert!(is_subclass_of(&f.oracle, d_array, a_array).unwrap());
        assert!(is_subclass_of(&f.oracle, a_array, objects).unwrap());
        assert!(!is_subclass_of(&f.oracle, a_array, d_array).unwrap());

        assert_eq!(least_common_ancestor(&mut f.oracle, d_array, a_array).unwrap(), a_array);
        assert_eq!(least_common_ancestor(&mut f.oracle, b_array, d_array).unwrap(), a_array);
        assert_eq!(least_common_ancestor(&mut f.oracle, b_array, objects).unwrap(), objects);
        assert_eq!(least_common_ancestor(&mut f.oracle, b_array, a).unwrap(), object);
    }

    #[test]
    fn test_interface_arrays() {
        let mut f = Fixture::new();
        let object = f.root();
        let runnable = f.table.define(ClassDef::interface("Runnable")).unwrap();
        let task = f
            .table
            .define(ClassDef::class("Task").implements([runnable]))
            .unwrap();
        let runnable = f.oracle.resolve(runnable).unwrap();
        let task = f.oracle.resolve(task).unwrap();

        let tasks = f.array(task);
        let runnables = f.array(runnable);
        let objects = f.array(object);

        assert!(is_subtype_of(&f.oracle, tasks, runnables).unwrap());
        assert!(!is_subtype_of(&f.oracle, runnables, tasks).unwrap());
        assert!(is_subtype_of(&f.oracle, runnables, objects).unwrap());
        assert!(!is_subclass_of(&f.oracle, tasks, runnables).unwrap());
        assert_eq!(least_common_ancestor(&mut f.oracle, tasks, runnables).unwrap(), objects);
    }

    #[test]
    fn test_deep_classes_use_secondary_supers() {
        let mut f = Fixture::with_capacity(2);
        let object = f.root();
        let mut chain = vec![object];
        for i in 0..5 {
            let parent = *chain.last().unwrap();
            let next = f.class(&format!("L{i}"), Some(parent));
            chain.push(next);
        }

        // L2 sits at depth 3, past the display
        let deep = chain[3];
        assert!(!f.oracle[deep].can_be_primary_super().unwrap());
        assert!(is_subtype_of(&f.oracle, chain[5], deep).unwrap());
        assert!(!is_subtype_of(&f.oracle, chain[2], deep).unwrap());
        assert!(is_subtype_of(&f.oracle, chain[5], chain[1]).unwrap());
        assert_eq!(super_of_depth(&mut f.oracle, chain[5], 1).unwrap(), Some(chain[1]));
        assert_eq!(super_of_depth(&mut f.oracle, chain[5], 2).unwrap(), None);
    }

    #[test]
    fn test_super_of_depth() {
        let mut f = Fixture::new();
        let object = f.root();
        let a = f.class("A", None);
        let b = f.class("B", Some(a));

        assert_eq!(super_of_depth(&mut f.oracle, b, 0).unwrap(), Some(object));
        assert_eq!(super_of_depth(&mut f.oracle, b, 1).unwrap(), Some(a));
        assert_eq!(super_of_depth(&mut f.oracle, b, 2).unwrap(), None);
        assert_eq!(super_of_depth(&mut f.oracle, object, 0).unwrap(), None);
    }

    #[test]
    fn test_super_of_depth_resolves_uncached_ancestor() {
        let table = Arc::new(ClassTable::new("Object"));
        let a = table.define(ClassDef::class("A")).unwrap();
        let b = table.define(ClassDef::class("B").extends(a)).unwrap();
        let mut oracle = TypeOracle::new(table.clone());

        let b = oracle.resolve(b).unwrap();
        assert_eq!(oracle.cached(a), None);
        let found = super_of_depth(&mut oracle, b, 1).unwrap().unwrap();
        assert_eq!(oracle[found].identity(), Some(a));
        assert_eq!(oracle.cached(a), Some(found));
    }

    #[test]
    fn test_lca_returns_existing_handles() {
        let mut f = Fixture::new();
        let a = f.class("A", None);
        let b = f.class("B", Some(a));
        let d = f.class("D", Some(a));
        let built = f.oracle.len();

        assert_eq!(least_common_ancestor(&mut f.oracle, b, a).unwrap(), a);
        assert_eq!(least_common_ancestor(&mut f.oracle, a, b).unwrap(), a);
        assert_eq!(least_common_ancestor(&mut f.oracle, b, b).unwrap(), b);
        assert_eq!(least_common_ancestor(&mut f.oracle, b, d).unwrap(), a);
        assert_eq!(f.oracle.len(), built);
    }

    #[test]
    fn test_lca_ignores_interfaces() {
        let mut f = Fixture::new();
        let object = f.root();
        let shared = f.table.define(ClassDef::interface("Shared")).unwrap();
        let x = f.table.define(ClassDef::class("X").implements([shared])).unwrap();
        let y = f.table.define(ClassDef::class("Y").implements([shared])).unwrap();
        let x = f.oracle.resolve(x).unwrap();
        let y = f.oracle.resolve(y).unwrap();

        assert_eq!(least_common_ancestor(&mut f.oracle, x, y).unwrap(), object);
    }

    #[test]
    fn test_queries_reject_unloaded_and_primitive() {
        let mut f = Fixture::new();
        let a = f.class("A", None);
        let foo = f
            .oracle
            .resolve_unloaded("com/example/Foo", BasicType::Object)
            .unwrap();
        let int = f.oracle.primitive(BasicType::Int).unwrap();

        for result in [
            is_subtype_of(&f.oracle, foo, a),
            is_subtype_of(&f.oracle, a, foo),
            is_subtype_of(&f.oracle, foo, foo),
            is_subclass_of(&f.oracle, int, a),
        ] {
            assert!(matches!(result, Err(OracleError::PreconditionViolated { .. })));
        }
        assert!(super_of_depth(&mut f.oracle, foo, 0).is_err());
        assert!(least_common_ancestor(&mut f.oracle, a, foo).is_err());
    }
}
