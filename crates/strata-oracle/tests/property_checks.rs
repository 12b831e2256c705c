//! Randomized agreement between the display-based checks and a brute-force
//! walk of the class model the table was built from.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use strata_oracle::{ClassDef, ClassTable, TypeOracle, TypeRef};

#[derive(Debug, Clone)]
struct Node {
    parent: Option<usize>,
    interfaces: Vec<usize>,
    is_interface: bool,
}

struct Model {
    nodes: Vec<Node>,
    oracle: TypeOracle,
    refs: Vec<TypeRef>,
}

impl Model {
    /// Index 0 is the root; the next `interfaces` entries are interfaces
    fn generate(seed: u64, capacity: usize, classes: usize, interfaces: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let table = Arc::new(ClassTable::with_display_capacity("Object", capacity).unwrap());
        let mut nodes = vec![Node {
            parent: None,
            interfaces: Vec::new(),
            is_interface: false,
        }];
        let mut ids = vec![table.root()];

        for i in 0..interfaces {
            let id = table.define(ClassDef::interface(format!("I{i}"))).unwrap();
            nodes.push(Node {
                parent: Some(0),
                interfaces: Vec::new(),
                is_interface: true,
            });
            ids.push(id);
        }

        for i in 0..classes {
            // Bias towards recent classes so chains get deep
            let candidates: Vec<usize> = (0..nodes.len()).filter(|&n| !nodes[n].is_interface).collect();
            let parent = if rng.gen_bool(0.7) {
                candidates[candidates.len() - 1 - rng.gen_range(0..candidates.len().min(3))]
            } else {
                candidates[rng.gen_range(0..candidates.len())]
            };
            let implemented: Vec<usize> = (1..=interfaces).filter(|_| rng.gen_bool(0.15)).collect();

            let def = ClassDef::class(format!("C{i}"))
                .extends(ids[parent])
                .implements(implemented.iter().map(|&n| ids[n]));
            ids.push(table.define(def).unwrap());
            nodes.push(Node {
                parent: Some(parent),
                interfaces: implemented,
                is_interface: false,
            });
        }

        let mut oracle = TypeOracle::new(table.clone());
        let refs = ids.iter().map(|&id| oracle.resolve(id).unwrap()).collect();
        Self { nodes, oracle, refs }
    }

    /// Class chain of `n`, including `n`
    fn class_chain(&self, n: usize) -> Vec<usize> {
        let mut chain = vec![n];
        let mut current = n;
        while let Some(parent) = self.nodes[current].parent {
            chain.push(parent);
            current = parent;
        }
        chain
    }

    fn brute_subtype(&self, x: usize, y: usize) -> bool {
        let chain = self.class_chain(x);
        let mut supertypes: HashSet<usize> = chain.iter().copied().collect();
        for &c in &chain {
            supertypes.extend(self.nodes[c].interfaces.iter().copied());
        }
        supertypes.contains(&y)
    }

    fn brute_subclass(&self, x: usize, y: usize) -> bool {
        x == y || (!self.nodes[y].is_interface && self.class_chain(x).contains(&y))
    }

    fn brute_lca(&self, x: usize, y: usize) -> usize {
        let ancestors: HashSet<usize> = self.class_chain(y).into_iter().collect();
        self.class_chain(x)
            .into_iter()
            .find(|c| ancestors.contains(c))
            .unwrap()
    }
}

/// Returns how many classes sit past the primary display
fn check_agreement(model: &mut Model, capacity: usize) -> usize {
    let n = model.nodes.len();
    let mut deep = 0;
    for x in 0..n {
        if model.oracle[model.refs[x]].super_depth().unwrap() >= capacity {
            deep += 1;
        }
        for y in 0..n {
            let (a, b) = (model.refs[x], model.refs[y]);
            assert_eq!(
                model.oracle.is_subtype_of(a, b).unwrap(),
                model.brute_subtype(x, y),
                "is_subtype_of(C{x}, C{y})"
            );
            assert_eq!(
                model.oracle.is_subclass_of(a, b).unwrap(),
                model.brute_subclass(x, y),
                "is_subclass_of(C{x}, C{y})"
            );
            let lca = model.oracle.least_common_ancestor(a, b).unwrap();
            assert_eq!(lca, model.refs[model.brute_lca(x, y)]);
        }
    }
    deep
}

#[test]
fn test_small_display_agrees_with_brute_force() {
    let mut deep = 0;
    for seed in 0..8 {
        let mut model = Model::generate(seed, 3, 40, 4);
        deep += check_agreement(&mut model, 3);
    }
    assert!(deep > 0, "no class exceeded the display");
}

#[test]
fn test_default_display_agrees_with_brute_force() {
    for seed in 100..104 {
        let mut model = Model::generate(seed, 8, 60, 6);
        check_agreement(&mut model, 8);
    }
}

#[test]
fn test_answers_do_not_depend_on_display_capacity() {
    // Same seed, same shape; only the display capacity differs
    let mut narrow = Model::generate(7, 2, 30, 3);
    let mut wide = Model::generate(7, 16, 30, 3);
    let n = narrow.nodes.len();
    for x in 0..n {
        for y in 0..n {
            assert_eq!(
                narrow.oracle.is_subtype_of(narrow.refs[x], narrow.refs[y]).unwrap(),
                wide.oracle.is_subtype_of(wide.refs[x], wide.refs[y]).unwrap()
            );
            let narrow_lca = narrow.oracle.least_common_ancestor(narrow.refs[x], narrow.refs[y]).unwrap();
            let wide_lca = wide.oracle.least_common_ancestor(wide.refs[x], wide.refs[y]).unwrap();
            assert_eq!(
                narrow.refs.iter().position(|&r| r == narrow_lca),
                wide.refs.iter().position(|&r| r == wide_lca)
            );
        }
    }
}

#[test]
fn test_displays_never_repeat_an_ancestor() {
    let model = Model::generate(42, 4, 50, 2);
    for &ty in &model.refs {
        let handle = &model.oracle[ty];
        let chain = handle.hierarchy().unwrap().class_chain();
        let unique: HashSet<_> = chain.iter().collect();
        assert_eq!(unique.len(), chain.len());
        assert!(!chain.contains(&handle.identity().unwrap()));
    }
}
