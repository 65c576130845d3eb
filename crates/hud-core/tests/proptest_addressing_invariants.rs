// SPDX-License-Identifier: MIT
//! Property-based invariant tests for nest-id addressing.
//!
//! ## Invariants
//!
//! 1. Round trip: inserting a child and resolving `child_path(parent, id)`
//!    finds exactly that child.
//! 2. `parent_path` inverts `child_path`.
//! 3. Every node in a constructed tree is reachable through its own nest id.
//! 4. Resolution never panics on arbitrary path strings.

use hud_core::node::{Group, NodeSource};
use hud_core::{nest, resolve};
use proptest::prelude::*;

// ── Strategies ────────────────────────────────────────────────────────────

fn arb_id() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,6}").unwrap()
}

/// A chain of unique ids describing a root-to-leaf path.
fn arb_id_chain() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(arb_id(), 1..5).prop_map(|ids| ids.into_iter().collect())
}

fn chain_to_tree(chain: &[String]) -> Vec<Group> {
    let mut iter = chain.iter().rev();
    let first = iter.next().expect("chain is non-empty");
    let mut node = Group::new(first, first, NodeSource::System);
    for id in iter {
        let mut parent = Group::new(id, id, NodeSource::System);
        parent.push_group(node);
        node = parent;
    }
    vec![node]
}

// ── 1 + 2. Round trip and parent inversion ────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn child_path_round_trips_through_resolve(chain in arb_id_chain(), child in arb_id()) {
        prop_assume!(!chain.contains(&child));
        let mut roots = chain_to_tree(&chain);

        // Deepest node in the chain.
        let leaf_nest = chain.join("_");
        let parent = hud_core::resolve_mut(&mut roots, &leaf_nest).unwrap();
        let parent_nest = parent.nest_id.clone();
        parent.push_group(Group::new(&child, &child, NodeSource::System));

        let nest_id = nest::child_path(&parent_nest, &child).unwrap();
        let found = resolve(&roots, &nest_id).unwrap();
        prop_assert_eq!(&found.id, &child);
        prop_assert_eq!(&found.nest_id, &nest_id);

        prop_assert_eq!(nest::parent_path(&nest_id), Some(parent_nest.as_str()));
    }
}

// ── 3. Self-reachability ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn every_node_resolves_by_its_own_nest_id(chain in arb_id_chain()) {
        let roots = chain_to_tree(&chain);

        let mut nest_ids = Vec::new();
        fn collect(group: &Group, out: &mut Vec<String>) {
            out.push(group.nest_id.clone());
            for child in &group.groups {
                collect(child, out);
            }
        }
        for root in &roots {
            collect(root, &mut nest_ids);
        }

        for nest_id in nest_ids {
            let found = resolve(&roots, &nest_id);
            prop_assert!(found.is_some(), "unreachable nest id {nest_id}");
            prop_assert_eq!(&found.unwrap().nest_id, &nest_id);
        }
    }
}

// ── 4. Totality on arbitrary input ────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn resolve_never_panics(chain in arb_id_chain(), probe in "[a-z_|]{0,24}") {
        let roots = chain_to_tree(&chain);
        let _ = resolve(&roots, &probe);
        let _ = nest::parent_path(&probe);
        let _ = nest::leaf_id(&probe);
    }
}
