//! Property tests for the approver sort and the artifact codec.

use std::collections::{HashMap, HashSet};

use idsnap::SnapError;
use idsnap::backup::{SortableNode, codec, sort, sort_groups};
use idsnap::models::CrdbModels;
use idsnap::test_utils::fixtures;
use proptest::prelude::*;

/// A forest over ids `0..len`: a node's parent, if any, has a smaller id.
/// Node order is shuffled.
fn forest() -> impl Strategy<Value = Vec<SortableNode<i64, ()>>> {
    proptest::collection::vec(any::<Option<prop::sample::Index>>(), 1..60)
        .prop_map(|picks| {
            picks
                .into_iter()
                .enumerate()
                .map(|(i, pick)| SortableNode {
                    id: i as i64,
                    parent: pick.filter(|_| i > 0).map(|p| p.index(i) as i64),
                    row: (),
                })
                .collect::<Vec<_>>()
        })
        .prop_shuffle()
}

proptest! {
    #[test]
    fn forest_sorts_parents_first(nodes in forest()) {
        let input_ids: HashSet<i64> = nodes.iter().map(|n| n.id).collect();
        let parents: HashMap<i64, Option<i64>> = nodes.iter().map(|n| (n.id, n.parent)).collect();

        let sorted = sort(nodes).unwrap();

        let output_ids: HashSet<i64> = sorted.iter().map(|n| n.id).collect();
        prop_assert_eq!(sorted.len(), input_ids.len());
        prop_assert_eq!(output_ids, input_ids);

        let position: HashMap<i64, usize> =
            sorted.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        for (id, parent) in parents {
            if let Some(parent) = parent {
                prop_assert!(position[&parent] < position[&id]);
            }
        }
    }

    #[test]
    fn any_cycle_fails_the_whole_sort(mut nodes in forest(), pick in any::<prop::sample::Index>()) {
        // Point the root of some node's chain back at that node.
        let parents: HashMap<i64, Option<i64>> = nodes.iter().map(|n| (n.id, n.parent)).collect();
        let target = nodes[pick.index(nodes.len())].id;
        let mut root = target;
        while let Some(parent) = parents[&root] {
            root = parent;
        }
        let at = nodes.iter().position(|n| n.id == root).unwrap();
        nodes[at].parent = Some(target);

        match sort(nodes) {
            Err(SnapError::CycleDetected { cycle }) => {
                prop_assert!(cycle.len() >= 2);
                prop_assert_eq!(cycle.first(), cycle.last());
            }
            other => prop_assert!(false, "expected a cycle, got {:?}", other.map(|n| n.len())),
        }
    }

    #[test]
    fn approver_chains_survive_any_input_order(seed in any::<u64>()) {
        let mut groups = fixtures::snapshot::<CrdbModels>().groups;
        let len = groups.len();
        groups.rotate_left(usize::try_from(seed % len as u64).unwrap());

        let sorted = sort_groups(groups).unwrap();
        let ids: Vec<i64> = sorted.iter().map(|g| g.id).collect();
        let at = |id: i64| ids.iter().position(|&x| x == id).unwrap();
        prop_assert!(at(101) < at(102));
        prop_assert!(at(102) < at(103));
    }

    #[test]
    fn artifact_encoding_is_stable(names in proptest::collection::vec("[a-z][a-z0-9 _-]{0,12}", 1..8)) {
        let mut snapshot = fixtures::snapshot::<CrdbModels>();
        for (i, name) in names.into_iter().enumerate() {
            snapshot.organizations.push(idsnap::models::Organization {
                id: 10_000 + i as i64,
                name,
                created_at: fixtures::ts(i as i64),
                updated_at: fixtures::ts(i as i64),
                deleted_at: None,
            });
        }

        let bytes = codec::to_bytes(&snapshot).unwrap();
        let decoded = codec::decode::<CrdbModels>(&bytes).unwrap();
        prop_assert_eq!(&decoded, &snapshot);
        prop_assert_eq!(codec::to_bytes(&decoded).unwrap(), bytes);
    }
}
