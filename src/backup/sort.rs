//! Parent-before-child ordering for self-referential rows.
//!
//! Every node has at most one parent, so the depth-first walk from a node is
//! a walk up its parent chain. Nodes on the chain being walked are marked
//! in progress; reaching one of them again is a cycle. The walk is iterative,
//! so chain depth is bounded only by memory.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use crate::error::{Result, SnapError};
use crate::models::{EntityId, Group};

/// A row plus the ids that order it.
#[derive(Debug, Clone, PartialEq)]
pub struct SortableNode<I, T> {
    pub id: I,
    pub parent: Option<I>,
    pub row: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Placed,
}

/// Order `nodes` so every parent present in the input precedes its children.
///
/// Parents that are not in the input are ignored. Any cycle fails the whole
/// sort with the ids on the cycle, first id repeated at the end.
pub fn sort<I, T>(nodes: Vec<SortableNode<I, T>>) -> Result<Vec<SortableNode<I, T>>>
where
    I: Eq + Hash + Display,
{
    let mut index: HashMap<&I, usize> = HashMap::with_capacity(nodes.len());
    for (i, node) in nodes.iter().enumerate() {
        index.entry(&node.id).or_insert(i);
    }

    let mut marks = vec![Mark::Unvisited; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());
    let mut path = Vec::new();

    for start in 0..nodes.len() {
        let mut current = Some(start);
        while let Some(i) = current {
            match marks[i] {
                Mark::Placed => break,
                Mark::InProgress => {
                    let from = path.iter().position(|&j| j == i).unwrap_or(0);
                    let cycle = path[from..]
                        .iter()
                        .chain(std::iter::once(&i))
                        .map(|&j| nodes[j].id.to_string())
                        .collect();
                    return Err(SnapError::CycleDetected { cycle });
                }
                Mark::Unvisited => {
                    marks[i] = Mark::InProgress;
                    path.push(i);
                    current = nodes[i]
                        .parent
                        .as_ref()
                        .and_then(|parent| index.get(parent).copied());
                }
            }
        }
        // The path runs child to ancestor; place ancestors first.
        for &i in path.iter().rev() {
            marks[i] = Mark::Placed;
            order.push(i);
        }
        path.clear();
    }

    drop(index);
    let mut slots: Vec<Option<SortableNode<I, T>>> = nodes.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

/// Sort groups so every approver group precedes the groups it approves for.
pub fn sort_groups<I: EntityId>(groups: Vec<Group<I>>) -> Result<Vec<Group<I>>> {
    let nodes = groups
        .into_iter()
        .map(|group| SortableNode {
            id: group.id.clone(),
            parent: group.approver_group_id.clone(),
            row: group,
        })
        .collect();
    Ok(sort(nodes)?.into_iter().map(|node| node.row).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &'static str, parent: Option<&'static str>) -> SortableNode<&'static str, ()> {
        SortableNode { id, parent, row: () }
    }

    fn ids(nodes: &[SortableNode<&'static str, ()>]) -> Vec<&'static str> {
        nodes.iter().map(|n| n.id).collect()
    }

    #[test]
    fn chain_sorts_parents_first() {
        let sorted = sort(vec![
            node("C", Some("B")),
            node("A", None),
            node("B", Some("A")),
        ])
        .unwrap();
        assert_eq!(ids(&sorted), vec!["A", "B", "C"]);
    }

    #[test]
    fn already_ordered_input_is_unchanged() {
        let input = vec![node("A", None), node("B", Some("A")), node("C", Some("B"))];
        assert_eq!(ids(&sort(input).unwrap()), vec!["A", "B", "C"]);
    }

    #[test]
    fn two_cycle_fails() {
        let err = sort(vec![node("A", Some("B")), node("B", Some("A"))]).unwrap_err();
        match err {
            SnapError::CycleDetected { cycle } => assert_eq!(cycle, vec!["A", "B", "A"]),
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let err = sort(vec![node("A", Some("A"))]).unwrap_err();
        assert!(matches!(err, SnapError::CycleDetected { cycle } if cycle == vec!["A", "A"]));
    }

    #[test]
    fn cycle_fails_unrelated_nodes_too() {
        let result = sort(vec![
            node("root", None),
            node("leaf", Some("root")),
            node("X", Some("Y")),
            node("Y", Some("Z")),
            node("Z", Some("X")),
        ]);
        assert!(matches!(result, Err(SnapError::CycleDetected { .. })));
    }

    #[test]
    fn absent_parent_is_ignored() {
        let sorted = sort(vec![node("B", Some("ghost")), node("A", None)]).unwrap();
        assert_eq!(ids(&sorted), vec!["B", "A"]);
    }

    #[test]
    fn deep_chain_does_not_overflow() {
        let depth = 100_000_i64;
        let nodes: Vec<SortableNode<i64, ()>> = (0..depth)
            .rev()
            .map(|id| SortableNode {
                id,
                parent: (id > 0).then(|| id - 1),
                row: (),
            })
            .collect();
        let sorted = sort(nodes).unwrap();
        assert!(sorted.iter().map(|n| n.id).eq(0..depth));
    }

    #[test]
    fn empty_input_sorts_to_empty() {
        let sorted = sort(Vec::<SortableNode<i64, ()>>::new()).unwrap();
        assert!(sorted.is_empty());
    }
}
