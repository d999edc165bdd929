#![allow(missing_docs)]

use nodebridge::model::{NodeKind, ParsedNode};
use nodebridge::rpc::walker::{walk_bfs, walk_preorder, WalkBounds};

/// A tree five levels deep with a hundred nodes total, matching spec §8
/// scenario 4 ("A tree of depth 5, 100 nodes").
fn hundred_node_tree() -> ParsedNode {
    fn build(id: &mut u32, depth: u32, max_depth: u32, fanout: u32, budget: &mut u32) -> ParsedNode {
        *id += 1;
        let mut node = ParsedNode::new(format!("1:{}", *id), format!("n{}", *id), NodeKind::Group);
        *budget -= 1;
        if depth < max_depth {
            for _ in 0..fanout {
                if *budget == 0 {
                    break;
                }
                node.children.push(build(id, depth + 1, max_depth, fanout, budget));
            }
        }
        node
    }
    let mut id = 0;
    let mut budget = 100;
    build(&mut id, 0, 5, 3, &mut budget)
}

#[test]
fn recursive_walk_bound_caps_at_max_nodes() {
    let tree = hundred_node_tree();
    let bounds = WalkBounds { max_depth: 10, max_nodes: 17 };
    let entries = walk_bfs(&tree, &bounds);
    assert_eq!(entries.len(), 17);
}

#[test]
fn recursive_walk_depth_bound_only_emits_nodes_at_or_below_the_limit() {
    let tree = hundred_node_tree();
    let bounds = WalkBounds { max_depth: 3, max_nodes: 1000 };
    let entries = walk_bfs(&tree, &bounds);
    assert!(entries.iter().all(|e| e.depth <= 3));
    // a depth-3 cutoff must exclude at least one node from the full 100-node tree
    assert!(entries.len() < 100);
}

#[test]
fn bfs_emits_nodes_in_level_order() {
    let tree = hundred_node_tree();
    let bounds = WalkBounds { max_depth: 10, max_nodes: 1000 };
    let entries = walk_bfs(&tree, &bounds);
    let depths: Vec<u32> = entries.iter().map(|e| e.depth).collect();
    let mut sorted = depths.clone();
    sorted.sort_unstable();
    assert_eq!(depths, sorted, "BFS must emit non-decreasing depths");
}

#[test]
fn every_frames_parent_id_was_emitted_by_an_earlier_frame() {
    let tree = hundred_node_tree();
    let bounds = WalkBounds { max_depth: 10, max_nodes: 1000 };
    let entries = walk_bfs(&tree, &bounds);
    let mut seen = std::collections::HashSet::new();
    seen.insert(tree.id.clone());
    for entry in &entries {
        if !entry.parent_id.is_empty() {
            assert!(
                seen.contains(&entry.parent_id),
                "parent {} of {} was not emitted earlier",
                entry.parent_id,
                entry.node.id
            );
        }
        seen.insert(entry.node.id.clone());
    }
}

#[test]
fn each_node_is_emitted_at_most_once_even_with_a_generous_bound() {
    let tree = hundred_node_tree();
    let bounds = WalkBounds { max_depth: 10, max_nodes: 10_000 };
    let entries = walk_bfs(&tree, &bounds);
    let mut ids: Vec<&str> = entries.iter().map(|e| e.node.id.as_str()).collect();
    let total = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert_eq!(total, tree.subtree_size());
}

#[test]
fn preorder_walk_respects_the_same_bounds_as_bfs() {
    let tree = hundred_node_tree();
    let bounds = WalkBounds { max_depth: 2, max_nodes: 5 };
    let entries = walk_preorder(&tree, &bounds);
    assert!(entries.len() <= 5);
    assert!(entries.iter().all(|e| e.depth <= 2));
}
