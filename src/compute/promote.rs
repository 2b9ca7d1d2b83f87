//! Promotion: turning split marks into actual moves.
//!
//! One sweep per direction, LEFT strictly before RIGHT. The forward pass
//! lifts every marked node next to its parent; the backward pass collapses
//! the operation nodes left childless or with a single child.

use tracing::instrument;

use crate::compute::{ComputeNode, Side};
use crate::forest::Forest;
use crate::index::NodeId;

fn promote_one_node(forest: &mut Forest<ComputeNode>, index: NodeId, side: Side) {
    if forest[index].is_leaf() {
        return;
    }

    // (entering, node) frames; an entering frame visits a node and queues its
    // right sibling, a leaving frame cleans up after the subtree
    let mut stack = vec![(false, index), (true, forest[index].first_child.expect("not a leaf"))];

    while let Some((entering, node)) = stack.pop() {
        if entering {
            if let Some(right) = forest[node].right {
                stack.push((true, right));
            }
            if forest[node].data.is_split_marked(side) {
                let parent = forest[node].parent.expect("promoted nodes sit below their tree root");
                match side {
                    Side::Left => forest.move_before(node, parent),
                    Side::Right => forest.move_after(node, parent),
                }
                if forest[node].has_child() {
                    stack.push((false, node));
                    stack.push((true, forest[node].first_child.expect("has a child")));
                }
            }
        } else if forest[node].is_leaf() && forest[node].data.is_operation_node() {
            forest.remove(node);
        } else if forest[node].has_only_one_child() {
            forest.replace_by_children(node);
            forest.remove(node);
        }
    }
}

fn promote_one_direction(forest: &mut Forest<ComputeNode>, problem: NodeId, side: Side) {
    for c in forest.children(problem).collect::<Vec<_>>() {
        promote_one_node(forest, c, side);
    }
}

#[instrument(skip_all)]
pub(crate) fn promote(forest: &mut Forest<ComputeNode>, problem: NodeId) {
    promote_one_direction(forest, problem, Side::Left);
    promote_one_direction(forest, problem, Side::Right);
}
