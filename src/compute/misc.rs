//! Reduction plumbing around the three main phases.

use crate::compute::{ComputeNode, Operation};
use crate::forest::Forest;
use crate::index::NodeId;
use crate::set::FastSet;

/// Detaches the tree of the trailing unconnected layer, if any. Vertices
/// without a path to the pivot gather there; their finished tree is
/// reattached by [`merge_components`] after the main reduction.
pub(crate) fn remove_extra_components(forest: &mut Forest<ComputeNode>, problem: NodeId) -> Option<NodeId> {
    let mut subproblem = forest[problem].first_child;
    while let Some(sp) = subproblem {
        if !forest[sp].data.connected {
            break;
        }
        subproblem = forest[sp].right;
    }

    let subproblem = subproblem?;
    let components = forest[subproblem].first_child.expect("layers are never empty");
    forest.detach(components);
    forest.remove(subproblem);
    Some(components)
}

/// Replaces every layer by its finished tree. Each solved subproblem holds
/// exactly one child at this point.
pub(crate) fn remove_layers(forest: &mut Forest<ComputeNode>, problem: NodeId) {
    let mut child = forest[problem].first_child;
    while let Some(c) = child {
        let next = forest[c].right;
        debug_assert_eq!(forest[c].number_of_children(), 1);
        let tree = forest[c].first_child.expect("layers are never empty");
        forest.replace(c, tree);
        forest.remove(c);
        child = next;
    }
}

/// Makes the alpha lists of the given leaves symmetric and duplicate-free.
pub(crate) fn complete_alpha_lists(alpha: &mut [Vec<NodeId>], scratch: &mut FastSet, leaves: &[NodeId]) {
    for &v in leaves {
        for i in 0..alpha[v.index()].len() {
            let a = alpha[v.index()][i];
            debug_assert_ne!(a, v);
            alpha[a.index()].push(v);
        }
    }

    for &v in leaves {
        let list = &mut alpha[v.index()];
        scratch.clear();
        let mut i = 0;
        while i < list.len() {
            let a = list[i].index();
            if scratch.get(a) {
                list.swap_remove(i);
            } else {
                scratch.set(a);
                i += 1;
            }
        }
    }
}

/// Reattaches the detached extra components: the finished tree is spliced
/// into them when they already form a PARALLEL node, otherwise both go below
/// a fresh PARALLEL root.
pub(crate) fn merge_components(forest: &mut Forest<ComputeNode>, problem: NodeId, extra_components: Option<NodeId>) {
    let Some(new_components) = extra_components else {
        return;
    };

    let finished = forest[problem].first_child.expect("a reduced problem holds its tree");

    if forest[new_components].data.op == Operation::Parallel && forest[new_components].data.is_operation_node() {
        if forest[finished].data.op == Operation::Parallel && forest[finished].data.is_operation_node() {
            forest.add_children_from(new_components, finished);
        } else {
            forest.move_to(finished, new_components);
        }
        forest.move_to(new_components, problem);
    } else {
        let new_root = forest.create(ComputeNode::operation_node(Operation::Parallel));
        forest.move_to(new_root, problem);
        forest.move_to(new_components, new_root);
        forest.move_to(finished, new_root);
    }
}
