//! Refinement: splitting the preliminary subtrees along the alpha edges.
//!
//! For every leaf `v` the maximal subtrees whose leaves all lie in alpha(v)
//! are grouped and lifted apart from their siblings, and the affected nodes
//! pick up split marks that the promotion phase turns into actual moves.
//! Marks must reach a moved node before its ancestors, and the per-direction
//! child counters stay in sync whenever a node changes parents.

use tracing::instrument;

use crate::compute::{node_of, ComputeNode, Operation, Side, SIDES};
use crate::forest::Forest;
use crate::index::{NodeId, VertexId};

#[instrument(skip_all)]
pub(crate) fn refine(forest: &mut Forest<ComputeNode>, alpha: &[Vec<NodeId>], problem: NodeId, leaves: &[NodeId]) {
    number_by_comp(forest, problem);
    number_by_tree(forest, problem);

    let pivot = forest[problem].data.vertex.expect("a reduced problem has its pivot recorded");
    for &v in leaves {
        refine_with(forest, alpha, VertexId::new(v.index()), pivot);
    }
}

/// Numbers the co-components left of the pivot and the components right of
/// it. The implicit operation joining a subtree root to the pivot flips from
/// SERIES to PARALLEL at the pivot; a root that matches the implicit
/// operation contributes one number per child.
fn number_by_comp(forest: &mut Forest<ComputeNode>, problem: NodeId) {
    let mut comp_number = 0;
    let pivot = forest[problem].data.vertex.map(node_of);
    let mut op = Operation::Series;

    for c in forest.children(problem).collect::<Vec<_>>() {
        if Some(c) == pivot {
            op = Operation::Parallel;
        }

        if forest[c].data.op == op && forest[c].data.is_operation_node() {
            for x in forest.children(c).collect::<Vec<_>>() {
                for y in forest.dfs_reverse_preorder_nodes(x) {
                    forest[y].data.comp_number = Some(comp_number);
                }
                comp_number += 1;
            }
        } else {
            for y in forest.dfs_reverse_preorder_nodes(c) {
                forest[y].data.comp_number = Some(comp_number);
            }
            comp_number += 1;
        }
    }
}

fn number_by_tree(forest: &mut Forest<ComputeNode>, problem: NodeId) {
    let mut tree_number = 0;
    for c in forest.children(problem).collect::<Vec<_>>() {
        for y in forest.dfs_reverse_preorder_nodes(c) {
            forest[y].data.tree_number = Some(tree_number);
        }
        tree_number += 1;
    }
}

/// A node whose parent is not an operation node roots one of the preliminary
/// trees.
fn is_root_operator(forest: &Forest<ComputeNode>, index: NodeId) -> bool {
    match forest[index].parent {
        None => true,
        Some(parent) => !forest[parent].data.is_operation_node(),
    }
}

/// Marks `index` and, when recursing into a PRIME node, all its children.
/// The parent's per-direction counter tracks every newly marked child; a
/// fully counted PRIME node is skipped without touching its children.
fn add_split_mark(forest: &mut Forest<ComputeNode>, index: NodeId, side: Side, should_recurse: bool) {
    if !forest[index].data.is_split_marked(side) {
        let parent = forest[index].parent.expect("split marks only reach nodes below a problem");
        if forest[parent].data.is_operation_node() {
            forest[parent].data.increment_num_split_children(side);
        }
        forest[index].data.set_split_mark(side);
    }

    if !should_recurse || forest[index].data.op != Operation::Prime {
        return;
    }
    if forest[index].number_of_children() == forest[index].data.num_split_children(side) {
        return;
    }

    let mut child = forest[index].first_child;
    while let Some(c) = child {
        if !forest[c].data.is_split_marked(side) {
            forest[index].data.increment_num_split_children(side);
            forest[c].data.set_split_mark(side);
        }
        child = forest[c].right;
    }
}

/// Propagates a split mark to the ancestors of `index`, stopping at the
/// problem node or at the first ancestor that already carries the mark.
fn mark_ancestors_by_split(forest: &mut Forest<ComputeNode>, index: NodeId, side: Side) {
    let mut current = forest[index].parent;
    loop {
        let p = current.expect("the walk stops at the problem node");
        if forest[p].data.is_problem_node() {
            break;
        }
        let already_marked = forest[p].data.is_split_marked(side);
        add_split_mark(forest, p, side, true);
        if already_marked {
            break;
        }
        current = forest[p].parent;
    }
}

fn is_parent_fully_charged(forest: &Forest<ComputeNode>, index: NodeId) -> bool {
    if is_root_operator(forest, index) {
        return false;
    }
    let parent = forest[index].parent.expect("non-roots have a parent");
    forest[parent].number_of_children() == forest[parent].data.number_of_marks()
}

/// Finds the maximal subtrees whose leaves all belong to `leaves`, by
/// charging: each listed leaf charges its parent, a parent charged once per
/// child is fully charged and charges its own parent in turn. The maximal
/// subtrees are the fully charged nodes without a fully charged parent.
fn get_max_subtrees(forest: &mut Forest<ComputeNode>, leaves: &[NodeId]) -> Vec<NodeId> {
    let mut fully_charged: Vec<NodeId> = leaves.to_vec();
    let mut charged: Vec<NodeId> = vec![];

    let mut i = 0;
    while i < fully_charged.len() {
        let x = fully_charged[i];
        i += 1;
        if is_root_operator(forest, x) {
            continue;
        }

        let parent = forest[x].parent.expect("non-roots have a parent");
        if !forest[parent].data.is_marked() {
            charged.push(parent);
        }
        forest[parent].data.add_mark();

        if forest[parent].data.number_of_marks() == forest[parent].number_of_children() {
            fully_charged.push(parent);
        }
    }

    let result = fully_charged.into_iter().filter(|&x| !is_parent_fully_charged(forest, x)).collect();
    for x in charged {
        forest[x].data.clear_marks();
    }
    result
}

/// Classifies the maximal subtrees into tree roots, single marked children
/// and sibling groups; the latter are gathered under a replica of their
/// parent. Returns each group with a flag telling whether it became a fresh
/// PRIME node.
fn group_sibling_nodes(forest: &mut Forest<ComputeNode>, nodes: &[NodeId]) -> Vec<(NodeId, bool)> {
    let mut parents: Vec<NodeId> = vec![];
    let mut groups: Vec<(NodeId, bool)> = vec![];

    for &node in nodes {
        if is_root_operator(forest, node) {
            groups.push((node, false));
        } else {
            forest.make_first_child(node);
            let parent = forest[node].parent.expect("non-roots have a parent");
            if !forest[parent].data.is_marked() {
                parents.push(parent);
            }
            forest[parent].data.add_mark();
        }
    }

    for parent in parents {
        let num_marks = forest[parent].data.number_of_marks();

        if num_marks == 1 {
            let only = forest[parent].first_child.expect("a marked parent keeps its children");
            groups.push((only, false));
        } else {
            // gather the marked children, now leading the sibling chain,
            // under a replica of the parent
            let group = forest.create(forest[parent].data.replica());
            for side in SIDES {
                if forest[group].data.is_split_marked(side) {
                    forest[parent].data.increment_num_split_children(side);
                }
            }

            let mut child = forest[parent].first_child;
            for _ in 0..num_marks {
                let c = child.expect("the marked children lead the chain");
                child = forest[c].right;
                forest.move_to(c, group);

                for side in SIDES {
                    if forest[c].data.is_split_marked(side) {
                        forest[parent].data.decrement_num_split_children(side);
                        forest[group].data.increment_num_split_children(side);
                    }
                }
            }
            forest.move_to(group, parent);

            groups.push((group, forest[group].data.op == Operation::Prime));
        }
        forest[parent].data.clear_marks();
    }

    groups
}

/// Subtrees left of the pivot or right of the refiner move left, the rest
/// move right.
fn get_split_type(forest: &Forest<ComputeNode>, index: NodeId, refiner: VertexId, pivot: VertexId) -> Side {
    let pivot_tn = forest[node_of(pivot)].data.tree_number;
    let refiner_tn = forest[node_of(refiner)].data.tree_number;
    let current = forest[index].data.tree_number;
    if current < pivot_tn || refiner_tn < current {
        Side::Left
    } else {
        Side::Right
    }
}

fn refine_one_node(forest: &mut Forest<ComputeNode>, index: NodeId, side: Side, new_prime: bool) {
    if is_root_operator(forest, index) {
        return;
    }

    let parent = forest[index].parent.expect("non-roots have a parent");
    let mut new_sibling = None;

    if is_root_operator(forest, parent) {
        // parent roots a preliminary tree; lift the group out of it
        match side {
            Side::Left => forest.move_before(index, parent),
            Side::Right => forest.move_after(index, parent),
        }
        for s in SIDES {
            if forest[index].data.is_split_marked(s) {
                forest[parent].data.decrement_num_split_children(s);
            }
        }

        new_sibling = Some(parent);

        if forest[parent].has_only_one_child() {
            forest.replace_by_children(parent);
            forest.remove(parent);
            new_sibling = None;
        }
    } else if forest[parent].data.op != Operation::Prime {
        // split the degenerate parent in two
        let replacement = forest.create(forest[parent].data.replica());
        forest.replace(parent, replacement);
        forest.move_to(index, replacement);
        forest.move_to(parent, replacement);

        new_sibling = Some(parent);

        for s in SIDES {
            if forest[index].data.is_split_marked(s) {
                forest[parent].data.decrement_num_split_children(s);
                forest[replacement].data.increment_num_split_children(s);
            }
            if forest[parent].data.is_split_marked(s) {
                forest[replacement].data.increment_num_split_children(s);
            }
        }
    }

    add_split_mark(forest, index, side, new_prime);
    mark_ancestors_by_split(forest, index, side);

    if let Some(new_sibling) = new_sibling {
        add_split_mark(forest, new_sibling, side, true);
    }
}

fn refine_with(forest: &mut Forest<ComputeNode>, alpha: &[Vec<NodeId>], refiner: VertexId, pivot: VertexId) {
    let subtree_roots = get_max_subtrees(forest, &alpha[refiner.index()]);
    let groups = group_sibling_nodes(forest, &subtree_roots);

    for (index, new_prime) in groups {
        let side = get_split_type(forest, index, refiner, pivot);
        refine_one_node(forest, index, side, new_prime);
    }
}
