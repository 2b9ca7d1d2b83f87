//! Assembly: reading the modules off the factorizing permutation.
//!
//! After promotion the children of the problem node form a factorizing
//! permutation around the pivot. Flag vectors and mu values drive the
//! delineation of module boundaries; a spine of fresh operation nodes then
//! stacks the modules from the pivot outwards.

use std::collections::VecDeque;

use tracing::instrument;

use crate::compute::{node_of, ComputeNode, Operation};
use crate::forest::Forest;
use crate::index::NodeId;
use crate::set::FastSet;

/// `true` at `i` left of the pivot when elements `i-1` and `i` belong to the
/// same co-component.
fn left_cocomp_fragments(forest: &Forest<ComputeNode>, ps: &[NodeId], pivot_index: usize) -> Vec<bool> {
    let mut flags = vec![false; ps.len()];
    for i in 1..pivot_index {
        flags[i] = forest[ps[i]].data.comp_number.is_some()
            && forest[ps[i - 1]].data.comp_number == forest[ps[i]].data.comp_number;
    }
    flags
}

/// `true` at `i` right of the pivot when elements `i` and `i+1` belong to the
/// same component.
fn right_comp_fragments(forest: &Forest<ComputeNode>, ps: &[NodeId], pivot_index: usize) -> Vec<bool> {
    let mut flags = vec![false; ps.len()];
    for i in pivot_index + 1..ps.len().saturating_sub(1) {
        flags[i] = forest[ps[i]].data.comp_number.is_some()
            && forest[ps[i]].data.comp_number == forest[ps[i + 1]].data.comp_number;
    }
    flags
}

/// `true` at `i` right of the pivot when some leaf below element `i` keeps an
/// alpha edge into a later layer.
fn right_layer_neighbor(
    forest: &Forest<ComputeNode>,
    alpha: &[Vec<NodeId>],
    ps: &[NodeId],
    pivot_index: usize,
) -> Vec<bool> {
    let mut flags = vec![false; ps.len()];
    for i in pivot_index + 1..ps.len() {
        let tree_number = forest[ps[i]].data.tree_number;
        'leaves: for leaf in forest.leaves(ps[i]) {
            for &a in &alpha[leaf.index()] {
                if forest[a].data.tree_number > tree_number {
                    flags[i] = true;
                    break 'leaves;
                }
            }
        }
    }
    flags
}

/// For every element left of the pivot, the distinct elements its alpha edges
/// reach. Leaf comp numbers are reassigned to element indices first. An
/// element can reach at most the pivot and everything right of it, so the
/// scan stops early once that many are found.
fn fact_perm_edges(
    forest: &mut Forest<ComputeNode>,
    alpha: &[Vec<NodeId>],
    ps: &[NodeId],
    pivot_index: usize,
    scratch: &mut FastSet,
    neighbors: &mut [Vec<u32>],
) {
    let k = ps.len();
    for list in neighbors.iter_mut() {
        list.clear();
    }

    let mut left_leaves: Vec<Vec<NodeId>> = vec![vec![]; pivot_index];
    for (i, &p) in ps.iter().enumerate() {
        let leaves = forest.leaves(p);
        for &leaf in &leaves {
            forest[leaf].data.comp_number = Some(i as u32);
        }
        if i < pivot_index {
            left_leaves[i] = leaves;
        }
    }

    for i in 0..pivot_index {
        scratch.clear();
        'element: for &leaf in &left_leaves[i] {
            for &a in &alpha[leaf.index()] {
                let j = forest[a].data.comp_number.expect("leaves were renumbered") as usize;
                if !scratch.get(j) {
                    scratch.set(j);
                    neighbors[i].push(j as u32);
                    if neighbors[i].len() == k - pivot_index {
                        break 'element;
                    }
                }
            }
        }
    }
}

/// `mu[i]` bounds how far the module starting at element `i` must reach
/// across the pivot; determined entirely by the edges of the left elements.
fn compute_mu(ps: &[NodeId], pivot_index: usize, neighbors: &[Vec<u32>]) -> Vec<usize> {
    let k = ps.len();
    let mut mu: Vec<usize> = (0..k).map(|i| if i < pivot_index { pivot_index } else { 0 }).collect();

    for i in 0..pivot_index {
        for &j in &neighbors[i] {
            let j = j as usize;
            // a left element universal to everything up to i and adjacent to
            // i as well pushes its bound one further
            if mu[j] == i {
                mu[j] = i + 1;
            }
            if j > mu[i] {
                mu[i] = j;
            }
        }
    }
    mu
}

struct Delineate {
    lb: isize,
    rb: usize,
    left_last_in: usize,
    right_last_in: usize,
}

fn compose_series(lcocomp: &[bool], mu: &[usize], st: &mut Delineate) -> bool {
    let mut absorbed = false;
    while st.lb >= 0 && mu[st.lb as usize] <= st.right_last_in && !lcocomp[st.lb as usize] {
        absorbed = true;
        st.left_last_in = st.lb as usize;
        st.lb -= 1;
    }
    absorbed
}

fn compose_parallel(rcomp: &[bool], rlayer: &[bool], mu: &[usize], st: &mut Delineate) -> bool {
    let mut absorbed = false;
    while st.rb < rcomp.len() && st.left_last_in <= mu[st.rb] && !rcomp[st.rb] && !rlayer[st.rb] {
        absorbed = true;
        st.right_last_in = st.rb;
        st.rb += 1;
    }
    absorbed
}

/// Alternately absorbs whole co-component blocks on the left and component
/// blocks on the right. Returns `true` when an absorbed right element still
/// has an edge into a later layer; the module then spans the entire problem.
fn compose_prime(lcocomp: &[bool], rcomp: &[bool], rlayer: &[bool], mu: &[usize], st: &mut Delineate) -> bool {
    let mut left_queue = VecDeque::new();
    let mut right_queue = VecDeque::new();

    loop {
        left_queue.push_back(st.lb as usize);
        st.left_last_in = st.lb as usize;
        st.lb -= 1;
        if !lcocomp[st.left_last_in] {
            break;
        }
    }

    while !(left_queue.is_empty() && right_queue.is_empty()) {
        while let Some(current_left) = left_queue.pop_front() {
            while st.right_last_in < mu[current_left] {
                loop {
                    right_queue.push_back(st.rb);
                    st.right_last_in = st.rb;
                    st.rb += 1;
                    if rlayer[st.right_last_in] {
                        return true;
                    }
                    if !rcomp[st.right_last_in] {
                        break;
                    }
                }
            }
        }
        while let Some(current_right) = right_queue.pop_front() {
            while mu[current_right] < st.left_last_in {
                loop {
                    left_queue.push_back(st.lb as usize);
                    st.left_last_in = st.lb as usize;
                    st.lb -= 1;
                    if !lcocomp[st.left_last_in] {
                        break;
                    }
                }
            }
        }
    }
    false
}

/// Finds the nested module boundaries around the pivot.
fn delineate(
    pivot_index: usize,
    lcocomp: &[bool],
    rcomp: &[bool],
    rlayer: &[bool],
    mu: &[usize],
) -> Vec<(usize, usize)> {
    let k = lcocomp.len();
    let mut boundaries = vec![];

    let mut st = Delineate {
        lb: pivot_index as isize - 1,
        rb: pivot_index + 1,
        left_last_in: pivot_index,
        right_last_in: pivot_index,
    };

    while st.lb >= 0 && st.rb < k {
        if !compose_series(lcocomp, mu, &mut st)
            && !compose_parallel(rcomp, rlayer, mu, &mut st)
            && compose_prime(lcocomp, rcomp, rlayer, mu, &mut st)
        {
            // an absorbed element reaches into a later layer; the only module
            // containing it is the whole problem
            st.left_last_in = 0;
            st.right_last_in = k - 1;
            st.lb = -1;
            st.rb = k;
        }
        boundaries.push((st.left_last_in, st.right_last_in));
    }
    boundaries
}

/// Stacks the modules outward from the pivot along a spine of fresh nodes.
fn assemble_tree(
    forest: &mut Forest<ComputeNode>,
    ps: &[NodeId],
    pivot_index: usize,
    boundaries: &[(usize, usize)],
) -> NodeId {
    let k = ps.len();
    let mut lb = pivot_index as isize - 1;
    let mut rb = pivot_index + 1;
    let mut last_module = ps[pivot_index];

    let mut i = 0;
    while lb >= 0 || rb < k {
        let (lbound, rbound) = boundaries.get(i).copied().unwrap_or((0, k - 1));
        i += 1;

        let new_module = forest.create(ComputeNode::operation_node(Operation::Prime));
        forest.move_to(last_module, new_module);

        let mut added_left = false;
        let mut added_right = false;

        while lb >= lbound as isize {
            added_left = true;
            forest.move_to(ps[lb as usize], new_module);
            lb -= 1;
        }
        while rb <= rbound {
            added_right = true;
            forest.move_to(ps[rb], new_module);
            rb += 1;
        }

        forest[new_module].data.op = match (added_left, added_right) {
            (true, true) => Operation::Prime,
            (true, false) => Operation::Series,
            _ => Operation::Parallel,
        };
        last_module = new_module;
    }
    last_module
}

/// Splices out non-PRIME nodes that repeat their parent's operation.
fn remove_degenerate_duplicates(forest: &mut Forest<ComputeNode>, index: NodeId) {
    let order = forest.bfs_nodes(index);

    for &it in order.iter().rev() {
        if it == index {
            break;
        }
        let parent = forest[it].parent.expect("bfs nodes below the root have parents");
        if forest[it].data.is_operation_node()
            && forest[it].data.op == forest[parent].data.op
            && forest[it].data.op != Operation::Prime
        {
            forest.replace_by_children(it);
            forest.remove(it);
        }
    }
}

#[instrument(skip_all)]
pub(crate) fn assemble(
    forest: &mut Forest<ComputeNode>,
    alpha: &[Vec<NodeId>],
    problem: NodeId,
    fp_neighbors: &mut [Vec<u32>],
    scratch: &mut FastSet,
) {
    debug_assert!(!forest[problem].is_leaf());

    let pivot = forest[problem].data.vertex.expect("a reduced problem has its pivot recorded");
    let pivot_node = node_of(pivot);

    let mut ps = vec![];
    let mut pivot_index = None;
    for p in forest.children(problem) {
        if p == pivot_node {
            pivot_index = Some(ps.len());
        }
        ps.push(p);
    }
    let pivot_index = pivot_index.expect("the pivot is a direct child of its problem");

    let lcocomp = left_cocomp_fragments(forest, &ps, pivot_index);
    let rcomp = right_comp_fragments(forest, &ps, pivot_index);
    let rlayer = right_layer_neighbor(forest, alpha, &ps, pivot_index);

    fact_perm_edges(forest, alpha, &ps, pivot_index, scratch, fp_neighbors);
    let mu = compute_mu(&ps, pivot_index, fp_neighbors);

    let boundaries = delineate(pivot_index, &lcocomp, &rcomp, &rlayer, &mu);
    let root = assemble_tree(forest, &ps, pivot_index, &boundaries);
    remove_degenerate_duplicates(forest, root);

    forest.replace_children(problem, root);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mu_values_follow_the_edges() {
        // three elements left of the pivot at 3, two right of it
        let ps: Vec<NodeId> = (0..6).map(NodeId::new).collect();
        let neighbors: Vec<Vec<u32>> = vec![vec![3], vec![3, 4], vec![3, 4, 5], vec![], vec![], vec![]];

        let mu = compute_mu(&ps, 3, &neighbors);
        // each left element is pushed to the furthest right element it
        // reaches; the pivot bound advances once per universal left element
        assert_eq!(mu, vec![3, 4, 5, 3, 0, 0]);
    }

    #[test]
    fn series_modules_absorb_left_elements() {
        // both left elements are joined to the pivot and see nothing beyond
        let lcocomp = vec![false; 4];
        let rcomp = vec![false; 4];
        let rlayer = vec![false; 4];
        let mu = vec![2, 2, 0, 0];

        let boundaries = delineate(2, &lcocomp, &rcomp, &rlayer, &mu);
        assert_eq!(boundaries, vec![(0, 2)]);
    }

    #[test]
    fn parallel_modules_absorb_right_elements() {
        // the left element reaches past the first right element
        let lcocomp = vec![false; 3];
        let rcomp = vec![false; 3];
        let rlayer = vec![false; 3];
        let mu = vec![2, 0, 1];

        let boundaries = delineate(1, &lcocomp, &rcomp, &rlayer, &mu);
        assert_eq!(boundaries, vec![(1, 2)]);
    }

    #[test]
    fn prime_modules_absorb_both_sides() {
        // neither side can be absorbed alone
        let lcocomp = vec![false; 3];
        let rcomp = vec![false; 3];
        let rlayer = vec![false; 3];
        let mu = vec![2, 0, 0];

        let boundaries = delineate(1, &lcocomp, &rcomp, &rlayer, &mu);
        assert_eq!(boundaries, vec![(0, 2)]);
    }

    #[test]
    fn layer_edges_force_the_whole_problem() {
        // the absorbed right element keeps an edge into a later layer
        let lcocomp = vec![false; 3];
        let rcomp = vec![false; 3];
        let rlayer = vec![false, false, true];
        let mu = vec![2, 0, 1];

        let boundaries = delineate(1, &lcocomp, &rcomp, &rlayer, &mu);
        assert_eq!(boundaries, vec![(0, 2)]);
    }
}
