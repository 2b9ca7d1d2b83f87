//! The decomposition pipeline.
//!
//! A single [`Forest`] of [`ComputeNode`]s holds the whole computation state:
//! vertex leaves, problem nodes (the recursion made explicit) and the
//! operation nodes of the tree under construction. The driver loop either
//! dives into an unexplored subproblem by pivoting, or reduces a finished one
//! with refine → promote → assemble.

mod assemble;
mod misc;
mod pivot;
mod promote;
mod refine;

use std::fmt::{Display, Formatter};

use tracing::{info, instrument, trace};

use crate::forest::Forest;
use crate::graph::Graph;
use crate::index::{NodeId, VertexId};
use crate::set::FastSet;

use self::assemble::assemble;
use self::misc::{complete_alpha_lists, merge_components, remove_extra_components, remove_layers};
use self::pivot::{do_pivot, process_neighbors};
use self::promote::promote;
use self::refine::refine;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum NodeKind {
    Vertex,
    Operation,
    Problem,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Operation {
    Prime,
    Series,
    Parallel,
}

/// Promotion side of a split mark.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Side {
    Left,
    Right,
}

pub(crate) const SIDES: [Side; 2] = [Side::Left, Side::Right];

impl Side {
    fn index(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

/// Split state of a node. `Mixed` is terminal: a node marked from both sides
/// is not promoted but still propagates marks upward.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub(crate) enum Split {
    #[default]
    None,
    Left,
    Right,
    Mixed,
}

impl From<Side> for Split {
    fn from(side: Side) -> Self {
        match side {
            Side::Left => Split::Left,
            Side::Right => Split::Right,
        }
    }
}

/// Per-node state of the computation. Vertex, operation and problem nodes
/// share this record and readers branch on `kind`.
#[derive(Clone)]
pub(crate) struct ComputeNode {
    pub(crate) kind: NodeKind,
    pub(crate) op: Operation,
    pub(crate) split: Split,
    /// The graph vertex for vertex nodes; the chosen pivot for problem nodes.
    pub(crate) vertex: Option<VertexId>,
    pub(crate) comp_number: Option<u32>,
    pub(crate) tree_number: Option<u32>,
    num_marks: u32,
    num_split_children: [u32; 2],
    pub(crate) active: bool,
    /// For problem nodes: this layer has edges into the layer to its left.
    pub(crate) connected: bool,
}

impl ComputeNode {
    fn new(kind: NodeKind) -> Self {
        ComputeNode {
            kind,
            op: Operation::Prime,
            split: Split::None,
            vertex: None,
            comp_number: None,
            tree_number: None,
            num_marks: 0,
            num_split_children: [0, 0],
            active: false,
            connected: false,
        }
    }

    pub(crate) fn vertex_node(vertex: VertexId) -> Self {
        ComputeNode { vertex: Some(vertex), ..Self::new(NodeKind::Vertex) }
    }

    pub(crate) fn operation_node(op: Operation) -> Self {
        ComputeNode { op, ..Self::new(NodeKind::Operation) }
    }

    pub(crate) fn problem_node(connected: bool) -> Self {
        ComputeNode { connected, ..Self::new(NodeKind::Problem) }
    }

    /// Copy for a node that takes this node's place or groups some of its
    /// children. Marks and split-child counters start at zero; the new node
    /// has different children than the original.
    pub(crate) fn replica(&self) -> Self {
        ComputeNode { num_marks: 0, num_split_children: [0, 0], ..self.clone() }
    }

    pub(crate) fn is_vertex_node(&self) -> bool {
        self.kind == NodeKind::Vertex
    }
    pub(crate) fn is_operation_node(&self) -> bool {
        self.kind == NodeKind::Operation
    }
    pub(crate) fn is_problem_node(&self) -> bool {
        self.kind == NodeKind::Problem
    }

    fn is_marked(&self) -> bool {
        self.num_marks > 0
    }
    fn add_mark(&mut self) {
        self.num_marks += 1;
    }
    fn number_of_marks(&self) -> u32 {
        self.num_marks
    }
    fn clear_marks(&mut self) {
        self.num_marks = 0;
    }

    fn is_split_marked(&self, side: Side) -> bool {
        self.split == Split::Mixed || self.split == Split::from(side)
    }

    fn set_split_mark(&mut self, side: Side) {
        let mark = Split::from(side);
        if self.split == Split::None {
            self.split = mark;
        } else if self.split != mark {
            self.split = Split::Mixed;
        }
    }

    fn increment_num_split_children(&mut self, side: Side) {
        self.num_split_children[side.index()] += 1;
    }

    fn decrement_num_split_children(&mut self, side: Side) {
        self.num_split_children[side.index()] -= 1;
    }

    fn num_split_children(&self, side: Side) -> u32 {
        self.num_split_children[side.index()]
    }

    /// Resets everything a reduction leaves behind; `active` and `connected`
    /// only matter for problem nodes, which are gone by then.
    fn clear(&mut self) {
        self.comp_number = None;
        self.tree_number = None;
        self.split = Split::None;
        self.num_marks = 0;
        self.num_split_children = [0, 0];
    }
}

impl Display for ComputeNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            NodeKind::Vertex => write!(f, "{}", self.vertex.expect("vertex nodes carry a vertex")),
            NodeKind::Operation => match self.op {
                Operation::Prime => write!(f, "P"),
                Operation::Series => write!(f, "J"),
                Operation::Parallel => write!(f, "U"),
            },
            NodeKind::Problem => match self.vertex {
                Some(pivot) => write!(f, "C{pivot}"),
                None => write!(f, "C-"),
            },
        }
    }
}

pub(crate) fn node_of(vertex: VertexId) -> NodeId {
    // vertex leaves occupy the first n arena slots and are never removed
    NodeId::new(vertex.index())
}

/// Runs the decomposition. Returns the compute forest and the handle of the
/// finished tree's root, `None` for the null graph.
pub(crate) fn compute(graph: &Graph) -> (Forest<ComputeNode>, Option<NodeId>) {
    let n = graph.number_of_nodes();
    let mut forest = Forest::with_capacity(2 * n + 1);
    if n == 0 {
        return (forest, None);
    }

    for u in graph.vertices() {
        forest.create(ComputeNode::vertex_node(u));
    }
    let main_problem = forest.create(ComputeNode::problem_node(false));
    for u in graph.vertices().rev() {
        forest.move_to(node_of(u), main_problem);
    }

    let root = solve(graph, &mut forest, main_problem);
    info!(number_of_nodes = forest.size(), "computed modular decomposition");
    (forest, Some(root))
}

#[instrument(skip_all)]
fn solve(graph: &Graph, forest: &mut Forest<ComputeNode>, main_problem: NodeId) -> NodeId {
    let n = graph.number_of_nodes();
    let mut alpha: Vec<Vec<NodeId>> = vec![vec![]; n];
    let mut fp_neighbors: Vec<Vec<u32>> = vec![vec![]; n];
    let mut visited = vec![false; n];
    let mut scratch = FastSet::new(n);

    let mut current = Some(main_problem);
    let mut result = main_problem;

    while let Some(problem) = forest.as_valid(current) {
        trace!(problem = %forest.format_subtree(Some(problem)));

        forest[problem].data.active = true;
        let first = forest[problem].first_child.expect("a problem node holds at least one node");

        if !forest[first].data.is_problem_node() {
            // subproblems below have not been explored yet
            visited[first.index()] = true;
            let pivot = VertexId::new(first.index());

            if forest[problem].has_only_one_child() {
                process_neighbors(graph, forest, &mut alpha, &visited, pivot, problem, None);
            } else {
                let pivoted = do_pivot(graph, forest, &mut alpha, &visited, problem, pivot);
                current = forest[pivoted].first_child;
                continue;
            }
        } else {
            // all subproblems solved; reduce this one
            let extra_components = remove_extra_components(forest, problem);
            remove_layers(forest, problem);

            let leaves = forest.leaves(problem);
            complete_alpha_lists(&mut alpha, &mut scratch, &leaves);

            refine(forest, &alpha, problem, &leaves);
            promote(forest, problem);
            assemble(forest, &alpha, problem, &mut fp_neighbors, &mut scratch);

            let root = forest[problem].first_child.expect("assembly leaves a single tree");
            for c in forest.dfs_reverse_preorder_nodes(root) {
                if forest[c].is_leaf() {
                    alpha[c.index()].clear();
                }
                forest[c].data.clear();
            }

            merge_components(forest, problem, extra_components);
        }

        result = forest[problem].first_child.expect("a solved problem holds its tree");
        current = if forest[problem].is_last_child() { forest[problem].parent } else { forest[problem].right };
    }

    // the last reduced problem holds the final tree
    let result_parent = forest[result].parent.expect("the result sits below the outermost problem");
    forest.detach(result);
    forest.remove(result_parent);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decompose(n: usize, edges: &[(u32, u32)]) -> String {
        let mut graph = Graph::new(n);
        for &(u, v) in edges {
            graph.add_edge(u, v).unwrap();
        }
        let (forest, root) = compute(&graph);
        forest.check_consistency().unwrap();
        forest.format_subtree(root)
    }

    #[test]
    fn null_graph() {
        let (forest, root) = compute(&Graph::new(0));
        assert_eq!(forest.size(), 0);
        assert_eq!(root, None);
    }

    #[test]
    fn single_vertex() {
        assert_eq!(decompose(1, &[]), "(0)");
    }

    #[test]
    fn two_vertices() {
        assert_eq!(decompose(2, &[]), "(U(0)(1))");
        assert_eq!(decompose(2, &[(0, 1)]), "(J(1)(0))");
    }

    #[test]
    fn paths() {
        // P2 and P3 are cographs, P4 is the smallest prime graph
        assert_eq!(decompose(3, &[(0, 1), (1, 2)]), "(J(1)(U(2)(0)))");
        assert_eq!(decompose(4, &[(0, 1), (1, 2), (2, 3)]), "(P(3)(2)(1)(0))");
    }

    #[test]
    fn small_cographs() {
        // C4 with a chord pattern: {(0,1),(1,2),(2,3),(0,2),(1,3)}
        assert_eq!(decompose(4, &[(0, 1), (1, 2), (2, 3), (0, 2), (1, 3)]), "(J(1)(2)(U(3)(0)))");
        // K4
        assert_eq!(decompose(4, &[(0, 1), (1, 2), (2, 3), (0, 2), (1, 3), (0, 3)]), "(J(1)(2)(3)(0))");
    }

    #[test]
    fn disconnected_with_nontrivial_components() {
        let s = decompose(5, &[(0, 1), (3, 4)]);
        assert_eq!(s, "(U(J(1)(0))(2)(J(4)(3)))");
    }

    #[test]
    fn bull_with_twins() {
        // vertices 3 and 4 are non-adjacent twins of the path 0-1-3/4
        let s = decompose(5, &[(0, 1), (1, 3), (2, 3), (4, 3)]);
        assert_eq!(s, "(P(U(4)(2))(3)(1)(0))");
    }
}
