//! The user-facing modular decomposition tree.

use std::cmp::Reverse;
use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::ops::Range;

use petgraph::graph::DiGraph;

use crate::compute::{self, ComputeNode, Operation};
use crate::forest::Forest;
use crate::graph::Graph;
use crate::index::{NodeId, VertexId};

/// Kind of a node in a [MDTree].
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum MDNodeKind {
    /// The quotient over the children has only trivial modules.
    Prime,
    /// The quotient over the children is complete (join).
    Series,
    /// The quotient over the children is edgeless (disjoint union).
    Parallel,
    /// A leaf holding a single graph vertex.
    Vertex(VertexId),
}

pub(crate) struct MDNode {
    kind: MDNodeKind,
    /// Span `[vertices_begin, vertices_end)` of this module in the leaf
    /// order; the spans of a node's children partition its own.
    vertices_begin: u32,
    vertices_end: u32,
}

impl MDNode {
    fn new(kind: MDNodeKind, vertices_begin: u32, vertices_end: u32) -> Self {
        MDNode { kind, vertices_begin, vertices_end }
    }

    fn size(&self) -> u32 {
        self.vertices_end - self.vertices_begin
    }
}

impl Display for MDNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            MDNodeKind::Prime => write!(f, "P"),
            MDNodeKind::Series => write!(f, "J"),
            MDNodeKind::Parallel => write!(f, "U"),
            MDNodeKind::Vertex(v) => write!(f, "{v}"),
        }
    }
}

/// The modular decomposition tree of a graph.
///
/// Leaves are the graph's vertices; every strong module of the graph is the
/// leaf set of exactly one subtree. [`MDTree::sort`] canonicalizes the
/// sibling order, making [`MDTree::to_string`] unique per graph.
pub struct MDTree {
    tree: Forest<MDNode>,
    root: Option<NodeId>,
    vertices: Vec<VertexId>,
}

impl MDTree {
    /// Decomposes `graph`. The tree of the null graph is empty.
    pub fn new(graph: &Graph) -> Self {
        let (forest, root) = compute::compute(graph);
        match root {
            Some(root) => Self::from_computed(&forest, root),
            None => MDTree { tree: Forest::new(), root: None, vertices: vec![] },
        }
    }

    /// Rebuilds the computation forest into a clean tree carrying vertex
    /// spans, built bottom-up over the internal nodes.
    pub(crate) fn from_computed(computed: &Forest<ComputeNode>, root: NodeId) -> Self {
        let mut vertices: Vec<VertexId> = computed
            .leaves(root)
            .into_iter()
            .map(|x| computed[x].data.vertex.expect("leaves of the computation forest are vertex nodes"))
            .collect();
        vertices.reverse(); // leaves() walks rightmost-first

        let n = vertices.len();
        let mut tree = Forest::with_capacity(2 * n);
        let mut mapping: Vec<Option<NodeId>> = vec![None; computed.capacity()];

        for (i, &v) in vertices.iter().enumerate() {
            let leaf = tree.create(MDNode::new(MDNodeKind::Vertex(v), i as u32, i as u32 + 1));
            mapping[compute::node_of(v).index()] = Some(leaf);
        }

        let order = computed.bfs_nodes(root);
        for &x in order.iter().rev() {
            let data = &computed[x].data;
            if data.is_vertex_node() {
                continue;
            }
            debug_assert!(data.is_operation_node(), "problem nodes do not survive the computation");

            let children: Vec<NodeId> = computed.children(x).collect();
            let mut begin = n as u32;
            let mut end = 0;
            for &c in &children {
                let mapped = mapping[c.index()].expect("children are mapped before their parent");
                begin = begin.min(tree[mapped].data.vertices_begin);
                end = end.max(tree[mapped].data.vertices_end);
            }

            let kind = match data.op {
                Operation::Prime => MDNodeKind::Prime,
                Operation::Series => MDNodeKind::Series,
                Operation::Parallel => MDNodeKind::Parallel,
            };
            let node = tree.create(MDNode::new(kind, begin, end));
            for &c in children.iter().rev() {
                tree.move_to(mapping[c.index()].expect("children are mapped before their parent"), node);
            }
            mapping[x.index()] = Some(node);
        }

        let root = mapping[root.index()].expect("the root is mapped last");
        MDTree { tree, root: Some(root), vertices }
    }

    /// Number of nodes, internal and leaves.
    pub fn node_count(&self) -> usize {
        self.tree.size()
    }

    /// Root handle; `None` for the null graph.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn kind(&self, node: NodeId) -> MDNodeKind {
        self.tree[node].data.kind
    }

    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.tree.children(node)
    }

    /// The leaf sequence, left to right.
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    /// The `i`-th leaf vertex. Panics when `i` is out of range.
    pub fn get_vertex(&self, i: usize) -> VertexId {
        self.vertices[i]
    }

    /// The slice of [`MDTree::vertices`] spanned by the module at `node`.
    pub fn vertex_range(&self, node: NodeId) -> Range<usize> {
        let data = &self.tree[node].data;
        data.vertices_begin as usize..data.vertices_end as usize
    }

    /// The largest number of children of any PRIME node; 0 when there is
    /// none.
    pub fn modular_width(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        self.tree
            .dfs_preorder_nodes(root)
            .into_iter()
            .filter(|&x| self.tree[x].data.kind == MDNodeKind::Prime)
            .map(|x| self.tree[x].number_of_children() as usize)
            .max()
            .unwrap_or(0)
    }

    /// Reorders every node's children by increasing smallest leaf vertex and
    /// rewrites the leaf sequence and all spans accordingly. The rendering of
    /// a sorted tree is canonical for its graph, and sorting again changes
    /// nothing.
    pub fn sort(&mut self) {
        let Some(root) = self.root else {
            return;
        };
        let order = self.tree.bfs_nodes(root);

        // bottom-up: smallest leaf vertex below each node
        let mut min_label = vec![u32::MAX; self.tree.capacity()];
        for &x in order.iter().rev() {
            if let MDNodeKind::Vertex(v) = self.tree[x].data.kind {
                min_label[x.index()] = v.index() as u32;
            }
            if let Some(parent) = self.tree[x].parent {
                min_label[parent.index()] = min_label[parent.index()].min(min_label[x.index()]);
            }
        }

        // top-down: each node's span is final when it is reached; hand out
        // sub-spans to the children from the right and move each to the
        // front, smallest label last
        for &x in &order {
            if let MDNodeKind::Vertex(v) = self.tree[x].data.kind {
                self.vertices[self.tree[x].data.vertices_begin as usize] = v;
                continue;
            }

            let mut idx = self.tree[x].data.vertices_end;
            let mut children: Vec<NodeId> = self.tree.children(x).collect();
            children.sort_by_key(|c| Reverse(min_label[c.index()]));
            for c in children {
                let size = self.tree[c].data.size();
                idx -= size;
                self.tree[c].data.vertices_begin = idx;
                self.tree[c].data.vertices_end = idx + size;
                self.tree.make_first_child(c);
            }
        }
    }

    /// Exports the tree as a petgraph [DiGraph] with edges from parents to
    /// children.
    pub fn to_digraph(&self) -> DiGraph<MDNodeKind, ()> {
        let Some(root) = self.root else {
            return DiGraph::new();
        };

        let mut digraph = DiGraph::with_capacity(self.node_count(), self.node_count().saturating_sub(1));
        let mut queue = VecDeque::new();
        queue.push_back((root, digraph.add_node(self.tree[root].data.kind)));
        while let Some((x, a)) = queue.pop_front() {
            for y in self.tree.children(x) {
                let b = digraph.add_node(self.tree[y].data.kind);
                digraph.add_edge(a, b, ());
                queue.push_back((y, b));
            }
        }
        digraph
    }
}

impl Display for MDTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.root {
            Some(root) => f.write_str(&self.tree.format_subtree(Some(root))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(n: usize, edges: &[(u32, u32)]) -> MDTree {
        let mut graph = Graph::new(n);
        for &(u, v) in edges {
            graph.add_edge(u, v).unwrap();
        }
        MDTree::new(&graph)
    }

    const TED08_TEST0: [(u32, u32); 16] = [
        (0, 2),
        (0, 3),
        (0, 6),
        (0, 7),
        (1, 6),
        (2, 3),
        (2, 4),
        (2, 5),
        (2, 7),
        (3, 4),
        (3, 5),
        (4, 5),
        (4, 6),
        (4, 7),
        (5, 6),
        (5, 7),
    ];

    #[test]
    fn null_graph() {
        let md = build(0, &[]);
        assert_eq!(md.root(), None);
        assert_eq!(md.node_count(), 0);
        assert_eq!(md.modular_width(), 0);
        assert_eq!(md.to_string(), "");
    }

    #[test]
    fn single_vertex() {
        let mut md = build(1, &[]);
        let root = md.root().unwrap();
        assert_eq!(md.kind(root), MDNodeKind::Vertex(VertexId::new(0)));
        assert_eq!(md.modular_width(), 0);
        md.sort();
        assert_eq!(md.to_string(), "(0)");
        assert_eq!(md.vertex_range(root), 0..1);
    }

    #[test]
    fn sorted_tree_with_spans() {
        let mut md = build(8, &TED08_TEST0);
        md.sort();

        assert_eq!(md.to_string(), "(P(U(0)(J(4)(5)))(1)(J(2)(U(3)(7)))(6))");
        assert_eq!(md.modular_width(), 4);

        let leaf_order: Vec<usize> = (0..8).map(|i| md.get_vertex(i).index()).collect();
        assert_eq!(leaf_order, vec![0, 4, 5, 1, 2, 3, 7, 6]);

        let spans: Vec<(usize, usize)> = md
            .tree
            .bfs_nodes(md.root().unwrap())
            .into_iter()
            .map(|x| {
                let r = md.vertex_range(x);
                (r.start, r.end)
            })
            .collect();
        let expected = vec![
            (0, 8),                         // P
            (0, 3), (3, 4), (4, 7), (7, 8), // U 1 J 6
            (0, 1), (1, 3), (4, 5), (5, 7), // 0 J 2 U
            (1, 2), (2, 3), (5, 6), (6, 7), // 4 5 3 7
        ];
        assert_eq!(spans, expected);
    }

    #[test]
    fn spans_partition_parents() {
        let mut md = build(8, &TED08_TEST0);
        md.sort();

        for x in md.tree.bfs_nodes(md.root().unwrap()) {
            let range = md.vertex_range(x);
            let child_ranges: Vec<_> = md.children(x).map(|c| md.vertex_range(c)).collect();
            if child_ranges.is_empty() {
                continue;
            }
            assert_eq!(child_ranges.first().unwrap().start, range.start);
            assert_eq!(child_ranges.last().unwrap().end, range.end);
            for pair in child_ranges.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
        }
    }

    #[test]
    fn sort_is_idempotent() {
        let mut md = build(8, &TED08_TEST0);
        md.sort();
        let once = md.to_string();
        let vertices_once = md.vertices().to_vec();
        md.sort();
        assert_eq!(md.to_string(), once);
        assert_eq!(md.vertices(), vertices_once);
    }

    #[test]
    fn digraph_export_matches_tree() {
        use petgraph::Incoming;

        let mut md = build(8, &TED08_TEST0);
        md.sort();
        let digraph = md.to_digraph();

        assert_eq!(digraph.node_count(), md.node_count());
        assert_eq!(digraph.edge_count(), md.node_count() - 1);
        let roots: Vec<_> = digraph.externals(Incoming).collect();
        assert_eq!(roots.len(), 1);
        assert_eq!(digraph[roots[0]], MDNodeKind::Prime);
    }
}
