//! Adjacency container for simple undirected graphs.
//!
//! Two backings share one operation surface: a sorted neighbor vector per
//! vertex (default, unbounded) and a fixed-width bitset per vertex for dense
//! graphs. The decomposition itself only needs `number_of_nodes` and
//! `neighbors`; everything else serves construction and tests.

use crate::error::Error;
use crate::index::VertexId;

/// Largest vertex count the dense backing accepts.
pub const MAX_DENSE_NODES: usize = 1 << 13;

/// Adjacency representation, chosen at construction.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Backing {
    /// Sorted neighbor vectors. O(deg) membership, memory O(n + m).
    #[default]
    Sparse,
    /// One bitset per vertex. O(1) membership, memory O(n^2 / 64); bounded by
    /// [`MAX_DENSE_NODES`].
    Dense,
}

#[derive(Debug)]
enum AdjSet {
    Sorted(Vec<VertexId>),
    Bits(Vec<u64>),
}

impl AdjSet {
    fn contains(&self, v: VertexId) -> bool {
        match self {
            AdjSet::Sorted(vs) => vs.binary_search(&v).is_ok(),
            AdjSet::Bits(words) => words[v.index() / 64] >> (v.index() % 64) & 1 == 1,
        }
    }

    /// Returns false if `v` was already present.
    fn insert(&mut self, v: VertexId) -> bool {
        match self {
            AdjSet::Sorted(vs) => match vs.binary_search(&v) {
                Ok(_) => false,
                Err(pos) => {
                    vs.insert(pos, v);
                    true
                }
            },
            AdjSet::Bits(words) => {
                let (word, bit) = (v.index() / 64, v.index() % 64);
                let was_set = words[word] >> bit & 1 == 1;
                words[word] |= 1 << bit;
                !was_set
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            AdjSet::Sorted(vs) => vs.len(),
            AdjSet::Bits(words) => words.iter().map(|w| w.count_ones() as usize).sum(),
        }
    }
}

#[derive(Debug)]
pub struct Graph {
    adj: Vec<AdjSet>,
    num_edges: usize,
}

impl Graph {
    /// Graph on `n` isolated vertices with the sparse backing.
    pub fn new(number_of_nodes: usize) -> Self {
        Graph { adj: (0..number_of_nodes).map(|_| AdjSet::Sorted(vec![])).collect(), num_edges: 0 }
    }

    /// Graph on `n` isolated vertices with the given backing.
    ///
    /// # Errors
    ///
    /// `Error::Overflow` if the dense backing is requested for more than
    /// [`MAX_DENSE_NODES`] vertices.
    pub fn with_backing(number_of_nodes: usize, backing: Backing) -> Result<Self, Error> {
        match backing {
            Backing::Sparse => Ok(Self::new(number_of_nodes)),
            Backing::Dense => {
                if number_of_nodes > MAX_DENSE_NODES {
                    return Err(Error::Overflow { nodes: number_of_nodes, max: MAX_DENSE_NODES });
                }
                let words = number_of_nodes.div_ceil(64);
                Ok(Graph {
                    adj: (0..number_of_nodes).map(|_| AdjSet::Bits(vec![0; words])).collect(),
                    num_edges: 0,
                })
            }
        }
    }

    pub fn number_of_nodes(&self) -> usize {
        self.adj.len()
    }

    pub fn number_of_edges(&self) -> usize {
        self.num_edges
    }

    pub fn degree(&self, u: VertexId) -> usize {
        self.adj[u.index()].len()
    }

    fn has_vertex(&self, u: VertexId) -> bool {
        u.index() < self.adj.len()
    }

    pub fn has_edge(&self, u: VertexId, v: VertexId) -> bool {
        self.has_vertex(u) && self.has_vertex(v) && u != v && self.adj[u.index()].contains(v)
    }

    /// Inserts the edge `{u, v}`. Duplicates are collapsed.
    ///
    /// # Errors
    ///
    /// `Error::MalformedInput` for self-loops and out-of-range endpoints.
    pub fn add_edge<V: Into<VertexId>>(&mut self, u: V, v: V) -> Result<(), Error> {
        let (u, v) = (u.into(), v.into());
        if !self.has_vertex(u) || !self.has_vertex(v) {
            return Err(Error::MalformedInput(format!("edge ({u}, {v}) out of range")));
        }
        if u == v {
            return Err(Error::MalformedInput(format!("self-loop at vertex {u}")));
        }
        if self.adj[u.index()].insert(v) {
            self.adj[v.index()].insert(u);
            self.num_edges += 1;
        }
        Ok(())
    }

    /// Neighbors of `u` in increasing order.
    pub fn neighbors(&self, u: VertexId) -> Neighbors<'_> {
        match &self.adj[u.index()] {
            AdjSet::Sorted(vs) => Neighbors::Sorted(vs.iter()),
            AdjSet::Bits(words) => Neighbors::Bits { words, word: 0, bits: words.first().copied().unwrap_or(0) },
        }
    }

    pub fn vertices(&self) -> impl DoubleEndedIterator<Item = VertexId> {
        (0..self.number_of_nodes()).map(VertexId::new)
    }

    /// All edges `(u, v)` with `u < v`, lexicographically.
    pub fn edges(&self) -> impl Iterator<Item = (VertexId, VertexId)> + '_ {
        self.vertices().flat_map(move |u| self.neighbors(u).filter(move |&v| u < v).map(move |v| (u, v)))
    }
}

pub enum Neighbors<'a> {
    Sorted(std::slice::Iter<'a, VertexId>),
    Bits { words: &'a [u64], word: usize, bits: u64 },
}

impl Iterator for Neighbors<'_> {
    type Item = VertexId;

    fn next(&mut self) -> Option<VertexId> {
        match self {
            Neighbors::Sorted(iter) => iter.next().copied(),
            Neighbors::Bits { words, word, bits } => {
                while *bits == 0 {
                    *word += 1;
                    *bits = *words.get(*word)?;
                }
                let low = bits.trailing_zeros() as usize;
                *bits &= *bits - 1;
                Some(VertexId::new(*word * 64 + low))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init(backing: Backing) -> Graph {
        let mut graph = Graph::with_backing(5, backing).unwrap();
        graph.add_edge(0_u32, 1).unwrap();
        graph.add_edge(1_u32, 2).unwrap();
        graph.add_edge(2_u32, 3).unwrap();
        graph.add_edge(3_u32, 4).unwrap();
        graph.add_edge(3_u32, 1).unwrap();
        graph
    }

    #[test]
    fn basic() {
        for backing in [Backing::Sparse, Backing::Dense] {
            let graph = init(backing);
            assert_eq!(graph.number_of_nodes(), 5);
            assert_eq!(graph.number_of_edges(), 5);
            assert_eq!(graph.degree(VertexId::new(3)), 3);
            assert!(graph.has_edge(VertexId::new(1), VertexId::new(3)));
            assert!(graph.has_edge(VertexId::new(3), VertexId::new(1)));
            assert!(!graph.has_edge(VertexId::new(0), VertexId::new(4)));
            assert!(!graph.has_edge(VertexId::new(2), VertexId::new(2)));

            let nbrs: Vec<_> = graph.neighbors(VertexId::new(3)).map(|v| v.index()).collect();
            assert_eq!(nbrs, vec![1, 2, 4]);

            let edges: Vec<_> = graph.edges().map(|(u, v)| (u.index(), v.index())).collect();
            assert_eq!(edges, vec![(0, 1), (1, 2), (1, 3), (2, 3), (3, 4)]);
        }
    }

    #[test]
    fn duplicates_are_collapsed() {
        for backing in [Backing::Sparse, Backing::Dense] {
            let mut graph = init(backing);
            graph.add_edge(1_u32, 3).unwrap();
            graph.add_edge(3_u32, 1).unwrap();
            assert_eq!(graph.number_of_edges(), 5);
            assert_eq!(graph.degree(VertexId::new(3)), 3);
        }
    }

    #[test]
    fn rejects_self_loops_and_out_of_range() {
        let mut graph = Graph::new(3);
        assert!(matches!(graph.add_edge(1_u32, 1), Err(Error::MalformedInput(_))));
        assert!(matches!(graph.add_edge(0_u32, 3), Err(Error::MalformedInput(_))));
        assert_eq!(graph.number_of_edges(), 0);
    }

    #[test]
    fn dense_backing_is_bounded() {
        assert!(Graph::with_backing(MAX_DENSE_NODES, Backing::Dense).is_ok());
        let err = Graph::with_backing(MAX_DENSE_NODES + 1, Backing::Dense).unwrap_err();
        assert!(matches!(err, Error::Overflow { .. }));
    }

    #[test]
    fn dense_neighbors_cross_word_boundaries() {
        let mut graph = Graph::with_backing(200, Backing::Dense).unwrap();
        for v in [1_u32, 63, 64, 127, 128, 199] {
            graph.add_edge(0, v).unwrap();
        }
        let nbrs: Vec<_> = graph.neighbors(VertexId::new(0)).map(|v| v.index()).collect();
        assert_eq!(nbrs, vec![1, 63, 64, 127, 128, 199]);
        let nbrs: Vec<_> = graph.neighbors(VertexId::new(199)).map(|v| v.index()).collect();
        assert_eq!(nbrs, vec![0]);
    }
}
