//! Modular decomposition of simple undirected graphs.
//!
//! A vertex set *M* is a *module* if every vertex outside *M* is adjacent
//! either to all of *M* or to none of it. The strong modules (those
//! overlapping no other module) form a tree: the modular decomposition tree,
//! with internal nodes labeled PRIME, SERIES (join) or PARALLEL (disjoint
//! union) and the graph's vertices at the leaves. The largest number of
//! children of any PRIME node is the *modular width*, the parameter this
//! crate is built to feed.
//!
//! The decomposition runs on an arena-backed forest of compute nodes driven
//! through a pivot → recurse → refine → promote → assemble pipeline.
//!
//! # Examples
//!
//! Decomposing a [petgraph](petgraph::graph::UnGraph) graph; the path on four
//! vertices is the smallest prime graph.
//!
//! ```rust
//! use petgraph::graph::UnGraph;
//! use modtree::modular_decomposition;
//!
//! let graph = UnGraph::<(), ()>::from_edges([(0, 1), (1, 2), (2, 3)]);
//! let mut md = modular_decomposition(&graph)?;
//! md.sort();
//!
//! assert_eq!(md.to_string(), "(P(0)(1)(2)(3))");
//! assert_eq!(md.modular_width(), 4);
//! # Ok::<(), modtree::Error>(())
//! ```
//!
//! Cographs are exactly the graphs without PRIME modules.
//!
//! ```rust
//! use modtree::{Graph, MDNodeKind, MDTree};
//!
//! let mut graph = Graph::new(3);
//! graph.add_edge(0_u32, 1)?;
//! graph.add_edge(1_u32, 2)?;
//!
//! let md = MDTree::new(&graph);
//! let digraph = md.to_digraph();
//! let is_cograph = digraph.node_weights().all(|kind| *kind != MDNodeKind::Prime);
//! assert!(is_cograph);
//! # Ok::<(), modtree::Error>(())
//! ```

#![forbid(unsafe_code)]

mod compute;
mod error;
mod forest;
mod graph;
mod index;
pub mod io;
mod mdtree;
mod set;

pub use error::Error;
pub use graph::{Backing, Graph, Neighbors, MAX_DENSE_NODES};
pub use index::{NodeId, VertexId};
pub use io::read_edge_list;
pub use mdtree::{MDNodeKind, MDTree};

use petgraph::graph::UnGraph;
use petgraph::visit::EdgeRef;

/// Computes the modular decomposition of a petgraph graph.
///
/// Parallel edges are collapsed. The tree of the null graph is empty.
///
/// # Errors
///
/// `Error::MalformedInput` if the graph contains a self-loop.
pub fn modular_decomposition<N, E>(graph: &UnGraph<N, E>) -> Result<MDTree, Error> {
    let mut g = Graph::new(graph.node_count());
    for edge in graph.edge_references() {
        g.add_edge(VertexId::new(edge.source().index()), VertexId::new(edge.target().index()))?;
    }
    Ok(MDTree::new(&g))
}
