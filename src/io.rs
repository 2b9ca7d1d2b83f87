//! Edge-list input.
//!
//! One edge per line as two whitespace-separated vertex labels; empty lines
//! are skipped. The vertex count is the largest label plus one. Duplicate
//! edges are collapsed by the graph; self-loops are rejected.

use std::io::BufRead;

use crate::error::Error;
use crate::graph::Graph;

/// Reads an edge list into a [Graph] with the sparse backing.
///
/// # Errors
///
/// `Error::MalformedInput` for lines that are not exactly two tokens or that
/// describe a self-loop, `Error::ParseInt` for non-integer tokens and
/// `Error::Io` for read failures.
pub fn read_edge_list<R: BufRead>(reader: R) -> Result<Graph, Error> {
    let mut edges: Vec<(u32, u32)> = vec![];
    let mut n = 0;

    for line in reader.lines() {
        let line = line?;
        let mut tokens = line.split_ascii_whitespace();
        let (Some(a), Some(b), None) = (tokens.next(), tokens.next(), tokens.next()) else {
            if line.trim().is_empty() {
                continue;
            }
            return Err(Error::MalformedInput(format!("expected \"u v\", got {line:?}")));
        };

        let u: u32 = a.parse()?;
        let v: u32 = b.parse()?;
        edges.push((u, v));
        n = n.max(u as usize + 1).max(v as usize + 1);
    }

    let mut graph = Graph::new(n);
    for (u, v) in edges {
        graph.add_edge(u, v)?;
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::VertexId;

    #[test]
    fn reads_edges_and_skips_blank_lines() {
        let input = "0 1\n\n2 0\n   \n1 2\n5 0\n";
        let graph = read_edge_list(input.as_bytes()).unwrap();
        assert_eq!(graph.number_of_nodes(), 6);
        assert_eq!(graph.number_of_edges(), 4);
        assert!(graph.has_edge(VertexId::new(0), VertexId::new(5)));
    }

    #[test]
    fn collapses_duplicates() {
        let graph = read_edge_list("0 1\n1 0\n0 1\n".as_bytes()).unwrap();
        assert_eq!(graph.number_of_edges(), 1);
    }

    #[test]
    fn empty_input_is_the_null_graph() {
        let graph = read_edge_list("".as_bytes()).unwrap();
        assert_eq!(graph.number_of_nodes(), 0);
        assert_eq!(graph.number_of_edges(), 0);
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(matches!(read_edge_list("0\n".as_bytes()), Err(Error::MalformedInput(_))));
        assert!(matches!(read_edge_list("0 1 2\n".as_bytes()), Err(Error::MalformedInput(_))));
        assert!(matches!(read_edge_list("a b\n".as_bytes()), Err(Error::ParseInt(_))));
        assert!(matches!(read_edge_list("3 3\n".as_bytes()), Err(Error::MalformedInput(_))));
    }
}
