//! Pivoting: turning one subproblem into a layered chain of smaller ones.

use crate::compute::{node_of, ComputeNode};
use crate::forest::Forest;
use crate::graph::Graph;
use crate::index::{NodeId, VertexId};

fn is_pivot_layer(forest: &Forest<ComputeNode>, index: NodeId) -> bool {
    let Some(parent) = forest[index].parent else {
        return false;
    };
    forest[parent].data.is_problem_node()
        && forest[parent].data.vertex.map(node_of) == forest[index].first_child
}

/// Moves `v` one layer towards the pivot it is adjacent to, opening a fresh
/// connected layer if the one to the left is already processed or holds the
/// pivot itself.
fn pull_forward(forest: &mut Forest<ComputeNode>, v: NodeId) {
    let current_layer = forest[v].parent.expect("a pulled vertex sits in a layer");
    if forest[current_layer].data.connected {
        return;
    }
    debug_assert!(forest[current_layer].data.is_problem_node());

    let mut prev_layer = forest[current_layer].left.expect("an unconnected layer has a left neighbor");

    if forest[prev_layer].data.active || is_pivot_layer(forest, prev_layer) {
        let new_layer = forest.create(ComputeNode::problem_node(true));
        forest.move_before(new_layer, current_layer);
        prev_layer = new_layer;
    }

    if forest[prev_layer].data.connected {
        forest.move_to(v, prev_layer);
    }
    if forest[current_layer].is_leaf() {
        forest.remove(current_layer);
    }
}

/// Distributes the neighbors of `pivot`: processed vertices record the pivot
/// in their alpha list, same-layer vertices move into the neighbor
/// subproblem, vertices of later layers are pulled forward.
pub(crate) fn process_neighbors(
    graph: &Graph,
    forest: &mut Forest<ComputeNode>,
    alpha: &mut [Vec<NodeId>],
    visited: &[bool],
    pivot: VertexId,
    current_problem: NodeId,
    neighbor_problem: Option<NodeId>,
) {
    for v in graph.neighbors(pivot) {
        let node = node_of(v);
        if visited[v.index()] {
            alpha[v.index()].push(node_of(pivot));
        } else if forest[node].parent == Some(current_problem) {
            let neighbor_problem = neighbor_problem.expect("same-layer neighbors need a neighbor subproblem");
            forest.move_to(node, neighbor_problem);
        } else {
            pull_forward(forest, node);
        }
    }
}

/// Splits `problem` around `pivot`. The replacement node takes the problem's
/// place and carries the pivot; left to right its children become the
/// neighbor layer, the pivot layer and the remaining non-neighbors.
pub(crate) fn do_pivot(
    graph: &Graph,
    forest: &mut Forest<ComputeNode>,
    alpha: &mut [Vec<NodeId>],
    visited: &[bool],
    problem: NodeId,
    pivot: VertexId,
) -> NodeId {
    let replacement = forest.create(forest[problem].data.replica());
    forest.swap(problem, replacement);
    forest.move_to(problem, replacement);
    forest[replacement].data.vertex = Some(pivot);

    // the old problem node lives on as the non-neighbor layer
    let data = &mut forest[problem].data;
    data.active = false;
    data.connected = false;
    data.vertex = None;

    let pivot_problem = forest.create(ComputeNode::problem_node(true));
    forest.move_to(pivot_problem, replacement);
    forest.move_to(node_of(pivot), pivot_problem);

    let neighbor_problem = forest.create(ComputeNode::problem_node(true));
    forest.move_to(neighbor_problem, replacement);
    process_neighbors(graph, forest, alpha, visited, pivot, problem, Some(neighbor_problem));

    if forest[problem].is_leaf() {
        forest.remove(problem);
    }
    if forest[neighbor_problem].is_leaf() {
        forest.remove(neighbor_problem);
    }

    replacement
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::node_of;

    fn setup(n: usize, edges: &[(u32, u32)]) -> (Graph, Forest<ComputeNode>, NodeId) {
        let mut graph = Graph::new(n);
        for &(u, v) in edges {
            graph.add_edge(u, v).unwrap();
        }
        let mut forest = Forest::new();
        for u in graph.vertices() {
            forest.create(ComputeNode::vertex_node(u));
        }
        let problem = forest.create(ComputeNode::problem_node(false));
        for u in graph.vertices().rev() {
            forest.move_to(node_of(u), problem);
        }
        (graph, forest, problem)
    }

    #[test]
    fn pivot_splits_into_layers() {
        let (graph, mut forest, problem) = setup(5, &[(0, 1), (0, 3), (2, 3)]);
        let mut alpha = vec![vec![]; 5];
        let visited = vec![false; 5];

        let replacement = do_pivot(&graph, &mut forest, &mut alpha, &visited, problem, VertexId::new(0));

        // neighbors {1, 3} | pivot {0} | non-neighbors {2, 4}
        assert_eq!(forest.format_subtree(Some(replacement)), "(C0(C-(3)(1))(C-(0))(C-(2)(4)))");
        assert!(forest[replacement].data.is_problem_node());
        assert_eq!(forest[replacement].data.vertex, Some(VertexId::new(0)));
        forest.check_consistency().unwrap();

        let layers: Vec<_> = forest.children(replacement).collect();
        assert!(forest[layers[0]].data.connected);
        assert!(forest[layers[1]].data.connected);
        assert!(!forest[layers[2]].data.connected);
    }

    #[test]
    fn pivot_with_all_vertices_adjacent() {
        let (graph, mut forest, problem) = setup(3, &[(0, 1), (0, 2)]);
        let mut alpha = vec![vec![]; 3];
        let visited = vec![false; 3];

        let replacement = do_pivot(&graph, &mut forest, &mut alpha, &visited, problem, VertexId::new(0));

        // the non-neighbor layer vanished with the old problem node
        assert_eq!(forest.format_subtree(Some(replacement)), "(C0(C-(2)(1))(C-(0)))");
        forest.check_consistency().unwrap();
    }

    #[test]
    fn visited_neighbors_extend_alpha_lists() {
        let (graph, mut forest, problem) = setup(4, &[(0, 1), (1, 2), (1, 3)]);
        let mut alpha = vec![vec![]; 4];
        let mut visited = vec![false; 4];

        let replacement = do_pivot(&graph, &mut forest, &mut alpha, &visited, problem, VertexId::new(0));
        visited[0] = true;

        // processing the pivot's lone neighbor records the edge back to 0
        let neighbor_layer = forest[replacement].first_child.unwrap();
        process_neighbors(&graph, &mut forest, &mut alpha, &visited, VertexId::new(1), neighbor_layer, None);
        assert_eq!(alpha[0], vec![node_of(VertexId::new(1))]);
        forest.check_consistency().unwrap();
    }
}
