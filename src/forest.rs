//! Arena-backed rooted forest with intrusive sibling links.
//!
//! Nodes live in a slot vector and are addressed by [`NodeId`]; removed slots
//! are recycled through a free queue. Each node stores parent, first-child and
//! doubly-linked sibling handles, so the surgical operations used by the
//! decomposition (detach, splice, swap, adopt) are O(1).
//!
//! Surgeries validate their preconditions with `debug_assert!`; release builds
//! pay nothing. [`Forest::check_consistency`] performs a full structural audit
//! and is run by the tests after every surgery sequence.

use std::collections::VecDeque;
use std::fmt::Display;
use std::iter::FusedIterator;
use std::ops::{Index, IndexMut};

use crate::error::Error;
use crate::index::NodeId;

pub(crate) struct Node<Data> {
    pub(crate) data: Data,
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    num_children: u32,
    alive: bool,
}

impl<Data> Node<Data> {
    fn new(data: Data) -> Self {
        Node { data, parent: None, left: None, right: None, first_child: None, num_children: 0, alive: true }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.alive
    }
    pub(crate) fn is_root(&self) -> bool {
        self.parent.is_none()
    }
    pub(crate) fn is_first_child(&self) -> bool {
        self.parent.is_some() && self.left.is_none()
    }
    pub(crate) fn is_last_child(&self) -> bool {
        self.parent.is_some() && self.right.is_none()
    }
    pub(crate) fn is_leaf(&self) -> bool {
        self.first_child.is_none()
    }
    pub(crate) fn has_child(&self) -> bool {
        self.first_child.is_some()
    }
    pub(crate) fn has_only_one_child(&self) -> bool {
        self.num_children == 1
    }
    pub(crate) fn number_of_children(&self) -> u32 {
        self.num_children
    }
}

pub(crate) struct Forest<Data> {
    nodes: Vec<Node<Data>>,
    free: VecDeque<NodeId>,
    num_live: u32,
}

impl<Data> Default for Forest<Data> {
    fn default() -> Self {
        Forest { nodes: vec![], free: VecDeque::new(), num_live: 0 }
    }
}

impl<Data> Index<NodeId> for Forest<Data> {
    type Output = Node<Data>;
    fn index(&self, index: NodeId) -> &Self::Output {
        &self.nodes[index.index()]
    }
}

impl<Data> IndexMut<NodeId> for Forest<Data> {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        &mut self.nodes[index.index()]
    }
}

impl<Data> Forest<Data> {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Forest { nodes: Vec::with_capacity(capacity), free: VecDeque::new(), num_live: 0 }
    }

    /// Number of live nodes.
    pub(crate) fn size(&self) -> usize {
        self.num_live as usize
    }

    /// Number of slots, live or recycled.
    pub(crate) fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn is_valid(&self, index: NodeId) -> bool {
        index.index() < self.nodes.len() && self.nodes[index.index()].alive
    }

    pub(crate) fn as_valid(&self, index: Option<NodeId>) -> Option<NodeId> {
        index.filter(|&index| self.is_valid(index))
    }

    /// Allocates a node holding `data`, recycling a removed slot if one is
    /// available. The new node is a root without children.
    pub(crate) fn create(&mut self, data: Data) -> NodeId {
        self.num_live += 1;
        if let Some(index) = self.free.pop_front() {
            debug_assert!(!self.nodes[index.index()].alive);
            self.nodes[index.index()] = Node::new(data);
            index
        } else {
            let index = NodeId::new(self.nodes.len());
            self.nodes.push(Node::new(data));
            index
        }
    }

    /// Marks a detached, childless node dead and queues its slot for reuse.
    pub(crate) fn remove(&mut self, index: NodeId) {
        debug_assert!(self.is_valid(index));
        self.detach(index);
        debug_assert!(self[index].is_leaf());

        self.num_live -= 1;
        self[index].alive = false;
        self.free.push_back(index);
    }

    /// Unlinks `index` from its parent and siblings. Its subtree comes along.
    /// A root is left unchanged.
    pub(crate) fn detach(&mut self, index: NodeId) {
        debug_assert!(self.is_valid(index));

        let Node { parent, left, right, .. } = self[index];
        if let Some(parent) = parent {
            let parent = &mut self[parent];
            parent.num_children -= 1;
            if parent.first_child == Some(index) {
                parent.first_child = right;
            }
        }
        if let Some(left) = left {
            self[left].right = right;
        }
        if let Some(right) = right {
            self[right].left = left;
        }

        let node = &mut self[index];
        node.parent = None;
        node.left = None;
        node.right = None;
    }

    /// Prepends a detached node as the first child of `parent`.
    fn add_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.is_valid(parent));
        debug_assert!(self.is_valid(child));
        debug_assert!(self[child].is_root());

        if let Some(first) = self[parent].first_child.replace(child) {
            self[first].left = Some(child);
            self[child].right = Some(first);
        }
        self[child].parent = Some(parent);
        self[parent].num_children += 1;
    }

    /// Detaches `index` and prepends it to the children of `new_parent`.
    pub(crate) fn move_to(&mut self, index: NodeId, new_parent: NodeId) {
        debug_assert!(self.is_valid(index));
        debug_assert!(self.is_valid(new_parent));
        debug_assert_ne!(index, new_parent);

        self.detach(index);
        self.add_child(new_parent, index);
    }

    /// Detaches `index` and splices it in as the left sibling of `target`.
    /// `target` must not be a root.
    pub(crate) fn move_before(&mut self, index: NodeId, target: NodeId) {
        debug_assert!(self.is_valid(index));
        debug_assert!(self.is_valid(target));
        debug_assert_ne!(index, target);
        debug_assert!(!self.ancestors(target).any(|a| a == index));

        self.detach(index);

        let Node { parent, left, .. } = self[target];
        let parent = parent.expect("move_before: target must not be a root");
        {
            let node = &mut self[index];
            node.parent = Some(parent);
            node.left = left;
            node.right = Some(target);
        }
        self[parent].num_children += 1;
        match left {
            Some(left) => self[left].right = Some(index),
            None => self[parent].first_child = Some(index),
        }
        self[target].left = Some(index);
    }

    /// Detaches `index` and splices it in as the right sibling of `target`.
    /// `target` must not be a root.
    pub(crate) fn move_after(&mut self, index: NodeId, target: NodeId) {
        debug_assert!(self.is_valid(index));
        debug_assert!(self.is_valid(target));
        debug_assert_ne!(index, target);
        debug_assert!(!self.ancestors(target).any(|a| a == index));

        self.detach(index);

        let Node { parent, right, .. } = self[target];
        let parent = parent.expect("move_after: target must not be a root");
        {
            let node = &mut self[index];
            node.parent = Some(parent);
            node.left = Some(target);
            node.right = right;
        }
        self[parent].num_children += 1;
        if let Some(right) = right {
            self[right].left = Some(index);
        }
        self[target].right = Some(index);
    }

    /// Exchanges the positions of two nodes from different trees; the
    /// subtrees below them travel along.
    pub(crate) fn swap(&mut self, a: NodeId, b: NodeId) {
        debug_assert!(self.is_valid(a));
        debug_assert!(self.is_valid(b));
        debug_assert_ne!(a, b);
        debug_assert_ne!(self.root_of(a), self.root_of(b), "swap requires nodes of different trees");

        let Node { parent: a_parent, left: a_left, right: a_right, .. } = self[a];
        let Node { parent: b_parent, left: b_left, right: b_right, .. } = self[b];

        // The trees are disjoint, so none of these neighbors is `a` or `b`.
        let mut relink = |from: NodeId, to: NodeId, parent: Option<NodeId>, left: Option<NodeId>, right: Option<NodeId>| {
            if let Some(parent) = parent {
                if self[parent].first_child == Some(from) {
                    self[parent].first_child = Some(to);
                }
            }
            if let Some(left) = left {
                self[left].right = Some(to);
            }
            if let Some(right) = right {
                self[right].left = Some(to);
            }
        };
        relink(a, b, a_parent, a_left, a_right);
        relink(b, a, b_parent, b_left, b_right);

        let node = &mut self[a];
        node.parent = b_parent;
        node.left = b_left;
        node.right = b_right;
        let node = &mut self[b];
        node.parent = a_parent;
        node.left = a_left;
        node.right = a_right;
    }

    /// Puts `replace_by` (detached first) in the position of `index`;
    /// `index` ends up detached with its subtree.
    pub(crate) fn replace(&mut self, index: NodeId, replace_by: NodeId) {
        debug_assert!(self.is_valid(index));
        debug_assert!(self.is_valid(replace_by));
        debug_assert_ne!(index, replace_by);
        debug_assert!(!self.ancestors(index).any(|a| a == replace_by));

        self.detach(replace_by);
        self.swap(index, replace_by);
    }

    /// Moves `index` before its first sibling. No-op for roots and first
    /// children.
    pub(crate) fn make_first_child(&mut self, index: NodeId) {
        debug_assert!(self.is_valid(index));

        if self[index].is_root() || self[index].is_first_child() {
            return;
        }
        let parent = self[index].parent.expect("checked to not be a root");
        let first = self[parent].first_child.expect("a parent has at least one child");
        self.move_before(index, first);
    }

    /// Moves all children of `src`, keeping their order, to the front of the
    /// children of `dst`. `src` ends up childless.
    pub(crate) fn add_children_from(&mut self, dst: NodeId, src: NodeId) {
        debug_assert!(self.is_valid(dst));
        debug_assert!(self.is_valid(src));
        debug_assert!(!self.ancestors(dst).any(|a| a == src));

        if dst == src {
            return;
        }

        let mut child = self[src].first_child;
        while let Some(c) = child {
            self[c].parent = Some(dst);
            let next = self[c].right;
            if next.is_none() {
                // last child of src: connect to dst's old first child
                self[c].right = self[dst].first_child;
                if let Some(old_first) = self[dst].first_child {
                    self[old_first].left = Some(c);
                }
            }
            child = next;
        }

        if let Some(first) = self[src].first_child.take() {
            self[dst].first_child = Some(first);
        }
        self[dst].num_children += self[src].num_children;
        self[src].num_children = 0;
    }

    /// Splices the children of `index` into its position, keeping their
    /// order, and detaches `index`. The node stays alive for the caller to
    /// remove.
    pub(crate) fn replace_by_children(&mut self, index: NodeId) {
        debug_assert!(self.is_valid(index));
        debug_assert!(!self[index].is_root());

        let mut child = self[index].first_child;
        while let Some(c) = child {
            let next = self[c].right;
            self.move_before(c, index);
            child = next;
        }
        self.detach(index);
    }

    /// Detaches every child of `index` and makes `target` its only child.
    pub(crate) fn replace_children(&mut self, index: NodeId, target: NodeId) {
        for c in self.children(index).collect::<Vec<_>>() {
            self.detach(c);
        }
        self.move_to(target, index);
    }
}

pub(crate) struct Children<'a, Data> {
    forest: &'a Forest<Data>,
    current: Option<NodeId>,
    remaining: u32,
}

impl<Data> Iterator for Children<'_, Data> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.current?;
        self.current = self.forest[current].right;
        self.remaining -= 1;
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

impl<Data> ExactSizeIterator for Children<'_, Data> {}

impl<Data> FusedIterator for Children<'_, Data> {}

pub(crate) struct Ancestors<'a, Data> {
    forest: &'a Forest<Data>,
    current: Option<NodeId>,
}

impl<Data> Iterator for Ancestors<'_, Data> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.current?;
        self.current = self.forest[current].parent;
        Some(current)
    }
}

impl<Data> FusedIterator for Ancestors<'_, Data> {}

impl<Data> Forest<Data> {
    /// Children of `index`, left to right.
    pub(crate) fn children(&self, index: NodeId) -> Children<'_, Data> {
        debug_assert!(self.is_valid(index));
        Children { forest: self, current: self[index].first_child, remaining: self[index].num_children }
    }

    /// Proper ancestors of `index`, nearest first.
    pub(crate) fn ancestors(&self, index: NodeId) -> Ancestors<'_, Data> {
        debug_assert!(self.is_valid(index));
        Ancestors { forest: self, current: self[index].parent }
    }

    pub(crate) fn root_of(&self, index: NodeId) -> NodeId {
        debug_assert!(self.is_valid(index));
        self.ancestors(index).last().unwrap_or(index)
    }

    /// All live roots, in slot order.
    #[allow(dead_code)]
    pub(crate) fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.alive && node.is_root())
            .map(|(i, _)| NodeId::new(i))
    }

    /// Subtree nodes in breadth-first order.
    pub(crate) fn bfs_nodes(&self, index: NodeId) -> Vec<NodeId> {
        debug_assert!(self.is_valid(index));

        let mut order = vec![];
        let mut queue = VecDeque::new();
        queue.push_back(index);
        while let Some(x) = queue.pop_front() {
            order.push(x);
            queue.extend(self.children(x));
        }
        order
    }

    /// Subtree nodes in depth-first pre-order, leftmost child first.
    pub(crate) fn dfs_preorder_nodes(&self, index: NodeId) -> Vec<NodeId> {
        debug_assert!(self.is_valid(index));

        let mut order = vec![];
        let mut stack = vec![index];
        while let Some(x) = stack.pop() {
            order.push(x);
            let first = stack.len();
            stack.extend(self.children(x));
            stack[first..].reverse();
        }
        order
    }

    /// Subtree nodes in depth-first pre-order, rightmost child first.
    pub(crate) fn dfs_reverse_preorder_nodes(&self, index: NodeId) -> Vec<NodeId> {
        debug_assert!(self.is_valid(index));

        let mut order = vec![];
        let mut stack = vec![index];
        while let Some(x) = stack.pop() {
            order.push(x);
            stack.extend(self.children(x));
        }
        order
    }

    /// Leaves of the subtree, rightmost first. This is the leaf order the
    /// pipeline iterates in.
    pub(crate) fn leaves(&self, index: NodeId) -> Vec<NodeId> {
        self.dfs_reverse_preorder_nodes(index).into_iter().filter(|&x| self[x].is_leaf()).collect()
    }
}

impl<Data> Forest<Data> {
    /// Full structural audit of the arena. O(total slots).
    pub(crate) fn check_consistency(&self) -> Result<(), Error> {
        let mut num_alive = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            let index = NodeId::new(i);
            if !node.is_alive() {
                continue;
            }
            num_alive += 1;

            if let Some(left) = node.left {
                if !self.is_valid(left) {
                    return Err(Error::InvalidHandle(format!("dead left sibling at node {index}")));
                }
                if self[left].right != Some(index) {
                    return Err(Error::PreconditionViolated(format!("left->right link broken at node {index}")));
                }
            }
            if let Some(right) = node.right {
                if !self.is_valid(right) {
                    return Err(Error::InvalidHandle(format!("dead right sibling at node {index}")));
                }
                if self[right].left != Some(index) {
                    return Err(Error::PreconditionViolated(format!("right->left link broken at node {index}")));
                }
            }
            if self.children(index).count() != node.num_children as usize {
                return Err(Error::PreconditionViolated(format!("child count out of sync at node {index}")));
            }
            if let Some(parent) = node.parent {
                if !self.is_valid(parent) {
                    return Err(Error::InvalidHandle(format!("dead parent at node {index}")));
                }
                if !self.children(parent).any(|c| c == index) {
                    return Err(Error::PreconditionViolated(format!("node {index} missing from its parent's children")));
                }
            }
        }
        if num_alive != self.size() {
            return Err(Error::PreconditionViolated("live node count out of sync".into()));
        }
        Ok(())
    }
}

impl<Data: Display> Forest<Data> {
    /// Parenthesized rendering of a subtree, with cycle detection.
    pub(crate) fn format_subtree(&self, root: Option<NodeId>) -> String {
        let Some(root) = self.as_valid(root) else {
            return format!("invalid({root:?})");
        };

        let mut out = String::new();
        let mut visited = vec![false; self.capacity()];
        let mut stack = vec![None, Some(root)];

        while let Some(entry) = stack.pop() {
            match entry {
                Some(x) => {
                    if visited[x.index()] {
                        return "cycle detected".into();
                    }
                    visited[x.index()] = true;
                    out.push('(');
                    out.push_str(&self[x].data.to_string());

                    let children: Vec<_> = self.children(x).collect();
                    for &c in children.iter().rev() {
                        stack.push(None);
                        stack.push(Some(c));
                    }
                }
                None => out.push(')'),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Builds two structurally identical trees plus two isolated roots:
    //
    //   2               12
    //   +- 0            +- 10
    //   +- 4            +- 14
    //   |  +- 5         |  +- 15
    //   |  +- 6         |  +- 16
    //   +- 8            +- 18
    //      +- 1            +- 11
    //      +- 7            +- 17
    //   3, 9 (roots)    13, 19 (roots)
    fn fixture() -> Forest<u32> {
        let mut forest = Forest::new();
        for i in 0..20 {
            forest.create(i);
        }
        for (parent, child) in
            [(2, 8), (2, 4), (2, 0), (4, 6), (4, 5), (8, 7), (8, 1), (12, 18), (12, 14), (12, 10), (14, 16), (14, 15), (18, 17), (18, 11)]
        {
            forest.move_to(NodeId::new(child), NodeId::new(parent));
        }
        forest
    }

    fn render(forest: &Forest<u32>, root: u32) -> String {
        forest.format_subtree(Some(NodeId::new(root as usize)))
    }

    #[test]
    fn construction() {
        let forest = fixture();
        assert_eq!(forest.size(), 20);
        assert_eq!(forest.capacity(), 20);
        assert_eq!(render(&forest, 2), "(2(0)(4(5)(6))(8(1)(7)))");
        assert_eq!(render(&forest, 12), "(12(10)(14(15)(16))(18(11)(17)))");
        let roots: Vec<_> = forest.roots().map(|r| r.index()).collect();
        assert_eq!(roots, vec![2, 3, 9, 12, 13, 19]);
        assert!(forest[NodeId::new(0)].is_first_child());
        assert!(forest[NodeId::new(8)].is_last_child());
        assert!(forest[NodeId::new(3)].is_root());
        assert_eq!(forest[NodeId::new(2)].number_of_children(), 3);
        forest.check_consistency().unwrap();
    }

    #[test]
    fn traversals() {
        let forest = fixture();
        let ids = |v: Vec<NodeId>| v.into_iter().map(|x| x.index()).collect::<Vec<_>>();

        assert_eq!(ids(forest.bfs_nodes(NodeId::new(2))), vec![2, 0, 4, 8, 5, 6, 1, 7]);
        assert_eq!(ids(forest.dfs_preorder_nodes(NodeId::new(2))), vec![2, 0, 4, 5, 6, 8, 1, 7]);
        assert_eq!(ids(forest.dfs_reverse_preorder_nodes(NodeId::new(2))), vec![2, 8, 7, 1, 4, 6, 5, 0]);
        assert_eq!(ids(forest.leaves(NodeId::new(2))), vec![7, 1, 6, 5, 0]);

        let ancestors: Vec<_> = forest.ancestors(NodeId::new(5)).map(|x| x.index()).collect();
        assert_eq!(ancestors, vec![4, 2]);
        assert_eq!(forest.root_of(NodeId::new(5)), NodeId::new(2));
        assert_eq!(forest.root_of(NodeId::new(3)), NodeId::new(3));
    }

    #[test]
    fn detach() {
        let mut forest = fixture();

        forest.detach(NodeId::new(4));
        assert_eq!(render(&forest, 2), "(2(0)(8(1)(7)))");
        assert_eq!(render(&forest, 4), "(4(5)(6))");
        assert_eq!(forest[NodeId::new(2)].number_of_children(), 2);

        forest.detach(NodeId::new(0));
        assert_eq!(render(&forest, 2), "(2(8(1)(7)))");

        forest.detach(NodeId::new(8));
        assert_eq!(render(&forest, 2), "(2)");
        assert_eq!(forest[NodeId::new(2)].number_of_children(), 0);

        // detaching a root changes nothing
        forest.detach(NodeId::new(2));
        assert_eq!(render(&forest, 2), "(2)");

        assert_eq!(forest.size(), 20);
        forest.check_consistency().unwrap();
    }

    #[test]
    fn remove_and_recycle() {
        let mut forest = fixture();

        forest.remove(NodeId::new(5));
        forest.remove(NodeId::new(6));
        forest.remove(NodeId::new(4));
        assert_eq!(render(&forest, 2), "(2(0)(8(1)(7)))");
        assert_eq!(forest.size(), 17);
        assert_eq!(forest.capacity(), 20);

        // slots are recycled in removal order
        let a = forest.create(95);
        let b = forest.create(96);
        assert_eq!(a, NodeId::new(5));
        assert_eq!(b, NodeId::new(6));
        assert_eq!(forest.size(), 19);
        assert_eq!(forest.capacity(), 20);

        let c = forest.create(97);
        let d = forest.create(98);
        assert_eq!(c, NodeId::new(4));
        assert_eq!(d.index(), 20);
        assert_eq!(forest.capacity(), 21);

        forest.move_to(a, NodeId::new(2));
        forest.move_to(b, a);
        assert_eq!(render(&forest, 2), "(2(5(6))(0)(8(1)(7)))");
        forest.check_consistency().unwrap();
    }

    #[test]
    fn move_before_and_after() {
        let mut forest = fixture();

        forest.move_before(NodeId::new(14), NodeId::new(4));
        assert_eq!(render(&forest, 2), "(2(0)(14(15)(16))(4(5)(6))(8(1)(7)))");

        forest.move_before(NodeId::new(3), NodeId::new(0));
        assert_eq!(render(&forest, 2), "(2(3)(0)(14(15)(16))(4(5)(6))(8(1)(7)))");

        forest.move_after(NodeId::new(9), NodeId::new(8));
        assert_eq!(render(&forest, 2), "(2(3)(0)(14(15)(16))(4(5)(6))(8(1)(7))(9))");

        forest.move_after(NodeId::new(14), NodeId::new(4));
        assert_eq!(render(&forest, 2), "(2(3)(0)(4(5)(6))(14(15)(16))(8(1)(7))(9))");

        // move within the same sibling chain
        forest.move_before(NodeId::new(9), NodeId::new(3));
        assert_eq!(render(&forest, 2), "(2(9)(3)(0)(4(5)(6))(14(15)(16))(8(1)(7)))");

        forest.check_consistency().unwrap();
    }

    #[test]
    fn swap_trees() {
        let mut forest = fixture();

        forest.swap(NodeId::new(4), NodeId::new(14));
        assert_eq!(render(&forest, 2), "(2(0)(14(15)(16))(8(1)(7)))");
        assert_eq!(render(&forest, 12), "(12(10)(4(5)(6))(18(11)(17)))");

        // swap a subtree with a detached root
        forest.detach(NodeId::new(18));
        forest.swap(NodeId::new(18), NodeId::new(14));
        assert_eq!(render(&forest, 2), "(2(0)(18(11)(17))(8(1)(7)))");
        assert_eq!(render(&forest, 14), "(14(15)(16))");

        forest.check_consistency().unwrap();
    }

    #[test]
    fn replace() {
        let mut forest = fixture();

        forest.replace(NodeId::new(4), NodeId::new(14));
        assert_eq!(render(&forest, 2), "(2(0)(14(15)(16))(8(1)(7)))");
        assert_eq!(render(&forest, 4), "(4(5)(6))");
        forest.check_consistency().unwrap();
    }

    #[test]
    fn make_first_child() {
        let mut forest = fixture();

        forest.make_first_child(NodeId::new(8));
        assert_eq!(render(&forest, 2), "(2(8(1)(7))(0)(4(5)(6)))");

        forest.make_first_child(NodeId::new(8));
        assert_eq!(render(&forest, 2), "(2(8(1)(7))(0)(4(5)(6)))");

        forest.make_first_child(NodeId::new(2));
        assert_eq!(render(&forest, 2), "(2(8(1)(7))(0)(4(5)(6)))");

        forest.make_first_child(NodeId::new(6));
        assert_eq!(render(&forest, 2), "(2(8(1)(7))(0)(4(6)(5)))");

        forest.check_consistency().unwrap();
    }

    #[test]
    fn add_children_from() {
        let mut forest = fixture();

        forest.add_children_from(NodeId::new(2), NodeId::new(12));
        assert_eq!(render(&forest, 2), "(2(10)(14(15)(16))(18(11)(17))(0)(4(5)(6))(8(1)(7)))");
        assert_eq!(render(&forest, 12), "(12)");
        assert_eq!(forest[NodeId::new(2)].number_of_children(), 6);
        assert_eq!(forest[NodeId::new(12)].number_of_children(), 0);

        // adopting from a leaf is a no-op
        forest.add_children_from(NodeId::new(2), NodeId::new(0));
        assert_eq!(forest[NodeId::new(2)].number_of_children(), 6);

        forest.add_children_from(NodeId::new(14), NodeId::new(18));
        assert_eq!(render(&forest, 2), "(2(10)(14(11)(17)(15)(16))(18)(0)(4(5)(6))(8(1)(7)))");

        forest.check_consistency().unwrap();
    }

    #[test]
    fn replace_by_children() {
        let mut forest = fixture();

        forest.replace_by_children(NodeId::new(4));
        assert_eq!(render(&forest, 2), "(2(0)(5)(6)(8(1)(7)))");
        assert_eq!(forest[NodeId::new(2)].number_of_children(), 4);

        forest.replace_by_children(NodeId::new(8));
        assert_eq!(render(&forest, 2), "(2(0)(5)(6)(1)(7))");

        // a leaf just disappears from the chain
        forest.replace_by_children(NodeId::new(6));
        assert_eq!(render(&forest, 2), "(2(0)(5)(1)(7))");

        forest.check_consistency().unwrap();
    }

    #[test]
    fn replace_children() {
        let mut forest = fixture();

        forest.replace_children(NodeId::new(4), NodeId::new(14));
        assert_eq!(render(&forest, 2), "(2(0)(4(14(15)(16)))(8(1)(7)))");
        assert_eq!(render(&forest, 5), "(5)");
        assert_eq!(render(&forest, 6), "(6)");

        forest.replace_children(NodeId::new(2), NodeId::new(3));
        assert_eq!(render(&forest, 2), "(2(3))");

        forest.check_consistency().unwrap();
    }

    #[test]
    fn format_subtree_invalid() {
        let forest: Forest<u32> = Forest::new();
        assert_eq!(forest.format_subtree(None), "invalid(None)");
    }
}
