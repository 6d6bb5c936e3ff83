//! Disjoint-set union over point indices.
//!
//! Tracks, for each component root, the linkage node that currently
//! represents the whole component, so merges can be recorded as tree nodes.

#[derive(Clone, Debug)]
pub(crate) struct DisjointSet {
    parent: Vec<usize>,
    rank: Vec<u8>,
    pub(super) component_node: Vec<usize>,
}

impl DisjointSet {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
            component_node: (0..size).collect(),
        }
    }

    /// Root of `node`'s component, compressing the path on the way.
    pub(crate) fn find(&mut self, mut node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merge the components of `left` and `right`, returning the new root.
    pub(crate) fn union(&mut self, left: usize, right: usize) -> usize {
        let (mut left, mut right) = (self.find(left), self.find(right));
        if left == right {
            return left;
        }
        if self.rank[left] < self.rank[right] {
            std::mem::swap(&mut left, &mut right);
        }
        self.parent[right] = left;
        if self.rank[left] == self.rank[right] {
            self.rank[left] = self.rank[left].saturating_add(1);
        }
        left
    }
}
