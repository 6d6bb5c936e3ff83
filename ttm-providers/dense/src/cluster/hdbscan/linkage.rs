//! Mutual-reachability spanning tree and the single-linkage forest built
//! from it.
//!
//! The minimum spanning tree of the mutual-reachability graph encodes the
//! same single-linkage hierarchy as the full graph. Sorting its edges by
//! weight and merging components with a union-find yields the dendrogram.

use rayon::prelude::*;
use ttm_core::Matrix;

use super::union_find::DisjointSet;
use crate::distance::Metric;

/// Weighted edge between two points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct Edge {
    pub(super) left: usize,
    pub(super) right: usize,
    pub(super) weight: f64,
}

/// Prim's algorithm over the dense mutual-reachability graph, where the
/// weight of `(i, j)` is `max(core[i], core[j], distance(i, j))`.
pub(super) fn mutual_reachability_mst(vectors: &Matrix, core: &[f64], metric: Metric) -> Vec<Edge> {
    let n = vectors.rows();
    if n < 2 {
        return Vec::new();
    }
    let mut in_tree = vec![false; n];
    let mut best = vec![(f64::INFINITY, 0_usize); n];
    let mut edges = Vec::with_capacity(n - 1);
    let mut current = 0;
    in_tree[0] = true;

    for _ in 1..n {
        let anchor = vectors.row(current);
        let anchor_core = core[current];
        best.par_iter_mut()
            .enumerate()
            .filter(|(point, _)| !in_tree[*point])
            .for_each(|(point, slot)| {
                let reach = metric
                    .distance(anchor, vectors.row(point))
                    .max(anchor_core)
                    .max(core[point]);
                if reach < slot.0 {
                    *slot = (reach, current);
                }
            });
        let Some((next, &(weight, from))) = best
            .iter()
            .enumerate()
            .filter(|(point, _)| !in_tree[*point])
            .min_by(|left, right| left.1.0.total_cmp(&right.1.0))
        else {
            break;
        };
        edges.push(Edge {
            left: from,
            right: next,
            weight,
        });
        in_tree[next] = true;
        current = next;
    }
    edges
}

#[derive(Clone, Debug)]
pub(super) struct LinkageNode {
    pub(super) children: Option<(usize, usize)>,
    pub(super) weight: f64,
    pub(super) size: usize,
    pub(super) point: Option<usize>,
}

/// Binary merge tree over the points; leaves are nodes `0..n`.
#[derive(Clone, Debug)]
pub(super) struct SingleLinkageForest {
    pub(super) nodes: Vec<LinkageNode>,
    pub(super) roots: Vec<usize>,
}

impl SingleLinkageForest {
    pub(super) fn from_edges(point_count: usize, edges: &[Edge]) -> Self {
        let mut nodes: Vec<LinkageNode> = (0..point_count)
            .map(|point| LinkageNode {
                children: None,
                weight: 0.0,
                size: 1,
                point: Some(point),
            })
            .collect();

        let mut sorted = edges.to_vec();
        sorted.sort_by(|a, b| {
            a.weight
                .total_cmp(&b.weight)
                .then(a.left.cmp(&b.left))
                .then(a.right.cmp(&b.right))
        });

        let mut components = DisjointSet::new(point_count);
        for edge in sorted {
            let (left_root, right_root) = (components.find(edge.left), components.find(edge.right));
            if left_root == right_root {
                continue;
            }
            let left_node = components.component_node[left_root];
            let right_node = components.component_node[right_root];
            let merged_node = nodes.len();
            nodes.push(LinkageNode {
                children: Some((left_node, right_node)),
                weight: edge.weight,
                size: nodes[left_node].size + nodes[right_node].size,
                point: None,
            });
            let merged = components.union(left_root, right_root);
            components.component_node[merged] = merged_node;
        }

        let mut roots: Vec<usize> = (0..point_count)
            .filter_map(|point| {
                let root = components.find(point);
                (root == point).then_some(components.component_node[root])
            })
            .collect();
        roots.sort_unstable();
        Self { nodes, roots }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[f64]) -> Matrix {
        Matrix::from_flat(points.len(), 1, points.to_vec()).expect("one column")
    }

    #[test]
    fn spanning_tree_links_neighbours_on_a_line() {
        let points = line(&[0.0, 1.0, 3.0, 7.0]);
        let edges = mutual_reachability_mst(&points, &[0.0; 4], Metric::Euclidean);
        let mut weights: Vec<f64> = edges.iter().map(|edge| edge.weight).collect();
        weights.sort_by(f64::total_cmp);
        assert_eq!(weights, vec![1.0, 2.0, 4.0]);
    }

    #[test]
    fn core_distances_raise_edge_weights() {
        let points = line(&[0.0, 1.0]);
        let edges = mutual_reachability_mst(&points, &[0.5, 3.0], Metric::Euclidean);
        assert_eq!(edges, vec![Edge { left: 0, right: 1, weight: 3.0 }]);
    }

    #[test]
    fn forest_root_spans_every_point() {
        let edges = [
            Edge { left: 0, right: 1, weight: 1.0 },
            Edge { left: 1, right: 2, weight: 2.0 },
        ];
        let forest = SingleLinkageForest::from_edges(3, &edges);
        assert_eq!(forest.roots, vec![4]);
        assert_eq!(forest.nodes[4].size, 3);
        assert_eq!(forest.nodes[4].weight, 2.0);
        assert_eq!(forest.nodes[3].children, Some((0, 1)));
    }
}
