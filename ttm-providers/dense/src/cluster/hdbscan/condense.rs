//! HDBSCAN condensed tree, cluster selection and labelling.
//!
//! Condensation walks the single-linkage forest top-down with
//! `min_cluster_size`:
//!
//! - When both branches of a split are large enough, the parent ends and two
//!   child clusters are born at the split lambda.
//! - When only one branch is large enough, the cluster continues down that
//!   branch and the points of the small branch fall out at the split lambda.
//! - When neither branch is large enough, the cluster ends and all its
//!   remaining points fall out.

use clap::ValueEnum;

use super::linkage::SingleLinkageForest;
use crate::cluster::NOISE;

/// How flat clusters are picked from the condensed tree.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Selection {
    /// Excess of mass: keep the most persistent clusters.
    #[default]
    Eom,
    /// Keep every leaf of the condensed tree.
    Leaf,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Event {
    Point { index: usize },
    Child { cluster: usize },
}

#[derive(Clone, Debug, PartialEq)]
struct CondensedCluster {
    birth_lambda: f64,
    stability: f64,
    events: Vec<Event>,
    children: Vec<usize>,
}

impl CondensedCluster {
    const fn new(birth_lambda: f64) -> Self {
        Self {
            birth_lambda,
            stability: 0.0,
            events: Vec::new(),
            children: Vec::new(),
        }
    }

    #[expect(clippy::cast_precision_loss, clippy::float_arithmetic, reason = "stability is a float sum")]
    fn record(&mut self, event: Event, lambda: f64, size: usize) {
        self.events.push(event);
        self.stability += (lambda - self.birth_lambda) * size as f64;
    }
}

/// Density at which a merge happens; zero distances map to a large finite
/// lambda so stabilities stay finite.
#[expect(clippy::float_arithmetic, reason = "lambda is the inverse distance")]
fn weight_to_lambda(weight: f64) -> f64 {
    1.0 / weight.max(f64::EPSILON)
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct CondensedTree {
    clusters: Vec<CondensedCluster>,
    roots: Vec<usize>,
}

impl CondensedTree {
    pub(super) fn build(forest: &SingleLinkageForest, min_cluster_size: usize) -> Self {
        let mut tree = Self {
            clusters: Vec::new(),
            roots: Vec::new(),
        };
        for &root in &forest.roots {
            // Components smaller than the minimum become noise.
            if forest.nodes[root].size < min_cluster_size {
                continue;
            }
            let cluster = tree.clusters.len();
            tree.clusters.push(CondensedCluster::new(0.0));
            tree.roots.push(cluster);
            CondenseBuilder {
                forest,
                min_cluster_size,
                clusters: &mut tree.clusters,
            }
            .condense(root, cluster);
        }
        tree
    }

    /// Selected cluster ids in ascending order.
    pub(super) fn select(&self, selection: Selection) -> Vec<usize> {
        let mut selected = Vec::new();
        for &root in &self.roots {
            // A root is never selected on its own, so a tree that never
            // splits is all noise.
            for &child in &self.clusters[root].children {
                match selection {
                    Selection::Eom => {
                        self.select_stable(child, &mut selected);
                    }
                    Selection::Leaf => self.select_leaves(child, &mut selected),
                }
            }
        }
        selected.sort_unstable();
        selected
    }

    #[expect(clippy::float_arithmetic, reason = "stability is a float sum")]
    fn select_stable(&self, cluster_id: usize, selected: &mut Vec<usize>) -> f64 {
        let cluster = &self.clusters[cluster_id];
        if cluster.children.is_empty() {
            selected.push(cluster_id);
            return cluster.stability;
        }
        let before = selected.len();
        let child_score: f64 = cluster
            .children
            .iter()
            .map(|&child| self.select_stable(child, selected))
            .sum();
        if child_score > cluster.stability {
            return child_score;
        }
        selected.truncate(before);
        selected.push(cluster_id);
        cluster.stability
    }

    fn select_leaves(&self, cluster_id: usize, selected: &mut Vec<usize>) {
        let cluster = &self.clusters[cluster_id];
        if cluster.children.is_empty() {
            selected.push(cluster_id);
        }
        for &child in &cluster.children {
            self.select_leaves(child, selected);
        }
    }

    /// Label every point by the selected cluster containing it; points outside
    /// every selected cluster are [`NOISE`].
    #[expect(clippy::cast_possible_wrap, reason = "cluster counts fit in i64")]
    pub(super) fn labels(&self, point_count: usize, selected: &[usize]) -> Vec<i64> {
        let mut lookup = vec![None; self.clusters.len()];
        for (label, &cluster) in selected.iter().enumerate() {
            lookup[cluster] = Some(label as i64);
        }
        let mut labels = vec![NOISE; point_count];
        for &root in &self.roots {
            self.label_cluster(root, None, &lookup, &mut labels);
        }
        labels
    }

    fn label_cluster(&self, cluster_id: usize, inherited: Option<i64>, lookup: &[Option<i64>], labels: &mut [i64]) {
        let label = lookup[cluster_id].or(inherited);
        for event in &self.clusters[cluster_id].events {
            match *event {
                Event::Point { index } => labels[index] = label.unwrap_or(NOISE),
                Event::Child { cluster } => self.label_cluster(cluster, label, lookup, labels),
            }
        }
    }
}

struct CondenseBuilder<'a> {
    forest: &'a SingleLinkageForest,
    min_cluster_size: usize,
    clusters: &'a mut Vec<CondensedCluster>,
}

impl CondenseBuilder<'_> {
    fn condense(&mut self, node_id: usize, cluster_id: usize) {
        let node = &self.forest.nodes[node_id];
        let Some((left, right)) = node.children else {
            if let Some(point) = node.point {
                let birth = self.clusters[cluster_id].birth_lambda;
                self.clusters[cluster_id].record(Event::Point { index: point }, birth, 1);
            }
            return;
        };

        let lambda = weight_to_lambda(node.weight);
        let left_size = self.forest.nodes[left].size;
        let right_size = self.forest.nodes[right].size;
        match (left_size >= self.min_cluster_size, right_size >= self.min_cluster_size) {
            (true, true) => {
                let left_cluster = self.child_cluster(cluster_id, lambda, left_size);
                let right_cluster = self.child_cluster(cluster_id, lambda, right_size);
                self.condense(left, left_cluster);
                self.condense(right, right_cluster);
            }
            (true, false) => {
                self.fall_out(right, cluster_id, lambda);
                self.condense(left, cluster_id);
            }
            (false, true) => {
                self.fall_out(left, cluster_id, lambda);
                self.condense(right, cluster_id);
            }
            (false, false) => {
                self.fall_out(left, cluster_id, lambda);
                self.fall_out(right, cluster_id, lambda);
            }
        }
    }

    fn child_cluster(&mut self, parent: usize, lambda: f64, size: usize) -> usize {
        let child = self.clusters.len();
        self.clusters.push(CondensedCluster::new(lambda));
        let parent = &mut self.clusters[parent];
        parent.children.push(child);
        parent.record(Event::Child { cluster: child }, lambda, size);
        child
    }

    fn fall_out(&mut self, node_id: usize, cluster_id: usize, lambda: f64) {
        let mut stack = vec![node_id];
        while let Some(current) = stack.pop() {
            let node = &self.forest.nodes[current];
            if let Some(point) = node.point {
                self.clusters[cluster_id].record(Event::Point { index: point }, lambda, 1);
            }
            if let Some((left, right)) = node.children {
                stack.push(left);
                stack.push(right);
            }
        }
    }
}
