use std::collections::{BTreeMap, BTreeSet};

use pod_types::{GraphName, Quad};

/// Quads added and removed by a transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatasetChanges {
    pub added: Vec<Quad>,
    pub removed: Vec<Quad>,
}

impl DatasetChanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_added(mut self, quad: Quad) -> Self {
        self.added.push(quad);
        self
    }

    pub fn with_removed(mut self, quad: Quad) -> Self {
        self.removed.push(quad);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Every graph touched by an addition or removal.
    pub fn graphs(&self) -> BTreeSet<GraphName> {
        self.added
            .iter()
            .chain(self.removed.iter())
            .map(|q| q.graph.clone())
            .collect()
    }

    /// Partition the changes by graph.
    pub fn split_by_graph(&self) -> BTreeMap<GraphName, DatasetChanges> {
        let mut out: BTreeMap<GraphName, DatasetChanges> = BTreeMap::new();
        for quad in &self.added {
            out.entry(quad.graph.clone()).or_default().added.push(quad.clone());
        }
        for quad in &self.removed {
            out.entry(quad.graph.clone()).or_default().removed.push(quad.clone());
        }
        out
    }
}
