use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use pod_types::{GraphName, Quad, Term};

use crate::changes::DatasetChanges;
use crate::traits::Dataset;
use crate::transaction::DatasetTransaction;

/// In-memory, `BTreeSet`-based quad store.
///
/// All quads are held behind a `RwLock`. Pattern matching is a linear scan,
/// which is adequate for the per-pod working sets a client caches.
pub struct InMemoryDataset {
    quads: RwLock<BTreeSet<Quad>>,
}

impl InMemoryDataset {
    /// Create a new empty dataset.
    pub fn new() -> Self {
        Self {
            quads: RwLock::new(BTreeSet::new()),
        }
    }

    /// Create a dataset pre-populated with quads.
    pub fn from_quads(quads: impl IntoIterator<Item = Quad>) -> Self {
        Self {
            quads: RwLock::new(quads.into_iter().collect()),
        }
    }

    /// Snapshot of every quad, in sorted order.
    pub fn all_quads(&self) -> Vec<Quad> {
        self.quads.read().expect("lock poisoned").iter().cloned().collect()
    }
}

impl Default for InMemoryDataset {
    fn default() -> Self {
        Self::new()
    }
}

fn quad_matches(
    quad: &Quad,
    subject: Option<&Term>,
    predicate: Option<&Term>,
    object: Option<&Term>,
    graph: Option<&GraphName>,
) -> bool {
    subject.map_or(true, |s| &quad.subject == s)
        && predicate.map_or(true, |p| &quad.predicate == p)
        && object.map_or(true, |o| &quad.object == o)
        && graph.map_or(true, |g| &quad.graph == g)
}

impl Dataset for InMemoryDataset {
    fn match_quads(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: Option<&GraphName>,
    ) -> Vec<Quad> {
        let quads = self.quads.read().expect("lock poisoned");
        quads
            .iter()
            .filter(|q| quad_matches(q, subject, predicate, object, graph))
            .cloned()
            .collect()
    }

    fn contains(&self, quad: &Quad) -> bool {
        self.quads.read().expect("lock poisoned").contains(quad)
    }

    fn add(&self, quad: Quad) -> bool {
        self.quads.write().expect("lock poisoned").insert(quad)
    }

    fn delete(&self, quad: &Quad) -> bool {
        self.quads.write().expect("lock poisoned").remove(quad)
    }

    fn delete_matches(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: Option<&GraphName>,
    ) -> usize {
        let mut quads = self.quads.write().expect("lock poisoned");
        let before = quads.len();
        quads.retain(|q| !quad_matches(q, subject, predicate, object, graph));
        before - quads.len()
    }

    fn apply(&self, changes: &DatasetChanges) {
        let mut quads = self.quads.write().expect("lock poisoned");
        for quad in &changes.removed {
            quads.remove(quad);
        }
        for quad in &changes.added {
            quads.insert(quad.clone());
        }
    }

    fn len(&self) -> usize {
        self.quads.read().expect("lock poisoned").len()
    }

    fn start_transaction(self: Arc<Self>) -> DatasetTransaction {
        DatasetTransaction::new(self)
    }

    fn replace_graph(&self, graph: &GraphName, replacement: Vec<Quad>) {
        let mut quads = self.quads.write().expect("lock poisoned");
        quads.retain(|q| &q.graph != graph);
        quads.extend(replacement.into_iter().map(|q| q.in_graph(graph.clone())));
    }
}

impl std::fmt::Debug for InMemoryDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDataset")
            .field("quad_count", &self.len())
            .finish()
    }
}
