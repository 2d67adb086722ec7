use std::sync::Arc;

use pod_types::{GraphName, Quad, Term};

use crate::changes::DatasetChanges;
use crate::transaction::DatasetTransaction;

/// Shared quad store holding the local copy of every fetched resource.
///
/// All implementations must satisfy these invariants:
/// - `None` in a pattern position matches any term.
/// - `apply` removes before it adds.
/// - Methods never block on I/O; they are safe to call while holding no
///   other locks and from any task.
pub trait Dataset: Send + Sync {
    /// Every quad matching the pattern.
    fn match_quads(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: Option<&GraphName>,
    ) -> Vec<Quad>;

    fn contains(&self, quad: &Quad) -> bool;

    /// Insert a quad. Returns `true` if it was not already present.
    fn add(&self, quad: Quad) -> bool;

    /// Remove a quad. Returns `true` if it was present.
    fn delete(&self, quad: &Quad) -> bool;

    /// Remove every quad matching the pattern and return how many went.
    fn delete_matches(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: Option<&GraphName>,
    ) -> usize;

    /// Apply a change set: removals first, then additions.
    fn apply(&self, changes: &DatasetChanges);

    /// Total number of quads.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Begin a buffered transaction over this dataset.
    fn start_transaction(self: Arc<Self>) -> DatasetTransaction;

    /// Every quad in one graph.
    fn graph_quads(&self, graph: &GraphName) -> Vec<Quad> {
        self.match_quads(None, None, None, Some(graph))
    }

    /// Replace the full contents of a graph.
    fn replace_graph(&self, graph: &GraphName, quads: Vec<Quad>) {
        self.delete_matches(None, None, None, Some(graph));
        for quad in quads {
            self.add(quad.in_graph(graph.clone()));
        }
    }
}
