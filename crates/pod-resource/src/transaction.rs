//! Committing changes that span several resources.
//!
//! Changes are split by graph. The default graph is local only and is
//! applied directly; every named graph must be a leaf and is sent to the
//! pod as that leaf's own update. Graphs are independent: a failed graph
//! is rolled back while the others stay committed.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use pod_store::DatasetChanges;
use pod_types::{is_container_uri, AggregateError, GraphName, ResourceError, ResourceResult};

use crate::context::PodContext;
use crate::outcome::{TransactionSuccess, UpdateSuccess};

/// Partition `changes` into one set of changes per graph.
pub fn split_changes_by_graph(changes: &DatasetChanges) -> BTreeMap<GraphName, DatasetChanges> {
    changes.split_by_graph()
}

/// Sends the per-graph parts of a change set to their resources.
#[derive(Clone, Debug)]
pub struct TransactionCoordinator {
    context: Arc<PodContext>,
}

impl TransactionCoordinator {
    pub fn new(context: Arc<PodContext>) -> Self {
        Self { context }
    }

    /// Commit `changes`, one update per graph, all graphs concurrently.
    ///
    /// Succeeds only if every graph succeeded. Otherwise the error is an
    /// [`AggregateError`] of each failed graph's error.
    pub async fn commit(&self, changes: &DatasetChanges) -> ResourceResult<TransactionSuccess> {
        let parts = split_changes_by_graph(changes);
        debug!(graphs = parts.len(), added = changes.added.len(), removed = changes.removed.len(), "committing changes");

        let results = join_all(parts.into_iter().map(|(graph, part)| self.commit_graph(graph, part))).await;

        let mut successes = Vec::new();
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(success) => successes.push(success),
                Err(e) => errors.push(e),
            }
        }
        if !errors.is_empty() {
            warn!(failed = errors.len(), committed = successes.len(), "transaction partially failed");
            return Err(AggregateError::new(errors).into());
        }
        info!(graphs = successes.len(), "transaction committed");
        Ok(TransactionSuccess { results: successes })
    }

    async fn commit_graph(&self, graph: GraphName, part: DatasetChanges) -> ResourceResult<UpdateSuccess> {
        match graph {
            GraphName::DefaultGraph => {
                self.context.dataset().apply(&part);
                Ok(UpdateSuccess::DefaultGraph)
            }
            GraphName::Named(uri) if is_container_uri(&uri) => Err(ResourceError::invalid_uri(
                uri,
                "container graphs are managed by the pod and cannot be updated",
            )),
            GraphName::Named(uri) => self.context.leaf(&uri)?.update(part).await,
        }
    }
}

/// Commit `changes` against `context` with a one-off coordinator.
pub async fn commit_changes(context: &Arc<PodContext>, changes: &DatasetChanges) -> ResourceResult<TransactionSuccess> {
    TransactionCoordinator::new(Arc::clone(context)).commit(changes).await
}
