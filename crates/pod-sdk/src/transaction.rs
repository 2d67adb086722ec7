use std::sync::Arc;

use tracing::debug;

use pod_resource::{PodContext, TransactionCoordinator, TransactionSuccess};
use pod_store::{DatasetChanges, DatasetTransaction};
use pod_types::{GraphName, Quad, Term};

use crate::error::SdkResult;

/// Buffered edits to the client's dataset.
///
/// Reads through the transaction see the edits; the dataset itself is
/// untouched until [`commit`](Self::commit) sends each graph's share to its
/// resource.
pub struct PodTransaction {
    context: Arc<PodContext>,
    buffer: DatasetTransaction,
}

impl PodTransaction {
    pub(crate) fn new(context: Arc<PodContext>) -> Self {
        let buffer = Arc::clone(context.dataset()).start_transaction();
        Self { context, buffer }
    }

    pub fn add(&mut self, quad: Quad) -> &mut Self {
        self.buffer.add(quad);
        self
    }

    pub fn delete(&mut self, quad: &Quad) -> &mut Self {
        self.buffer.delete(quad);
        self
    }

    pub fn match_quads(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: Option<&GraphName>,
    ) -> Vec<Quad> {
        self.buffer.match_quads(subject, predicate, object, graph)
    }

    pub fn changes(&self) -> DatasetChanges {
        self.buffer.changes()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Send the buffered edits. Graphs that fail are rolled back, the rest
    /// stay committed.
    pub async fn commit(self) -> SdkResult<TransactionSuccess> {
        let changes = self.buffer.into_changes();
        debug!(added = changes.added.len(), removed = changes.removed.len(), "committing pod transaction");
        let coordinator = TransactionCoordinator::new(self.context);
        Ok(coordinator.commit(&changes).await?)
    }

    pub fn rollback(self) {
        self.buffer.rollback();
    }
}

impl std::fmt::Debug for PodTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PodTransaction").field("buffer", &self.buffer).finish()
    }
}
