use std::collections::BTreeSet;
use std::sync::Arc;

use pod_types::{GraphName, Quad, Term};

use crate::changes::DatasetChanges;
use crate::traits::Dataset;

/// Buffered view over a dataset.
///
/// Additions and deletions are recorded against the base dataset without
/// touching it. Reads through the transaction see the buffered state.
/// `commit` applies the buffer; `rollback` (or dropping) discards it.
pub struct DatasetTransaction {
    base: Arc<dyn Dataset>,
    added: BTreeSet<Quad>,
    removed: BTreeSet<Quad>,
}

impl DatasetTransaction {
    pub fn new(base: Arc<dyn Dataset>) -> Self {
        Self {
            base,
            added: BTreeSet::new(),
            removed: BTreeSet::new(),
        }
    }

    /// Record an addition. Adding a quad the base already holds is a no-op;
    /// adding one deleted earlier in this transaction cancels the delete.
    pub fn add(&mut self, quad: Quad) {
        if self.removed.remove(&quad) {
            return;
        }
        if !self.base.contains(&quad) {
            self.added.insert(quad);
        }
    }

    /// Record a deletion, cancelling an earlier addition if there was one.
    pub fn delete(&mut self, quad: &Quad) {
        if self.added.remove(quad) {
            return;
        }
        if self.base.contains(quad) {
            self.removed.insert(quad.clone());
        }
    }

    /// Pattern match against the buffered state.
    pub fn match_quads(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: Option<&GraphName>,
    ) -> Vec<Quad> {
        let mut out: Vec<Quad> = self
            .base
            .match_quads(subject, predicate, object, graph)
            .into_iter()
            .filter(|q| !self.removed.contains(q))
            .collect();
        out.extend(
            self.added
                .iter()
                .filter(|q| {
                    subject.map_or(true, |s| &q.subject == s)
                        && predicate.map_or(true, |p| &q.predicate == p)
                        && object.map_or(true, |o| &q.object == o)
                        && graph.map_or(true, |g| &q.graph == g)
                })
                .cloned(),
        );
        out
    }

    /// The buffered changes, without applying them.
    pub fn changes(&self) -> DatasetChanges {
        DatasetChanges {
            added: self.added.iter().cloned().collect(),
            removed: self.removed.iter().cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Consume the transaction, returning its changes unapplied.
    pub fn into_changes(self) -> DatasetChanges {
        DatasetChanges {
            added: self.added.into_iter().collect(),
            removed: self.removed.into_iter().collect(),
        }
    }

    /// Apply the buffered changes to the base dataset.
    pub fn commit(self) -> DatasetChanges {
        let base = Arc::clone(&self.base);
        let changes = self.into_changes();
        base.apply(&changes);
        changes
    }

    /// Discard the buffered changes.
    pub fn rollback(self) {}
}

impl std::fmt::Debug for DatasetTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasetTransaction")
            .field("added", &self.added.len())
            .field("removed", &self.removed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDataset;

    fn quad(s: &str) -> Quad {
        Quad::iris(s, "http://p", "http://o", GraphName::named("http://g"))
    }

    #[test]
    fn buffered_until_commit() {
        let ds = Arc::new(InMemoryDataset::new());
        let mut tx = Arc::clone(&ds).start_transaction();
        tx.add(quad("http://a"));
        assert_eq!(ds.len(), 0);
        assert_eq!(tx.match_quads(None, None, None, None).len(), 1);

        let changes = tx.commit();
        assert_eq!(changes.added.len(), 1);
        assert!(ds.contains(&quad("http://a")));
    }

    #[test]
    fn rollback_discards() {
        let ds = Arc::new(InMemoryDataset::new());
        ds.add(quad("http://keep"));
        let mut tx = Arc::clone(&ds).start_transaction();
        tx.delete(&quad("http://keep"));
        tx.add(quad("http://new"));
        assert_eq!(tx.match_quads(None, None, None, None), vec![quad("http://new")]);
        tx.rollback();
        assert_eq!(ds.all_quads(), vec![quad("http://keep")]);
    }

    #[test]
    fn add_then_delete_cancels() {
        let ds = Arc::new(InMemoryDataset::new());
        let mut tx = Arc::clone(&ds).start_transaction();
        tx.add(quad("http://a"));
        tx.delete(&quad("http://a"));
        assert!(tx.is_empty());
    }

    #[test]
    fn redundant_operations_are_dropped() {
        let ds = Arc::new(InMemoryDataset::new());
        ds.add(quad("http://present"));
        let mut tx = Arc::clone(&ds).start_transaction();
        tx.add(quad("http://present"));
        tx.delete(&quad("http://absent"));
        assert!(tx.changes().is_empty());
    }

    #[test]
    fn delete_then_readd_cancels() {
        let ds = Arc::new(InMemoryDataset::new());
        ds.add(quad("http://a"));
        let mut tx = Arc::clone(&ds).start_transaction();
        tx.delete(&quad("http://a"));
        tx.add(quad("http://a"));
        assert!(tx.into_changes().is_empty());
    }
}
