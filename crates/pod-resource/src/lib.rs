//! The resource engine of the pod client.
//!
//! A [`PodContext`] owns the local dataset, the transports and a registry
//! of [`Resource`] handles, one per URI. Each resource is a [`Leaf`] or a
//! [`Container`]; its requests go through a per-resource batcher, so
//! identical concurrent requests reach the pod once. Reads and writes keep
//! the dataset and the containment triples between containers and their
//! children in step with the pod. Changes spanning several resources are
//! committed with a [`TransactionCoordinator`].

pub mod containment;
pub mod context;
mod notifications;
pub mod outcome;
mod requester;
pub mod requests;
pub mod resource;
pub mod state;
pub mod transaction;
mod wac;

pub use containment::{contained_uris, propagate_containment, remove_containment};
pub use context::{PodContext, PodContextBuilder, DEFAULT_BATCH_WINDOW};
pub use outcome::{CreateOutcome, DeleteSuccess, ReadSuccess, TransactionSuccess, UpdateSuccess};
pub use requests::NewContent;
pub use resource::{Container, Leaf, Resource};
pub use state::{BinaryContent, ContentKind, FetchState, Presence};
pub use transaction::{commit_changes, split_changes_by_graph, TransactionCoordinator};
