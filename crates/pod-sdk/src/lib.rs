//! High-level SDK for the pod client.
//!
//! [`PodClient`] is the entry point for applications: it owns the local
//! dataset and transports, hands out resources, runs transactions and
//! finds a WebID's storage.

pub mod client;
pub mod config;
pub mod error;
pub mod transaction;

pub use client::PodClient;
pub use config::ClientConfig;
pub use error::{SdkError, SdkResult};
pub use transaction::PodTransaction;

// Re-export key types
pub use pod_notify::{NotificationCallback, NotificationConfig, NotificationEvent};
pub use pod_resource::{
    Container, CreateOutcome, DeleteSuccess, FetchState, Leaf, Presence, ReadSuccess, Resource,
    TransactionSuccess, UpdateSuccess,
};
pub use pod_store::DatasetChanges;
pub use pod_types::{AccessModeList, GraphName, Quad, ResourceError, Term, WacRule};
pub use pod_wac::EffectiveRule;
