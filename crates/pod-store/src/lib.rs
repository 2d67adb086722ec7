//! Local RDF storage for the pod client.
//!
//! Every remote resource's triples are cached in one shared quad dataset,
//! each resource in the named graph equal to its URI. This crate provides
//! that dataset and the Turtle codec used to move triples over the wire.
//!
//! # Components
//!
//! - [`Dataset`] -- the quad store interface the resource engine mutates
//! - [`InMemoryDataset`] -- `RwLock`-guarded implementation
//! - [`DatasetTransaction`] -- buffered adds/deletes with commit/rollback
//! - [`DatasetChanges`] -- the added/removed quads a transaction produced
//! - [`RdfCodec`] / [`TurtleCodec`] -- parse and serialize `text/turtle`
//!
//! # Design Rules
//!
//! 1. The dataset never talks to the network; remote effects are the
//!    resource layer's job.
//! 2. Removals are applied before additions, so a change set that removes
//!    and re-adds a quad leaves it present.
//! 3. Parsing yields default-graph quads; callers move them into the
//!    resource's graph.

pub mod changes;
pub mod codec;
pub mod error;
pub mod memory;
pub mod traits;
pub mod transaction;
pub mod turtle;

pub use changes::DatasetChanges;
pub use codec::{RdfCodec, TURTLE_MEDIA_TYPE};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryDataset;
pub use traits::Dataset;
pub use transaction::DatasetTransaction;
pub use turtle::TurtleCodec;
