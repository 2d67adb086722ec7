//! Foundation types for the pod client.
//!
//! This crate provides the identity, RDF and access-control types used
//! throughout the workspace. Every other crate depends on `pod-types`.
//!
//! # Key Types
//!
//! - [`Term`], [`Quad`], [`GraphName`] -- the RDF data model shared with the dataset
//! - [`AccessModeList`], [`WacRule`] -- Web Access Control permissions
//! - [`ResourceError`] -- the error taxonomy every resource operation reports
//! - [`AggregateError`] -- a flat list of errors from multi-resource operations
//!
//! URIs are plain strings; the [`uri`] module classifies and walks them
//! structurally (a container URI is one whose path ends in `/`).

pub mod access;
pub mod error;
pub mod term;
pub mod uri;
pub mod vocab;

pub use access::{AccessModeList, WacRule};
pub use error::{
    AggregateError, HttpError, HttpErrorKind, ResourceError, ResourceResult, TypeError,
};
pub use term::{GraphName, Literal, Quad, Term};
pub use uri::{
    child_uri, is_container_uri, is_leaf_uri, normalize_uri, parent_uri, resolve_uri, slug,
};
