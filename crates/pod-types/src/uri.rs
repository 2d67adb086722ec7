//! Structural helpers for resource URIs.
//!
//! A container URI is one whose path ends in `/`; every other URI names a
//! leaf. The distinction is always recomputed from the string, never stored.

use url::Url;

use crate::error::TypeError;

/// Strip the fragment (`#...`) from a URI.
///
/// Resources are keyed by their normalised URI, so `doc.ttl#me` and
/// `doc.ttl` refer to the same resource.
pub fn normalize_uri(uri: &str) -> &str {
    match uri.find('#') {
        Some(idx) => &uri[..idx],
        None => uri,
    }
}

/// Returns `true` if the URI's path ends in `/`.
pub fn is_container_uri(uri: &str) -> bool {
    let (_, path) = split_origin(uri);
    path.ends_with('/')
}

/// Returns `true` if the URI names a leaf (non-container) resource.
pub fn is_leaf_uri(uri: &str) -> bool {
    !is_container_uri(uri)
}

/// The URI of the container holding `uri`, or `None` for the top of the
/// hierarchy (`https://pod.example/`).
pub fn parent_uri(uri: &str) -> Option<String> {
    let (origin, path) = split_origin(uri);
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return None;
    }
    let idx = trimmed.rfind('/')?;
    Some(format!("{origin}{}", &trimmed[..=idx]))
}

/// The last path segment of a URI, without any trailing `/`.
///
/// This is the value sent in the `Slug` header when creating the resource.
pub fn slug(uri: &str) -> String {
    let (_, path) = split_origin(uri);
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    match trimmed.rfind('/') {
        Some(idx) => trimmed[idx + 1..].to_string(),
        None => trimmed.to_string(),
    }
}

/// Join a container URI and a child slug.
pub fn child_uri(container: &str, slug: &str) -> String {
    let base = normalize_uri(container);
    if base.ends_with('/') {
        format!("{base}{slug}")
    } else {
        format!("{base}/{slug}")
    }
}

/// Resolve a possibly-relative reference against a base URI.
pub fn resolve_uri(base: &str, reference: &str) -> Result<String, TypeError> {
    let base = Url::parse(base).map_err(|e| TypeError::InvalidUri {
        uri: base.to_string(),
        reason: e.to_string(),
    })?;
    let joined = base.join(reference).map_err(|e| TypeError::InvalidUri {
        uri: reference.to_string(),
        reason: e.to_string(),
    })?;
    Ok(joined.to_string())
}

/// Split a URI into `(scheme://authority, path)`, dropping query and
/// fragment. A URI with no path yields `/`.
fn split_origin(uri: &str) -> (&str, &str) {
    let uri = normalize_uri(uri);
    let uri = match uri.find('?') {
        Some(idx) => &uri[..idx],
        None => uri,
    };
    let authority_start = uri.find("://").map(|i| i + 3).unwrap_or(0);
    match uri[authority_start..].find('/') {
        Some(rel) => {
            let idx = authority_start + rel;
            (&uri[..idx], &uri[idx..])
        }
        None => (uri, "/"),
    }
}
