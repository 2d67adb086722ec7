use std::fmt;

use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid uri {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },
}

/// Classification of a failed HTTP exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpErrorKind {
    /// 5xx status.
    Server,
    /// 401 status.
    Unauthenticated,
    /// 404 where absence is not an expected outcome.
    NotFound,
    /// Any other status outside 2xx (304 excepted).
    Unexpected,
}

impl HttpErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Server => "serverError",
            Self::Unauthenticated => "unauthenticatedError",
            Self::NotFound => "notFoundError",
            Self::Unexpected => "unexpectedHttpError",
        }
    }
}

/// An HTTP response the client could not accept.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message} ({status} from {uri})")]
pub struct HttpError {
    pub kind: HttpErrorKind,
    pub uri: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub message: String,
}

impl HttpError {
    /// Case-insensitive lookup of a response header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Every way a resource operation can fail.
///
/// Public operations never panic and never return a bare transport error:
/// everything is folded into one of these variants.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResourceError {
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The pod answered in a way the protocol does not allow.
    #[error("noncompliant pod at {uri}: {message}")]
    NoncompliantPod { uri: String, message: String },

    #[error("no root container found for {uri}")]
    NoRootContainer { uri: String },

    /// The operation does not apply to this URI.
    #[error("invalid uri {uri}: {message}")]
    InvalidUri { uri: String, message: String },

    /// Anything thrown along the way: transport failures, panics, codec errors.
    #[error("unexpected error for {uri}: {message}")]
    Unexpected { uri: String, message: String },

    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

impl ResourceError {
    pub fn noncompliant(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NoncompliantPod { uri: uri.into(), message: message.into() }
    }

    pub fn unexpected(uri: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Unexpected { uri: uri.into(), message: message.to_string() }
    }

    pub fn invalid_uri(uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUri { uri: uri.into(), message: message.into() }
    }

    /// Stable discriminant, e.g. `"noncompliantPodError"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Http(e) => e.kind.as_str(),
            Self::NoncompliantPod { .. } => "noncompliantPodError",
            Self::NoRootContainer { .. } => "noRootContainerError",
            Self::InvalidUri { .. } => "invalidUriError",
            Self::Unexpected { .. } => "unexpectedResourceError",
            Self::Aggregate(_) => "aggregateError",
        }
    }

    /// The URI the error concerns; aggregates have none of their own.
    pub fn uri(&self) -> Option<&str> {
        match self {
            Self::Http(e) => Some(&e.uri),
            Self::NoncompliantPod { uri, .. }
            | Self::NoRootContainer { uri }
            | Self::InvalidUri { uri, .. }
            | Self::Unexpected { uri, .. } => Some(uri),
            Self::Aggregate(_) => None,
        }
    }

    /// HTTP status for HTTP errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => Some(e.status),
            _ => None,
        }
    }

    pub fn http_kind(&self) -> Option<HttpErrorKind> {
        match self {
            Self::Http(e) => Some(e.kind),
            _ => None,
        }
    }
}

/// A flat list of errors from a multi-resource operation.
///
/// Building an aggregate out of aggregates splices their children in, so
/// the list never nests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregateError {
    errors: Vec<ResourceError>,
}

impl AggregateError {
    pub fn new(errors: impl IntoIterator<Item = ResourceError>) -> Self {
        let mut flat = Vec::new();
        for error in errors {
            match error {
                ResourceError::Aggregate(inner) => flat.extend(inner.errors),
                other => flat.push(other),
            }
        }
        Self { errors: flat }
    }

    pub fn errors(&self) -> &[ResourceError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ResourceError> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s) occurred", self.errors.len())?;
        for (i, e) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Result alias for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16, kind: HttpErrorKind) -> ResourceError {
        ResourceError::Http(HttpError {
            kind,
            uri: "https://pod.example/x".into(),
            status,
            headers: vec![("Content-Type".into(), "text/plain".into())],
            message: "bad".into(),
        })
    }

    #[test]
    fn aggregate_flattens_nested() {
        let inner = AggregateError::new(vec![
            http(500, HttpErrorKind::Server),
            ResourceError::noncompliant("u", "m"),
        ]);
        let outer = AggregateError::new(vec![
            ResourceError::Aggregate(inner),
            ResourceError::unexpected("u", "boom"),
        ]);
        assert_eq!(outer.len(), 3);
        assert!(outer.errors().iter().all(|e| !matches!(e, ResourceError::Aggregate(_))));
    }

    #[test]
    fn kinds_are_stable() {
        assert_eq!(http(500, HttpErrorKind::Server).kind(), "serverError");
        assert_eq!(http(401, HttpErrorKind::Unauthenticated).kind(), "unauthenticatedError");
        assert_eq!(ResourceError::NoRootContainer { uri: "u".into() }.kind(), "noRootContainerError");
        assert_eq!(ResourceError::Aggregate(AggregateError::new(vec![])).kind(), "aggregateError");
    }

    #[test]
    fn http_error_accessors() {
        let e = http(404, HttpErrorKind::NotFound);
        assert_eq!(e.status(), Some(404));
        assert_eq!(e.uri(), Some("https://pod.example/x"));
        assert_eq!(e.http_kind(), Some(HttpErrorKind::NotFound));
        if let ResourceError::Http(inner) = &e {
            assert_eq!(inner.header("content-type"), Some("text/plain"));
        }
    }

    #[test]
    fn aggregate_display_lists_children() {
        let agg = AggregateError::new(vec![
            ResourceError::unexpected("a", "one"),
            ResourceError::unexpected("b", "two"),
        ]);
        let msg = agg.to_string();
        assert!(msg.starts_with("2 error(s) occurred: "));
        assert!(msg.contains("one") && msg.contains("two"));
    }
}
