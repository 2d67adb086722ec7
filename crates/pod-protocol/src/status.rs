use pod_types::{HttpError, HttpErrorKind, ResourceError};

use crate::error::ProtocolError;
use crate::http::HttpResponse;

/// Classify a status code. `None` means the response is acceptable
/// (2xx or 304).
pub fn classify_status(status: u16) -> Option<HttpErrorKind> {
    match status {
        200..=299 | 304 => None,
        401 => Some(HttpErrorKind::Unauthenticated),
        404 => Some(HttpErrorKind::NotFound),
        500..=599 => Some(HttpErrorKind::Server),
        _ => Some(HttpErrorKind::Unexpected),
    }
}

/// Build the [`HttpError`] for a rejected response.
pub fn http_error(uri: &str, response: &HttpResponse, kind: HttpErrorKind) -> HttpError {
    let message = match kind {
        HttpErrorKind::Server => "server error",
        HttpErrorKind::Unauthenticated => "request is not authenticated",
        HttpErrorKind::NotFound => "resource not found",
        HttpErrorKind::Unexpected => "unexpected response status",
    };
    HttpError {
        kind,
        uri: uri.to_string(),
        status: response.status,
        headers: response.headers.clone(),
        message: message.to_string(),
    }
}

/// Accept a response or turn it into a [`ResourceError::Http`].
pub fn check_response(uri: &str, response: &HttpResponse) -> Result<(), ResourceError> {
    match classify_status(response.status) {
        None => Ok(()),
        Some(kind) => Err(http_error(uri, response, kind).into()),
    }
}

/// A transport failure surfaces as an unexpected resource error.
pub fn transport_failure(uri: &str, error: ProtocolError) -> ResourceError {
    ResourceError::unexpected(uri, error)
}
