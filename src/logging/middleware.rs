//! Request ID generation

use axum::http::HeaderMap;
use uuid::Uuid;

/// Header carrying a caller-supplied correlation ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied request ID that is kept.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Generate a new request ID using UUID v4
///
/// # Examples
///
/// ```
/// use switchyard::logging::generate_request_id;
///
/// let request_id = generate_request_id();
/// assert!(!request_id.is_empty());
/// ```
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Use the caller's `x-request-id` when it is printable and short,
/// otherwise mint a fresh one.
pub fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.chars().all(|c| c.is_ascii_graphic())
        })
        .map(String::from)
        .unwrap_or_else(generate_request_id)
}
