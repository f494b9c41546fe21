use std::net::SocketAddr;

use axum::http::HeaderMap;

pub const SESSION_HEADER: &str = "x-session-id";
const MAX_SESSION_CHARS: usize = 128;

/// Client supplied session id when it is sane, the peer IP otherwise. Only labels attempt
/// counts; limits and player counts go by peer address.
pub fn session_id(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_SESSION_CHARS)
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}
