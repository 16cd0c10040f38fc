//! Identifies the visitor a request is charged to.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap};

/// Header a browser client may send to identify itself across IP changes.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Longest accepted client id.
const MAX_CLIENT_ID_LEN: usize = 128;

/// Key used when neither a client id nor a peer address is available.
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Rate-limit key for a request.
///
/// Prefers a well-formed `x-client-id` header, then the peer IP.
pub fn client_key(headers: &HeaderMap, extensions: &Extensions) -> String {
    let header_id = headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_CLIENT_ID_LEN);

    if let Some(id) = header_id {
        return format!("id:{id}");
    }

    match extensions.get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => ANONYMOUS_KEY.to_string(),
    }
}

/// Extractor yielding [`client_key`] for the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientKey(pub String);

impl<S> FromRequestParts<S> for ClientKey
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientKey(client_key(&parts.headers, &parts.extensions)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(CLIENT_ID_HEADER, HeaderValue::from_static("  browser-42 "));
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 5555))));
        assert_eq!(client_key(&headers, &extensions), "id:browser-42");
    }

    #[test]
    fn test_peer_ip_without_header() {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 5555))));
        assert_eq!(client_key(&HeaderMap::new(), &extensions), "ip:10.0.0.1");
    }

    #[test]
    fn test_oversized_header_is_ignored() {
        let mut headers = HeaderMap::new();
        let long = "x".repeat(MAX_CLIENT_ID_LEN + 1);
        headers.insert(CLIENT_ID_HEADER, HeaderValue::from_str(&long).unwrap());
        assert_eq!(client_key(&headers, &Extensions::new()), ANONYMOUS_KEY);
    }

    #[test]
    fn test_anonymous_fallback() {
        assert_eq!(
            client_key(&HeaderMap::new(), &Extensions::new()),
            ANONYMOUS_KEY
        );
    }
}
