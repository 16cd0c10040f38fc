//! Tower rate-limiting middleware.
//!
//! `RateLimitLayer` wraps a route so each request first reserves a message
//! slot for its caller. The slot is kept only if the inner service answers
//! with a success status; failed or rejected requests give it back.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::response::{IntoResponse, Response};
use komz_core::RateLimiter;
use tower::{Layer, Service};

use crate::ApiError;
use crate::client_key::client_key;

/// Messages allowed per window.
pub const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");

/// Messages left in the current window.
pub const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

/// Tower `Layer` that charges requests against a [`RateLimiter`].
#[derive(Clone, Debug)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
}

impl RateLimitLayer {
    /// Create a new layer over the given limiter.
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// Tower `Service` that reserves a slot before forwarding the request.
#[derive(Clone, Debug)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Response: IntoResponse,
    S::Future: Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        let limiter = self.limiter.clone();

        Box::pin(async move {
            let key = client_key(req.headers(), req.extensions());
            let limit = limiter.limit();

            let reservation = match limiter.try_reserve(&key) {
                Ok(reservation) => reservation,
                Err(err) => {
                    if err.is_client_error() {
                        tracing::info!(key = %key, "Demo message limit reached");
                    } else {
                        tracing::error!(key = %key, error = %err, "Rate limiter failed");
                    }
                    let mut response = ApiError::from(err).into_response();
                    set_quota_headers(&mut response, limit, 0);
                    return Ok(response);
                }
            };

            let reserved_remaining = reservation.remaining();
            let mut response = inner
                .call(req)
                .await
                .unwrap_or_else(|infallible| match infallible {})
                .into_response();

            let remaining = if response.status().is_success() {
                reservation.commit();
                reserved_remaining
            } else {
                drop(reservation);
                reserved_remaining + 1
            };

            set_quota_headers(&mut response, limit, remaining);
            Ok(response)
        })
    }
}

fn set_quota_headers(response: &mut Response, limit: u32, remaining: u32) {
    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));
}
