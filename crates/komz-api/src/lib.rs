//! # komz-api
//!
//! HTTP gateway behind the site's demo widgets.
//!
//! | Route                    | Purpose                                         |
//! |--------------------------|-------------------------------------------------|
//! | `POST /create-web-call`  | Provision a browser voice call (passthrough)    |
//! | `POST /chat`             | One chat turn, throttled per visitor            |
//! | `GET /chat/quota`        | Messages the caller has left                    |
//! | `GET /health`            | Liveness                                        |

#![forbid(unsafe_code)]

pub mod client_key;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, Error, Result};
pub use middleware::{RateLimitLayer, RateLimitService};
pub use server::{Server, router};
pub use state::AppState;
