//! AckRouter - signed webhook router for Slack-style payloads.
//!
//! Authenticates requests with Slack's `v0` HMAC signature, decodes JSON or
//! form-encoded bodies, derives a `(type, id)` identity, dispatches to exactly
//! one registered handler and encodes its return value as the ack body.
//!
//! ## Architecture
//!
//! ```text
//! Request → signature → payload::parse → payload::classify → Router → ack::encode → Response
//! ```

pub mod ack;
pub mod app;
pub mod config;
pub mod error;
pub mod payload;
pub mod router;
pub mod signature;
pub mod web;

// Re-export commonly used types
pub use ack::Ack;
pub use app::{AckResponse, App, DefaultErrorHandler, ErrorHandler, InboundRequest};
pub use config::Config;
pub use error::{AppError, AuthError, BodyError, ErrorKind, PayloadError};
pub use payload::{Payload, PayloadIdentity, PayloadType};
pub use router::{FallbackHandler, Handler, HandlerResult, Router, RouterBuilder};
pub use signature::SigningKey;
pub use web::AppState;
