//! Web server module for receiving Slack webhooks.
//!
//! This module is a thin axum adapter around [`App`](crate::App):
//! - Extracts the method, signature headers and raw body
//! - Runs the synchronous pipeline
//! - Writes the status code and JSON ack back

pub mod handlers;

pub use handlers::{
    health, into_http_response, webhook, AppState, HealthResponse, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
