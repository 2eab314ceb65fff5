//! Request pipeline.
//!
//! ```text
//! InboundRequest → validate → parse → classify → dispatch → encode → AckResponse
//! ```
//!
//! Any stage failure short-circuits to the app's [`ErrorHandler`].

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::ack::encode;
use crate::error::{AppError, AuthError, BodyError};
use crate::payload::{classify, parse};
use crate::router::Router;
use crate::signature::{unix_now, validate_at, SigningKey, DEFAULT_MAX_AGE_SECONDS};

/// Transport-neutral view of an inbound HTTP request.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub method: String,
    pub signature: Option<String>,
    pub timestamp: Option<String>,
    /// Raw body bytes, exactly as signed.
    pub body: Vec<u8>,
}

/// Signed request with a parsed timestamp. Built once the required headers
/// are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope<'a> {
    pub signature: &'a str,
    pub timestamp: i64,
    pub raw_body: &'a [u8],
}

impl<'a> Envelope<'a> {
    pub fn from_request(request: &'a InboundRequest) -> Result<Self, AuthError> {
        if !request.method.eq_ignore_ascii_case("POST") {
            return Err(AuthError::MethodNotAllowed(request.method.clone()));
        }

        let signature = request
            .signature
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingSignature)?;

        let raw_timestamp = request
            .timestamp
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingTimestamp)?;

        let timestamp = raw_timestamp
            .trim()
            .parse::<i64>()
            .map_err(|_| AuthError::InvalidTimestamp(raw_timestamp.to_string()))?;

        Ok(Self {
            signature,
            timestamp,
            raw_body: &request.body,
        })
    }
}

/// Status and body handed back to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckResponse {
    pub status: u16,
    pub body: String,
}

impl AckResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Content type to send, if there is a body at all.
    pub fn content_type(&self) -> Option<&'static str> {
        if self.body.is_empty() {
            None
        } else {
            Some("application/json")
        }
    }
}

/// Turns a pipeline failure into the response sent to the caller.
pub trait ErrorHandler: Send + Sync + 'static {
    fn handle(&self, error: &AppError) -> AckResponse;
}

impl<F> ErrorHandler for F
where
    F: Fn(&AppError) -> AckResponse + Send + Sync + 'static,
{
    fn handle(&self, error: &AppError) -> AckResponse {
        self(error)
    }
}

/// Logs the error and answers with its status code and an empty body.
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, err: &AppError) -> AckResponse {
        let status = err.status_code();

        if status >= 500 {
            error!(error = %err, kind = %err.kind(), status = status, "request_failed");
        } else {
            warn!(error = %err, kind = %err.kind(), status = status, "request_rejected");
        }

        AckResponse::new(status, String::new())
    }
}

/// Composes signature validation, payload decoding, routing and ack encoding.
///
/// Immutable once built, so one instance can serve concurrent requests.
pub struct App {
    signing_key: Option<SigningKey>,
    router: Router,
    error_handler: Arc<dyn ErrorHandler>,
    max_age_seconds: u64,
}

impl App {
    pub fn new(signing_key: Option<SigningKey>, router: Router) -> Self {
        Self {
            signing_key,
            router,
            error_handler: Arc::new(DefaultErrorHandler),
            max_age_seconds: DEFAULT_MAX_AGE_SECONDS,
        }
    }

    pub fn with_error_handler<H: ErrorHandler>(mut self, handler: H) -> Self {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Override the allowed clock skew for request timestamps.
    pub fn with_max_age(mut self, seconds: u64) -> Self {
        self.max_age_seconds = seconds;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Process one request to completion.
    pub fn process(&self, request: &InboundRequest) -> AckResponse {
        self.process_at(request, unix_now())
    }

    /// Like [`App::process`], against an explicit clock reading.
    pub fn process_at(&self, request: &InboundRequest, now: i64) -> AckResponse {
        match self.run(request, now) {
            Ok(body) => AckResponse::new(200, body),
            Err(err) => self.error_handler.handle(&err),
        }
    }

    /// Answer a failure raised outside the pipeline, e.g. by the transport.
    pub fn error_response(&self, err: &AppError) -> AckResponse {
        self.error_handler.handle(err)
    }

    fn run(&self, request: &InboundRequest, now: i64) -> Result<String, AppError> {
        let key = self
            .signing_key
            .as_ref()
            .ok_or(AuthError::MissingSigningKey)?;

        let envelope = Envelope::from_request(request)?;
        validate_at(
            key,
            envelope.signature,
            envelope.timestamp,
            envelope.raw_body,
            now,
            self.max_age_seconds,
        )?;

        let body = std::str::from_utf8(envelope.raw_body).map_err(|_| BodyError::NotUtf8)?;
        let payload = parse(body)?;
        let identity = classify(&payload)?;

        info!(payload_type = %identity.kind, id = %identity.id, "request_dispatching");

        let ack = self.router.dispatch(&identity, &payload)?;
        let body = encode(&ack)?;

        info!(
            payload_type = %identity.kind,
            id = %identity.id,
            body_length = body.len(),
            "request_acknowledged"
        );

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ack::Ack;
    use crate::payload::Payload;
    use crate::router::RouterBuilder;
    use crate::signature::sign;

    const NOW: i64 = 1_700_000_000;
    const KEY: &str = "test-signing-key";

    fn key() -> SigningKey {
        SigningKey::new(KEY)
    }

    fn signed(body: &str) -> InboundRequest {
        InboundRequest {
            method: "POST".to_string(),
            signature: Some(sign(&key(), NOW, body)),
            timestamp: Some(NOW.to_string()),
            body: body.into(),
        }
    }

    fn app(router: Router) -> App {
        App::new(Some(key()), router)
    }

    #[test]
    fn test_command_returns_text_ack() {
        let app = app(
            RouterBuilder::new()
                .command("/foo", |_: &Payload| Ok(Ack::from("bar")))
                .build(),
        );

        let response = app.process_at(&signed(r#"{"command":"/foo"}"#), NOW);

        assert_eq!(response, AckResponse::new(200, r#"{"text":"bar"}"#));
        assert_eq!(response.content_type(), Some("application/json"));
    }

    #[test]
    fn test_form_encoded_command() {
        let app = app(
            RouterBuilder::new()
                .command("/foo", |p: &Payload| {
                    Ok(Ack::from(format!("got {}", p.str_at(&["text"]).unwrap_or(""))))
                })
                .build(),
        );

        let response = app.process_at(&signed("command=%2Ffoo&text=hello"), NOW);

        assert_eq!(response, AckResponse::new(200, r#"{"text":"got hello"}"#));
    }

    #[test]
    fn test_block_action_empty_ack() {
        let app = app(
            RouterBuilder::new()
                .block_action("foo", |_: &Payload| Ok(Ack::Empty))
                .build(),
        );

        let body = r#"{"type":"block_actions","actions":[{"action_id":"foo"}]}"#;
        let response = app.process_at(&signed(body), NOW);

        assert_eq!(response, AckResponse::new(200, ""));
        assert_eq!(response.content_type(), None);
    }

    #[test]
    fn test_missing_signing_key() {
        let app = App::new(None, RouterBuilder::new().build());

        let response = app.process_at(&signed(r#"{"command":"/foo"}"#), NOW);

        assert_eq!(response, AckResponse::new(401, ""));
    }

    #[test]
    fn test_signature_mismatch() {
        let app = app(
            RouterBuilder::new()
                .command("/foo", |_: &Payload| Ok(Ack::from("bar")))
                .build(),
        );
        let mut request = signed(r#"{"command":"/foo"}"#);
        request.body = r#"{"command":"/evil"}"#.into();

        let response = app.process_at(&request, NOW);

        assert_eq!(response, AckResponse::new(401, ""));
    }

    #[test]
    fn test_auth_failures() {
        let app = app(RouterBuilder::new().build());
        let body = r#"{"command":"/foo"}"#;

        let mut get = signed(body);
        get.method = "GET".to_string();

        let mut no_signature = signed(body);
        no_signature.signature = None;

        let mut no_timestamp = signed(body);
        no_timestamp.timestamp = None;

        let mut bad_timestamp = signed(body);
        bad_timestamp.timestamp = Some("yesterday".to_string());

        for request in [get, no_signature, no_timestamp, bad_timestamp] {
            assert_eq!(app.process_at(&request, NOW).status, 401);
        }

        assert_eq!(app.process_at(&signed(body), NOW + 301).status, 401);
    }

    #[test]
    fn test_body_and_payload_failures() {
        let app = app(RouterBuilder::new().build());

        for body in ["", "{broken", "{}", r#"{"text":"no type"}"#, r#"{"type":"unknown"}"#] {
            assert_eq!(app.process_at(&signed(body), NOW).status, 400, "body: {}", body);
        }
    }

    #[test]
    fn test_non_utf8_body_checked_after_auth() {
        let body = vec![0xff, 0xfe, b'{'];
        let request = InboundRequest {
            method: "POST".to_string(),
            signature: Some(sign(&key(), NOW, &body)),
            timestamp: Some(NOW.to_string()),
            body: body.clone(),
        };

        let response = app(RouterBuilder::new().build()).process_at(&request, NOW);
        assert_eq!(response, AckResponse::new(400, ""));

        let unsigned = InboundRequest {
            method: "POST".to_string(),
            body,
            ..Default::default()
        };

        let response = App::new(None, RouterBuilder::new().build()).process_at(&unsigned, NOW);
        assert_eq!(response, AckResponse::new(401, ""));
    }

    #[test]
    fn test_unrouted_payload_is_not_found() {
        let app = app(RouterBuilder::new().build());

        let response = app.process_at(&signed(r#"{"command":"/unknown"}"#), NOW);

        assert_eq!(response, AckResponse::new(404, ""));
    }

    #[test]
    fn test_handler_failure_is_internal_error() {
        let app = app(
            RouterBuilder::new()
                .command("/fail", |_: &Payload| Err(anyhow::anyhow!("boom")))
                .build(),
        );

        let response = app.process_at(&signed(r#"{"command":"/fail"}"#), NOW);

        assert_eq!(response, AckResponse::new(500, ""));
    }

    #[test]
    fn test_custom_error_handler() {
        let app = app(RouterBuilder::new().build()).with_error_handler(|err: &AppError| {
            AckResponse::new(
                200,
                format!(r#"{{"text":"{}"}}"#, err.kind()),
            )
        });

        let response = app.process_at(&signed(r#"{"command":"/unknown"}"#), NOW);

        assert_eq!(response, AckResponse::new(200, r#"{"text":"routing"}"#));
    }

    #[test]
    fn test_custom_max_age() {
        let app = app(
            RouterBuilder::new()
                .command("/foo", |_: &Payload| Ok(Ack::Empty))
                .build(),
        )
        .with_max_age(10);

        let request = signed(r#"{"command":"/foo"}"#);

        assert_eq!(app.process_at(&request, NOW + 10).status, 200);
        assert_eq!(app.process_at(&request, NOW + 11).status, 401);
    }

    #[test]
    fn test_envelope_from_request() {
        let request = signed("{}");

        let envelope = Envelope::from_request(&request).unwrap();

        assert_eq!(envelope.timestamp, NOW);
        assert_eq!(envelope.raw_body, b"{}".as_slice());
        assert!(envelope.signature.starts_with("v0="));
    }
}
