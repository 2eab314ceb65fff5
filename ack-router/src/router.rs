//! Route table mapping payload identities to handlers.
//!
//! Routes are registered on a [`RouterBuilder`] and frozen into an immutable
//! [`Router`] before any request is processed.
//!
//! # Example
//!
//! ```
//! use ackrouter::{Ack, RouterBuilder};
//!
//! let router = RouterBuilder::new()
//!     .command("/ping", |_p: &ackrouter::Payload| Ok(Ack::from("pong")))
//!     .view_submission("settings", |_p: &ackrouter::Payload| Ok(Ack::Empty))
//!     .build();
//!
//! assert_eq!(router.route_count(), 2);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::ack::Ack;
use crate::error::AppError;
use crate::payload::{Payload, PayloadIdentity, PayloadType};

/// Result type for handler functions.
pub type HandlerResult = anyhow::Result<Ack>;

/// A route handler. Runs at most once per request and is never retried.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, payload: &Payload) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, payload: &Payload) -> HandlerResult {
        self(payload)
    }
}

/// Handler invoked when no route matches a payload's identity.
pub trait FallbackHandler: Send + Sync + 'static {
    fn handle(&self, identity: &PayloadIdentity, payload: &Payload) -> HandlerResult;
}

impl<F> FallbackHandler for F
where
    F: Fn(&PayloadIdentity, &Payload) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, identity: &PayloadIdentity, payload: &Payload) -> HandlerResult {
        self(identity, payload)
    }
}

/// Default fallback: fail with route-not-found (404).
pub struct NotFound;

impl FallbackHandler for NotFound {
    fn handle(&self, identity: &PayloadIdentity, _payload: &Payload) -> HandlerResult {
        Err(AppError::RouteNotFound {
            kind: identity.kind.clone(),
            id: identity.id.clone(),
        }
        .into())
    }
}

type RouteTable = HashMap<String, HashMap<String, Arc<dyn Handler>>>;

/// Builder collecting routes before the app starts.
pub struct RouterBuilder {
    routes: RouteTable,
    fallback: Arc<dyn FallbackHandler>,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            fallback: Arc::new(NotFound),
        }
    }

    /// Register a closure for an exact `(type, id)` pair.
    ///
    /// Registering the same pair again replaces the earlier handler.
    pub fn route<F>(self, kind: &str, id: &str, handler: F) -> Self
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.route_handler(kind, id, handler)
    }

    /// Register a [`Handler`] implementation for an exact `(type, id)` pair.
    pub fn route_handler<H: Handler>(mut self, kind: &str, id: &str, handler: H) -> Self {
        let replaced = self
            .routes
            .entry(kind.to_string())
            .or_default()
            .insert(id.to_string(), Arc::new(handler))
            .is_some();

        debug!(payload_type = kind, id = id, replaced = replaced, "route_registered");
        self
    }

    fn typed<F>(self, kind: PayloadType, id: &str, handler: F) -> Self
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.route(kind.as_str(), id, handler)
    }

    /// Slash command, e.g. `/deploy`.
    pub fn command<F>(self, command: &str, handler: F) -> Self
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.typed(PayloadType::Command, command, handler)
    }

    /// Block kit interaction, keyed by the first action's `action_id`.
    pub fn block_action<F>(self, action_id: &str, handler: F) -> Self
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.typed(PayloadType::BlockActions, action_id, handler)
    }

    /// External select options request.
    pub fn block_suggestion<F>(self, action_id: &str, handler: F) -> Self
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.typed(PayloadType::BlockSuggestion, action_id, handler)
    }

    /// Events API callback, keyed by the inner event type.
    pub fn event<F>(self, event_type: &str, handler: F) -> Self
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.typed(PayloadType::EventCallback, event_type, handler)
    }

    pub fn message_action<F>(self, callback_id: &str, handler: F) -> Self
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.typed(PayloadType::MessageAction, callback_id, handler)
    }

    /// Global shortcut.
    pub fn shortcut<F>(self, callback_id: &str, handler: F) -> Self
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.typed(PayloadType::Shortcut, callback_id, handler)
    }

    pub fn workflow_step_edit<F>(self, callback_id: &str, handler: F) -> Self
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.typed(PayloadType::WorkflowStepEdit, callback_id, handler)
    }

    /// Modal submission, keyed by `view.callback_id`.
    pub fn view_submission<F>(self, callback_id: &str, handler: F) -> Self
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.typed(PayloadType::ViewSubmission, callback_id, handler)
    }

    pub fn view_closed<F>(self, callback_id: &str, handler: F) -> Self
    where
        F: Fn(&Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.typed(PayloadType::ViewClosed, callback_id, handler)
    }

    /// Replace the catch-all handler used when no route matches.
    pub fn fallback<F>(self, handler: F) -> Self
    where
        F: Fn(&PayloadIdentity, &Payload) -> HandlerResult + Send + Sync + 'static,
    {
        self.fallback_handler(handler)
    }

    pub fn fallback_handler<H: FallbackHandler>(mut self, handler: H) -> Self {
        self.fallback = Arc::new(handler);
        self
    }

    /// Freeze the table.
    pub fn build(self) -> Router {
        let router = Router {
            routes: self.routes,
            fallback: self.fallback,
        };
        info!(route_count = router.route_count(), "router_built");
        router
    }
}

/// Immutable dispatch table. Safe to share across concurrent requests.
#[derive(Clone)]
pub struct Router {
    routes: RouteTable,
    fallback: Arc<dyn FallbackHandler>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Number of registered `(type, id)` routes.
    pub fn route_count(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    pub fn has_route(&self, kind: &str, id: &str) -> bool {
        self.lookup(kind, id).is_some()
    }

    fn lookup(&self, kind: &str, id: &str) -> Option<&Arc<dyn Handler>> {
        self.routes.get(kind)?.get(id)
    }

    /// Run exactly one handler for the identity: the exact match if one is
    /// registered, otherwise the fallback.
    pub fn dispatch(&self, identity: &PayloadIdentity, payload: &Payload) -> Result<Ack, AppError> {
        let result = match self.lookup(&identity.kind, &identity.id) {
            Some(handler) => {
                debug!(payload_type = %identity.kind, id = %identity.id, "dispatch_matched");
                handler.handle(payload)
            }
            None => {
                debug!(payload_type = %identity.kind, id = %identity.id, "dispatch_fallback");
                self.fallback.handle(identity, payload)
            }
        };

        result.map_err(AppError::from_handler)
    }
}
