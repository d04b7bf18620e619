//! Raw webhook routing
//!
//! A single delivery mixes user messages, postbacks and echoes in the same
//! `messaging` array. [`WebhookRouter`] splits a raw payload into one typed
//! payload per family (keeping entry ids, times and event order) and runs
//! the message, postback and echo dispatchers in that order.

use serde_json::Value;
use tracing::{debug, warn};

use crate::dispatcher::DispatcherOptionsUpdate;
use crate::echo::{EchoDispatcher, EchoEvent};
use crate::error::{Result, WebhookError};
use crate::events::{Entry, WebhookPayload, PAGE_OBJECT};
use crate::message::{MessageDispatcher, MessageEvent};
use crate::postback::{PostbackDispatcher, PostbackEvent};

/// Payload whose events have not been assigned to a family yet
pub type RawWebhookPayload = WebhookPayload<Value>;

/// Family an untyped event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Message,
    Postback,
    Echo,
    /// Deliveries, reads, optins, reactions, ...
    Other,
}

impl EventKind {
    pub fn of(event: &Value) -> Self {
        if event.get("postback").is_some() {
            return Self::Postback;
        }
        match event.get("message") {
            Some(message) if message.get("is_echo").and_then(Value::as_bool) == Some(true) => {
                Self::Echo
            }
            Some(_) => Self::Message,
            None => Self::Other,
        }
    }
}

/// One typed payload per family
#[derive(Debug, Clone)]
pub struct SplitPayload {
    pub messages: WebhookPayload<MessageEvent>,
    pub postbacks: WebhookPayload<PostbackEvent>,
    pub echoes: WebhookPayload<EchoEvent>,
}

/// Split a raw payload by event family.
///
/// Standby events are only kept for echoes. Events that do not match their
/// family's shape are dropped with a warning.
pub fn split_payload(payload: &RawWebhookPayload) -> SplitPayload {
    let mut split = SplitPayload {
        messages: WebhookPayload {
            object: payload.object.clone(),
            entry: Vec::with_capacity(payload.entry.len()),
        },
        postbacks: WebhookPayload {
            object: payload.object.clone(),
            entry: Vec::with_capacity(payload.entry.len()),
        },
        echoes: WebhookPayload {
            object: payload.object.clone(),
            entry: Vec::with_capacity(payload.entry.len()),
        },
    };

    for entry in &payload.entry {
        let mut messages = Entry::new(entry.id.clone(), entry.time, Vec::new());
        let mut postbacks = Entry::new(entry.id.clone(), entry.time, Vec::new());
        let mut echoes = Entry::new(entry.id.clone(), entry.time, Vec::new());

        for event in &entry.messaging {
            match EventKind::of(event) {
                EventKind::Message => push_typed(&mut messages.messaging, event),
                EventKind::Postback => push_typed(&mut postbacks.messaging, event),
                EventKind::Echo => push_typed(&mut echoes.messaging, event),
                EventKind::Other => debug!(page = %entry.id, "Ignoring unsupported messaging event"),
            }
        }

        for event in &entry.standby {
            match EventKind::of(event) {
                EventKind::Echo => push_typed(&mut echoes.standby, event),
                _ => debug!(page = %entry.id, "Ignoring standby event"),
            }
        }

        split.messages.entry.push(messages);
        split.postbacks.entry.push(postbacks);
        split.echoes.entry.push(echoes);
    }

    split
}

fn push_typed<E: serde::de::DeserializeOwned>(events: &mut Vec<E>, raw: &Value) {
    match serde_json::from_value(raw.clone()) {
        Ok(event) => events.push(event),
        Err(e) => warn!("Dropping malformed webhook event: {}", e),
    }
}

/// Owns one dispatcher per family
#[derive(Default)]
pub struct WebhookRouter {
    messages: MessageDispatcher,
    postbacks: PostbackDispatcher,
    echoes: EchoDispatcher,
}

impl WebhookRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &MessageDispatcher {
        &self.messages
    }

    pub fn postbacks(&self) -> &PostbackDispatcher {
        &self.postbacks
    }

    pub fn echoes(&self) -> &EchoDispatcher {
        &self.echoes
    }

    /// Apply the same option update to all three dispatchers
    pub fn set_options(&self, update: DispatcherOptionsUpdate) {
        self.messages.set_options(update.clone());
        self.postbacks.set_options(update.clone());
        self.echoes.set_options(update);
    }

    /// Validate, split and dispatch a raw payload
    pub async fn route(&self, payload: &RawWebhookPayload) -> Result<()> {
        if payload.object != PAGE_OBJECT {
            return Err(WebhookError::InvalidObjectType(payload.object.clone()));
        }

        let split = split_payload(payload);
        debug!(
            messages = split.messages.event_count(),
            postbacks = split.postbacks.event_count(),
            echoes = split.echoes.event_count(),
            "Routing webhook delivery"
        );

        self.messages.process_webhook(&split.messages).await?;
        self.postbacks.process_webhook(&split.postbacks).await?;
        self.echoes.process_webhook(&split.echoes).await?;

        Ok(())
    }

    /// Parse a JSON body and route it
    pub async fn route_json(&self, body: &str) -> Result<()> {
        let payload: RawWebhookPayload = serde_json::from_str(body)?;
        self.route(&payload).await
    }
}
