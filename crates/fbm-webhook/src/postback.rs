//! Postback events
//!
//! `messaging_postbacks` webhook field: button taps, the get-started button,
//! persistent menu items and referral-opened threads. Besides its static
//! category, every postback is also routed to callbacks subscribed to its
//! exact payload string.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::PostbackCategory;
use crate::classify::classify_postback;
use crate::dispatcher::{Dispatcher, EventFamily};
use crate::events::{timestamp_to_datetime, Participant, Referral};

/// One `messaging[]` item carrying a postback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostbackEvent {
    pub sender: Participant,
    pub recipient: Participant,
    #[serde(default)]
    pub timestamp: i64,
    pub postback: Postback,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Postback {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub referral: Option<Referral>,
    #[serde(default)]
    pub mid: Option<String>,
}

impl PostbackEvent {
    pub fn sender_id(&self) -> &str {
        &self.sender.id
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient.id
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        timestamp_to_datetime(self.timestamp)
    }

    pub fn payload(&self) -> &str {
        &self.postback.payload
    }

    pub fn title(&self) -> Option<&str> {
        self.postback.title.as_deref()
    }

    pub fn referral_ref(&self) -> Option<&str> {
        self.postback
            .referral
            .as_ref()
            .and_then(|r| r.reference.as_deref())
    }

    pub fn category(&self) -> PostbackCategory {
        classify_postback(&self.postback)
    }
}

/// Postback family marker
pub struct PostbackFamily;

impl EventFamily for PostbackFamily {
    type Event = PostbackEvent;
    type Category = PostbackCategory;
    const NAME: &'static str = "postback";

    fn classify(event: &PostbackEvent) -> PostbackCategory {
        classify_postback(&event.postback)
    }

    fn extra_categories(event: &PostbackEvent) -> Vec<PostbackCategory> {
        vec![PostbackCategory::Payload(event.postback.payload.clone())]
    }

    fn sender_id(event: &PostbackEvent) -> &str {
        event.sender_id()
    }
}

/// Dispatcher for postback events
pub type PostbackDispatcher = Dispatcher<PostbackFamily>;

impl Dispatcher<PostbackFamily> {
    pub fn on_button<H, Fut>(&self, handler: H)
    where
        H: Fn(PostbackEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(PostbackCategory::Button, handler);
    }

    pub fn on_get_started<H, Fut>(&self, handler: H)
    where
        H: Fn(PostbackEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(PostbackCategory::GetStarted, handler);
    }

    pub fn on_persistent_menu<H, Fut>(&self, handler: H)
    where
        H: Fn(PostbackEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(PostbackCategory::PersistentMenu, handler);
    }

    pub fn on_referral<H, Fut>(&self, handler: H)
    where
        H: Fn(PostbackEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(PostbackCategory::Referral, handler);
    }

    /// Subscribe to postbacks whose payload equals `payload` exactly
    pub fn on_payload<H, Fut>(&self, payload: impl Into<String>, handler: H)
    where
        H: Fn(PostbackEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(PostbackCategory::payload(payload), handler);
    }
}
