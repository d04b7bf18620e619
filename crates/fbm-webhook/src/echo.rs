//! Message echoes
//!
//! `message_echoes` webhook field: copies of messages the page itself sent,
//! through this app or another one. Events whose `is_echo` flag is not set
//! are skipped. With standby handling enabled, echoes delivered on the
//! `standby` channel (while another app owns the thread) are dispatched too.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::EchoCategory;
use crate::classify::classify_echo;
use crate::dispatcher::{Dispatcher, EventFamily};
use crate::events::{null_as_empty, timestamp_to_datetime, Attachment, Participant, ProductElement};

/// One `messaging[]` or `standby[]` item carrying an echo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoEvent {
    /// The page
    pub sender: Participant,
    /// The user the page wrote to
    pub recipient: Participant,
    #[serde(default)]
    pub timestamp: i64,
    pub message: EchoMessage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EchoMessage {
    #[serde(default)]
    pub is_echo: bool,
    /// App that sent the message
    #[serde(default)]
    pub app_id: Option<u64>,
    /// Custom string passed with the send API call
    #[serde(default)]
    pub metadata: Option<String>,
    #[serde(default)]
    pub mid: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attachments: Vec<Attachment>,
}

impl EchoEvent {
    pub fn page_id(&self) -> &str {
        &self.sender.id
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient.id
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        timestamp_to_datetime(self.timestamp)
    }

    pub fn text(&self) -> Option<&str> {
        self.message.text.as_deref()
    }

    pub fn app_id(&self) -> Option<u64> {
        self.message.app_id
    }

    pub fn metadata(&self) -> Option<&str> {
        self.message.metadata.as_deref()
    }

    /// Template type of the first attachment
    pub fn template_type(&self) -> Option<&str> {
        self.message.attachments.first().and_then(Attachment::template_type)
    }

    /// Product elements of the first attachment
    pub fn product_elements(&self) -> Vec<&ProductElement> {
        self.message
            .attachments
            .first()
            .and_then(Attachment::product)
            .map(|p| p.elements.iter().collect())
            .unwrap_or_default()
    }

    pub fn category(&self) -> EchoCategory {
        classify_echo(&self.message)
    }
}

/// Echo family marker
pub struct EchoFamily;

impl EventFamily for EchoFamily {
    type Event = EchoEvent;
    type Category = EchoCategory;
    const NAME: &'static str = "echo";
    const READS_STANDBY: bool = true;

    fn classify(event: &EchoEvent) -> EchoCategory {
        classify_echo(&event.message)
    }

    fn skip_reason(event: &EchoEvent) -> Option<&'static str> {
        (!event.message.is_echo).then_some("message is not an echo")
    }

    fn sender_id(event: &EchoEvent) -> &str {
        event.page_id()
    }
}

/// Dispatcher for message echoes
pub type EchoDispatcher = Dispatcher<EchoFamily>;

impl Dispatcher<EchoFamily> {
    pub fn on_text<H, Fut>(&self, handler: H)
    where
        H: Fn(EchoEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(EchoCategory::Text, handler);
    }

    pub fn on_attachment<H, Fut>(&self, handler: H)
    where
        H: Fn(EchoEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(EchoCategory::Attachment, handler);
    }

    pub fn on_template<H, Fut>(&self, handler: H)
    where
        H: Fn(EchoEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(EchoCategory::Template, handler);
    }

    pub fn on_product<H, Fut>(&self, handler: H)
    where
        H: Fn(EchoEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(EchoCategory::Product, handler);
    }

    pub fn on_media<H, Fut>(&self, handler: H)
    where
        H: Fn(EchoEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(EchoCategory::Media, handler);
    }

    pub fn on_fallback<H, Fut>(&self, handler: H)
    where
        H: Fn(EchoEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(EchoCategory::Fallback, handler);
    }

    pub fn on_unknown<H, Fut>(&self, handler: H)
    where
        H: Fn(EchoEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(EchoCategory::Unknown, handler);
    }
}
