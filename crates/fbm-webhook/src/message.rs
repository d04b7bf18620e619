//! Incoming user messages
//!
//! `messages` webhook field: text, attachments, quick replies, referrals,
//! bot commands and product templates sent by a user to the page.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::MessageCategory;
use crate::classify::classify_message;
use crate::dispatcher::{Dispatcher, EventFamily};
use crate::events::{
    null_as_empty, timestamp_to_datetime, Attachment, Participant, ProductElement, Referral,
};

/// One `messaging[]` item carrying a user message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub sender: Participant,
    pub recipient: Participant,
    #[serde(default)]
    pub timestamp: i64,
    pub message: IncomingMessage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub mid: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub quick_reply: Option<QuickReply>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub referral: Option<Referral>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub commands: Vec<BotCommand>,
    #[serde(default)]
    pub reply_to: Option<ReplyTo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickReply {
    pub payload: String,
}

/// Bot command picked from the composer menu
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotCommand {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyTo {
    pub mid: String,
}

impl MessageEvent {
    pub fn sender_id(&self) -> &str {
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

    pub fn quick_reply_payload(&self) -> Option<&str> {
        self.message.quick_reply.as_ref().map(|q| q.payload.as_str())
    }

    pub fn command_names(&self) -> Vec<&str> {
        self.message.commands.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn referral_ref(&self) -> Option<&str> {
        self.message
            .referral
            .as_ref()
            .and_then(|r| r.reference.as_deref())
    }

    /// URLs of media attachments
    pub fn attachment_urls(&self) -> Vec<&str> {
        self.message
            .attachments
            .iter()
            .filter_map(Attachment::url)
            .collect()
    }

    /// Product elements across all product template attachments
    pub fn product_elements(&self) -> Vec<&ProductElement> {
        self.message
            .attachments
            .iter()
            .filter_map(Attachment::product)
            .flat_map(|p| p.elements.iter())
            .collect()
    }

    pub fn category(&self) -> MessageCategory {
        classify_message(&self.message)
    }
}

/// Message family marker
pub struct MessageFamily;

impl EventFamily for MessageFamily {
    type Event = MessageEvent;
    type Category = MessageCategory;
    const NAME: &'static str = "message";

    fn classify(event: &MessageEvent) -> MessageCategory {
        classify_message(&event.message)
    }

    fn sender_id(event: &MessageEvent) -> &str {
        event.sender_id()
    }
}

/// Dispatcher for incoming user messages
pub type MessageDispatcher = Dispatcher<MessageFamily>;

impl Dispatcher<MessageFamily> {
    pub fn on_text<H, Fut>(&self, handler: H)
    where
        H: Fn(MessageEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(MessageCategory::Text, handler);
    }

    pub fn on_attachment<H, Fut>(&self, handler: H)
    where
        H: Fn(MessageEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(MessageCategory::Attachment, handler);
    }

    pub fn on_quick_reply<H, Fut>(&self, handler: H)
    where
        H: Fn(MessageEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(MessageCategory::QuickReply, handler);
    }

    pub fn on_referral<H, Fut>(&self, handler: H)
    where
        H: Fn(MessageEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(MessageCategory::Referral, handler);
    }

    pub fn on_command<H, Fut>(&self, handler: H)
    where
        H: Fn(MessageEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(MessageCategory::Command, handler);
    }

    pub fn on_product<H, Fut>(&self, handler: H)
    where
        H: Fn(MessageEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(MessageCategory::Product, handler);
    }

    pub fn on_unknown<H, Fut>(&self, handler: H)
    where
        H: Fn(MessageEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.register_for_category(MessageCategory::Unknown, handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WebhookPayload;
    use crate::DispatcherOptionsUpdate;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn payload(page_id: &str, messages: Vec<serde_json::Value>) -> WebhookPayload<MessageEvent> {
        let messaging: Vec<serde_json::Value> = messages
            .into_iter()
            .map(|message| {
                json!({
                    "sender": {"id": "user123"},
                    "recipient": {"id": page_id},
                    "timestamp": 1_700_000_000_000i64,
                    "message": message
                })
            })
            .collect();
        serde_json::from_value(json!({
            "object": "page",
            "entry": [{"id": page_id, "time": 1_700_000_000_000i64, "messaging": messaging}]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_text_callback_receives_message_text() {
        let dispatcher = MessageDispatcher::new();
        let seen = Arc::new(Mutex::new(None));

        let s = Arc::clone(&seen);
        dispatcher.on_text(move |event| {
            let s = Arc::clone(&s);
            async move {
                *s.lock().unwrap() = event.text().map(str::to_string);
                Ok(())
            }
        });

        let p = payload("page456", vec![json!({"mid": "m1", "text": "Hello World"})]);
        dispatcher.process_webhook(&p).await.unwrap();

        assert_eq!(seen.lock().unwrap().as_deref(), Some("Hello World"));
    }

    #[tokio::test]
    async fn test_quick_reply_with_attachments_routes_to_quick_reply_only() {
        let dispatcher = MessageDispatcher::new();
        let quick = Arc::new(AtomicUsize::new(0));
        let attachment = Arc::new(AtomicUsize::new(0));

        let q = Arc::clone(&quick);
        dispatcher.on_quick_reply(move |event| {
            let q = Arc::clone(&q);
            async move {
                assert_eq!(event.quick_reply_payload(), Some("YES"));
                q.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        let a = Arc::clone(&attachment);
        dispatcher.on_attachment(move |_event| {
            let a = Arc::clone(&a);
            async move {
                a.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let p = payload(
            "page456",
            vec![json!({
                "mid": "m1",
                "text": "Yes",
                "quick_reply": {"payload": "YES"},
                "attachments": [{"type": "image", "payload": {"url": "https://cdn/x.png"}}]
            })],
        );
        dispatcher.process_webhook(&p).await.unwrap();

        assert_eq!(quick.load(Ordering::SeqCst), 1);
        assert_eq!(attachment.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_product_and_command_callbacks() {
        let dispatcher = MessageDispatcher::new();
        let products = Arc::new(Mutex::new(Vec::new()));
        let commands = Arc::new(Mutex::new(Vec::new()));

        let p = Arc::clone(&products);
        dispatcher.on_product(move |event| {
            let p = Arc::clone(&p);
            async move {
                let ids = event.product_elements().iter().map(|e| e.id.clone()).collect::<Vec<_>>();
                p.lock().unwrap().extend(ids);
                Ok(())
            }
        });
        let c = Arc::clone(&commands);
        dispatcher.on_command(move |event| {
            let c = Arc::clone(&c);
            async move {
                let names = event.command_names().into_iter().map(str::to_string).collect::<Vec<_>>();
                c.lock().unwrap().extend(names);
                Ok(())
            }
        });

        let payload = payload(
            "page456",
            vec![
                json!({
                    "mid": "m1",
                    "attachments": [{"type": "template", "payload": {"product": {"elements": [{"id": "sku-1"}, {"id": "sku-2"}]}}}]
                }),
                json!({"mid": "m2", "text": "/help", "commands": [{"name": "help"}]}),
            ],
        );
        dispatcher.process_webhook(&payload).await.unwrap();

        assert_eq!(*products.lock().unwrap(), vec!["sku-1", "sku-2"]);
        assert_eq!(*commands.lock().unwrap(), vec!["help"]);
    }

    #[tokio::test]
    async fn test_page_filter_drops_foreign_entries() {
        let dispatcher = MessageDispatcher::new();
        dispatcher.set_options(DispatcherOptionsUpdate::new().page_id("P1").enable_logging(false));
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        dispatcher.on_all(move |_event| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
        dispatcher.on_text(|_event| async { Ok(()) });

        let p = payload("P2", vec![json!({"mid": "m1", "text": "hi"})]);
        dispatcher.process_webhook(&p).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let p = payload("P1", vec![json!({"mid": "m1", "text": "hi"})]);
        dispatcher.process_webhook(&p).await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_accessors() {
        let p = payload(
            "page456",
            vec![json!({
                "mid": "m1",
                "referral": {"ref": "spring_sale", "source": "ADS", "type": "OPEN_THREAD"},
                "attachments": [{"type": "image", "payload": {"url": "https://cdn/x.png"}}]
            })],
        );
        let event = &p.entry[0].messaging[0];
        assert_eq!(event.sender_id(), "user123");
        assert_eq!(event.recipient_id(), "page456");
        assert_eq!(event.referral_ref(), Some("spring_sale"));
        assert_eq!(event.attachment_urls(), vec!["https://cdn/x.png"]);
        assert_eq!(event.category(), MessageCategory::Referral);
        assert!(event.sent_at().is_some());
    }
}
