//! Webhook payload shapes shared by every event family
//!
//! The envelope is always `{ "object": "page", "entry": [...] }`. Each entry
//! carries the events for one page; the event type `E` depends on the family
//! being dispatched (messages, postbacks or echoes).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// The only accepted value of [`WebhookPayload::object`].
pub const PAGE_OBJECT: &str = "page";

/// Top-level webhook envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "E: serde::de::DeserializeOwned"))]
pub struct WebhookPayload<E> {
    pub object: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub entry: Vec<Entry<E>>,
}

impl<E> WebhookPayload<E> {
    /// Create a page payload from its entries
    pub fn page(entry: Vec<Entry<E>>) -> Self {
        Self {
            object: PAGE_OBJECT.to_string(),
            entry,
        }
    }

    /// Whether the envelope targets a page subscription
    pub fn is_page(&self) -> bool {
        self.object == PAGE_OBJECT
    }

    /// Total number of events across all entries (messaging and standby)
    pub fn event_count(&self) -> usize {
        self.entry
            .iter()
            .map(|e| e.messaging.len() + e.standby.len())
            .sum()
    }
}

/// One page's batch of events in a single delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "E: serde::de::DeserializeOwned"))]
pub struct Entry<E> {
    /// Page id
    pub id: String,
    #[serde(default)]
    pub time: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messaging: Vec<E>,
    /// Events delivered while another app holds the thread (handover protocol)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub standby: Vec<E>,
}

impl<E> Entry<E> {
    /// Create an entry with messaging events only
    pub fn new(id: impl Into<String>, time: i64, messaging: Vec<E>) -> Self {
        Self {
            id: id.into(),
            time,
            messaging,
            standby: Vec::new(),
        }
    }

    /// Attach standby events
    pub fn with_standby(mut self, standby: Vec<E>) -> Self {
        self.standby = standby;
        self
    }
}

/// Sender or recipient of an event (PSID or page id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
}

impl Participant {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Deserialize a list that may be missing or `null` as an empty list
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Convert a webhook millisecond timestamp
pub fn timestamp_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Attachment carried by an incoming message or an echo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// `image`, `video`, `audio`, `file`, `template`, `fallback`, ...
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Option<AttachmentPayload>,
}

impl Attachment {
    pub fn is_template(&self) -> bool {
        self.kind == "template"
    }

    /// Product payload, when the attachment is a product template
    pub fn product(&self) -> Option<&ProductPayload> {
        self.payload.as_ref().and_then(|p| p.product.as_ref())
    }

    pub fn template_type(&self) -> Option<&str> {
        self.payload.as_ref().and_then(|p| p.template_type.as_deref())
    }

    pub fn url(&self) -> Option<&str> {
        self.payload.as_ref().and_then(|p| p.url.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachmentPayload {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sticker_id: Option<u64>,
    #[serde(default)]
    pub template_type: Option<String>,
    #[serde(default)]
    pub product: Option<ProductPayload>,
    /// Template elements other than products, kept untyped
    #[serde(default)]
    pub elements: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPayload {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub elements: Vec<ProductElement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductElement {
    /// Catalog product id; some echoes only carry `retailer_id`
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub retailer_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
}

/// Referral (m.me links, ads, shops, chat plugin)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Referral {
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub ad_id: Option<String>,
    #[serde(default)]
    pub referer_uri: Option<String>,
    #[serde(default)]
    pub product: Option<ReferralProduct>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralProduct {
    #[serde(default)]
    pub id: String,
}
