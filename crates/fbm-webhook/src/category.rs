//! Category vocabularies used as callback registry keys
//!
//! Every family has its own closed set of labels plus the `all` wildcard.
//! Postbacks additionally carry a dynamic `payload:<value>` variant, kept as
//! its own enum arm so a payload can never collide with a static label.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use crate::error::WebhookError;

/// Wire label of the wildcard category
pub const WILDCARD: &str = "all";

/// Prefix of dynamic postback payload categories
pub const PAYLOAD_PREFIX: &str = "payload:";

/// A registry key
pub trait Category:
    Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// The category that matches every event of the family
    fn wildcard() -> Self;

    fn is_wildcard(&self) -> bool {
        *self == Self::wildcard()
    }
}

/// Categories for incoming user messages
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageCategory {
    Text,
    Attachment,
    QuickReply,
    Referral,
    Command,
    Product,
    Unknown,
    All,
}

impl MessageCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Attachment => "attachment",
            Self::QuickReply => "quick_reply",
            Self::Referral => "referral",
            Self::Command => "command",
            Self::Product => "product",
            Self::Unknown => "unknown",
            Self::All => WILDCARD,
        }
    }
}

impl Category for MessageCategory {
    fn wildcard() -> Self {
        Self::All
    }
}

impl fmt::Display for MessageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageCategory {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "attachment" => Ok(Self::Attachment),
            "quick_reply" => Ok(Self::QuickReply),
            "referral" => Ok(Self::Referral),
            "command" => Ok(Self::Command),
            "product" => Ok(Self::Product),
            "unknown" => Ok(Self::Unknown),
            WILDCARD => Ok(Self::All),
            other => Err(WebhookError::UnknownCategory(other.to_string())),
        }
    }
}

/// Categories for postback events
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PostbackCategory {
    Button,
    GetStarted,
    PersistentMenu,
    Referral,
    /// Exact postback payload subscription
    Payload(String),
    All,
}

impl PostbackCategory {
    pub fn payload(payload: impl Into<String>) -> Self {
        Self::Payload(payload.into())
    }
}

impl Category for PostbackCategory {
    fn wildcard() -> Self {
        Self::All
    }
}

impl fmt::Display for PostbackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Button => f.write_str("button"),
            Self::GetStarted => f.write_str("get_started"),
            Self::PersistentMenu => f.write_str("persistent_menu"),
            Self::Referral => f.write_str("referral"),
            Self::Payload(payload) => write!(f, "{}{}", PAYLOAD_PREFIX, payload),
            Self::All => f.write_str(WILDCARD),
        }
    }
}

impl FromStr for PostbackCategory {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(payload) = s.strip_prefix(PAYLOAD_PREFIX) {
            return Ok(Self::Payload(payload.to_string()));
        }
        match s {
            "button" => Ok(Self::Button),
            "get_started" => Ok(Self::GetStarted),
            "persistent_menu" => Ok(Self::PersistentMenu),
            "referral" => Ok(Self::Referral),
            WILDCARD => Ok(Self::All),
            other => Err(WebhookError::UnknownCategory(other.to_string())),
        }
    }
}

/// Categories for message echoes (messages sent by the page)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EchoCategory {
    Text,
    Attachment,
    Template,
    Product,
    Media,
    Fallback,
    Unknown,
    All,
}

impl EchoCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Attachment => "attachment",
            Self::Template => "template",
            Self::Product => "product",
            Self::Media => "media",
            Self::Fallback => "fallback",
            Self::Unknown => "unknown",
            Self::All => WILDCARD,
        }
    }
}

impl Category for EchoCategory {
    fn wildcard() -> Self {
        Self::All
    }
}

impl fmt::Display for EchoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EchoCategory {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "attachment" => Ok(Self::Attachment),
            "template" => Ok(Self::Template),
            "product" => Ok(Self::Product),
            "media" => Ok(Self::Media),
            "fallback" => Ok(Self::Fallback),
            "unknown" => Ok(Self::Unknown),
            WILDCARD => Ok(Self::All),
            other => Err(WebhookError::UnknownCategory(other.to_string())),
        }
    }
}
