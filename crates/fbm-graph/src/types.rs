//! Send API and Graph API data structures

use serde::{Deserialize, Serialize};

use crate::template::Template;
use crate::validate::{Validate, ValidationError};

/// `messaging_type` of a Send API request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessagingType {
    /// Reply to a user message within the 24h window
    Response,
    Update,
    MessageTag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: String,
}

/// Typing indicators and read receipts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderAction {
    MarkSeen,
    TypingOn,
    TypingOff,
}

/// Body of `POST /{page}/messages`
#[derive(Debug, Clone, Serialize)]
pub struct SendRequest {
    pub recipient: Recipient,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messaging_type: Option<MessagingType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<OutgoingMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_action: Option<SenderAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl SendRequest {
    pub fn message(recipient_id: &str, message: OutgoingMessage) -> Self {
        Self {
            recipient: Recipient {
                id: recipient_id.to_string(),
            },
            messaging_type: Some(MessagingType::Response),
            message: Some(message),
            sender_action: None,
            tag: None,
        }
    }

    pub fn action(recipient_id: &str, action: SenderAction) -> Self {
        Self {
            recipient: Recipient {
                id: recipient_id.to_string(),
            },
            messaging_type: None,
            message: None,
            sender_action: Some(action),
            tag: None,
        }
    }

    pub fn messaging_type(mut self, messaging_type: MessagingType) -> Self {
        self.messaging_type = Some(messaging_type);
        self
    }

    /// Send outside the 24h window with a message tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.messaging_type = Some(MessagingType::MessageTag);
        self.tag = Some(tag.into());
        self
    }
}

/// Message content: text or one attachment, plus optional quick replies
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutgoingMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<OutgoingAttachment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub quick_replies: Vec<QuickReply>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            attachment: None,
            quick_replies: Vec::new(),
            metadata: None,
        }
    }

    pub fn attachment(attachment: OutgoingAttachment) -> Self {
        Self {
            text: None,
            attachment: Some(attachment),
            quick_replies: Vec::new(),
            metadata: None,
        }
    }

    pub fn template(template: Template) -> Self {
        Self::attachment(OutgoingAttachment::Template {
            payload: template,
        })
    }

    pub fn with_quick_replies(mut self, quick_replies: Vec<QuickReply>) -> Self {
        self.quick_replies = quick_replies;
        self
    }

    /// Opaque string echoed back in the `message_echoes` event
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

/// Attachment of an outgoing message, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutgoingAttachment {
    Image { payload: MediaPayload },
    Audio { payload: MediaPayload },
    Video { payload: MediaPayload },
    File { payload: MediaPayload },
    Template { payload: Template },
}

impl OutgoingAttachment {
    pub fn from_url(kind: AttachmentKind, url: impl Into<String>) -> Self {
        let payload = MediaPayload {
            url: Some(url.into()),
            attachment_id: None,
            is_reusable: None,
        };
        kind.with_payload(payload)
    }

    pub fn from_attachment_id(kind: AttachmentKind, attachment_id: impl Into<String>) -> Self {
        let payload = MediaPayload {
            url: None,
            attachment_id: Some(attachment_id.into()),
            is_reusable: None,
        };
        kind.with_payload(payload)
    }
}

impl Validate for OutgoingAttachment {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Template { payload } => payload.validate(),
            Self::Image { payload }
            | Self::Audio { payload }
            | Self::Video { payload }
            | Self::File { payload } => match (&payload.url, &payload.attachment_id) {
                (Some(url), None) => match reqwest::Url::parse(url) {
                    Ok(u) if matches!(u.scheme(), "http" | "https") => Ok(()),
                    _ => Err(ValidationError::InvalidUrl {
                        field: "attachment.url",
                        value: url.clone(),
                    }),
                },
                (None, Some(_)) => Ok(()),
                _ => Err(ValidationError::Invalid(
                    "attachment needs exactly one of url or attachment_id".to_string(),
                )),
            },
        }
    }
}

/// Media attachment kinds accepted by the Send API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Audio,
    Video,
    File,
}

impl AttachmentKind {
    fn with_payload(self, payload: MediaPayload) -> OutgoingAttachment {
        match self {
            Self::Image => OutgoingAttachment::Image { payload },
            Self::Audio => OutgoingAttachment::Audio { payload },
            Self::Video => OutgoingAttachment::Video { payload },
            Self::File => OutgoingAttachment::File { payload },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_reusable: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickReplyType {
    Text,
    UserPhoneNumber,
    UserEmail,
}

/// Quick reply button shown above the composer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickReply {
    pub content_type: QuickReplyType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl QuickReply {
    pub fn text(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            content_type: QuickReplyType::Text,
            title: Some(title.into()),
            payload: Some(payload.into()),
            image_url: None,
        }
    }

    pub fn user_email() -> Self {
        Self {
            content_type: QuickReplyType::UserEmail,
            title: None,
            payload: None,
            image_url: None,
        }
    }

    pub fn user_phone_number() -> Self {
        Self {
            content_type: QuickReplyType::UserPhoneNumber,
            title: None,
            payload: None,
            image_url: None,
        }
    }

    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    pub recipient_id: Option<String>,
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profile_pic: Option<String>,
    pub locale: Option<String>,
}

impl UserProfile {
    /// First name, or "there" when the profile hides it
    pub fn greeting_name(&self) -> &str {
        self.first_name.as_deref().unwrap_or("there")
    }
}

/// Result of an OAuth token exchange
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribedApp {
    pub id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub subscribed_fields: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribedApps {
    #[serde(default)]
    pub data: Vec<SubscribedApp>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: bool,
}

/// `{"error": {...}}` body returned on failed Graph calls
#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorBody {
    pub error: GraphErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub code: Option<i64>,
    pub error_subcode: Option<i64>,
    pub fbtrace_id: Option<String>,
}
