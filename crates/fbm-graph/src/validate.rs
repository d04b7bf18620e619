//! Field validation for outgoing messages
//!
//! Checks run before a request is sent so that oversized or malformed
//! messages fail locally with a precise field name instead of a generic
//! `(#100) Invalid parameter` from the Graph API. Lengths are counted in
//! characters.

use thiserror::Error;

use crate::template::{Button, GenericElement, MediaElement, PersistentMenu, Template};
use crate::types::{OutgoingMessage, QuickReply, QuickReplyType};

pub const MAX_TEXT_LEN: usize = 2000;
pub const MAX_QUICK_REPLIES: usize = 13;
pub const MAX_QUICK_REPLY_TITLE: usize = 20;
pub const MAX_PAYLOAD_LEN: usize = 1000;
pub const MAX_BUTTONS: usize = 3;
pub const MAX_BUTTON_TITLE: usize = 20;
pub const MAX_GENERIC_ELEMENTS: usize = 10;
pub const MAX_ELEMENT_TITLE: usize = 80;
pub const MAX_ELEMENT_SUBTITLE: usize = 80;
pub const MAX_PRODUCTS: usize = 10;
pub const MAX_MENU_ITEMS: usize = 20;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} exceeds {max} characters (got {len})")]
    TooLong {
        field: &'static str,
        max: usize,
        len: usize,
    },

    #[error("{field} allows {min} to {max} items (got {count})")]
    Count {
        field: &'static str,
        min: usize,
        max: usize,
        count: usize,
    },

    #[error("{field} must be an http(s) URL: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{0}")]
    Invalid(String),
}

type Result = std::result::Result<(), ValidationError>;

/// Outgoing values that can be checked before sending
pub trait Validate {
    fn validate(&self) -> Result;
}

fn max_len(field: &'static str, value: &str, max: usize) -> Result {
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { field, max, len });
    }
    Ok(())
}

fn required(field: &'static str, value: &str, max: usize) -> Result {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    max_len(field, value, max)
}

fn count(field: &'static str, count: usize, min: usize, max: usize) -> Result {
    if count < min || count > max {
        return Err(ValidationError::Count {
            field,
            min,
            max,
            count,
        });
    }
    Ok(())
}

fn http_url(field: &'static str, value: &str) -> Result {
    match reqwest::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}

fn buttons(field: &'static str, list: &[Button], min: usize) -> Result {
    count(field, list.len(), min, MAX_BUTTONS)?;
    list.iter().try_for_each(Validate::validate)
}

impl Validate for Button {
    fn validate(&self) -> Result {
        required("button.title", self.title(), MAX_BUTTON_TITLE)?;
        match self {
            Button::WebUrl { url, .. } => http_url("button.url", url),
            Button::Postback { payload, .. } => required("button.payload", payload, MAX_PAYLOAD_LEN),
            Button::PhoneNumber { payload, .. } => {
                if !payload.starts_with('+') || payload.len() < 2 {
                    return Err(ValidationError::Invalid(format!(
                        "phone number must start with '+' and a country code: {}",
                        payload
                    )));
                }
                Ok(())
            }
        }
    }
}

impl Validate for GenericElement {
    fn validate(&self) -> Result {
        required("element.title", &self.title, MAX_ELEMENT_TITLE)?;
        if let Some(subtitle) = &self.subtitle {
            max_len("element.subtitle", subtitle, MAX_ELEMENT_SUBTITLE)?;
        }
        if let Some(image_url) = &self.image_url {
            http_url("element.image_url", image_url)?;
        }
        if let Some(action) = &self.default_action {
            http_url("element.default_action.url", &action.url)?;
        }
        buttons("element.buttons", &self.buttons, 0)
    }
}

impl Validate for MediaElement {
    fn validate(&self) -> Result {
        match (&self.attachment_id, &self.url) {
            (Some(_), None) => {}
            (None, Some(url)) => http_url("media.url", url)?,
            _ => {
                return Err(ValidationError::Invalid(
                    "media element needs exactly one of attachment_id or url".to_string(),
                ));
            }
        }
        buttons("media.buttons", &self.buttons, 0)
    }
}

impl Validate for Template {
    fn validate(&self) -> Result {
        match self {
            Template::Generic { elements, .. } => {
                count("generic.elements", elements.len(), 1, MAX_GENERIC_ELEMENTS)?;
                elements.iter().try_for_each(Validate::validate)
            }
            Template::Button { text, buttons: list } => {
                required("button_template.text", text, MAX_TEXT_LEN)?;
                buttons("button_template.buttons", list, 1)
            }
            Template::Media { elements } => {
                count("media.elements", elements.len(), 1, 1)?;
                elements.iter().try_for_each(Validate::validate)
            }
            Template::Product { elements } => {
                count("product.elements", elements.len(), 1, MAX_PRODUCTS)?;
                elements
                    .iter()
                    .try_for_each(|p| required("product.id", &p.id, usize::MAX))
            }
        }
    }
}

impl Validate for QuickReply {
    fn validate(&self) -> Result {
        if self.content_type == QuickReplyType::Text {
            let title = self.title.as_deref().unwrap_or_default();
            required("quick_reply.title", title, MAX_QUICK_REPLY_TITLE)?;
            let payload = self.payload.as_deref().unwrap_or_default();
            required("quick_reply.payload", payload, MAX_PAYLOAD_LEN)?;
        }
        if let Some(image_url) = &self.image_url {
            http_url("quick_reply.image_url", image_url)?;
        }
        Ok(())
    }
}

impl Validate for OutgoingMessage {
    fn validate(&self) -> Result {
        match (&self.text, &self.attachment) {
            (Some(text), None) => required("message.text", text, MAX_TEXT_LEN)?,
            (None, Some(attachment)) => attachment.validate()?,
            _ => {
                return Err(ValidationError::Invalid(
                    "message needs exactly one of text or attachment".to_string(),
                ));
            }
        }
        count("message.quick_replies", self.quick_replies.len(), 0, MAX_QUICK_REPLIES)?;
        self.quick_replies.iter().try_for_each(Validate::validate)
    }
}

impl Validate for PersistentMenu {
    fn validate(&self) -> Result {
        required("menu.locale", &self.locale, usize::MAX)?;
        count("menu.call_to_actions", self.call_to_actions.len(), 1, MAX_MENU_ITEMS)?;
        self.call_to_actions.iter().try_for_each(Validate::validate)
    }
}
