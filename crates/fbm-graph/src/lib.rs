//! fbm-graph: Facebook Graph API client for Messenger bots
//!
//! Sends replies through the Send API, reads user profiles, exchanges
//! tokens and manages page subscriptions and the Messenger profile.
//! Outgoing messages are validated against the platform limits before
//! any request is made.

pub mod client;
pub mod error;
pub mod template;
pub mod types;
pub mod validate;

pub use client::{GraphClient, DEFAULT_GRAPH_VERSION, DEFAULT_SUBSCRIBED_FIELDS};
pub use error::{GraphError, Result};
pub use template::{Button, GenericElement, MediaElement, MediaType, PersistentMenu, Template};
pub use types::{
    AttachmentKind, MessagingType, OutgoingAttachment, OutgoingMessage, QuickReply, SendRequest,
    SendResponse, SenderAction, UserProfile,
};
pub use validate::{Validate, ValidationError};
