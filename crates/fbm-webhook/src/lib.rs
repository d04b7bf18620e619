//! fbm-webhook: Messenger Platform webhook dispatch
//!
//! Classifies webhook events (user messages, postbacks, message echoes) into
//! categories and fans them out to registered callbacks. Each family has its
//! own dispatcher built on the generic [`Dispatcher`]; [`WebhookRouter`] owns
//! all three and splits raw deliveries between them.
//!
//! ```ignore
//! let router = WebhookRouter::new();
//! router.messages().on_text(|event| async move {
//!     tracing::info!("{} said {:?}", event.sender_id(), event.text());
//!     Ok(())
//! });
//! router.postbacks().on_payload("BUY_42", |event| async move { Ok(()) });
//! router.route_json(&body).await?;
//! ```

pub mod category;
pub mod classify;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod events;
pub mod message;
pub mod postback;
pub mod registry;
pub mod router;
pub mod verify;

pub use category::{Category, EchoCategory, MessageCategory, PostbackCategory};
pub use dispatcher::{Dispatcher, DispatcherOptions, DispatcherOptionsUpdate, EventFamily};
pub use echo::{EchoDispatcher, EchoEvent, EchoFamily};
pub use error::{Result, WebhookError};
pub use events::{Entry, Participant, WebhookPayload};
pub use message::{MessageDispatcher, MessageEvent, MessageFamily};
pub use postback::{PostbackDispatcher, PostbackEvent, PostbackFamily};
pub use registry::{callback, Callback, CallbackRegistry, HandlerFuture};
pub use router::{RawWebhookPayload, WebhookRouter};
