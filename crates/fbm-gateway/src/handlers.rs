//! Default bot behaviour
//!
//! Greets users who tap "Get Started", acknowledges text messages and
//! traces every event family at debug level.

use std::sync::Arc;

use fbm_graph::{GraphClient, SenderAction};
use fbm_webhook::WebhookRouter;
use tracing::{debug, warn};

/// Postback payload sent by the "Get Started" button
pub const GET_STARTED_PAYLOAD: &str = "GET_STARTED";

pub fn greeting(name: &str) -> String {
    format!("Hi {}! Thanks for getting in touch. Send us a message any time.", name)
}

pub fn acknowledgement(text: &str) -> String {
    format!("Got your message: \"{}\"", text)
}

/// Register the default handlers on all three dispatchers
pub fn register_default_handlers(router: &WebhookRouter, graph: Arc<GraphClient>) {
    let client = Arc::clone(&graph);
    router.postbacks().on_get_started(move |event| {
        let client = Arc::clone(&client);
        async move {
            let name = match client.get_user_profile(event.sender_id(), &["first_name"]).await {
                Ok(profile) => profile.greeting_name().to_string(),
                Err(e) => {
                    warn!("Could not load profile for {}: {}", event.sender_id(), e);
                    "there".to_string()
                }
            };
            client.send_text(event.sender_id(), &greeting(&name)).await?;
            Ok(())
        }
    });

    let client = Arc::clone(&graph);
    router.messages().on_text(move |event| {
        let client = Arc::clone(&client);
        async move {
            let Some(text) = event.text() else {
                return Ok(());
            };
            client
                .send_sender_action(event.sender_id(), SenderAction::MarkSeen)
                .await?;
            client
                .send_text(event.sender_id(), &acknowledgement(text))
                .await?;
            Ok(())
        }
    });

    router.messages().on_all(|event| async move {
        debug!(sender = %event.sender_id(), category = %event.category(), "Message event");
        Ok(())
    });
    router.postbacks().on_all(|event| async move {
        debug!(sender = %event.sender_id(), payload = %event.payload(), "Postback event");
        Ok(())
    });
    router.echoes().on_all(|event| async move {
        debug!(page = %event.page_id(), category = %event.category(), "Echo event");
        Ok(())
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbm_webhook::{EchoCategory, MessageCategory, PostbackCategory};

    #[test]
    fn test_messages() {
        assert_eq!(
            greeting("Ada"),
            "Hi Ada! Thanks for getting in touch. Send us a message any time."
        );
        assert_eq!(acknowledgement("hello"), "Got your message: \"hello\"");
    }

    #[test]
    fn test_default_handlers_are_registered() {
        let router = WebhookRouter::new();
        let graph = Arc::new(GraphClient::new("page456", "token").unwrap());
        register_default_handlers(&router, graph);

        assert_eq!(router.postbacks().callback_count(&PostbackCategory::GetStarted), 1);
        assert_eq!(router.messages().callback_count(&MessageCategory::Text), 1);
        assert_eq!(router.messages().callback_count(&MessageCategory::All), 1);
        assert_eq!(router.postbacks().callback_count(&PostbackCategory::All), 1);
        assert_eq!(router.echoes().callback_count(&EchoCategory::All), 1);
    }
}
