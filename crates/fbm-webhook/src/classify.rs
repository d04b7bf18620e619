//! Event classifiers
//!
//! Webhook event shapes are not disjoint: one payload may carry several of
//! the optional fields at once (a referral next to attachments, a quick reply
//! next to text). Each classifier checks the fields in a fixed order and
//! returns the first match. The order is the routing contract that existing
//! handlers rely on and must not be rearranged.

use crate::category::{EchoCategory, MessageCategory, PostbackCategory};
use crate::echo::EchoMessage;
use crate::message::IncomingMessage;
use crate::postback::Postback;

/// quick_reply > command > referral > product/attachment > text > unknown
pub fn classify_message(message: &IncomingMessage) -> MessageCategory {
    if message.quick_reply.is_some() {
        MessageCategory::QuickReply
    } else if !message.commands.is_empty() {
        MessageCategory::Command
    } else if message.referral.is_some() {
        MessageCategory::Referral
    } else if !message.attachments.is_empty() {
        // Any product template among the attachments wins
        let has_product = message
            .attachments
            .iter()
            .any(|a| a.is_template() && a.product().is_some());
        if has_product {
            MessageCategory::Product
        } else {
            MessageCategory::Attachment
        }
    } else if message.text.is_some() {
        MessageCategory::Text
    } else {
        MessageCategory::Unknown
    }
}

/// referral > get_started > persistent_menu > button
///
/// Payload matching is case-insensitive and substring based. Every postback
/// has a payload, so the fallback is `button` rather than `unknown`.
pub fn classify_postback(postback: &Postback) -> PostbackCategory {
    if postback.referral.is_some() {
        return PostbackCategory::Referral;
    }

    let payload = postback.payload.to_lowercase();
    if payload.contains("get_started") {
        PostbackCategory::GetStarted
    } else if payload.contains("menu") || payload.contains("persistent") {
        PostbackCategory::PersistentMenu
    } else {
        PostbackCategory::Button
    }
}

/// Only the first attachment is inspected; without attachments text wins.
pub fn classify_echo(message: &EchoMessage) -> EchoCategory {
    if let Some(first) = message.attachments.first() {
        return match first.kind.as_str() {
            "template" if first.product().is_some() => EchoCategory::Product,
            "template" if first.template_type() == Some("media") => EchoCategory::Media,
            "template" => EchoCategory::Template,
            "fallback" => EchoCategory::Fallback,
            // image, video, audio, file and anything unrecognised
            _ => EchoCategory::Attachment,
        };
    }

    if message.text.is_some() {
        EchoCategory::Text
    } else {
        EchoCategory::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(value: serde_json::Value) -> IncomingMessage {
        serde_json::from_value(value).unwrap()
    }

    fn postback(payload: &str) -> Postback {
        serde_json::from_value(json!({ "payload": payload })).unwrap()
    }

    fn echo(value: serde_json::Value) -> EchoMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_message_plain_text() {
        let m = message(json!({"mid": "m1", "text": "Hello"}));
        assert_eq!(classify_message(&m), MessageCategory::Text);
    }

    #[test]
    fn test_message_quick_reply_outranks_attachments() {
        let m = message(json!({
            "mid": "m1",
            "text": "Red",
            "quick_reply": {"payload": "COLOR_RED"},
            "attachments": [{"type": "image", "payload": {"url": "https://x/y.png"}}]
        }));
        assert_eq!(classify_message(&m), MessageCategory::QuickReply);
    }

    #[test]
    fn test_message_command_outranks_referral() {
        let m = message(json!({
            "mid": "m1",
            "text": "/order",
            "commands": [{"name": "order"}],
            "referral": {"ref": "ad"}
        }));
        assert_eq!(classify_message(&m), MessageCategory::Command);
    }

    #[test]
    fn test_message_empty_commands_are_ignored() {
        let m = message(json!({"mid": "m1", "text": "hi", "commands": []}));
        assert_eq!(classify_message(&m), MessageCategory::Text);
    }

    #[test]
    fn test_message_referral_outranks_product() {
        let m = message(json!({
            "mid": "m1",
            "referral": {"product": {"id": "p1"}},
            "attachments": [{"type": "template", "payload": {"product": {"elements": []}}}]
        }));
        assert_eq!(classify_message(&m), MessageCategory::Referral);
    }

    #[test]
    fn test_message_product_in_any_attachment() {
        let m = message(json!({
            "mid": "m1",
            "attachments": [
                {"type": "image", "payload": {"url": "https://x/y.png"}},
                {"type": "template", "payload": {"product": {"elements": [{"id": "p1"}]}}}
            ]
        }));
        assert_eq!(classify_message(&m), MessageCategory::Product);
    }

    #[test]
    fn test_message_template_without_product_is_attachment() {
        let m = message(json!({
            "mid": "m1",
            "text": "ignored",
            "attachments": [{"type": "template", "payload": {"template_type": "generic"}}]
        }));
        assert_eq!(classify_message(&m), MessageCategory::Attachment);
    }

    #[test]
    fn test_message_unknown() {
        let m = message(json!({"mid": "m1"}));
        assert_eq!(classify_message(&m), MessageCategory::Unknown);
    }

    #[test]
    fn test_postback_get_started_case_insensitive() {
        assert_eq!(classify_postback(&postback("GET_STARTED")), PostbackCategory::GetStarted);
        assert_eq!(classify_postback(&postback("user_get_started_v2")), PostbackCategory::GetStarted);
    }

    #[test]
    fn test_postback_menu_and_persistent() {
        assert_eq!(classify_postback(&postback("MAIN_MENU")), PostbackCategory::PersistentMenu);
        assert_eq!(classify_postback(&postback("Persistent_Help")), PostbackCategory::PersistentMenu);
    }

    #[test]
    fn test_postback_get_started_outranks_menu() {
        assert_eq!(
            classify_postback(&postback("MENU_GET_STARTED")),
            PostbackCategory::GetStarted
        );
    }

    #[test]
    fn test_postback_referral_outranks_payload() {
        let p: Postback = serde_json::from_value(json!({
            "payload": "GET_STARTED",
            "referral": {"ref": "campaign", "source": "SHORTLINK", "type": "OPEN_THREAD"}
        }))
        .unwrap();
        assert_eq!(classify_postback(&p), PostbackCategory::Referral);
    }

    #[test]
    fn test_postback_defaults_to_button() {
        assert_eq!(classify_postback(&postback("BUY_ITEM_42")), PostbackCategory::Button);
        assert_eq!(classify_postback(&postback("")), PostbackCategory::Button);
    }

    #[test]
    fn test_echo_product_media_template() {
        let product = echo(json!({
            "is_echo": true,
            "attachments": [{"type": "template", "payload": {"product": {"elements": [{"id": "1"}]}}}]
        }));
        assert_eq!(classify_echo(&product), EchoCategory::Product);

        let media = echo(json!({
            "is_echo": true,
            "attachments": [{"type": "template", "payload": {"template_type": "media"}}]
        }));
        assert_eq!(classify_echo(&media), EchoCategory::Media);

        let generic = echo(json!({
            "is_echo": true,
            "attachments": [{"type": "template", "payload": {"template_type": "generic"}}]
        }));
        assert_eq!(classify_echo(&generic), EchoCategory::Template);
    }

    #[test]
    fn test_echo_only_first_attachment_counts() {
        let m = echo(json!({
            "is_echo": true,
            "attachments": [
                {"type": "image", "payload": {"url": "https://x/y.png"}},
                {"type": "template", "payload": {"product": {"elements": [{"id": "1"}]}}}
            ]
        }));
        assert_eq!(classify_echo(&m), EchoCategory::Attachment);
    }

    #[test]
    fn test_echo_fallback_and_unrecognised() {
        let fallback = echo(json!({"is_echo": true, "attachments": [{"type": "fallback"}]}));
        assert_eq!(classify_echo(&fallback), EchoCategory::Fallback);

        let sticker = echo(json!({"is_echo": true, "attachments": [{"type": "sticker"}]}));
        assert_eq!(classify_echo(&sticker), EchoCategory::Attachment);
    }

    #[test]
    fn test_echo_text_and_unknown() {
        assert_eq!(classify_echo(&echo(json!({"is_echo": true, "text": "hi"}))), EchoCategory::Text);
        assert_eq!(classify_echo(&echo(json!({"is_echo": true}))), EchoCategory::Unknown);
    }
}
