//! Webhook subscription challenge and payload signature checks

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{info, warn};

use crate::error::{Result, WebhookError};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

/// Answer the `hub.challenge` handshake sent when the webhook is registered
pub fn verify_challenge(
    mode: &str,
    token: &str,
    challenge: &str,
    expected_token: &str,
) -> Result<String> {
    if mode == "subscribe" && token == expected_token {
        info!("Webhook verified successfully");
        Ok(challenge.to_string())
    } else {
        warn!("Webhook verification failed: invalid mode or token");
        Err(WebhookError::VerificationFailed)
    }
}

/// Check an `X-Hub-Signature-256: sha256=<hex>` header against the raw body
pub fn verify_signature(app_secret: &str, body: &[u8], header: &str) -> Result<()> {
    let hex_digest = header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(WebhookError::InvalidSignature)?;
    let expected = hex::decode(hex_digest).map_err(|_| WebhookError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| WebhookError::InvalidSignature)
}

/// Compute the header value for a body (used by tests and local tooling)
pub fn sign(app_secret: &str, body: &[u8]) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(body);
    Ok(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_challenge() {
        assert_eq!(
            verify_challenge("subscribe", "verify", "challenge", "verify").unwrap(),
            "challenge"
        );
        assert!(verify_challenge("subscribe", "wrong", "challenge", "verify").is_err());
        assert!(verify_challenge("unsubscribe", "verify", "challenge", "verify").is_err());
    }

    #[test]
    fn test_verify_signature() {
        let secret = "test_secret";
        let body = br#"{"object":"page","entry":[]}"#;

        let valid = sign(secret, body).unwrap();
        assert!(valid.starts_with("sha256="));
        assert!(verify_signature(secret, body, &valid).is_ok());

        assert!(verify_signature("other_secret", body, &valid).is_err());
        assert!(verify_signature(secret, b"tampered", &valid).is_err());
        assert!(verify_signature(secret, body, "sha256=zz").is_err());
        assert!(verify_signature(secret, body, valid.trim_start_matches("sha256=")).is_err());
    }
}
