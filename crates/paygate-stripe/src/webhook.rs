//! # Stripe Webhook Verification
//!
//! Signature verification and event mapping for Stripe webhooks.
//!
//! Stripe signs the exact request body: `HMAC-SHA256(secret, "{t}.{body}")`,
//! delivered in the `stripe-signature` header as `t=<unix>,v1=<hex>[,v1=...]`.
//! Verification therefore has to run on the raw bytes, before any JSON
//! parsing.

use chrono::Utc;
use paygate_core::{PaymentError, PaymentResult, ProviderEvent, ProviderEventKind};
use serde::Deserialize;
use tracing::debug;

/// Accepted clock skew between Stripe and us, in seconds
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

pub(crate) struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

pub(crate) fn parse_signature_header(header: &str) -> PaymentResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let kv: Vec<&str> = part.split('=').collect();
        if kv.len() != 2 {
            continue;
        }
        match kv[0] {
            "t" => {
                timestamp = kv[1].parse().ok();
            }
            "v1" => {
                signatures.push(kv[1].to_string());
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        PaymentError::WebhookVerificationFailed("Missing timestamp in signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(PaymentError::WebhookVerificationFailed(
            "No v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

pub(crate) fn compute_hmac_sha256(secret: &str, message: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    let result = mac.finalize();
    hex::encode(result.into_bytes())
}

pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Verify a webhook payload and map it into a [`ProviderEvent`]
pub fn verify_and_parse(
    secret: &str,
    payload: &[u8],
    signature: &str,
) -> PaymentResult<ProviderEvent> {
    if secret.is_empty() {
        return Err(PaymentError::WebhookVerificationFailed(
            "Webhook secret not configured".to_string(),
        ));
    }

    let sig_parts = parse_signature_header(signature)?;

    let now = Utc::now().timestamp();
    if (now - sig_parts.timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(PaymentError::WebhookVerificationFailed(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let signed_payload = format!(
        "{}.{}",
        sig_parts.timestamp,
        String::from_utf8_lossy(payload)
    );
    let expected_sig = compute_hmac_sha256(secret, &signed_payload);

    let valid = sig_parts
        .signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected_sig));

    if !valid {
        return Err(PaymentError::WebhookVerificationFailed(
            "Signature mismatch".to_string(),
        ));
    }

    parse_event(payload)
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

/// Map a verified Stripe event into the uniform provider event
fn parse_event(payload: &[u8]) -> PaymentResult<ProviderEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| PaymentError::WebhookParse(format!("Failed to parse webhook: {}", e)))?;

    debug!(event_type = %event.event_type, "verified Stripe webhook");

    let object = &event.data.object;
    let object_id = object.get("id").and_then(|v| v.as_str()).map(String::from);

    let (kind, transaction_id, order_id) = match event.event_type.as_str() {
        "payment_intent.succeeded" => (ProviderEventKind::PaymentSucceeded, object_id, None),
        "payment_intent.payment_failed" => (ProviderEventKind::PaymentFailed, object_id, None),
        "checkout.session.completed" => {
            // The session object carries the real payment intent id plus our
            // order id in metadata; both are needed for reconciliation.
            let payment_intent = object
                .get("payment_intent")
                .and_then(|v| v.as_str())
                .map(String::from);
            let order_id = object
                .get("metadata")
                .and_then(|m| m.get("order_id"))
                .and_then(|v| v.as_str())
                .map(String::from);
            (
                ProviderEventKind::CheckoutCompleted,
                payment_intent,
                order_id,
            )
        }
        other => (
            ProviderEventKind::Unknown(other.to_string()),
            object_id,
            None,
        ),
    };

    Ok(ProviderEvent {
        event_id: event.id,
        kind,
        transaction_id,
        order_id,
        raw: serde_json::Value::Object(event.data.object),
    })
}

/// Build a valid `stripe-signature` header for a payload. Used by tests and
/// local tooling that replays webhooks.
pub fn sign_payload(secret: &str, payload: &[u8], timestamp: i64) -> String {
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    format!(
        "t={},v1={}",
        timestamp,
        compute_hmac_sha256(secret, &signed_payload)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_signature_header() {
        let header = "t=1234567890,v1=abc123,v1=def456";
        let parsed = parse_signature_header(header).unwrap();

        assert_eq!(parsed.timestamp, 1234567890);
        assert_eq!(parsed.signatures.len(), 2);
        assert_eq!(parsed.signatures[0], "abc123");
    }

    #[test]
    fn test_parse_signature_header_missing_parts() {
        assert!(parse_signature_header("v1=abc").is_err());
        assert!(parse_signature_header("t=123").is_err());
    }

    #[test]
    fn test_hmac_sha256() {
        let sig = compute_hmac_sha256("whsec_test", "1234567890.{}");
        // 64-character hex string
        assert_eq!(sig.len(), 64);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_verify_roundtrip() {
        let secret = "whsec_test";
        let payload = json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": {"object": {"id": "pi_123"}}
        })
        .to_string()
        .into_bytes();

        let header = sign_payload(secret, &payload, Utc::now().timestamp());
        let event = verify_and_parse(secret, &payload, &header).unwrap();

        assert_eq!(event.kind, ProviderEventKind::PaymentSucceeded);
        assert_eq!(event.transaction_id.as_deref(), Some("pi_123"));
    }

    #[test]
    fn test_verify_rejects_bad_signature() {
        let payload = br#"{"id":"evt_1","type":"x","data":{"object":{}}}"#;
        let header = sign_payload("whsec_other", payload, Utc::now().timestamp());

        let err = verify_and_parse("whsec_test", payload, &header).unwrap_err();
        assert!(matches!(err, PaymentError::WebhookVerificationFailed(_)));
    }

    #[test]
    fn test_verify_rejects_stale_timestamp() {
        let payload = br#"{}"#;
        let header = sign_payload("whsec_test", payload, Utc::now().timestamp() - 3600);

        let err = verify_and_parse("whsec_test", payload, &header).unwrap_err();
        assert!(matches!(err, PaymentError::WebhookVerificationFailed(_)));
    }

    #[test]
    fn test_verify_rejects_missing_secret() {
        let payload = br#"{}"#;
        let err = verify_and_parse("", payload, "t=1,v1=a").unwrap_err();
        assert!(matches!(err, PaymentError::WebhookVerificationFailed(_)));
    }

    #[test]
    fn test_checkout_completed_mapping() {
        let secret = "whsec_test";
        let payload = json!({
            "id": "evt_2",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_test_123",
                "payment_intent": "pi_real_456",
                "metadata": {"order_id": "3f0c9a54-0000-0000-0000-000000000000"}
            }}
        })
        .to_string()
        .into_bytes();

        let header = sign_payload(secret, &payload, Utc::now().timestamp());
        let event = verify_and_parse(secret, &payload, &header).unwrap();

        assert_eq!(event.kind, ProviderEventKind::CheckoutCompleted);
        assert_eq!(event.transaction_id.as_deref(), Some("pi_real_456"));
        assert_eq!(
            event.order_id.as_deref(),
            Some("3f0c9a54-0000-0000-0000-000000000000")
        );
    }

    #[test]
    fn test_unknown_event_mapping() {
        let secret = "whsec_test";
        let payload = json!({
            "id": "evt_3",
            "type": "customer.subscription.created",
            "data": {"object": {"id": "sub_1"}}
        })
        .to_string()
        .into_bytes();

        let header = sign_payload(secret, &payload, Utc::now().timestamp());
        let event = verify_and_parse(secret, &payload, &header).unwrap();

        assert!(matches!(event.kind, ProviderEventKind::Unknown(_)));
    }
}
