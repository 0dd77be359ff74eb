//! # PayPal Webhook Verification
//!
//! Signature verification and event mapping for PayPal webhooks.
//!
//! Deliveries carry a `paypal-signature` header of the form
//! `t=<unix>,s=<hex>` where `s = HMAC-SHA256(secret, "{t}.{body}")` over the
//! exact request bytes. Verification runs before any JSON parsing.
//!
//! Event mapping follows the capture lifecycle: approval alone moves no
//! money, so `CHECKOUT.ORDER.APPROVED` is informational; the order settles
//! (or fails) at capture time.

use chrono::Utc;
use paygate_core::{PaymentError, PaymentResult, ProviderEvent, ProviderEventKind};
use serde::Deserialize;
use tracing::debug;

/// Accepted clock skew between PayPal and us, in seconds
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

fn compute_hmac_sha256(secret: &str, message: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(message.as_bytes());
    let result = mac.finalize();
    hex::encode(result.into_bytes())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

fn parse_signature_header(header: &str) -> PaymentResult<(i64, String)> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        let kv: Vec<&str> = part.split('=').collect();
        if kv.len() != 2 {
            continue;
        }
        match kv[0] {
            "t" => timestamp = kv[1].parse().ok(),
            "s" => signature = Some(kv[1].to_string()),
            _ => {}
        }
    }

    match (timestamp, signature) {
        (Some(t), Some(s)) => Ok((t, s)),
        _ => Err(PaymentError::WebhookVerificationFailed(
            "Malformed paypal-signature header".to_string(),
        )),
    }
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

    let (timestamp, sig) = parse_signature_header(signature)?;

    let now = Utc::now().timestamp();
    if (now - timestamp).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(PaymentError::WebhookVerificationFailed(
            "Timestamp outside tolerance".to_string(),
        ));
    }

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let expected = compute_hmac_sha256(secret, &signed_payload);

    if !constant_time_compare(&sig, &expected) {
        return Err(PaymentError::WebhookVerificationFailed(
            "Signature mismatch".to_string(),
        ));
    }

    parse_event(payload)
}

#[derive(Debug, Deserialize)]
struct PaypalWebhookEvent {
    id: String,
    event_type: String,
    #[serde(default)]
    resource: serde_json::Value,
}

/// Map a verified PayPal event into the uniform provider event.
///
/// `PAYMENT.CAPTURE.COMPLETED` reconciles like a completed checkout: the
/// local order id comes from `custom_id` and the capture id becomes the
/// stored payment reference (captures, not checkout orders, are what the
/// refund API accepts).
fn parse_event(payload: &[u8]) -> PaymentResult<ProviderEvent> {
    let event: PaypalWebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| PaymentError::WebhookParse(format!("Failed to parse webhook: {}", e)))?;

    debug!(event_type = %event.event_type, "verified PayPal webhook");

    let resource = &event.resource;
    let capture_id = resource.get("id").and_then(|v| v.as_str()).map(String::from);
    let custom_id = resource
        .get("custom_id")
        .and_then(|v| v.as_str())
        .map(String::from);
    // The checkout order the capture belongs to; this is what was stored as
    // the transaction id at initiation time.
    let checkout_order_id = resource
        .get("supplementary_data")
        .and_then(|d| d.get("related_ids"))
        .and_then(|r| r.get("order_id"))
        .and_then(|v| v.as_str())
        .map(String::from);

    let (kind, transaction_id, order_id) = match event.event_type.as_str() {
        "PAYMENT.CAPTURE.COMPLETED" => {
            (ProviderEventKind::CheckoutCompleted, capture_id, custom_id)
        }
        "PAYMENT.CAPTURE.DENIED" | "PAYMENT.CAPTURE.DECLINED" => (
            ProviderEventKind::PaymentFailed,
            checkout_order_id.or(capture_id),
            custom_id,
        ),
        other => (
            ProviderEventKind::Unknown(other.to_string()),
            capture_id,
            custom_id,
        ),
    };

    Ok(ProviderEvent {
        event_id: event.id,
        kind,
        transaction_id,
        order_id,
        raw: event.resource,
    })
}

/// Build a valid `paypal-signature` header for a payload. Used by tests and
/// local tooling that replays webhooks.
pub fn sign_payload(secret: &str, payload: &[u8], timestamp: i64) -> String {
    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    format!(
        "t={},s={}",
        timestamp,
        compute_hmac_sha256(secret, &signed_payload)
    )
}
