//! Svix webhook signature verification.
//!
//! Clerk delivers webhooks through Svix, which signs
//! `{svix-id}.{svix-timestamp}.{body}` with HMAC-SHA256 and sends the
//! base64 digest in the `svix-signature` header.
//! Reference: https://docs.svix.com/receiving/verifying-payloads/how-manual

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::warn;

use crate::config::SigningSecret;

type HmacSha256 = Hmac<Sha256>;

pub const SVIX_ID_HEADER: &str = "svix-id";
pub const SVIX_TIMESTAMP_HEADER: &str = "svix-timestamp";
pub const SVIX_SIGNATURE_HEADER: &str = "svix-signature";

/// Only `v1` (HMAC-SHA256) signatures are understood.
const SIGNATURE_VERSION: &str = "v1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing or empty header: {0}")]
    MissingHeader(&'static str),

    #[error("timestamp header is not a unix timestamp")]
    InvalidTimestamp,

    #[error("timestamp is outside the tolerance window")]
    TimestampOutOfRange,

    #[error("no signature matched")]
    NoMatchingSignature,
}

/// The three Svix headers needed to verify a delivery.
#[derive(Debug, Clone, Copy)]
pub struct WebhookHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

impl<'a> WebhookHeaders<'a> {
    /// Pull the Svix headers out of a request, rejecting absent or empty values.
    pub fn from_header_map(headers: &'a HeaderMap) -> Result<Self, SignatureError> {
        Ok(Self {
            id: required_header(headers, SVIX_ID_HEADER)?,
            timestamp: required_header(headers, SVIX_TIMESTAMP_HEADER)?,
            signature: required_header(headers, SVIX_SIGNATURE_HEADER)?,
        })
    }
}

fn required_header<'a>(
    headers: &'a HeaderMap,
    name: &'static str,
) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(SignatureError::MissingHeader(name))
}

/// Verify a webhook delivery against the current wall clock.
pub fn verify_webhook(
    secret: &SigningSecret,
    headers: &WebhookHeaders<'_>,
    body: &[u8],
    tolerance_secs: u64,
) -> Result<(), SignatureError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    verify_webhook_at(secret, headers, body, tolerance_secs, now)
}

/// Verify a webhook delivery as of `now` (unix seconds).
///
/// The timestamp must lie within `tolerance_secs` of `now` in either
/// direction, and at least one `v1` entry of the space-separated signature
/// header must match.
pub fn verify_webhook_at(
    secret: &SigningSecret,
    headers: &WebhookHeaders<'_>,
    body: &[u8],
    tolerance_secs: u64,
    now: u64,
) -> Result<(), SignatureError> {
    let sent_at: u64 = headers.timestamp.parse().map_err(|_| {
        warn!(timestamp = %headers.timestamp, "webhook_signature_invalid_timestamp");
        SignatureError::InvalidTimestamp
    })?;

    let age = now.abs_diff(sent_at);
    if age > tolerance_secs {
        warn!(
            webhook_time = sent_at,
            current_time = now,
            age_seconds = age,
            max_age_seconds = tolerance_secs,
            "webhook_signature_stale"
        );
        return Err(SignatureError::TimestampOutOfRange);
    }

    let mac = signed_content_mac(secret, headers.id, headers.timestamp, body);

    let matched = headers
        .signature
        .split_whitespace()
        .filter_map(|entry| entry.split_once(','))
        .filter(|(version, _)| *version == SIGNATURE_VERSION)
        .filter_map(|(_, encoded)| STANDARD.decode(encoded).ok())
        .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());

    if !matched {
        warn!(
            svix_id = %headers.id,
            signature_entries = headers.signature.split_whitespace().count(),
            "webhook_signature_mismatch"
        );
        return Err(SignatureError::NoMatchingSignature);
    }

    Ok(())
}

/// Produce a `v1,<base64>` signature for the given delivery.
///
/// Used to sign test deliveries; the server only ever verifies.
pub fn sign_webhook(secret: &SigningSecret, id: &str, timestamp: &str, body: &[u8]) -> String {
    let mac = signed_content_mac(secret, id, timestamp, body);
    format!(
        "{},{}",
        SIGNATURE_VERSION,
        STANDARD.encode(mac.finalize().into_bytes())
    )
}

fn signed_content_mac(
    secret: &SigningSecret,
    id: &str,
    timestamp: &str,
    body: &[u8],
) -> HmacSha256 {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => unreachable!("HMAC accepts keys of any length"),
    };
    mac.update(id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    mac
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const NOW: u64 = 1_700_000_000;
    const BODY: &[u8] = br#"{"type":"user.created","data":{"id":"u1"}}"#;

    fn secret() -> SigningSecret {
        SigningSecret::parse("whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw").unwrap()
    }

    fn signed(body: &[u8]) -> String {
        sign_webhook(&secret(), "msg_1", &NOW.to_string(), body)
    }

    fn headers<'a>(timestamp: &'a str, signature: &'a str) -> WebhookHeaders<'a> {
        WebhookHeaders {
            id: "msg_1",
            timestamp,
            signature,
        }
    }

    #[test]
    fn test_verify_valid_signature() {
        let ts = NOW.to_string();
        let sig = signed(BODY);
        assert_eq!(
            verify_webhook_at(&secret(), &headers(&ts, &sig), BODY, 300, NOW),
            Ok(())
        );
    }

    #[test]
    fn test_verify_tampered_body() {
        let ts = NOW.to_string();
        let sig = signed(BODY);
        let tampered = br#"{"type":"user.deleted","data":{"id":"u1"}}"#;
        assert_eq!(
            verify_webhook_at(&secret(), &headers(&ts, &sig), tampered, 300, NOW),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn test_verify_wrong_secret() {
        let ts = NOW.to_string();
        let other = SigningSecret::parse("whsec_b3RoZXItc2VjcmV0").unwrap();
        let sig = sign_webhook(&other, "msg_1", &ts, BODY);
        assert_eq!(
            verify_webhook_at(&secret(), &headers(&ts, &sig), BODY, 300, NOW),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn test_verify_any_of_multiple_signatures() {
        let ts = NOW.to_string();
        let sig = format!("v1,Zm9vYmFy v2,ignored {}", signed(BODY));
        assert_eq!(
            verify_webhook_at(&secret(), &headers(&ts, &sig), BODY, 300, NOW),
            Ok(())
        );
    }

    #[test]
    fn test_verify_ignores_unknown_versions() {
        let ts = NOW.to_string();
        let sig = signed(BODY).replacen("v1,", "v1a,", 1);
        assert_eq!(
            verify_webhook_at(&secret(), &headers(&ts, &sig), BODY, 300, NOW),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn test_verify_stale_and_future_timestamps() {
        let ts = NOW.to_string();
        let sig = signed(BODY);
        assert_eq!(
            verify_webhook_at(&secret(), &headers(&ts, &sig), BODY, 300, NOW + 301),
            Err(SignatureError::TimestampOutOfRange)
        );
        assert_eq!(
            verify_webhook_at(&secret(), &headers(&ts, &sig), BODY, 300, NOW - 301),
            Err(SignatureError::TimestampOutOfRange)
        );
        assert_eq!(
            verify_webhook_at(&secret(), &headers(&ts, &sig), BODY, 300, NOW + 300),
            Ok(())
        );
    }

    #[test]
    fn test_verify_invalid_timestamp() {
        let sig = signed(BODY);
        assert_eq!(
            verify_webhook_at(&secret(), &headers("yesterday", &sig), BODY, 300, NOW),
            Err(SignatureError::InvalidTimestamp)
        );
    }

    #[test]
    fn test_headers_required() {
        let mut map = HeaderMap::new();
        map.insert(SVIX_ID_HEADER, HeaderValue::from_static("msg_1"));
        map.insert(SVIX_TIMESTAMP_HEADER, HeaderValue::from_static("1700000000"));
        assert_eq!(
            WebhookHeaders::from_header_map(&map).unwrap_err(),
            SignatureError::MissingHeader(SVIX_SIGNATURE_HEADER)
        );

        map.insert(SVIX_SIGNATURE_HEADER, HeaderValue::from_static("  "));
        assert_eq!(
            WebhookHeaders::from_header_map(&map).unwrap_err(),
            SignatureError::MissingHeader(SVIX_SIGNATURE_HEADER)
        );

        map.insert(SVIX_SIGNATURE_HEADER, HeaderValue::from_static("v1,abc"));
        let parsed = WebhookHeaders::from_header_map(&map).unwrap();
        assert_eq!(parsed.id, "msg_1");
        assert_eq!(parsed.timestamp, "1700000000");
        assert_eq!(parsed.signature, "v1,abc");
    }
}
