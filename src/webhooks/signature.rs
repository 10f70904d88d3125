//! Webhook signature verification using HMAC-SHA256.
//!
//! The vendor signs each delivery with a shared endpoint secret. The signature
//! header has the form `t=<unix seconds>,v1=<hex>[,v1=<hex>...]`, where every
//! `v1` entry is an HMAC-SHA256 over `"<t>.<raw body>"`. Several `v1` entries
//! appear while a secret is being rotated; a delivery is authentic if any of
//! them matches.
//!
//! Verification is the first step in webhook processing. Nothing downstream
//! sees a body that has not passed through [`verify`], which is enforced by
//! [`VerifiedPayload`] having no public constructor.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Replay window used when the embedding application does not configure one.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(300);

/// The only signature scheme we verify. Other schemes (e.g. `v0`) are ignored.
const SIGNATURE_SCHEME: &str = "v1";

/// Reasons a delivery fails verification.
///
/// All of these reject the request with HTTP 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// No `v1` signature in the header matches the payload.
    #[error("no signature matches the expected signature for the payload")]
    SignatureInvalid,

    /// The signed timestamp is too far from the current time.
    #[error("timestamp {timestamp} is outside the tolerance window of {tolerance_secs}s")]
    Stale { timestamp: i64, tolerance_secs: u64 },

    /// The header lacks required fields, or the body is not well-formed JSON.
    #[error("malformed payload: {0}")]
    PayloadMalformed(String),
}

/// A parsed signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp (seconds) the vendor signed the delivery at.
    pub timestamp: i64,

    /// Decoded `v1` signatures. Entries that were not valid hex are dropped,
    /// since they can never match.
    pub signatures: Vec<Vec<u8>>,
}

/// A request body proven to come from the holder of the shared secret.
#[derive(Debug, Clone)]
pub struct VerifiedPayload {
    body: Vec<u8>,
    signed_at: DateTime<Utc>,
    verified_at: DateTime<Utc>,
}

impl VerifiedPayload {
    /// The raw body bytes, unchanged.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The timestamp carried in the signature header.
    pub fn signed_at(&self) -> DateTime<Utc> {
        self.signed_at
    }

    /// When verification succeeded.
    pub fn verified_at(&self) -> DateTime<Utc> {
        self.verified_at
    }
}

/// Parses a signature header into its timestamp and `v1` signatures.
///
/// Fails with [`VerifyError::PayloadMalformed`] when the timestamp is missing
/// or not an integer, or when there is no `v1` entry at all. Never panics.
///
/// # Examples
///
/// ```
/// use reader_webhook::webhooks::parse_signature_header;
///
/// let header = parse_signature_header("t=1700000000,v1=abcd,v0=ffff").unwrap();
/// assert_eq!(header.timestamp, 1700000000);
/// assert_eq!(header.signatures, vec![vec![0xab, 0xcd]]);
///
/// assert!(parse_signature_header("v1=abcd").is_err());
/// assert!(parse_signature_header("t=1700000000").is_err());
/// ```
pub fn parse_signature_header(header: &str) -> Result<SignatureHeader, VerifyError> {
    let mut timestamp = None;
    let mut saw_scheme = false;
    let mut signatures = Vec::new();

    for item in header.split(',') {
        let Some((key, value)) = item.trim().split_once('=') else {
            continue;
        };

        match key {
            "t" => {
                let parsed = value.parse::<i64>().map_err(|_| {
                    VerifyError::PayloadMalformed(format!("invalid timestamp in header: {value}"))
                })?;
                timestamp = Some(parsed);
            }
            SIGNATURE_SCHEME => {
                saw_scheme = true;
                if let Ok(sig) = hex::decode(value) {
                    signatures.push(sig);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        VerifyError::PayloadMalformed("signature header has no timestamp".to_string())
    })?;

    if !saw_scheme {
        return Err(VerifyError::PayloadMalformed(format!(
            "signature header has no {SIGNATURE_SCHEME} signature"
        )));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Computes the HMAC-SHA256 signature of `"<timestamp>.<payload>"`.
///
/// Used by tests and local tooling to produce deliveries that verify.
pub fn compute_signature(timestamp: i64, payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature header value: `t=<timestamp>,v1=<hex>,...`.
pub fn format_signature_header(timestamp: i64, signatures: &[Vec<u8>]) -> String {
    let mut header = format!("t={timestamp}");
    for sig in signatures {
        header.push_str(&format!(",{SIGNATURE_SCHEME}={}", hex::encode(sig)));
    }
    header
}

/// Verifies a delivery against the shared secret using the current time.
///
/// See [`verify_at`] for the checks performed.
pub fn verify(
    body: &[u8],
    signature_header: &str,
    secret: &[u8],
    tolerance: Duration,
) -> Result<VerifiedPayload, VerifyError> {
    verify_at(body, signature_header, secret, tolerance, Utc::now())
}

/// Verifies a delivery against the shared secret as of `now`.
///
/// Checks, in order:
/// 1. The header parses (else `PayloadMalformed`).
/// 2. `|now - t| <= tolerance` (else `Stale`, whatever the signatures say).
/// 3. Some `v1` signature matches (else `SignatureInvalid`). Comparison is
///    constant-time via the HMAC library.
/// 4. The body is well-formed JSON (else `PayloadMalformed`).
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use chrono::{TimeZone, Utc};
/// use reader_webhook::webhooks::{compute_signature, format_signature_header, verify_at};
///
/// let body = br#"{"id":"evt_1"}"#;
/// let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// let sig = compute_signature(1_700_000_000, body, b"whsec_test");
/// let header = format_signature_header(1_700_000_000, &[sig]);
///
/// let verified = verify_at(body, &header, b"whsec_test", Duration::from_secs(300), now).unwrap();
/// assert_eq!(verified.body(), body);
///
/// assert!(verify_at(body, &header, b"wrong", Duration::from_secs(300), now).is_err());
/// ```
pub fn verify_at(
    body: &[u8],
    signature_header: &str,
    secret: &[u8],
    tolerance: Duration,
    now: DateTime<Utc>,
) -> Result<VerifiedPayload, VerifyError> {
    let header = parse_signature_header(signature_header)?;

    let signed_at = DateTime::from_timestamp(header.timestamp, 0).ok_or_else(|| {
        VerifyError::PayloadMalformed(format!(
            "timestamp out of range: {}",
            header.timestamp
        ))
    })?;

    let age = (now - signed_at).num_seconds().unsigned_abs();
    if age > tolerance.as_secs() {
        return Err(VerifyError::Stale {
            timestamp: header.timestamp,
            tolerance_secs: tolerance.as_secs(),
        });
    }

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|_| VerifyError::SignatureInvalid)?;
    mac.update(header.timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);

    let matched = header
        .signatures
        .iter()
        .any(|sig| mac.clone().verify_slice(sig).is_ok());
    if !matched {
        return Err(VerifyError::SignatureInvalid);
    }

    serde_json::from_slice::<serde::de::IgnoredAny>(body)
        .map_err(|e| VerifyError::PayloadMalformed(format!("body is not valid JSON: {e}")))?;

    Ok(VerifiedPayload {
        body: body.to_vec(),
        signed_at,
        verified_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    const NOW: i64 = 1_700_000_000;
    const SECRET: &[u8] = b"whsec_test_secret";

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(NOW, 0).unwrap()
    }

    fn signed_header(timestamp: i64, body: &[u8], secret: &[u8]) -> String {
        let sig = compute_signature(timestamp, body, secret);
        format_signature_header(timestamp, &[sig])
    }

    // ========================================================================
    // Header parsing
    // ========================================================================

    #[test]
    fn parse_header_valid() {
        let header = parse_signature_header("t=12,v1=1234abcd").unwrap();
        assert_eq!(header.timestamp, 12);
        assert_eq!(header.signatures, vec![vec![0x12, 0x34, 0xab, 0xcd]]);
    }

    #[test]
    fn parse_header_multiple_signatures() {
        let header = parse_signature_header("t=12,v1=aa,v1=bb").unwrap();
        assert_eq!(header.signatures, vec![vec![0xaa], vec![0xbb]]);
    }

    #[test]
    fn parse_header_tolerates_whitespace_and_other_schemes() {
        let header = parse_signature_header("t=12, v0=ffff , v1=aa").unwrap();
        assert_eq!(header.signatures, vec![vec![0xaa]]);
    }

    #[test]
    fn parse_header_missing_timestamp() {
        assert!(matches!(
            parse_signature_header("v1=abcd"),
            Err(VerifyError::PayloadMalformed(_))
        ));
    }

    #[test]
    fn parse_header_non_numeric_timestamp() {
        assert!(matches!(
            parse_signature_header("t=soon,v1=abcd"),
            Err(VerifyError::PayloadMalformed(_))
        ));
    }

    #[test]
    fn parse_header_missing_v1() {
        assert!(matches!(
            parse_signature_header("t=12,v0=abcd"),
            Err(VerifyError::PayloadMalformed(_))
        ));
    }

    #[test]
    fn parse_header_empty() {
        assert!(matches!(
            parse_signature_header(""),
            Err(VerifyError::PayloadMalformed(_))
        ));
    }

    #[test]
    fn parse_header_drops_invalid_hex() {
        let header = parse_signature_header("t=12,v1=xyz").unwrap();
        assert!(header.signatures.is_empty());
    }

    #[test]
    fn format_header() {
        assert_eq!(
            format_signature_header(12, &[vec![0x12, 0x34], vec![0xab]]),
            "t=12,v1=1234,v1=ab"
        );
    }

    // ========================================================================
    // Verification
    // ========================================================================

    #[test]
    fn verify_valid_returns_same_body() {
        let body = br#"{"id":"evt_1"}"#;
        let header = signed_header(NOW, body, SECRET);

        let verified = verify_at(body, &header, SECRET, DEFAULT_TOLERANCE, now()).unwrap();
        assert_eq!(verified.body(), body);
        assert_eq!(verified.signed_at(), now());
        assert_eq!(verified.verified_at(), now());
    }

    #[test]
    fn verify_wrong_secret() {
        let body = br#"{"id":"evt_1"}"#;
        let header = signed_header(NOW, body, b"other-secret");

        assert_eq!(
            verify_at(body, &header, SECRET, DEFAULT_TOLERANCE, now()).unwrap_err(),
            VerifyError::SignatureInvalid
        );
    }

    #[test]
    fn verify_accepts_any_matching_signature() {
        let body = br#"{"id":"evt_1"}"#;
        let old = compute_signature(NOW, body, b"old-secret");
        let new = compute_signature(NOW, body, SECRET);
        let header = format_signature_header(NOW, &[old, new]);

        assert!(verify_at(body, &header, SECRET, DEFAULT_TOLERANCE, now()).is_ok());
    }

    #[test]
    fn verify_signature_over_timestamp() {
        // A signature for a different timestamp must not verify, even if the
        // header's timestamp is fresh.
        let body = br#"{"id":"evt_1"}"#;
        let sig = compute_signature(NOW - 1, body, SECRET);
        let header = format_signature_header(NOW, &[sig]);

        assert_eq!(
            verify_at(body, &header, SECRET, DEFAULT_TOLERANCE, now()).unwrap_err(),
            VerifyError::SignatureInvalid
        );
    }

    #[test]
    fn verify_stale_timestamp() {
        let body = br#"{"id":"evt_1"}"#;
        let header = signed_header(NOW - 600, body, SECRET);

        assert_eq!(
            verify_at(body, &header, SECRET, DEFAULT_TOLERANCE, now()).unwrap_err(),
            VerifyError::Stale {
                timestamp: NOW - 600,
                tolerance_secs: 300
            }
        );
    }

    #[test]
    fn verify_future_timestamp_outside_window_is_stale() {
        let body = br#"{"id":"evt_1"}"#;
        let header = signed_header(NOW + 301, body, SECRET);

        assert!(matches!(
            verify_at(body, &header, SECRET, DEFAULT_TOLERANCE, now()),
            Err(VerifyError::Stale { .. })
        ));
    }

    #[test]
    fn verify_timestamp_at_window_edge_is_accepted() {
        let body = br#"{"id":"evt_1"}"#;
        let header = signed_header(NOW - 300, body, SECRET);

        assert!(verify_at(body, &header, SECRET, DEFAULT_TOLERANCE, now()).is_ok());
    }

    #[test]
    fn verify_custom_tolerance() {
        let body = br#"{"id":"evt_1"}"#;
        let header = signed_header(NOW - 600, body, SECRET);

        assert!(verify_at(body, &header, SECRET, Duration::from_secs(900), now()).is_ok());
    }

    #[test]
    fn verify_non_json_body_is_malformed() {
        let body = b"not json";
        let header = signed_header(NOW, body, SECRET);

        assert!(matches!(
            verify_at(body, &header, SECRET, DEFAULT_TOLERANCE, now()),
            Err(VerifyError::PayloadMalformed(_))
        ));
    }

    #[test]
    fn verify_malformed_headers_never_panic() {
        let body = br#"{}"#;
        for header in ["", "t=", "v1=", "t=abc,v1=00", "garbage", ",,,", "t=1,v1=zz"] {
            assert!(verify_at(body, header, SECRET, DEFAULT_TOLERANCE, now()).is_err());
        }
    }

    #[test]
    fn verify_empty_secret() {
        let body = br#"{}"#;
        let header = signed_header(NOW, body, b"");

        assert!(verify_at(body, &header, b"", DEFAULT_TOLERANCE, now()).is_ok());
    }

    #[test]
    fn signature_is_32_bytes() {
        assert_eq!(compute_signature(NOW, b"any", b"secret").len(), 32);
    }

    // ========================================================================
    // Property-based tests
    // ========================================================================

    fn json_body() -> impl Strategy<Value = Vec<u8>> {
        "[a-zA-Z0-9 ]{0,64}"
            .prop_map(|s| serde_json::to_vec(&serde_json::json!({ "id": s })).unwrap())
    }

    proptest! {
        /// Signing then verifying within the window always succeeds and
        /// hands back the same bytes.
        #[test]
        fn prop_sign_verify_roundtrip(
            body in json_body(),
            secret: Vec<u8>,
            skew in -300i64..=300,
        ) {
            let header = signed_header(NOW + skew, &body, &secret);
            let verified = verify_at(&body, &header, &secret, DEFAULT_TOLERANCE, now());
            prop_assert!(verified.is_ok());
            let verified = verified.unwrap();
            prop_assert_eq!(verified.body(), &body[..]);
        }

        /// Flipping any single bit of the body invalidates the signature.
        #[test]
        fn prop_body_bit_flip_fails(
            body in json_body(),
            secret: Vec<u8>,
            index: prop::sample::Index,
            bit in 0u8..8,
        ) {
            let header = signed_header(NOW, &body, &secret);
            let mut tampered = body.clone();
            let i = index.index(tampered.len());
            tampered[i] ^= 1 << bit;

            prop_assert_eq!(
                verify_at(&tampered, &header, &secret, DEFAULT_TOLERANCE, now()).unwrap_err(),
                VerifyError::SignatureInvalid
            );
        }

        /// Flipping any single bit of the signature invalidates it.
        #[test]
        fn prop_signature_bit_flip_fails(
            body in json_body(),
            secret: Vec<u8>,
            index in 0usize..32,
            bit in 0u8..8,
        ) {
            let mut sig = compute_signature(NOW, &body, &secret);
            sig[index] ^= 1 << bit;
            let header = format_signature_header(NOW, &[sig]);

            prop_assert_eq!(
                verify_at(&body, &header, &secret, DEFAULT_TOLERANCE, now()).unwrap_err(),
                VerifyError::SignatureInvalid
            );
        }

        /// Anything older than the tolerance is stale, whether or not the
        /// signature is right.
        #[test]
        fn prop_old_timestamp_is_stale(
            body in json_body(),
            secret: Vec<u8>,
            age in 301i64..100_000,
            sign_correctly: bool,
        ) {
            let key: &[u8] = if sign_correctly { &secret } else { b"not-the-secret" };
            let header = signed_header(NOW - age, &body, key);

            let is_stale = matches!(
                verify_at(&body, &header, &secret, DEFAULT_TOLERANCE, now()),
                Err(VerifyError::Stale { .. })
            );
            prop_assert!(is_stale);
        }

        /// Arbitrary headers never cause a panic.
        #[test]
        fn prop_malformed_header_no_panic(header: String, body: Vec<u8>, secret: Vec<u8>) {
            let _ = parse_signature_header(&header);
            let _ = verify_at(&body, &header, &secret, DEFAULT_TOLERANCE, now());
        }
    }
}
