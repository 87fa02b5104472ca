// Stripe webhook signature verification
// Header format: t=<unix seconds>,v1=<hex hmac>[,v1=<hex hmac>...]
// Signed payload: "<t>.<raw body>" under HMAC-SHA256 with the endpoint secret

use ring::hmac;
use subtle::ConstantTimeEq;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SignatureError {
    #[error("Signature header missing")]
    MissingHeader,

    #[error("Signature header malformed")]
    MalformedHeader,

    #[error("Signature header has no timestamp")]
    MissingTimestamp,

    #[error("Signature header has no v1 signatures")]
    NoSignatures,

    #[error("Timestamp {timestamp} outside tolerance of {tolerance_secs}s")]
    TimestampOutsideTolerance { timestamp: i64, tolerance_secs: u64 },

    #[error("No signature matched the payload")]
    Mismatch,
}

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: u64,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    /// Verify against the current clock
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<(), SignatureError> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        payload: &[u8],
        header: Option<&str>,
        now: i64,
    ) -> Result<(), SignatureError> {
        let header = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(SignatureError::MissingHeader)?;

        let mut timestamp: Option<i64> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or(SignatureError::MalformedHeader)?;
            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| SignatureError::MalformedHeader)?)
                },
                "v1" => signatures.push(value),
                // v0 and future schemes are ignored
                _ => {},
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
        if signatures.is_empty() {
            return Err(SignatureError::NoSignatures);
        }

        let expected = compute_signature(&self.secret, timestamp, payload);
        let matched = signatures
            .iter()
            .any(|candidate| bool::from(expected.as_bytes().ct_eq(candidate.as_bytes())));
        if !matched {
            return Err(SignatureError::Mismatch);
        }

        // Checked after the MAC so stale-but-authentic deliveries are distinguishable in logs
        if self.tolerance_secs > 0 && (now - timestamp).unsigned_abs() > self.tolerance_secs {
            return Err(SignatureError::TimestampOutsideTolerance {
                timestamp,
                tolerance_secs: self.tolerance_secs,
            });
        }

        Ok(())
    }

    /// Build a header value for the given payload; used by tests and local tooling
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> String {
        format!(
            "t={},v1={}",
            timestamp,
            compute_signature(&self.secret, timestamp, payload)
        )
    }
}

/// Lowercase hex HMAC-SHA256 of "<timestamp>.<payload>"
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let mut ctx = hmac::Context::with_key(&key);
    ctx.update(timestamp.to_string().as_bytes());
    ctx.update(b".");
    ctx.update(payload);
    let tag = ctx.sign();

    tag.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
}
