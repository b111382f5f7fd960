//! Webhook authentication.
//!
//! Signatures are `sha256=<hex HMAC-SHA256(secret, raw body)>`, carried in
//! the `x-hub-signature-256` header. The body must be verified exactly as
//! received, before any parsing.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;

use crate::error::{SyncError, SyncResult};

/// Header carrying the signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

type HmacSha256 = Hmac<Sha256>;

/// Outcome of a signature check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    /// No signature header was sent.
    Missing,
    /// Rejected on length alone; no byte comparison was performed.
    LengthMismatch,
    /// Same length, different bytes.
    Mismatch,
}

impl fmt::Display for SignatureCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SignatureCheck::Valid => "valid",
            SignatureCheck::Missing => "missing signature",
            SignatureCheck::LengthMismatch => "signature length mismatch",
            SignatureCheck::Mismatch => "signature mismatch",
        })
    }
}

/// Verifies webhook signatures against a shared secret.
#[derive(Clone)]
pub struct WebhookAuthenticator {
    secret: Vec<u8>,
}

impl fmt::Debug for WebhookAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookAuthenticator").finish_non_exhaustive()
    }
}

impl WebhookAuthenticator {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Computes the signature header value for `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        // HMAC accepts keys of any length.
        let mut mac = match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(body);
        format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Checks `provided` against the signature of `body`.
    pub fn check(&self, body: &[u8], provided: Option<&str>) -> SignatureCheck {
        let Some(provided) = provided else {
            return SignatureCheck::Missing;
        };
        let expected = self.sign(body);
        if expected.len() != provided.len() {
            return SignatureCheck::LengthMismatch;
        }
        if constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
            SignatureCheck::Valid
        } else {
            SignatureCheck::Mismatch
        }
    }

    pub fn verify(&self, body: &[u8], provided: Option<&str>) -> bool {
        self.check(body, provided) == SignatureCheck::Valid
    }
}

/// Compares two byte strings without data-dependent early exit.
///
/// Slices of different length compare unequal immediately; callers check
/// lengths first.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a
        .iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    std::hint::black_box(diff) == 0
}

#[derive(Debug, Deserialize)]
struct Payload {
    repository: RepositoryRef,
    #[serde(default)]
    deployment: Option<DeploymentRef>,
}

#[derive(Debug, Deserialize)]
struct RepositoryRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DeploymentRef {
    statuses_url: String,
}

/// A parsed webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    /// Repository name as sent by the upstream host.
    pub repository: String,
    /// Deployment status callback, present on deployment events.
    pub statuses_url: Option<String>,
}

impl WebhookEvent {
    /// Parses the raw body. Call only after the signature has been checked.
    pub fn parse(raw: &[u8]) -> SyncResult<Self> {
        let payload: Payload =
            serde_json::from_slice(raw).map_err(|e| SyncError::InvalidEvent(e.to_string()))?;
        Ok(Self {
            repository: payload.repository.name,
            statuses_url: payload.deployment.map(|d| d.statuses_url),
        })
    }
}
