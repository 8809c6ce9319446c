//! Shared-secret verification for the cron drain entry.

use sha2::{Digest, Sha256};
use tracing::warn;

use charisma_core::error::AppError;

/// Checks the bearer token presented by the cron caller.
///
/// Both sides are hashed before comparison so the comparison time does
/// not depend on where the first differing byte is. An empty configured
/// secret rejects every caller.
#[derive(Clone)]
pub struct CronSecretVerifier {
    expected: Option<[u8; 32]>,
}

impl std::fmt::Debug for CronSecretVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronSecretVerifier")
            .field("configured", &self.expected.is_some())
            .finish()
    }
}

impl CronSecretVerifier {
    /// Create a verifier for `secret`.
    pub fn new(secret: &str) -> Self {
        if secret.is_empty() {
            warn!("cron.secret is empty; the cron endpoint will reject every request");
        }
        Self {
            expected: (!secret.is_empty()).then(|| digest(secret)),
        }
    }

    /// Verify an `Authorization` header value of the form `Bearer <secret>`.
    pub fn verify_header(&self, header: Option<&str>) -> Result<(), AppError> {
        let presented = header
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or_else(|| AppError::authentication("Missing cron bearer token"))?;
        self.verify(presented)
    }

    /// Verify a raw secret.
    pub fn verify(&self, presented: &str) -> Result<(), AppError> {
        let Some(expected) = self.expected else {
            return Err(AppError::authentication("Cron endpoint is not configured"));
        };
        let actual = digest(presented);
        let diff = expected
            .iter()
            .zip(actual.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        if diff == 0 {
            Ok(())
        } else {
            Err(AppError::authentication("Invalid cron secret"))
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}
