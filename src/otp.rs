use std::sync::Arc;

use chrono::Duration;
use rand::{rngs::OsRng, Rng};
use tracing::{info, instrument, warn};

use crate::delivery::{CodeSender, DeliveryError};
use crate::otp_store::OtpStore;
use crate::repo::RepoError;
use crate::validation::{normalize_email, validate_otp, ValidationError, OTP_LEN};

#[derive(thiserror::Error, Debug)]
pub enum OtpError {
    #[error("{0}")] InvalidIdentity(ValidationError),
    #[error("{0}")] InvalidFormat(ValidationError),
    #[error("no active code")] NotFound,
    #[error("code mismatch")] Mismatch,
    /// The code was stored and remains valid; only delivery failed.
    #[error("delivery failed: {0}")] Delivery(#[from] DeliveryError),
    #[error("store: {0}")] Store(#[from] RepoError),
}

/// Uniformly random fixed-width numeric code from the OS CSPRNG.
pub fn generate_code() -> String {
    let n: u32 = OsRng.gen_range(0..10u32.pow(OTP_LEN as u32));
    format!("{n:0width$}", width = OTP_LEN)
}

pub struct OtpService {
    store: Arc<dyn OtpStore>,
    sender: Arc<dyn CodeSender>,
    ttl: Duration,
}

impl OtpService {
    pub fn new(store: Arc<dyn OtpStore>, sender: Arc<dyn CodeSender>, ttl: Duration) -> Self {
        Self { store, sender, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generate, store and deliver a fresh code, replacing any outstanding one.
    #[instrument(skip(self))]
    pub async fn issue(&self, identity: &str) -> Result<(), OtpError> {
        let identity = normalize_email(identity).map_err(OtpError::InvalidIdentity)?;
        let code = generate_code();
        let record = self.store.put(&identity, &code, self.ttl).await?;
        if let Err(e) = self.sender.send_code(&identity, &code, self.ttl).await {
            warn!(identity = %identity, expires_at = %record.expires_at, "code stored but delivery failed: {e}");
            return Err(e.into());
        }
        info!(identity = %identity, expires_at = %record.expires_at, "otp issued");
        Ok(())
    }

    /// Check `code` against the active record for `identity`; consumes it on success.
    #[instrument(skip(self, code))]
    pub async fn verify(&self, identity: &str, code: &str) -> Result<(), OtpError> {
        let identity = normalize_email(identity).map_err(OtpError::InvalidIdentity)?;
        validate_otp(code).map_err(OtpError::InvalidFormat)?;
        let record = self.store.get(&identity).await?.ok_or(OtpError::NotFound)?;
        if !record.matches(code) {
            return Err(OtpError::Mismatch);
        }
        // lost a race with another verify, a re-issue, or expiry
        if !self.store.consume(&identity, &record).await? {
            return Err(OtpError::NotFound);
        }
        info!(identity = %identity, "otp verified");
        Ok(())
    }
}
