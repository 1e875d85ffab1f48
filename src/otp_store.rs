//! Storage for outstanding one-time codes.
//!
//! One record per identity. Codes are kept as SHA-256 digests; expiry is
//! checked lazily on read, with [`sweep_expired`] available to reclaim
//! records nobody ever reads again.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::repo::RepoResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    pub identity: String,
    pub code_digest: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn new(identity: &str, code: &str, ttl: Duration) -> Self {
        let issued_at = Utc::now();
        Self {
            identity: identity.to_string(),
            code_digest: digest_code(code),
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn matches(&self, code: &str) -> bool {
        self.code_digest == digest_code(code)
    }
}

/// SHA-256 hex digest of a code.
pub fn digest_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Store `code` for `identity`, replacing any existing record.
    async fn put(&self, identity: &str, code: &str, ttl: Duration) -> RepoResult<OtpRecord>;
    /// Current unexpired record. An expired record is removed and reported as absent.
    async fn get(&self, identity: &str) -> RepoResult<Option<OtpRecord>>;
    /// Delete the record for `identity`; returns whether one existed.
    async fn remove(&self, identity: &str) -> RepoResult<bool>;
    /// Remove the record only if it is still exactly `expected` and unexpired.
    async fn consume(&self, identity: &str, expected: &OtpRecord) -> RepoResult<bool>;
    /// Drop every expired record; returns how many were removed.
    async fn purge_expired(&self) -> RepoResult<usize>;
}

#[derive(Clone, Default)]
pub struct InMemOtpStore {
    records: Arc<DashMap<String, OtpRecord>>,
}

impl InMemOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl OtpStore for InMemOtpStore {
    async fn put(&self, identity: &str, code: &str, ttl: Duration) -> RepoResult<OtpRecord> {
        let record = OtpRecord::new(identity, code, ttl);
        self.records.insert(identity.to_string(), record.clone());
        Ok(record)
    }

    async fn get(&self, identity: &str) -> RepoResult<Option<OtpRecord>> {
        let now = Utc::now();
        match self.records.get(identity) {
            None => return Ok(None),
            Some(rec) if !rec.is_expired_at(now) => return Ok(Some(rec.clone())),
            Some(_) => {}
        }
        // re-check under the write lock: a fresh code may have replaced the stale one
        if self.records.remove_if(identity, |_, r| r.is_expired_at(now)).is_some() {
            debug!(identity, "dropped expired otp");
        }
        Ok(None)
    }

    async fn remove(&self, identity: &str) -> RepoResult<bool> {
        Ok(self.records.remove(identity).is_some())
    }

    async fn consume(&self, identity: &str, expected: &OtpRecord) -> RepoResult<bool> {
        let now = Utc::now();
        Ok(self
            .records
            .remove_if(identity, |_, r| r == expected && !r.is_expired_at(now))
            .is_some())
    }

    async fn purge_expired(&self) -> RepoResult<usize> {
        let now = Utc::now();
        let mut purged = 0;
        self.records.retain(|_, r| {
            let keep = !r.is_expired_at(now);
            if !keep {
                purged += 1;
            }
            keep
        });
        Ok(purged)
    }
}

/// Periodically purge expired codes. Runs until the task is dropped.
pub async fn sweep_expired(store: Arc<dyn OtpStore>, every: StdDuration) {
    let mut tick = tokio::time::interval(every);
    loop {
        tick.tick().await;
        match store.purge_expired().await {
            Ok(0) => {}
            Ok(n) => debug!(purged = n, "expired otp sweep"),
            Err(e) => warn!("otp sweep failed: {e}"),
        }
    }
}
