#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use defi_auth::auth::TokenIssuer;
use defi_auth::config::Argon2Config;
use defi_auth::delivery::{CodeSender, DeliveryError};
use defi_auth::otp::OtpService;
use defi_auth::otp_store::{InMemOtpStore, OtpStore};
use defi_auth::password::PasswordHasher;
use defi_auth::rate_limit::RateLimiterFacade;
use defi_auth::repo::inmem::InMemAccountRepo;
use defi_auth::signup::SignupService;
use defi_auth::AppState;

pub const SECRET: &[u8] = b"test-secret-must-be-32-bytes-long!!";

/// Captures every delivered code instead of sending it.
#[derive(Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last_code_for(&self, recipient: &str) -> Option<String> {
        self.sent.lock().unwrap().iter().rev().find(|(to, _)| to == recipient).map(|(_, c)| c.clone())
    }
}

#[async_trait]
impl CodeSender for RecordingSender {
    async fn send_code(&self, recipient: &str, code: &str, _ttl: Duration) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push((recipient.to_string(), code.to_string()));
        Ok(())
    }
}

/// Records the code, then reports a transport failure.
#[derive(Default)]
pub struct FailingSender {
    pub inner: RecordingSender,
}

#[async_trait]
impl CodeSender for FailingSender {
    async fn send_code(&self, recipient: &str, code: &str, ttl: Duration) -> Result<(), DeliveryError> {
        self.inner.send_code(recipient, code, ttl).await?;
        Err(DeliveryError::Transport("connection refused".into()))
    }
}

pub fn fast_hasher() -> Arc<PasswordHasher> {
    Arc::new(PasswordHasher::new(&Argon2Config { memory_kib: 1024, iterations: 1, parallelism: 1 }).unwrap())
}

pub fn tokens() -> Arc<TokenIssuer> {
    Arc::new(TokenIssuer::new(SECRET, Duration::hours(1)).unwrap())
}

pub struct Harness {
    pub state: AppState,
    pub sender: Arc<RecordingSender>,
    pub otp_store: Arc<InMemOtpStore>,
    pub accounts: Arc<InMemAccountRepo>,
}

pub fn harness(ttl: Duration, rate_limiter: Option<RateLimiterFacade>) -> Harness {
    let sender = Arc::new(RecordingSender::default());
    let otp_store = Arc::new(InMemOtpStore::new());
    let accounts = Arc::new(InMemAccountRepo::new());
    let tokens = tokens();
    let store: Arc<dyn OtpStore> = otp_store.clone();
    let state = AppState {
        otp: Arc::new(OtpService::new(store, sender.clone(), ttl)),
        signup: Arc::new(SignupService::new(accounts.clone(), fast_hasher(), tokens.clone())),
        tokens,
        rate_limiter,
    };
    Harness { state, sender, otp_store, accounts }
}
