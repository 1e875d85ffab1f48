//! Outbound delivery of one-time codes.

use async_trait::async_trait;
use chrono::Duration;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, instrument};

use crate::config::SmtpConfig;

#[derive(thiserror::Error, Debug)]
pub enum DeliveryError {
    #[error("invalid address: {0}")] Address(String),
    #[error("message build failed: {0}")] Message(String),
    #[error("transport failed: {0}")] Transport(String),
}

#[async_trait]
pub trait CodeSender: Send + Sync {
    /// Deliver `code` to `recipient`. Called once per issued code; not retried.
    async fn send_code(&self, recipient: &str, code: &str, ttl: Duration) -> Result<(), DeliveryError>;
}

/// Development sender: writes the code to the log instead of delivering it.
#[derive(Debug, Clone, Default)]
pub struct ConsoleSender;

#[async_trait]
impl CodeSender for ConsoleSender {
    async fn send_code(&self, recipient: &str, code: &str, ttl: Duration) -> Result<(), DeliveryError> {
        info!(recipient, code, ttl_secs = ttl.num_seconds(), "verification code (console delivery)");
        Ok(())
    }
}

pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    product_name: String,
}

impl SmtpSender {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, DeliveryError> {
        let from = cfg.from.parse::<Mailbox>().map_err(|e| DeliveryError::Address(e.to_string()))?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        Ok(Self { transport: builder.build(), from, product_name: cfg.product_name.clone() })
    }

    fn body(&self, code: &str, ttl: Duration) -> String {
        format!(
            "Your {} verification code is: {code}\n\nIt expires in {} minutes. If you did not request it, ignore this email.",
            self.product_name,
            ttl.num_minutes().max(1)
        )
    }
}

#[async_trait]
impl CodeSender for SmtpSender {
    #[instrument(skip(self, code, ttl))]
    async fn send_code(&self, recipient: &str, code: &str, ttl: Duration) -> Result<(), DeliveryError> {
        let to = recipient.parse::<Mailbox>().map_err(|e| DeliveryError::Address(e.to_string()))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(format!("Your {} verification code", self.product_name))
            .header(ContentType::TEXT_PLAIN)
            .body(self.body(code, ttl))
            .map_err(|e| DeliveryError::Message(e.to_string()))?;
        self.transport.send(email).await.map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(())
    }
}
