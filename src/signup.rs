use std::sync::Arc;

use actix_web::web;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::{TokenError, TokenIssuer};
use crate::models::{Id, NewAccount, PublicAccount};
use crate::password::{HashError, PasswordHasher};
use crate::repo::{AccountRepo, RepoError};
use crate::validation::{normalize_email, ValidationError, MIN_PASSWORD_LEN};

#[derive(thiserror::Error, Debug)]
pub enum SignupError {
    #[error("{0} is required")] MissingField(&'static str),
    #[error("{0}")] InvalidEmail(ValidationError),
    #[error("password must be at least {} characters", MIN_PASSWORD_LEN)] WeakPassword,
    #[error("email already registered")] DuplicateEmail,
    #[error("account not found")] NotFound,
    #[error("password hashing: {0}")] Hash(#[from] HashError),
    #[error("token: {0}")] Token(#[from] TokenError),
    #[error("repository: {0}")] Repo(RepoError),
    #[error("internal: {0}")] Internal(String),
}

impl From<RepoError> for SignupError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict => SignupError::DuplicateEmail,
            RepoError::NotFound => SignupError::NotFound,
            other => SignupError::Repo(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignupOutcome {
    pub token: String,
    pub user: PublicAccount,
}

pub struct SignupService {
    accounts: Arc<dyn AccountRepo>,
    hasher: Arc<PasswordHasher>,
    tokens: Arc<TokenIssuer>,
}

impl SignupService {
    pub fn new(accounts: Arc<dyn AccountRepo>, hasher: Arc<PasswordHasher>, tokens: Arc<TokenIssuer>) -> Self {
        Self { accounts, hasher, tokens }
    }

    #[instrument(skip(self, password))]
    pub async fn create_account(&self, email: &str, full_name: &str, password: &str) -> Result<SignupOutcome, SignupError> {
        let full_name = full_name.trim();
        if email.trim().is_empty() { return Err(SignupError::MissingField("email")); }
        if full_name.is_empty() { return Err(SignupError::MissingField("fullName")); }
        if password.is_empty() { return Err(SignupError::MissingField("password")); }
        let email = normalize_email(email).map_err(SignupError::InvalidEmail)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(SignupError::WeakPassword);
        }
        // fail fast before paying for a hash; the insert below re-checks atomically
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(SignupError::DuplicateEmail);
        }

        // mint the token first so nothing is stored when issuance fails
        let id = Uuid::new_v4();
        let token = self.tokens.issue(id, &email)?;

        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let password_hash = web::block(move || hasher.hash(&password))
            .await
            .map_err(|e| SignupError::Internal(format!("hash task: {e}")))??;

        let account = self
            .accounts
            .insert_account(NewAccount { id, email, full_name: full_name.to_string(), password_hash })
            .await?;
        info!(account_id = %account.id, "account created");
        Ok(SignupOutcome { token, user: PublicAccount::from(&account) })
    }

    pub async fn account(&self, id: Id) -> Result<PublicAccount, SignupError> {
        let account = self.accounts.get_account(id).await?;
        Ok(PublicAccount::from(&account))
    }
}
