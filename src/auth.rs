use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::error::ApiError;
use crate::models::Id;
use crate::routes::AppState;

/// Minimum accepted HS256 secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // account id
    pub email: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    #[error("secret must be at least {} bytes", MIN_SECRET_LEN)] WeakSecret,
    #[error("jwt: {0}")] Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Issues and validates HS256 identity tokens bound to an account id.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        })
    }

    pub fn issue(&self, account_id: Id, email: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: account_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + self.ttl).timestamp() as usize,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Ok(decode::<Claims>(token, &self.decoding, &validation)?.claims)
    }
}

/// Extractor yielding validated `Claims` from a bearer token.
pub struct Auth(pub Claims);

impl Auth {
    pub fn account_id(&self) -> Result<Id, ApiError> {
        self.0.sub.parse().map_err(|_| ApiError::Unauthorized)
    }
}

impl FromRequest for Auth {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            log::error!("Auth extractor used without AppState");
            return ready(Err(ApiError::Internal.into()));
        };
        let Ok(bearer) = BearerAuth::from_request(req, pl).into_inner() else {
            return ready(Err(ApiError::Unauthorized.into()));
        };
        match state.tokens.validate(bearer.token()) {
            Ok(claims) => ready(Ok(Auth(claims))),
            Err(_) => ready(Err(ApiError::Unauthorized.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-must-be-32-bytes-long!!";

    #[test]
    fn roundtrip_binds_account() {
        let issuer = TokenIssuer::new(SECRET, Duration::hours(1)).unwrap();
        let id = uuid::Uuid::new_v4();
        let claims = issuer.validate(&issuer.issue(id, "a@x.com").unwrap()).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.email, "a@x.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn short_secret_rejected() {
        assert!(matches!(TokenIssuer::new(b"short", Duration::hours(1)), Err(TokenError::WeakSecret)));
    }

    #[test]
    fn expired_token_rejected() {
        let issuer = TokenIssuer::new(SECRET, Duration::seconds(-10)).unwrap();
        let token = issuer.issue(uuid::Uuid::new_v4(), "a@x.com").unwrap();
        assert!(issuer.validate(&token).is_err());
    }

    #[test]
    fn other_secret_rejected() {
        let a = TokenIssuer::new(SECRET, Duration::hours(1)).unwrap();
        let b = TokenIssuer::new(b"another-secret-that-is-32-bytes-long", Duration::hours(1)).unwrap();
        let token = a.issue(uuid::Uuid::new_v4(), "a@x.com").unwrap();
        assert!(b.validate(&token).is_err());
    }
}
