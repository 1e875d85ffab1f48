use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use utoipa::ToSchema;

use crate::otp::OtpError;
use crate::repo::RepoError;
use crate::signup::SignupError;

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiErrorBody {
    pub success: bool,
    pub error: String,
}

/// Client-facing errors. Messages are fixed strings or validation text;
/// internal detail is logged where the error is converted, never returned.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] BadRequest(String),
    #[error("authorization required")] Unauthorized,
    #[error("not found")] NotFound,
    #[error("{0}")] Conflict(String),
    #[error("too many requests, try again later")] TooManyRequests,
    #[error("failed to deliver code")] DeliveryFailed,
    #[error("internal error")] Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Conflict => ApiError::Conflict("conflict".into()),
            RepoError::Internal(detail) => {
                log::error!("repository error: {detail}");
                ApiError::Internal
            }
        }
    }
}

impl From<OtpError> for ApiError {
    fn from(e: OtpError) -> Self {
        match e {
            OtpError::InvalidIdentity(v) | OtpError::InvalidFormat(v) => ApiError::BadRequest(v.to_string()),
            // absent and expired are deliberately indistinguishable
            OtpError::NotFound => ApiError::BadRequest("invalid or expired code".into()),
            OtpError::Mismatch => ApiError::BadRequest("incorrect code".into()),
            OtpError::Delivery(err) => {
                log::error!("otp delivery error: {err}");
                ApiError::DeliveryFailed
            }
            OtpError::Store(err) => err.into(),
        }
    }
}

impl From<SignupError> for ApiError {
    fn from(e: SignupError) -> Self {
        match e {
            SignupError::MissingField(_) | SignupError::WeakPassword => ApiError::BadRequest(e.to_string()),
            SignupError::InvalidEmail(v) => ApiError::BadRequest(v.to_string()),
            SignupError::DuplicateEmail => ApiError::Conflict("an account with this email already exists".into()),
            SignupError::NotFound => ApiError::NotFound,
            SignupError::Repo(err) => err.into(),
            other => {
                log::error!("signup error: {other}");
                ApiError::Internal
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::DeliveryFailed | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiErrorBody { success: false, error: self.to_string() })
    }
}
