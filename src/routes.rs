use std::sync::Arc;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{Auth, TokenIssuer};
use crate::error::{ApiError, ApiErrorBody};
use crate::models::PublicAccount;
use crate::otp::OtpService;
use crate::rate_limit::RateLimiterFacade;
use crate::signup::SignupService;
use crate::validation::email_key;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .service(
            web::scope("/auth")
                .service(web::resource("/send-otp").route(web::post().to(send_otp)))
                .service(web::resource("/verify-otp").route(web::post().to(verify_otp)))
                .service(web::resource("/complete-signup").route(web::post().to(complete_signup)))
                .service(web::resource("/me").route(web::get().to(auth_me))),
        )
        .route("/health", web::get().to(health));
}

fn json_error(err: actix_web::error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!("rejected request body: {err}");
    ApiError::BadRequest("request body must be a JSON object".into()).into()
}

#[derive(Clone)]
pub struct AppState {
    pub otp: Arc<OtpService>,
    pub signup: Arc<SignupService>,
    pub tokens: Arc<TokenIssuer>,
    pub rate_limiter: Option<RateLimiterFacade>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    fn ok() -> Self { Self { success: true } }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendOtpRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub otp: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSignupRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SignupResponse {
    pub success: bool,
    pub user: PublicAccount,
    /// Bearer token for the new account.
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub success: bool,
    pub user: PublicAccount,
}

#[utoipa::path(
    post,
    path = "/auth/send-otp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Code issued and sent", body = SuccessResponse),
        (status = 400, description = "Missing or invalid email", body = ApiErrorBody),
        (status = 429, description = "Too many codes requested", body = ApiErrorBody),
        (status = 500, description = "Delivery or internal failure", body = ApiErrorBody)
    ),
    tag = "auth"
)]
pub async fn send_otp(data: web::Data<AppState>, payload: web::Json<SendOtpRequest>) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_send_otp(&email_key(&payload.email)) { return Err(ApiError::TooManyRequests); }
    }
    data.otp.issue(&payload.email).await?;
    Ok(HttpResponse::Ok().json(SuccessResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code accepted and consumed", body = SuccessResponse),
        (status = 400, description = "Invalid format, incorrect, or invalid/expired code", body = ApiErrorBody),
        (status = 429, description = "Too many attempts", body = ApiErrorBody),
        (status = 500, description = "Internal failure", body = ApiErrorBody)
    ),
    tag = "auth"
)]
pub async fn verify_otp(data: web::Data<AppState>, payload: web::Json<VerifyOtpRequest>) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_verify_otp(&email_key(&payload.email)) { return Err(ApiError::TooManyRequests); }
    }
    data.otp.verify(&payload.email, &payload.otp).await?;
    Ok(HttpResponse::Ok().json(SuccessResponse::ok()))
}

#[utoipa::path(
    post,
    path = "/auth/complete-signup",
    request_body = CompleteSignupRequest,
    responses(
        (status = 200, description = "Account created", body = SignupResponse),
        (status = 400, description = "Missing fields, invalid email, or weak password", body = ApiErrorBody),
        (status = 409, description = "Email already registered", body = ApiErrorBody),
        (status = 500, description = "Internal failure", body = ApiErrorBody)
    ),
    tag = "auth"
)]
pub async fn complete_signup(data: web::Data<AppState>, payload: web::Json<CompleteSignupRequest>) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let outcome = data.signup.create_account(&req.email, &req.full_name, &req.password).await?;
    Ok(HttpResponse::Ok().json(SignupResponse { success: true, user: outcome.user, token: outcome.token }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Account behind the bearer token", body = MeResponse),
        (status = 401, description = "Missing or invalid token", body = ApiErrorBody),
        (status = 404, description = "Account no longer exists", body = ApiErrorBody)
    ),
    tag = "auth"
)]
pub async fn auth_me(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let user = data.signup.account(auth.account_id()?).await?;
    Ok(HttpResponse::Ok().json(MeResponse { success: true, user }))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
