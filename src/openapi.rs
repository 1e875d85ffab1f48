use crate::error::ApiErrorBody;
use crate::models::PublicAccount;
use crate::routes::{
    CompleteSignupRequest, MeResponse, SendOtpRequest, SignupResponse, SuccessResponse, VerifyOtpRequest,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::send_otp,
        crate::routes::verify_otp,
        crate::routes::complete_signup,
        crate::routes::auth_me,
    ),
    components(schemas(
        SendOtpRequest, VerifyOtpRequest, CompleteSignupRequest,
        SuccessResponse, SignupResponse, MeResponse, PublicAccount, ApiErrorBody
    )),
    tags(
        (name = "auth", description = "Email one-time codes and account signup"),
    )
)]
pub struct ApiDoc;
