use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::post,
};
use crates::{domain::repositories::login_codes::LoginCodeRepository, notifications::Mailer};
use serde::{Deserialize, Serialize};

use crate::{axum_http::error_responses::AppError, usecases::login_codes::LoginCodeUseCase};

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub message: &'static str,
}

pub fn routes<R, M>(usecase: Arc<LoginCodeUseCase<R, M>>) -> Router
where
    R: LoginCodeRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    Router::new()
        .route("/send-code", post(send_code::<R, M>))
        .route("/verify-code", post(verify_code::<R, M>))
        .with_state(usecase)
}

pub async fn send_code<R, M>(
    State(usecase): State<Arc<LoginCodeUseCase<R, M>>>,
    Json(request): Json<SendCodeRequest>,
) -> Result<impl IntoResponse, AppError>
where
    R: LoginCodeRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    usecase.send_code(&request.email).await?;
    Ok(Json(StatusResponse {
        status: "sent",
        message: "Code sent",
    }))
}

pub async fn verify_code<R, M>(
    State(usecase): State<Arc<LoginCodeUseCase<R, M>>>,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<impl IntoResponse, AppError>
where
    R: LoginCodeRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
{
    usecase.verify_code(&request.email, &request.code).await?;
    Ok(Json(StatusResponse {
        status: "ok",
        message: "Verified",
    }))
}
