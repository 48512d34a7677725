use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use crates::{
    domain::repositories::{
        payments::PaymentRepository, saved_cards::SavedCardRepository,
        successful_operations::SuccessfulOperationRepository,
    },
    notifications::Mailer,
    webhooks::queue::WebhookDispatch,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    axum_http::routers::{csrf_cookie, outcome_response, trusted_email},
    usecases::payments::{PaymentError, PaymentUseCase, parse_payment_id},
};

#[derive(Debug, Deserialize)]
pub struct OtpForm {
    pub otp_code: String,
}

/// Payer-facing pages: checkout, OTP challenge and the confirmation page.
pub fn routes<P, C, O, M, W>(usecase: Arc<PaymentUseCase<P, C, O, M, W>>) -> Router
where
    P: PaymentRepository + Send + Sync + 'static,
    C: SavedCardRepository + Send + Sync + 'static,
    O: SuccessfulOperationRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
    W: WebhookDispatch + Send + Sync + 'static,
{
    Router::new()
        .route("/checkout/:payment_id", get(checkout_page::<P, C, O, M, W>))
        .route("/otp/:payment_id", get(otp_page::<P, C, O, M, W>))
        .route("/otp/verify/:payment_id", post(verify_otp::<P, C, O, M, W>))
        .route("/success/:payment_id", get(success_page::<P, C, O, M, W>))
        .with_state(usecase)
}

pub async fn checkout_page<P, C, O, M, W>(
    State(usecase): State<Arc<PaymentUseCase<P, C, O, M, W>>>,
    Path(raw_payment_id): Path<String>,
    jar: CookieJar,
) -> Result<Response, PaymentError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: SavedCardRepository + Send + Sync + 'static,
    O: SuccessfulOperationRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
    W: WebhookDispatch + Send + Sync + 'static,
{
    let payment_id = parse_payment_id(&raw_payment_id)?;
    let view = usecase
        .checkout_view(payment_id, trusted_email(&jar))
        .await?;

    let jar = jar.add(csrf_cookie(view.csrf_token.clone()));
    Ok((jar, Json(view)).into_response())
}

pub async fn otp_page<P, C, O, M, W>(
    State(usecase): State<Arc<PaymentUseCase<P, C, O, M, W>>>,
    Path(raw_payment_id): Path<String>,
) -> Result<impl IntoResponse, PaymentError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: SavedCardRepository + Send + Sync + 'static,
    O: SuccessfulOperationRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
    W: WebhookDispatch + Send + Sync + 'static,
{
    let payment_id = parse_payment_id(&raw_payment_id)?;
    Ok(Json(usecase.otp_page(payment_id).await?))
}

pub async fn verify_otp<P, C, O, M, W>(
    State(usecase): State<Arc<PaymentUseCase<P, C, O, M, W>>>,
    Path(raw_payment_id): Path<String>,
    jar: CookieJar,
    Form(form): Form<OtpForm>,
) -> Result<Response, PaymentError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: SavedCardRepository + Send + Sync + 'static,
    O: SuccessfulOperationRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
    W: WebhookDispatch + Send + Sync + 'static,
{
    let payment_id = parse_payment_id(&raw_payment_id)?;
    info!(%payment_id, "checkout: otp verification request received");

    let outcome = usecase.verify_otp(payment_id, form.otp_code.trim()).await?;
    Ok(outcome_response(jar, outcome))
}

pub async fn success_page<P, C, O, M, W>(
    State(usecase): State<Arc<PaymentUseCase<P, C, O, M, W>>>,
    Path(raw_payment_id): Path<String>,
) -> Result<impl IntoResponse, PaymentError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: SavedCardRepository + Send + Sync + 'static,
    O: SuccessfulOperationRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
    W: WebhookDispatch + Send + Sync + 'static,
{
    let payment_id = parse_payment_id(&raw_payment_id)?;
    Ok(Json(usecase.success_view(payment_id).await?))
}
