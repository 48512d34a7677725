use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use crates::{
    domain::{
        repositories::{
            payments::PaymentRepository, saved_cards::SavedCardRepository,
            successful_operations::SuccessfulOperationRepository,
        },
        value_objects::{
            invoices::CreateInvoiceModel,
            payments::{CardInput, SubmitPaymentModel},
        },
    },
    notifications::Mailer,
    security::sanitizer::clean_input,
    webhooks::queue::WebhookDispatch,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    axum_http::routers::{CSRF_COOKIE, outcome_response, trusted_email},
    usecases::payments::{
        PaymentError, PaymentUseCase, UseCaseResult, parse_payment_id, verify_csrf,
    },
};

pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

#[derive(Debug, Deserialize)]
pub struct PayForm {
    pub email: String,
    pub csrf_token: Option<String>,
    pub card_number: Option<String>,
    pub expiry: Option<String>,
    pub cvv: Option<String>,
    pub saved_card_id: Option<String>,
    pub save_card: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserInfoQuery {
    pub email: String,
}

pub fn routes<P, C, O, M, W>(usecase: Arc<PaymentUseCase<P, C, O, M, W>>) -> Router
where
    P: PaymentRepository + Send + Sync + 'static,
    C: SavedCardRepository + Send + Sync + 'static,
    O: SuccessfulOperationRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
    W: WebhookDispatch + Send + Sync + 'static,
{
    Router::new()
        .route("/create-invoice", post(create_invoice::<P, C, O, M, W>))
        .route("/pay/:payment_id", post(submit_payment::<P, C, O, M, W>))
        .route("/user-info", get(user_info::<P, C, O, M, W>))
        .with_state(usecase)
}

pub async fn create_invoice<P, C, O, M, W>(
    State(usecase): State<Arc<PaymentUseCase<P, C, O, M, W>>>,
    Json(invoice): Json<CreateInvoiceModel>,
) -> Result<impl IntoResponse, PaymentError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: SavedCardRepository + Send + Sync + 'static,
    O: SuccessfulOperationRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
    W: WebhookDispatch + Send + Sync + 'static,
{
    info!(amount = invoice.amount, "payments: create invoice request received");
    let response = usecase.create_invoice(invoice).await?;
    Ok(Json(response))
}

pub async fn submit_payment<P, C, O, M, W>(
    State(usecase): State<Arc<PaymentUseCase<P, C, O, M, W>>>,
    Path(raw_payment_id): Path<String>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(form): Form<PayForm>,
) -> Result<Response, PaymentError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: SavedCardRepository + Send + Sync + 'static,
    O: SuccessfulOperationRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
    W: WebhookDispatch + Send + Sync + 'static,
{
    let payment_id = parse_payment_id(&raw_payment_id)?;
    let csrf_cookie = jar.get(CSRF_COOKIE).map(|cookie| cookie.value().to_string());

    let card = match card_input(payment_id, &form) {
        Ok(card) => card,
        Err(err) => {
            verify_csrf(payment_id, csrf_cookie.as_deref(), form.csrf_token.as_deref())?;
            return Err(err);
        }
    };

    let idempotency_key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    let submission = SubmitPaymentModel {
        csrf_cookie,
        csrf_form: form.csrf_token,
        idempotency_key,
        card,
        email: clean_input(&form.email),
        trusted_email: trusted_email(&jar),
    };

    let outcome = usecase.submit_payment(payment_id, submission).await?;
    Ok(outcome_response(jar, outcome))
}

pub async fn user_info<P, C, O, M, W>(
    State(usecase): State<Arc<PaymentUseCase<P, C, O, M, W>>>,
    Query(query): Query<UserInfoQuery>,
) -> Result<impl IntoResponse, PaymentError>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: SavedCardRepository + Send + Sync + 'static,
    O: SuccessfulOperationRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
    W: WebhookDispatch + Send + Sync + 'static,
{
    let info = usecase.user_info(&clean_input(&query.email)).await?;
    Ok(Json(info))
}

/// A saved-card id takes precedence over raw card fields.
fn card_input(payment_id: Uuid, form: &PayForm) -> UseCaseResult<Option<CardInput>> {
    if let Some(raw_id) = form.saved_card_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        let card_id = raw_id.parse::<i32>().map_err(|_| PaymentError::Validation {
            payment_id: Some(payment_id.to_string()),
            message: "saved_card_id must be an integer".to_string(),
        })?;
        return Ok(Some(CardInput::Saved { card_id }));
    }

    let card = form
        .card_number
        .as_deref()
        .filter(|number| !number.trim().is_empty())
        .map(|number| CardInput::Raw {
            number: number.to_string(),
            expiry: form.expiry.clone(),
            cvv: form.cvv.clone(),
            save_card: matches!(form.save_card.as_deref(), Some("true" | "on")),
        });

    Ok(card)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> PayForm {
        PayForm {
            email: "payer@example.com".to_string(),
            csrf_token: Some("token".to_string()),
            card_number: None,
            expiry: None,
            cvv: None,
            saved_card_id: None,
            save_card: None,
        }
    }

    #[test]
    fn saved_card_wins_over_raw_fields() {
        let mut form = form();
        form.saved_card_id = Some(" 12 ".to_string());
        form.card_number = Some("4444 4444 4444 4444".to_string());

        let card = card_input(Uuid::new_v4(), &form).unwrap();
        assert_eq!(card, Some(CardInput::Saved { card_id: 12 }));
    }

    #[test]
    fn raw_card_reads_save_flag() {
        let mut form = form();
        form.card_number = Some("4444444444444444".to_string());
        form.save_card = Some("true".to_string());

        let card = card_input(Uuid::new_v4(), &form).unwrap();
        assert!(matches!(card, Some(CardInput::Raw { save_card: true, .. })));
    }

    #[test]
    fn empty_form_has_no_card() {
        assert_eq!(card_input(Uuid::new_v4(), &form()).unwrap(), None);
    }

    #[test]
    fn non_numeric_saved_card_id_is_rejected() {
        let mut form = form();
        form.saved_card_id = Some("abc".to_string());
        let err = card_input(Uuid::new_v4(), &form).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
