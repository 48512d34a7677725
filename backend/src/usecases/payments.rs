use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use crates::{
    domain::{
        entities::{
            payments::{InsertPaymentEntity, PaymentEntity},
            saved_cards::InsertSavedCardEntity,
            successful_operations::InsertSuccessfulOperationEntity,
        },
        repositories::{
            payments::PaymentRepository, saved_cards::SavedCardRepository,
            successful_operations::SuccessfulOperationRepository,
        },
        value_objects::{
            checkout::{CheckoutView, OtpPageView, SuccessView},
            enums::payment_statuses::PaymentStatus,
            invoices::{CreateInvoiceModel, CreateInvoiceResponse},
            payments::{CardInput, PaymentOutcome, SubmitPaymentModel},
            user_info::{OperationDto, SavedCardDto, UserInfoDto},
        },
    },
    notifications::{Mailer, ReceiptEmail},
    payments::card_authorizer::{
        Authorization, CardAuthorizer, CardMaterial, normalize_card_number,
    },
    security::{sanitizer::clean_input, tokens},
    webhooks::queue::WebhookDispatch,
};
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;
use uuid::Uuid;

pub const INSUFFICIENT_FUNDS_CODE: &str = "INSUFFICIENT_FUNDS";
pub const INSUFFICIENT_FUNDS_MESSAGE: &str = "Invalid card or insufficient funds";
const RECENT_OPERATIONS_LIMIT: i64 = 5;
const SAVED_CARD_PROVIDER: &str = "mock";

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment not found")]
    NotFound(String),
    #[error("Payment has already been processed")]
    AlreadyProcessed(String),
    #[error("Payment link has expired")]
    Expired(String),
    #[error("CSRF token mismatch")]
    CsrfMismatch(String),
    #[error("Invalid card or insufficient funds")]
    InsufficientFunds(String),
    #[error("Saved card {card_id} not found")]
    SavedCardNotFound { payment_id: String, card_id: i32 },
    #[error("Invalid OTP code")]
    InvalidOtp(String),
    #[error("{message}")]
    Validation {
        payment_id: Option<String>,
        message: String,
    },
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PaymentError {
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::NotFound(_) => "PAYMENT_NOT_FOUND",
            PaymentError::AlreadyProcessed(_) => "PAYMENT_ALREADY_PROCESSED",
            PaymentError::Expired(_) => "PAYMENT_EXPIRED",
            PaymentError::CsrfMismatch(_) => "CSRF_TOKEN_MISMATCH",
            PaymentError::InsufficientFunds(_) => INSUFFICIENT_FUNDS_CODE,
            PaymentError::SavedCardNotFound { .. } => "SAVED_CARD_NOT_FOUND",
            PaymentError::InvalidOtp(_) => "INVALID_OTP",
            PaymentError::Validation { .. } => "VALIDATION_ERROR",
            PaymentError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::NotFound(_) | PaymentError::SavedCardNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            PaymentError::AlreadyProcessed(_) => StatusCode::CONFLICT,
            PaymentError::Expired(_) => StatusCode::GONE,
            PaymentError::CsrfMismatch(_) => StatusCode::FORBIDDEN,
            PaymentError::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
            PaymentError::InvalidOtp(_) => StatusCode::BAD_REQUEST,
            PaymentError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            PaymentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn payment_id(&self) -> Option<&str> {
        match self {
            PaymentError::NotFound(id)
            | PaymentError::AlreadyProcessed(id)
            | PaymentError::Expired(id)
            | PaymentError::CsrfMismatch(id)
            | PaymentError::InsufficientFunds(id)
            | PaymentError::InvalidOtp(id) => Some(id),
            PaymentError::SavedCardNotFound { payment_id, .. } => Some(payment_id),
            PaymentError::Validation { payment_id, .. } => payment_id.as_deref(),
            PaymentError::Internal(_) => None,
        }
    }

    fn validation(message: impl Into<String>) -> Self {
        PaymentError::Validation {
            payment_id: None,
            message: message.into(),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentError>;

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub base_url: String,
    pub currency_symbol: String,
    pub invoice_ttl: Duration,
    pub otp_length: usize,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            currency_symbol: "$".to_string(),
            invoice_ttl: Duration::minutes(15),
            otp_length: tokens::DEFAULT_OTP_LENGTH,
        }
    }
}

/// What a transition's compare-and-swap must still find in storage.
#[derive(Debug, Clone, Copy)]
enum SwapGuard<'a> {
    Status(PaymentStatus),
    /// `waiting_for_otp` with this exact code outstanding.
    Otp(&'a str),
}

impl SwapGuard<'_> {
    fn status(&self) -> PaymentStatus {
        match self {
            SwapGuard::Status(status) => *status,
            SwapGuard::Otp(_) => PaymentStatus::WaitingForOtp,
        }
    }
}

/// Owns every status transition of a payment. Each transition is written with a
/// compare-and-swap on the state it was computed from, so concurrent requests
/// against one payment cannot both win.
pub struct PaymentUseCase<P, C, O, M, W>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: SavedCardRepository + Send + Sync + 'static,
    O: SuccessfulOperationRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
    W: WebhookDispatch + Send + Sync + 'static,
{
    payment_repo: Arc<P>,
    saved_card_repo: Arc<C>,
    operation_repo: Arc<O>,
    mailer: Arc<M>,
    webhooks: Arc<W>,
    card_authorizer: Arc<dyn CardAuthorizer>,
    settings: CheckoutSettings,
}

impl<P, C, O, M, W> PaymentUseCase<P, C, O, M, W>
where
    P: PaymentRepository + Send + Sync + 'static,
    C: SavedCardRepository + Send + Sync + 'static,
    O: SuccessfulOperationRepository + Send + Sync + 'static,
    M: Mailer + Send + Sync + 'static,
    W: WebhookDispatch + Send + Sync + 'static,
{
    pub fn new(
        payment_repo: Arc<P>,
        saved_card_repo: Arc<C>,
        operation_repo: Arc<O>,
        mailer: Arc<M>,
        webhooks: Arc<W>,
        card_authorizer: Arc<dyn CardAuthorizer>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            payment_repo,
            saved_card_repo,
            operation_repo,
            mailer,
            webhooks,
            card_authorizer,
            settings,
        }
    }

    pub fn currency_symbol(&self) -> &str {
        &self.settings.currency_symbol
    }

    pub async fn create_invoice(
        &self,
        invoice: CreateInvoiceModel,
    ) -> UseCaseResult<CreateInvoiceResponse> {
        if invoice.amount <= 0 {
            warn!(amount = invoice.amount, "payments: rejected non-positive amount");
            return Err(PaymentError::validation("amount must be a positive integer"));
        }

        let reference = clean_input(&invoice.reference);
        if reference.is_empty() {
            warn!("payments: rejected empty reference");
            return Err(PaymentError::validation("reference must not be empty"));
        }

        let webhook_url = parse_http_url(&invoice.webhook_url, "webhookUrl")?;
        let redirect_url = parse_http_url(&invoice.redirect_url, "redirectUrl")?;

        let now = Utc::now();
        let payment = self
            .payment_repo
            .create_payment(InsertPaymentEntity {
                id: Uuid::new_v4(),
                amount: invoice.amount,
                reference,
                status: PaymentStatus::Pending.to_string(),
                webhook_url,
                redirect_url,
                expires_at: now + self.settings.invoice_ttl,
                webhook_attempts: 0,
                created_at: now,
            })
            .await
            .map_err(|err| {
                error!(db_error = ?err, "payments: failed to create invoice");
                PaymentError::Internal(err)
            })?;

        info!(
            payment_id = %payment.id,
            amount = payment.amount,
            reference = %payment.reference,
            "payments: invoice created"
        );

        Ok(CreateInvoiceResponse {
            page_url: format!(
                "{}/checkout/{}",
                self.settings.base_url.trim_end_matches('/'),
                payment.id
            ),
        })
    }

    /// Loads a payment that can still be paid. This is also where lazy expiry happens:
    /// an overdue open payment is moved to `expired` before the error is returned.
    pub async fn load_for_checkout(&self, payment_id: Uuid) -> UseCaseResult<PaymentEntity> {
        let payment = self.require_payment(payment_id).await?;
        self.ensure_payable(payment).await
    }

    pub async fn checkout_view(
        &self,
        payment_id: Uuid,
        trusted_email: Option<String>,
    ) -> UseCaseResult<CheckoutView> {
        let payment = self.load_for_checkout(payment_id).await?;

        let (recent_operations, saved_cards) = match trusted_email.as_deref() {
            Some(email) => {
                let info = self.user_info(email).await?;
                (info.operations, info.cards)
            }
            None => (Vec::new(), Vec::new()),
        };

        Ok(CheckoutView {
            payment_id: payment.id,
            amount: payment.amount,
            reference: payment.reference,
            recent_operations,
            saved_cards,
            prefill_email: trusted_email,
            csrf_token: tokens::generate_csrf_token(),
            currency_symbol: self.settings.currency_symbol.clone(),
        })
    }

    pub async fn submit_payment(
        &self,
        payment_id: Uuid,
        submission: SubmitPaymentModel,
    ) -> UseCaseResult<PaymentOutcome> {
        verify_csrf(
            payment_id,
            submission.csrf_cookie.as_deref(),
            submission.csrf_form.as_deref(),
        )?;

        if let Some(key) = submission.idempotency_key.as_deref() {
            if let Some(outcome) = self.replay_idempotent(payment_id, key).await? {
                return Ok(outcome);
            }
        }

        info!(%payment_id, "payments: processing submission");
        let mut payment = self.load_for_checkout(payment_id).await?;
        let expected = payment.payment_status();

        if let Some(key) = submission.idempotency_key.clone() {
            payment.idempotency_key = Some(key);
        }

        let authorization = self
            .authorize_card(payment_id, &submission.card, &submission.email)
            .await?;

        let card_mask = match authorization {
            Authorization {
                approved: true,
                card_mask,
            } => card_mask,
            Authorization {
                approved: false, ..
            } => return Err(self.decline(payment, expected).await),
        };

        if let Some(CardInput::Raw {
            number,
            expiry,
            cvv,
            save_card: true,
        }) = &submission.card
        {
            if let Some(mask) = card_mask.as_deref() {
                self.save_card_if_new(
                    &submission.email,
                    mask,
                    number,
                    expiry.as_deref(),
                    cvv.as_deref(),
                )
                .await;
            }
        }

        payment.otp_email = Some(submission.email.clone());
        payment.card_mask = card_mask;

        if submission.trusted_email.as_deref() == Some(submission.email.as_str()) {
            info!(%payment_id, "payments: trusted email, skipping otp");
            payment.otp_code = None;
            self.finalize(payment, SwapGuard::Status(expected)).await?;
            return Ok(PaymentOutcome::Success {
                payment_id,
                trusted_email: Some(submission.email),
            });
        }

        let otp_code = tokens::generate_otp(self.settings.otp_length);
        payment.status = PaymentStatus::WaitingForOtp.to_string();
        payment.otp_code = Some(otp_code.clone());
        self.apply_transition(&payment, SwapGuard::Status(expected)).await?;

        info!(%payment_id, "payments: awaiting otp confirmation");
        self.dispatch_otp_email(submission.email, otp_code);

        Ok(PaymentOutcome::OtpRequired { payment_id })
    }

    pub async fn otp_page(&self, payment_id: Uuid) -> UseCaseResult<OtpPageView> {
        let payment = self.require_payment(payment_id).await?;
        if payment.payment_status() != PaymentStatus::WaitingForOtp {
            return Err(PaymentError::NotFound(payment_id.to_string()));
        }
        let payment = self.ensure_payable(payment).await?;

        Ok(OtpPageView {
            payment_id: payment.id,
            email: payment.otp_email,
        })
    }

    // TODO: cap wrong guesses per payment once an attempt counter is stored with the row.
    pub async fn verify_otp(
        &self,
        payment_id: Uuid,
        submitted_code: &str,
    ) -> UseCaseResult<PaymentOutcome> {
        info!(%payment_id, "payments: verifying otp");
        let mut payment = self.require_payment(payment_id).await?;

        let status = payment.payment_status();
        if !status.is_terminal() && payment.is_expired_at(Utc::now()) {
            return Err(self.expire(payment, status).await);
        }

        let matches = payment
            .otp_code
            .as_deref()
            .is_some_and(|stored| stored == submitted_code);
        if !matches {
            warn!(%payment_id, "payments: invalid otp");
            return Err(PaymentError::InvalidOtp(payment_id.to_string()));
        }

        payment.otp_code = None;
        let payment = self
            .finalize(payment, SwapGuard::Otp(submitted_code))
            .await?;

        Ok(PaymentOutcome::Success {
            payment_id,
            trusted_email: payment.otp_email,
        })
    }

    pub async fn success_view(&self, payment_id: Uuid) -> UseCaseResult<SuccessView> {
        let payment = self.require_payment(payment_id).await?;
        Ok(SuccessView::from_payment(
            payment,
            &self.settings.currency_symbol,
        ))
    }

    pub async fn user_info(&self, email: &str) -> UseCaseResult<UserInfoDto> {
        let operations = self
            .operation_repo
            .list_recent_by_email(email, RECENT_OPERATIONS_LIMIT)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "payments: failed to load recent operations");
                PaymentError::Internal(err)
            })?;

        let cards = self
            .saved_card_repo
            .list_by_email(email)
            .await
            .map_err(|err| {
                error!(db_error = ?err, "payments: failed to load saved cards");
                PaymentError::Internal(err)
            })?;

        Ok(UserInfoDto {
            operations: operations.into_iter().map(OperationDto::from).collect(),
            cards: cards.into_iter().map(SavedCardDto::from).collect(),
        })
    }

    async fn replay_idempotent(
        &self,
        payment_id: Uuid,
        key: &str,
    ) -> UseCaseResult<Option<PaymentOutcome>> {
        let existing = self
            .payment_repo
            .find_by_idempotency_key(key)
            .await
            .map_err(|err| {
                error!(%payment_id, db_error = ?err, "payments: idempotency lookup failed");
                PaymentError::Internal(err)
            })?;

        let Some(existing) = existing.filter(|p| p.id != payment_id) else {
            return Ok(None);
        };

        let outcome = match existing.payment_status() {
            PaymentStatus::Paid => Some(PaymentOutcome::Success {
                payment_id: existing.id,
                trusted_email: None,
            }),
            PaymentStatus::WaitingForOtp => Some(PaymentOutcome::OtpRequired {
                payment_id: existing.id,
            }),
            _ => None,
        };

        if outcome.is_some() {
            info!(
                %payment_id,
                existing_payment_id = %existing.id,
                status = %existing.status,
                "payments: duplicate submission resolved by idempotency key"
            );
        }

        Ok(outcome)
    }

    async fn authorize_card(
        &self,
        payment_id: Uuid,
        card: &Option<CardInput>,
        email: &str,
    ) -> UseCaseResult<Authorization> {
        let material = match card {
            Some(CardInput::Saved { card_id }) => {
                let saved = self
                    .saved_card_repo
                    .find_by_id(*card_id)
                    .await
                    .map_err(|err| {
                        error!(%payment_id, db_error = ?err, "payments: failed to load saved card");
                        PaymentError::Internal(err)
                    })?
                    .filter(|saved| saved.email == email)
                    .ok_or_else(|| {
                        warn!(%payment_id, card_id, "payments: saved card not found");
                        PaymentError::SavedCardNotFound {
                            payment_id: payment_id.to_string(),
                            card_id: *card_id,
                        }
                    })?;
                CardMaterial::from(&saved)
            }
            Some(CardInput::Raw { number, .. }) => CardMaterial::Raw {
                number: number.clone(),
            },
            None => {
                return Ok(Authorization {
                    approved: false,
                    card_mask: None,
                });
            }
        };

        Ok(self.card_authorizer.authorize(&material))
    }

    async fn save_card_if_new(
        &self,
        email: &str,
        card_mask: &str,
        number: &str,
        expiry: Option<&str>,
        cvv: Option<&str>,
    ) {
        match self
            .saved_card_repo
            .find_by_email_and_mask(email, card_mask)
            .await
        {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(err) => {
                warn!(db_error = ?err, "payments: saved card lookup failed, card not saved");
                return;
            }
        }

        let hashed = tokens::hash_secret(&normalize_card_number(number))
            .and_then(|card_hash| Ok((card_hash, tokens::hash_secret(cvv.unwrap_or_default())?)));
        let (card_hash, cvv_hash) = match hashed {
            Ok(hashes) => hashes,
            Err(err) => {
                warn!(error = %err, "payments: failed to hash card, card not saved");
                return;
            }
        };

        let card = InsertSavedCardEntity {
            email: email.to_string(),
            card_token: Uuid::new_v4().to_string(),
            card_hash,
            cvv_hash,
            expiry: expiry.unwrap_or_default().to_string(),
            card_mask: card_mask.to_string(),
            psp_provider: SAVED_CARD_PROVIDER.to_string(),
            created_at: Utc::now(),
        };

        match self.saved_card_repo.insert_card(card).await {
            Ok(card_id) => info!(card_id, %email, "payments: card saved"),
            Err(err) => warn!(db_error = ?err, "payments: failed to save card"),
        }
    }

    async fn require_payment(&self, payment_id: Uuid) -> UseCaseResult<PaymentEntity> {
        self.payment_repo
            .find_by_id(payment_id)
            .await
            .map_err(|err| {
                error!(%payment_id, db_error = ?err, "payments: failed to load payment");
                PaymentError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%payment_id, "payments: payment not found");
                PaymentError::NotFound(payment_id.to_string())
            })
    }

    async fn ensure_payable(&self, payment: PaymentEntity) -> UseCaseResult<PaymentEntity> {
        let status = payment.payment_status();
        if status.is_terminal() {
            warn!(payment_id = %payment.id, %status, "payments: payment already processed");
            return Err(PaymentError::AlreadyProcessed(payment.id.to_string()));
        }

        if payment.is_expired_at(Utc::now()) {
            return Err(self.expire(payment, status).await);
        }

        Ok(payment)
    }

    async fn expire(&self, mut payment: PaymentEntity, expected: PaymentStatus) -> PaymentError {
        let payment_id = payment.id;
        payment.status = PaymentStatus::Expired.to_string();
        payment.otp_code = None;

        match self.apply_transition(&payment, SwapGuard::Status(expected)).await {
            Ok(()) => {
                info!(%payment_id, "payments: payment expired");
                PaymentError::Expired(payment_id.to_string())
            }
            Err(err) => err,
        }
    }

    async fn decline(&self, mut payment: PaymentEntity, expected: PaymentStatus) -> PaymentError {
        let payment_id = payment.id;
        payment.status = PaymentStatus::Failed.to_string();
        payment.otp_code = None;
        payment.error_code = Some(INSUFFICIENT_FUNDS_CODE.to_string());
        payment.error_message = Some(INSUFFICIENT_FUNDS_MESSAGE.to_string());

        match self.apply_transition(&payment, SwapGuard::Status(expected)).await {
            Ok(()) => {
                warn!(%payment_id, "payments: card declined");
                PaymentError::InsufficientFunds(payment_id.to_string())
            }
            Err(err) => err,
        }
    }

    /// Marks the payment paid, then runs the side effects. None of the side effects can
    /// undo or fail the payment.
    async fn finalize(
        &self,
        mut payment: PaymentEntity,
        guard: SwapGuard<'_>,
    ) -> UseCaseResult<PaymentEntity> {
        let now = Utc::now();
        payment.status = PaymentStatus::Paid.to_string();
        payment.paid_at = Some(now);
        payment.otp_code = None;
        self.apply_transition(&payment, guard).await?;
        info!(payment_id = %payment.id, "payments: payment finalized");

        let operation = InsertSuccessfulOperationEntity::from_payment(&payment, now);
        if let Err(err) = self.operation_repo.record_operation(operation).await {
            error!(
                payment_id = %payment.id,
                db_error = ?err,
                "payments: failed to record successful operation"
            );
        }

        if let Some(email) = payment.otp_email.clone() {
            self.dispatch_receipt_email(
                email,
                ReceiptEmail {
                    payment_id: payment.id,
                    amount: payment.amount,
                    reference: payment.reference.clone(),
                    card_mask: payment.card_mask.clone(),
                    currency_symbol: self.settings.currency_symbol.clone(),
                },
            );
        }

        self.webhooks.enqueue(payment.clone());

        Ok(payment)
    }

    async fn apply_transition(
        &self,
        payment: &PaymentEntity,
        guard: SwapGuard<'_>,
    ) -> UseCaseResult<()> {
        let changes = payment.transition_changes();
        let swapped = match guard {
            SwapGuard::Status(expected) => {
                self.payment_repo
                    .transition(payment.id, expected, changes)
                    .await
            }
            SwapGuard::Otp(otp_code) => {
                self.payment_repo
                    .transition_from_otp(payment.id, otp_code, changes)
                    .await
            }
        }
        .map_err(|err| {
            error!(
                payment_id = %payment.id,
                db_error = ?err,
                "payments: failed to persist transition"
            );
            PaymentError::Internal(err)
        })?;

        if !swapped {
            warn!(
                payment_id = %payment.id,
                from = %guard.status(),
                to = %payment.status,
                "payments: lost transition race"
            );
            return Err(PaymentError::AlreadyProcessed(payment.id.to_string()));
        }

        Ok(())
    }

    fn dispatch_otp_email(&self, email: String, code: String) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            if let Err(err) = mailer.send_otp(&email, &code).await {
                warn!(%email, error = %err, "payments: failed to send otp email");
            }
        });
    }

    fn dispatch_receipt_email(&self, email: String, receipt: ReceiptEmail) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            let payment_id = receipt.payment_id;
            if let Err(err) = mailer.send_receipt(&email, receipt).await {
                warn!(%payment_id, error = %err, "payments: failed to send receipt email");
            }
        });
    }
}

/// The cookie and the form field must both be present and byte-equal.
pub fn verify_csrf(
    payment_id: Uuid,
    cookie_token: Option<&str>,
    form_token: Option<&str>,
) -> UseCaseResult<()> {
    match (cookie_token, form_token) {
        (Some(cookie), Some(form)) if !cookie.is_empty() && cookie == form => Ok(()),
        _ => {
            warn!(%payment_id, "payments: csrf token mismatch");
            Err(PaymentError::CsrfMismatch(payment_id.to_string()))
        }
    }
}

/// Path ids that are not UUIDs cannot name a payment.
pub fn parse_payment_id(raw: &str) -> UseCaseResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| PaymentError::NotFound(raw.to_string()))
}

fn parse_http_url(raw: &str, field: &str) -> UseCaseResult<String> {
    let url = Url::parse(raw.trim())
        .map_err(|err| PaymentError::validation(format!("{field} is not a valid URL: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PaymentError::validation(format!(
            "{field} must use http or https"
        )));
    }
    Ok(url.to_string())
}
