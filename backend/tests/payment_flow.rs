use std::{sync::Arc, time::Duration};

use backend::usecases::payments::{CheckoutSettings, PaymentError, PaymentUseCase};
use chrono::Utc;
use crates::{
    domain::{
        entities::payments::PaymentEntity,
        repositories::{
            payments::PaymentRepository, successful_operations::SuccessfulOperationRepository,
        },
        value_objects::{
            enums::payment_statuses::PaymentStatus,
            invoices::CreateInvoiceModel,
            payments::{CardInput, PaymentOutcome, SubmitPaymentModel},
        },
    },
    infra::memory::{
        payments::PaymentMemory, saved_cards::SavedCardMemory,
        successful_operations::SuccessfulOperationMemory,
    },
    notifications::MockMailer,
    payments::card_authorizer::{ACCEPTED_CARD_NUMBER, FixedCardAuthorizer},
    webhooks::queue::MockWebhookDispatch,
};
use tokio::sync::mpsc;
use uuid::Uuid;

const PAYER: &str = "payer@example.com";

type MemoryUseCase = PaymentUseCase<
    PaymentMemory,
    SavedCardMemory,
    SuccessfulOperationMemory,
    MockMailer,
    MockWebhookDispatch,
>;

struct Harness {
    usecase: Arc<MemoryUseCase>,
    payments: Arc<PaymentMemory>,
    operations: Arc<SuccessfulOperationMemory>,
    otp_codes: mpsc::UnboundedReceiver<String>,
}

fn harness() -> Harness {
    let (otp_tx, otp_codes) = mpsc::unbounded_channel();
    let mut mailer = MockMailer::new();
    mailer.expect_send_otp().returning(move |_, code| {
        let _ = otp_tx.send(code.to_string());
        Ok(())
    });
    mailer.expect_send_receipt().returning(|_, _| Ok(()));

    let mut webhooks = MockWebhookDispatch::new();
    webhooks.expect_enqueue().return_const(());

    let payments = Arc::new(PaymentMemory::new());
    let operations = Arc::new(SuccessfulOperationMemory::new());

    let usecase = Arc::new(PaymentUseCase::new(
        Arc::clone(&payments),
        Arc::new(SavedCardMemory::new()),
        Arc::clone(&operations),
        Arc::new(mailer),
        Arc::new(webhooks),
        Arc::new(FixedCardAuthorizer::default()),
        CheckoutSettings::default(),
    ));

    Harness {
        usecase,
        payments,
        operations,
        otp_codes,
    }
}

fn order(amount: i64, reference: &str) -> CreateInvoiceModel {
    CreateInvoiceModel {
        amount,
        reference: reference.to_string(),
        webhook_url: "https://merchant.test/hook".to_string(),
        redirect_url: "https://merchant.test/done".to_string(),
    }
}

fn card_submission(number: &str) -> SubmitPaymentModel {
    SubmitPaymentModel {
        csrf_cookie: Some("csrf".to_string()),
        csrf_form: Some("csrf".to_string()),
        idempotency_key: None,
        card: Some(CardInput::Raw {
            number: number.to_string(),
            expiry: Some("12/30".to_string()),
            cvv: Some("123".to_string()),
            save_card: false,
        }),
        email: PAYER.to_string(),
        trusted_email: None,
    }
}

async fn create(harness: &Harness, amount: i64, reference: &str) -> Uuid {
    let response = harness
        .usecase
        .create_invoice(order(amount, reference))
        .await
        .unwrap();
    let id = response.page_url.rsplit('/').next().unwrap();
    Uuid::parse_str(id).unwrap()
}

async fn stored(harness: &Harness, payment_id: Uuid) -> PaymentEntity {
    harness
        .payments
        .find_by_id(payment_id)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn otp_flow_pays_the_invoice() {
    let mut harness = harness();
    let payment_id = create(&harness, 5000, "ORDER-1").await;

    let created = stored(&harness, payment_id).await;
    assert_eq!(created.payment_status(), PaymentStatus::Pending);
    assert_eq!(created.amount, 5000);

    let outcome = harness
        .usecase
        .submit_payment(payment_id, card_submission("4444 4444 4444 4444"))
        .await
        .unwrap();
    assert_eq!(outcome, PaymentOutcome::OtpRequired { payment_id });

    let waiting = stored(&harness, payment_id).await;
    assert_eq!(waiting.payment_status(), PaymentStatus::WaitingForOtp);
    assert_eq!(waiting.card_mask.as_deref(), Some("**** 4444"));

    let code = tokio::time::timeout(Duration::from_secs(2), harness.otp_codes.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(waiting.otp_code.as_deref(), Some(code.as_str()));

    let wrong = if code == "0000" { "1111" } else { "0000" };
    let err = harness.usecase.verify_otp(payment_id, wrong).await.unwrap_err();
    assert!(matches!(err, PaymentError::InvalidOtp(_)));
    assert_eq!(
        stored(&harness, payment_id).await.payment_status(),
        PaymentStatus::WaitingForOtp
    );

    let outcome = harness.usecase.verify_otp(payment_id, &code).await.unwrap();
    assert_eq!(
        outcome,
        PaymentOutcome::Success {
            payment_id,
            trusted_email: Some(PAYER.to_string())
        }
    );

    let paid = stored(&harness, payment_id).await;
    assert_eq!(paid.payment_status(), PaymentStatus::Paid);
    assert!(paid.otp_code.is_none());
    assert!(paid.paid_at.is_some());

    let history = harness
        .operations
        .list_recent_by_email(PAYER, 5)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].reference, "ORDER-1");

    let replay = harness.usecase.verify_otp(payment_id, &code).await.unwrap_err();
    assert!(matches!(replay, PaymentError::InvalidOtp(_)));
}

#[tokio::test]
async fn trusted_email_skips_otp() {
    let harness = harness();
    let payment_id = create(&harness, 1200, "ORDER-2").await;

    let mut submission = card_submission(ACCEPTED_CARD_NUMBER);
    submission.trusted_email = Some(PAYER.to_string());

    let outcome = harness
        .usecase
        .submit_payment(payment_id, submission)
        .await
        .unwrap();
    assert!(matches!(outcome, PaymentOutcome::Success { .. }));

    let paid = stored(&harness, payment_id).await;
    assert_eq!(paid.payment_status(), PaymentStatus::Paid);
    assert!(paid.otp_code.is_none());
}

#[tokio::test]
async fn trust_cookie_for_another_email_still_requires_otp() {
    let harness = harness();
    let payment_id = create(&harness, 1200, "ORDER-3").await;

    let mut submission = card_submission(ACCEPTED_CARD_NUMBER);
    submission.trusted_email = Some("someone@example.com".to_string());

    let outcome = harness
        .usecase
        .submit_payment(payment_id, submission)
        .await
        .unwrap();
    assert_eq!(outcome, PaymentOutcome::OtpRequired { payment_id });
}

#[tokio::test]
async fn declined_card_fails_the_payment_for_good() {
    let harness = harness();
    let payment_id = create(&harness, 700, "ORDER-4").await;

    let err = harness
        .usecase
        .submit_payment(payment_id, card_submission("4111111111111111"))
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::InsufficientFunds(_)));

    let failed = stored(&harness, payment_id).await;
    assert_eq!(failed.payment_status(), PaymentStatus::Failed);
    assert_eq!(failed.error_code.as_deref(), Some("INSUFFICIENT_FUNDS"));

    let retry = harness
        .usecase
        .submit_payment(payment_id, card_submission(ACCEPTED_CARD_NUMBER))
        .await
        .unwrap_err();
    assert!(matches!(retry, PaymentError::AlreadyProcessed(_)));
}

#[tokio::test]
async fn csrf_mismatch_wins_over_card_validity() {
    let harness = harness();
    let payment_id = create(&harness, 700, "ORDER-5").await;

    let mut submission = card_submission(ACCEPTED_CARD_NUMBER);
    submission.csrf_form = Some("forged".to_string());

    let err = harness
        .usecase
        .submit_payment(payment_id, submission)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::CsrfMismatch(_)));
    assert_eq!(
        stored(&harness, payment_id).await.payment_status(),
        PaymentStatus::Pending
    );
}

#[tokio::test]
async fn overdue_invoice_expires_once() {
    let harness = harness();
    let now = Utc::now();
    let payment_id = Uuid::new_v4();
    harness
        .payments
        .insert_raw(PaymentEntity {
            id: payment_id,
            amount: 100,
            reference: "LATE".to_string(),
            status: PaymentStatus::Pending.to_string(),
            webhook_url: "https://merchant.test/hook".to_string(),
            redirect_url: "https://merchant.test/done".to_string(),
            idempotency_key: None,
            otp_code: None,
            otp_email: None,
            card_mask: None,
            error_code: None,
            error_message: None,
            expires_at: now - chrono::Duration::minutes(1),
            paid_at: None,
            webhook_attempts: 0,
            created_at: now - chrono::Duration::minutes(16),
        })
        .await;

    let first = harness.usecase.load_for_checkout(payment_id).await.unwrap_err();
    assert!(matches!(first, PaymentError::Expired(_)));
    assert_eq!(
        stored(&harness, payment_id).await.payment_status(),
        PaymentStatus::Expired
    );

    let second = harness.usecase.load_for_checkout(payment_id).await.unwrap_err();
    assert!(matches!(second, PaymentError::AlreadyProcessed(_)));
}

#[tokio::test]
async fn idempotency_key_replays_the_earlier_payment() {
    let harness = harness();
    let first_id = create(&harness, 900, "ORDER-6").await;

    let mut submission = card_submission(ACCEPTED_CARD_NUMBER);
    submission.idempotency_key = Some("intent-42".to_string());
    submission.trusted_email = Some(PAYER.to_string());
    harness
        .usecase
        .submit_payment(first_id, submission.clone())
        .await
        .unwrap();

    let second_id = create(&harness, 900, "ORDER-6").await;
    let outcome = harness
        .usecase
        .submit_payment(second_id, submission)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        PaymentOutcome::Success {
            payment_id: first_id,
            trusted_email: None
        }
    );

    assert_eq!(
        stored(&harness, second_id).await.payment_status(),
        PaymentStatus::Pending
    );
    let history = harness
        .operations
        .list_recent_by_email(PAYER, 5)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn saved_card_pays_a_later_invoice() {
    let harness = harness();
    let first_id = create(&harness, 300, "ORDER-7").await;

    let mut submission = card_submission(ACCEPTED_CARD_NUMBER);
    submission.trusted_email = Some(PAYER.to_string());
    submission.card = Some(CardInput::Raw {
        number: ACCEPTED_CARD_NUMBER.to_string(),
        expiry: Some("12/30".to_string()),
        cvv: Some("123".to_string()),
        save_card: true,
    });
    harness
        .usecase
        .submit_payment(first_id, submission.clone())
        .await
        .unwrap();

    // Saving the same card twice keeps one entry.
    let again_id = create(&harness, 300, "ORDER-7b").await;
    harness
        .usecase
        .submit_payment(again_id, submission)
        .await
        .unwrap();

    let info = harness.usecase.user_info(PAYER).await.unwrap();
    assert_eq!(info.cards.len(), 1);
    assert_eq!(info.cards[0].mask, "**** 4444");
    assert_eq!(info.operations.len(), 2);

    let second_id = create(&harness, 450, "ORDER-8").await;
    let mut reuse = card_submission(ACCEPTED_CARD_NUMBER);
    reuse.trusted_email = Some(PAYER.to_string());
    reuse.card = Some(CardInput::Saved {
        card_id: info.cards[0].id,
    });

    let outcome = harness
        .usecase
        .submit_payment(second_id, reuse)
        .await
        .unwrap();
    assert!(matches!(outcome, PaymentOutcome::Success { .. }));
    assert_eq!(
        stored(&harness, second_id).await.card_mask.as_deref(),
        Some("**** 4444")
    );
}
