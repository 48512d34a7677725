use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity, PaymentTransition},
    value_objects::enums::payment_statuses::PaymentStatus,
};

#[automock]
#[async_trait]
pub trait PaymentRepository {
    async fn create_payment(&self, payment: InsertPaymentEntity) -> Result<PaymentEntity>;

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>>;

    async fn find_by_idempotency_key(&self, idempotency_key: &str)
    -> Result<Option<PaymentEntity>>;

    /// Writes `changes` only while the stored status still equals `expected`.
    /// Returns `false` when another request moved the payment first.
    async fn transition(
        &self,
        payment_id: Uuid,
        expected: PaymentStatus,
        changes: PaymentTransition,
    ) -> Result<bool>;

    /// Writes `changes` only while the payment is still `waiting_for_otp` on
    /// `otp_code`. A resubmission that issued a newer code makes this return `false`.
    async fn transition_from_otp(
        &self,
        payment_id: Uuid,
        otp_code: &str,
        changes: PaymentTransition,
    ) -> Result<bool>;

    /// Atomically bumps `webhook_attempts` and returns the new count.
    async fn record_webhook_attempt(&self, payment_id: Uuid) -> Result<i32>;
}
