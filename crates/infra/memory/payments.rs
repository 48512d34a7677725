use std::collections::HashMap;

use anyhow::{Result, bail};
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity, PaymentTransition},
    repositories::payments::PaymentRepository,
    value_objects::enums::payment_statuses::PaymentStatus,
};

/// Process-local payment store. Every compare-and-swap runs under one lock.
#[derive(Default)]
pub struct PaymentMemory {
    payments: Mutex<HashMap<Uuid, PaymentEntity>>,
}

impl PaymentMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a row as-is, bypassing the state machine. Intended for fixtures.
    pub async fn insert_raw(&self, payment: PaymentEntity) {
        self.payments.lock().await.insert(payment.id, payment);
    }
}

#[async_trait]
impl PaymentRepository for PaymentMemory {
    async fn create_payment(&self, payment: InsertPaymentEntity) -> Result<PaymentEntity> {
        let mut payments = self.payments.lock().await;
        if payments.contains_key(&payment.id) {
            bail!("payment {} already exists", payment.id);
        }
        let entity = PaymentEntity::from(payment);
        payments.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>> {
        Ok(self.payments.lock().await.get(&payment_id).cloned())
    }

    async fn find_by_idempotency_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Option<PaymentEntity>> {
        let payments = self.payments.lock().await;
        Ok(payments
            .values()
            .filter(|p| p.idempotency_key.as_deref() == Some(idempotency_key))
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn transition(
        &self,
        payment_id: Uuid,
        expected: PaymentStatus,
        changes: PaymentTransition,
    ) -> Result<bool> {
        let mut payments = self.payments.lock().await;
        let Some(payment) = payments.get_mut(&payment_id) else {
            return Ok(false);
        };
        if payment.status != expected.as_str() {
            return Ok(false);
        }
        changes.apply_to(payment);
        Ok(true)
    }

    async fn transition_from_otp(
        &self,
        payment_id: Uuid,
        otp_code: &str,
        changes: PaymentTransition,
    ) -> Result<bool> {
        let mut payments = self.payments.lock().await;
        let Some(payment) = payments.get_mut(&payment_id) else {
            return Ok(false);
        };
        if payment.status != PaymentStatus::WaitingForOtp.as_str()
            || payment.otp_code.as_deref() != Some(otp_code)
        {
            return Ok(false);
        }
        changes.apply_to(payment);
        Ok(true)
    }

    async fn record_webhook_attempt(&self, payment_id: Uuid) -> Result<i32> {
        let mut payments = self.payments.lock().await;
        let Some(payment) = payments.get_mut(&payment_id) else {
            bail!("payment {payment_id} not found");
        };
        payment.webhook_attempts += 1;
        Ok(payment.webhook_attempts)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    async fn waiting_payment(store: &PaymentMemory, otp_code: &str) -> PaymentEntity {
        let now = Utc::now();
        let mut payment = store
            .create_payment(InsertPaymentEntity {
                id: Uuid::new_v4(),
                amount: 5000,
                reference: "ORDER-1".to_string(),
                status: PaymentStatus::Pending.to_string(),
                webhook_url: "https://merchant.test/hook".to_string(),
                redirect_url: "https://merchant.test/done".to_string(),
                expires_at: now + Duration::minutes(15),
                webhook_attempts: 0,
                created_at: now,
            })
            .await
            .unwrap();

        payment.status = PaymentStatus::WaitingForOtp.to_string();
        payment.otp_code = Some(otp_code.to_string());
        assert!(
            store
                .transition(payment.id, PaymentStatus::Pending, payment.transition_changes())
                .await
                .unwrap()
        );
        payment
    }

    #[tokio::test]
    async fn otp_transition_applies_for_current_code() {
        let store = PaymentMemory::new();
        let mut payment = waiting_payment(&store, "1111").await;

        payment.status = PaymentStatus::Paid.to_string();
        payment.otp_code = None;
        let swapped = store
            .transition_from_otp(payment.id, "1111", payment.transition_changes())
            .await
            .unwrap();

        assert!(swapped);
        let stored = store.find_by_id(payment.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status(), PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn otp_transition_rejects_code_replaced_by_resubmission() {
        let store = PaymentMemory::new();
        let payment = waiting_payment(&store, "1111").await;

        let mut resubmitted = payment.clone();
        resubmitted.otp_code = Some("2222".to_string());
        resubmitted.otp_email = Some("other@example.com".to_string());
        assert!(
            store
                .transition(
                    payment.id,
                    PaymentStatus::WaitingForOtp,
                    resubmitted.transition_changes(),
                )
                .await
                .unwrap()
        );

        let mut stale = payment.clone();
        stale.status = PaymentStatus::Paid.to_string();
        stale.otp_code = None;
        let swapped = store
            .transition_from_otp(payment.id, "1111", stale.transition_changes())
            .await
            .unwrap();

        assert!(!swapped);
        let stored = store.find_by_id(payment.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_status(), PaymentStatus::WaitingForOtp);
        assert_eq!(stored.otp_code.as_deref(), Some("2222"));
        assert_eq!(stored.otp_email.as_deref(), Some("other@example.com"));
    }
}
