use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::payment_statuses::PaymentStatus,
    infra::db::postgres::schema::payments,
};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub amount: i64,
    pub reference: String,
    pub status: String,
    pub webhook_url: String,
    pub redirect_url: String,
    pub idempotency_key: Option<String>,
    pub otp_code: Option<String>,
    pub otp_email: Option<String>,
    pub card_mask: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub webhook_attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl PaymentEntity {
    /// Rows with an unrecognised status are treated as failed so they can never be paid.
    pub fn payment_status(&self) -> PaymentStatus {
        self.status.parse().unwrap_or(PaymentStatus::Failed)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// The mutable part of the row, written back by a guarded status transition.
    pub fn transition_changes(&self) -> PaymentTransition {
        PaymentTransition {
            status: self.status.clone(),
            idempotency_key: self.idempotency_key.clone(),
            otp_code: self.otp_code.clone(),
            otp_email: self.otp_email.clone(),
            card_mask: self.card_mask.clone(),
            error_code: self.error_code.clone(),
            error_message: self.error_message.clone(),
            paid_at: self.paid_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub id: Uuid,
    pub amount: i64,
    pub reference: String,
    pub status: String,
    pub webhook_url: String,
    pub redirect_url: String,
    pub expires_at: DateTime<Utc>,
    pub webhook_attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl From<InsertPaymentEntity> for PaymentEntity {
    fn from(value: InsertPaymentEntity) -> Self {
        Self {
            id: value.id,
            amount: value.amount,
            reference: value.reference,
            status: value.status,
            webhook_url: value.webhook_url,
            redirect_url: value.redirect_url,
            idempotency_key: None,
            otp_code: None,
            otp_email: None,
            card_mask: None,
            error_code: None,
            error_message: None,
            expires_at: value.expires_at,
            paid_at: None,
            webhook_attempts: value.webhook_attempts,
            created_at: value.created_at,
        }
    }
}

// `amount`, `expires_at` and `webhook_attempts` never change through a status transition.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = payments)]
#[diesel(treat_none_as_null = true)]
pub struct PaymentTransition {
    pub status: String,
    pub idempotency_key: Option<String>,
    pub otp_code: Option<String>,
    pub otp_email: Option<String>,
    pub card_mask: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PaymentTransition {
    pub fn apply_to(&self, payment: &mut PaymentEntity) {
        payment.status = self.status.clone();
        payment.idempotency_key = self.idempotency_key.clone();
        payment.otp_code = self.otp_code.clone();
        payment.otp_email = self.otp_email.clone();
        payment.card_mask = self.card_mask.clone();
        payment.error_code = self.error_code.clone();
        payment.error_message = self.error_message.clone();
        payment.paid_at = self.paid_at;
    }
}
