use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{domain::entities::payments::PaymentEntity, infra::db::postgres::schema::successful_operations};

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = successful_operations)]
pub struct SuccessfulOperationEntity {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub email: Option<String>,
    pub amount: i64,
    pub reference: String,
    pub card_mask: Option<String>,
    pub redirect_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = successful_operations)]
pub struct InsertSuccessfulOperationEntity {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub email: Option<String>,
    pub amount: i64,
    pub reference: String,
    pub card_mask: Option<String>,
    pub redirect_url: String,
    pub created_at: DateTime<Utc>,
}

impl InsertSuccessfulOperationEntity {
    /// Audit copy of a payment at the moment it was finalized.
    pub fn from_payment(payment: &PaymentEntity, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payment_id: payment.id,
            email: payment.otp_email.clone(),
            amount: payment.amount,
            reference: payment.reference.clone(),
            card_mask: payment.card_mask.clone(),
            redirect_url: payment.redirect_url.clone(),
            created_at,
        }
    }
}
