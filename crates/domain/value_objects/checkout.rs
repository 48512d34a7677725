use serde::Serialize;
use uuid::Uuid;

use crate::domain::{
    entities::payments::PaymentEntity,
    value_objects::user_info::{OperationDto, SavedCardDto},
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckoutView {
    pub payment_id: Uuid,
    pub amount: i64,
    pub reference: String,
    pub recent_operations: Vec<OperationDto>,
    pub saved_cards: Vec<SavedCardDto>,
    pub prefill_email: Option<String>,
    pub csrf_token: String,
    pub currency_symbol: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OtpPageView {
    pub payment_id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SuccessView {
    pub payment_id: Uuid,
    pub amount: i64,
    pub reference: String,
    pub card_mask: Option<String>,
    pub redirect_url: String,
    pub currency_symbol: String,
}

impl SuccessView {
    pub fn from_payment(payment: PaymentEntity, currency_symbol: &str) -> Self {
        Self {
            payment_id: payment.id,
            amount: payment.amount,
            reference: payment.reference,
            card_mask: payment.card_mask,
            redirect_url: payment.redirect_url,
            currency_symbol: currency_symbol.to_string(),
        }
    }
}
