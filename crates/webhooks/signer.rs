use anyhow::Result;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::domain::entities::payments::PaymentEntity;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Signature";
pub const PAYMENT_SUCCEEDED_EVENT: &str = "payment.succeeded";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentWebhookEvent {
    pub event: String,
    pub payment_id: Uuid,
    pub amount: i64,
    pub reference: String,
    pub status: String,
    pub card_mask: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<&PaymentEntity> for PaymentWebhookEvent {
    fn from(payment: &PaymentEntity) -> Self {
        Self {
            event: PAYMENT_SUCCEEDED_EVENT.to_string(),
            payment_id: payment.id,
            amount: payment.amount,
            reference: payment.reference.clone(),
            status: payment.status.clone(),
            card_mask: payment.card_mask.clone(),
            paid_at: payment.paid_at,
        }
    }
}

/// HMAC-SHA256 over the exact body bytes, hex encoded.
#[derive(Clone)]
pub struct WebhookSigner {
    secret: Vec<u8>,
}

impl WebhookSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn sign(&self, body: &[u8]) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Constant-time check of a hex signature; malformed hex is simply invalid.
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        let Ok(provided) = hex::decode(signature.trim()) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.secret) else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&provided).is_ok()
    }

    pub fn signed_event(&self, payment: &PaymentEntity) -> Result<(Vec<u8>, String)> {
        let body = serde_json::to_vec(&PaymentWebhookEvent::from(payment))?;
        let signature = self.sign(&body)?;
        Ok((body, signature))
    }
}
