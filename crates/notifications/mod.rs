use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptEmail {
    pub payment_id: Uuid,
    pub amount: i64,
    pub reference: String,
    pub card_mask: Option<String>,
    pub currency_symbol: String,
}

/// Outbound mail. Callers treat every send as fire-and-forget.
#[automock]
#[async_trait]
pub trait Mailer {
    async fn send_otp(&self, email: &str, code: &str) -> Result<()>;

    async fn send_receipt(&self, email: &str, receipt: ReceiptEmail) -> Result<()>;
}

/// Development transport: writes messages to the log instead of an SMTP relay.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_otp(&self, email: &str, code: &str) -> Result<()> {
        info!(%email, "mailer: otp email queued");
        debug!(%email, code, "mailer: otp email body");
        Ok(())
    }

    async fn send_receipt(&self, email: &str, receipt: ReceiptEmail) -> Result<()> {
        info!(
            %email,
            payment_id = %receipt.payment_id,
            amount = receipt.amount,
            reference = %receipt.reference,
            "mailer: receipt email queued"
        );
        Ok(())
    }
}
