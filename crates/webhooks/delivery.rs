use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use reqwest::header::CONTENT_TYPE;
use tracing::{error, info, warn};

use crate::{
    domain::{entities::payments::PaymentEntity, repositories::payments::PaymentRepository},
    webhooks::signer::{SIGNATURE_HEADER, WebhookSigner},
};

#[automock]
#[async_trait]
pub trait WebhookTransport {
    /// POSTs a signed body and returns the HTTP status code.
    async fn post(&self, url: &str, body: Vec<u8>, signature: &str) -> Result<u16>;
}

pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post(&self, url: &str, body: Vec<u8>, signature: &str) -> Result<u16> {
        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await?;
        Ok(resp.status().as_u16())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay after the given 1-based attempt: base, 2x base, 4x base, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryReport {
    Delivered { attempts: i32 },
    Exhausted { attempts: i32 },
}

pub struct WebhookDeliverer<R, T>
where
    R: PaymentRepository + Send + Sync + 'static,
    T: WebhookTransport + Send + Sync + 'static,
{
    payment_repo: Arc<R>,
    transport: Arc<T>,
    signer: WebhookSigner,
    policy: RetryPolicy,
}

impl<R, T> WebhookDeliverer<R, T>
where
    R: PaymentRepository + Send + Sync + 'static,
    T: WebhookTransport + Send + Sync + 'static,
{
    pub fn new(
        payment_repo: Arc<R>,
        transport: Arc<T>,
        signer: WebhookSigner,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            payment_repo,
            transport,
            signer,
            policy,
        }
    }

    /// Delivers the completion event, retrying with exponential backoff. The attempt
    /// counter persisted on the payment counts toward the ceiling, so a restarted
    /// delivery never exceeds `max_attempts` in total.
    pub async fn deliver(&self, payment: &PaymentEntity) -> DeliveryReport {
        let payment_id = payment.id;
        let ceiling = i32::try_from(self.policy.max_attempts).unwrap_or(i32::MAX);
        let mut attempts = payment.webhook_attempts;

        if attempts >= ceiling {
            warn!(%payment_id, attempts, "webhook: attempt ceiling already reached");
            return DeliveryReport::Exhausted { attempts };
        }

        let (body, signature) = match self.signer.signed_event(payment) {
            Ok(signed) => signed,
            Err(err) => {
                error!(%payment_id, error = %err, "webhook: failed to build signed event");
                return DeliveryReport::Exhausted { attempts };
            }
        };

        loop {
            let outcome = self
                .transport
                .post(&payment.webhook_url, body.clone(), &signature)
                .await;

            attempts = self.persist_attempt(payment_id, attempts).await;

            match outcome {
                Ok(status) if (200..300).contains(&status) => {
                    info!(%payment_id, attempts, status, "webhook: delivered");
                    return DeliveryReport::Delivered { attempts };
                }
                Ok(status) => {
                    warn!(%payment_id, attempts, status, "webhook: merchant rejected delivery");
                }
                Err(err) => {
                    warn!(%payment_id, attempts, error = %err, "webhook: delivery request failed");
                }
            }

            if attempts >= ceiling {
                error!(%payment_id, attempts, "webhook: retries exhausted");
                return DeliveryReport::Exhausted { attempts };
            }

            let delay = self.policy.delay_after(attempts.max(1) as u32);
            tokio::time::sleep(delay).await;
        }
    }

    async fn persist_attempt(&self, payment_id: uuid::Uuid, previous: i32) -> i32 {
        match self.payment_repo.record_webhook_attempt(payment_id).await {
            Ok(count) => count,
            Err(err) => {
                error!(
                    %payment_id,
                    db_error = ?err,
                    "webhook: failed to persist attempt count"
                );
                previous + 1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI32, Ordering};

    use anyhow::anyhow;
    use chrono::Utc;
    use mockall::predicate::eq;
    use uuid::Uuid;

    use super::*;
    use crate::domain::repositories::payments::MockPaymentRepository;

    fn paid_payment(webhook_attempts: i32) -> PaymentEntity {
        let now = Utc::now();
        PaymentEntity {
            id: Uuid::new_v4(),
            amount: 5000,
            reference: "ORDER-1".to_string(),
            status: "paid".to_string(),
            webhook_url: "https://merchant.test/hook".to_string(),
            redirect_url: "https://merchant.test/done".to_string(),
            idempotency_key: None,
            otp_code: None,
            otp_email: Some("payer@example.com".to_string()),
            card_mask: Some("**** 4444".to_string()),
            error_code: None,
            error_message: None,
            expires_at: now,
            paid_at: Some(now),
            webhook_attempts,
            created_at: now,
        }
    }

    fn counting_repo(payment_id: Uuid, start: i32) -> MockPaymentRepository {
        let counter = Arc::new(AtomicI32::new(start));
        let mut repo = MockPaymentRepository::new();
        repo.expect_record_webhook_attempt()
            .with(eq(payment_id))
            .returning(move |_| Ok(counter.fetch_add(1, Ordering::SeqCst) + 1));
        repo
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn first_success_stops_after_one_attempt() {
        let payment = paid_payment(0);
        let repo = counting_repo(payment.id, 0);
        let signer = WebhookSigner::new("secret");
        let verifier = signer.clone();

        let mut transport = MockWebhookTransport::new();
        transport
            .expect_post()
            .times(1)
            .withf(move |url, body, signature| {
                url == "https://merchant.test/hook" && verifier.verify(body, signature)
            })
            .returning(|_, _, _| Ok(200));

        let deliverer =
            WebhookDeliverer::new(Arc::new(repo), Arc::new(transport), signer, fast_policy());

        assert_eq!(
            deliverer.deliver(&payment).await,
            DeliveryReport::Delivered { attempts: 1 }
        );
    }

    #[tokio::test]
    async fn failures_retry_up_to_ceiling_then_stop() {
        let payment = paid_payment(0);
        let repo = counting_repo(payment.id, 0);

        let mut transport = MockWebhookTransport::new();
        transport.expect_post().times(3).returning(|_, _, _| Ok(503));

        let deliverer = WebhookDeliverer::new(
            Arc::new(repo),
            Arc::new(transport),
            WebhookSigner::new("secret"),
            fast_policy(),
        );

        assert_eq!(
            deliverer.deliver(&payment).await,
            DeliveryReport::Exhausted { attempts: 3 }
        );
    }

    #[tokio::test]
    async fn network_error_then_success_counts_both_attempts() {
        let payment = paid_payment(0);
        let repo = counting_repo(payment.id, 0);

        let calls = Arc::new(AtomicI32::new(0));
        let mut transport = MockWebhookTransport::new();
        transport.expect_post().times(2).returning(move |_, _, _| {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(anyhow!("connection refused"))
            } else {
                Ok(204)
            }
        });

        let deliverer = WebhookDeliverer::new(
            Arc::new(repo),
            Arc::new(transport),
            WebhookSigner::new("secret"),
            fast_policy(),
        );

        assert_eq!(
            deliverer.deliver(&payment).await,
            DeliveryReport::Delivered { attempts: 2 }
        );
    }

    #[tokio::test]
    async fn resumes_from_persisted_attempts() {
        let payment = paid_payment(2);
        let repo = counting_repo(payment.id, 2);

        let mut transport = MockWebhookTransport::new();
        transport.expect_post().times(1).returning(|_, _, _| Ok(500));

        let deliverer = WebhookDeliverer::new(
            Arc::new(repo),
            Arc::new(transport),
            WebhookSigner::new("secret"),
            fast_policy(),
        );

        assert_eq!(
            deliverer.deliver(&payment).await,
            DeliveryReport::Exhausted { attempts: 3 }
        );
    }

    #[tokio::test]
    async fn nothing_is_sent_once_ceiling_was_reached() {
        let payment = paid_payment(3);
        let mut transport = MockWebhookTransport::new();
        transport.expect_post().never();

        let deliverer = WebhookDeliverer::new(
            Arc::new(MockPaymentRepository::new()),
            Arc::new(transport),
            WebhookSigner::new("secret"),
            fast_policy(),
        );

        assert_eq!(
            deliverer.deliver(&payment).await,
            DeliveryReport::Exhausted { attempts: 3 }
        );
    }
}
