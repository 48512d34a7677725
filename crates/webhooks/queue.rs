use std::sync::Arc;

use mockall::automock;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::{
    domain::{entities::payments::PaymentEntity, repositories::payments::PaymentRepository},
    webhooks::delivery::{WebhookDeliverer, WebhookTransport},
};

/// Producer side of webhook delivery. Enqueueing never waits for the merchant.
#[automock]
pub trait WebhookDispatch {
    fn enqueue(&self, payment: PaymentEntity);
}

#[derive(Clone)]
pub struct WebhookQueue {
    sender: mpsc::UnboundedSender<PaymentEntity>,
}

pub struct WebhookJobs {
    receiver: mpsc::UnboundedReceiver<PaymentEntity>,
}

impl WebhookQueue {
    pub fn new() -> (Self, WebhookJobs) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, WebhookJobs { receiver })
    }
}

impl WebhookDispatch for WebhookQueue {
    fn enqueue(&self, payment: PaymentEntity) {
        let payment_id = payment.id;
        if self.sender.send(payment).is_err() {
            error!(%payment_id, "webhook: worker is not running, delivery dropped");
        }
    }
}

/// Consumes queued deliveries until every producer is dropped. Each delivery runs in its
/// own task so one slow merchant cannot hold up the rest.
pub async fn run_webhook_worker<R, T>(mut jobs: WebhookJobs, deliverer: Arc<WebhookDeliverer<R, T>>)
where
    R: PaymentRepository + Send + Sync + 'static,
    T: WebhookTransport + Send + Sync + 'static,
{
    info!("Starting webhook delivery worker");
    while let Some(payment) = jobs.receiver.recv().await {
        let deliverer = Arc::clone(&deliverer);
        tokio::spawn(async move {
            deliverer.deliver(&payment).await;
        });
    }
    info!("Webhook delivery worker stopped");
}
