use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{
    entities::successful_operations::{
        InsertSuccessfulOperationEntity, SuccessfulOperationEntity,
    },
    repositories::successful_operations::SuccessfulOperationRepository,
};

#[derive(Default)]
pub struct SuccessfulOperationMemory {
    operations: Mutex<Vec<SuccessfulOperationEntity>>,
}

impl SuccessfulOperationMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SuccessfulOperationRepository for SuccessfulOperationMemory {
    async fn record_operation(&self, operation: InsertSuccessfulOperationEntity) -> Result<Uuid> {
        let mut operations = self.operations.lock().await;
        let id = operation.id;
        operations.push(SuccessfulOperationEntity {
            id,
            payment_id: operation.payment_id,
            email: operation.email,
            amount: operation.amount,
            reference: operation.reference,
            card_mask: operation.card_mask,
            redirect_url: operation.redirect_url,
            created_at: operation.created_at,
        });
        Ok(id)
    }

    async fn list_recent_by_email(
        &self,
        email: &str,
        limit: i64,
    ) -> Result<Vec<SuccessfulOperationEntity>> {
        let operations = self.operations.lock().await;
        let mut matching: Vec<SuccessfulOperationEntity> = operations
            .iter()
            .filter(|op| op.email.as_deref() == Some(email))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(matching)
    }
}
