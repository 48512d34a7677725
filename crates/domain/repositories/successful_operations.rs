use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::successful_operations::{
    InsertSuccessfulOperationEntity, SuccessfulOperationEntity,
};

#[automock]
#[async_trait]
pub trait SuccessfulOperationRepository {
    async fn record_operation(&self, operation: InsertSuccessfulOperationEntity) -> Result<Uuid>;

    /// Newest first.
    async fn list_recent_by_email(
        &self,
        email: &str,
        limit: i64,
    ) -> Result<Vec<SuccessfulOperationEntity>>;
}
