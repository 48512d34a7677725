use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::entities::saved_cards::{InsertSavedCardEntity, SavedCardEntity};

#[automock]
#[async_trait]
pub trait SavedCardRepository {
    async fn find_by_id(&self, card_id: i32) -> Result<Option<SavedCardEntity>>;

    async fn find_by_email_and_mask(
        &self,
        email: &str,
        card_mask: &str,
    ) -> Result<Option<SavedCardEntity>>;

    async fn list_by_email(&self, email: &str) -> Result<Vec<SavedCardEntity>>;

    async fn insert_card(&self, card: InsertSavedCardEntity) -> Result<i32>;
}
