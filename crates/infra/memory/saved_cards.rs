use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    entities::saved_cards::{InsertSavedCardEntity, SavedCardEntity},
    repositories::saved_cards::SavedCardRepository,
};

#[derive(Default)]
pub struct SavedCardMemory {
    cards: Mutex<Vec<SavedCardEntity>>,
}

impl SavedCardMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SavedCardRepository for SavedCardMemory {
    async fn find_by_id(&self, card_id: i32) -> Result<Option<SavedCardEntity>> {
        let cards = self.cards.lock().await;
        Ok(cards.iter().find(|c| c.id == card_id).cloned())
    }

    async fn find_by_email_and_mask(
        &self,
        email: &str,
        card_mask: &str,
    ) -> Result<Option<SavedCardEntity>> {
        let cards = self.cards.lock().await;
        Ok(cards
            .iter()
            .find(|c| c.email == email && c.card_mask == card_mask)
            .cloned())
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<SavedCardEntity>> {
        let cards = self.cards.lock().await;
        Ok(cards.iter().filter(|c| c.email == email).cloned().collect())
    }

    async fn insert_card(&self, card: InsertSavedCardEntity) -> Result<i32> {
        let mut cards = self.cards.lock().await;
        let id = cards.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        cards.push(SavedCardEntity {
            id,
            email: card.email,
            card_token: card.card_token,
            card_hash: card.card_hash,
            cvv_hash: card.cvv_hash,
            expiry: card.expiry,
            card_mask: card.card_mask,
            psp_provider: card.psp_provider,
            created_at: card.created_at,
        });
        Ok(id)
    }
}
