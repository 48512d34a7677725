use anyhow::Result;
use async_trait::async_trait;
use diesel::{RunQueryDsl, insert_into, prelude::*};
use std::sync::Arc;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::saved_cards},
};
use domain::{
    entities::saved_cards::{InsertSavedCardEntity, SavedCardEntity},
    repositories::saved_cards::SavedCardRepository,
};

pub struct SavedCardPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SavedCardPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SavedCardRepository for SavedCardPostgres {
    async fn find_by_id(&self, card_id: i32) -> Result<Option<SavedCardEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = saved_cards::table
            .filter(saved_cards::id.eq(card_id))
            .select(SavedCardEntity::as_select())
            .first::<SavedCardEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_email_and_mask(
        &self,
        email: &str,
        card_mask: &str,
    ) -> Result<Option<SavedCardEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = saved_cards::table
            .filter(saved_cards::email.eq(email))
            .filter(saved_cards::card_mask.eq(card_mask))
            .select(SavedCardEntity::as_select())
            .first::<SavedCardEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<SavedCardEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = saved_cards::table
            .filter(saved_cards::email.eq(email))
            .order(saved_cards::created_at.desc())
            .select(SavedCardEntity::as_select())
            .load::<SavedCardEntity>(&mut conn)?;

        Ok(results)
    }

    async fn insert_card(&self, card: InsertSavedCardEntity) -> Result<i32> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let card_id = insert_into(saved_cards::table)
            .values(&card)
            .returning(saved_cards::id)
            .get_result::<i32>(&mut conn)?;

        Ok(card_id)
    }
}
