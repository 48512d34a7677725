use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::infra::db::postgres::schema::saved_cards;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = saved_cards)]
pub struct SavedCardEntity {
    pub id: i32,
    pub email: String,
    pub card_token: String,
    pub card_hash: String,
    pub cvv_hash: String,
    pub expiry: String,
    pub card_mask: String,
    pub psp_provider: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = saved_cards)]
pub struct InsertSavedCardEntity {
    pub email: String,
    pub card_token: String,
    pub card_hash: String,
    pub cvv_hash: String,
    pub expiry: String,
    pub card_mask: String,
    pub psp_provider: String,
    pub created_at: DateTime<Utc>,
}
