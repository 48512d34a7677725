use serde::Serialize;

use crate::domain::entities::{
    saved_cards::SavedCardEntity, successful_operations::SuccessfulOperationEntity,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OperationDto {
    pub reference: String,
    pub amount: i64,
    pub card_mask: Option<String>,
    pub date: String,
}

impl From<SuccessfulOperationEntity> for OperationDto {
    fn from(value: SuccessfulOperationEntity) -> Self {
        Self {
            reference: value.reference,
            amount: value.amount,
            card_mask: value.card_mask,
            date: value.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SavedCardDto {
    pub id: i32,
    pub mask: String,
    pub expiry: String,
}

impl From<SavedCardEntity> for SavedCardDto {
    fn from(value: SavedCardEntity) -> Self {
        Self {
            id: value.id,
            mask: value.card_mask,
            expiry: value.expiry,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserInfoDto {
    pub operations: Vec<OperationDto>,
    pub cards: Vec<SavedCardDto>,
}
