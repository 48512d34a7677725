use crate::{domain::entities::saved_cards::SavedCardEntity, security::tokens};

/// The only card number the stand-in acquirer approves.
pub const ACCEPTED_CARD_NUMBER: &str = "4444444444444444";

#[derive(Debug, Clone)]
pub enum CardMaterial {
    Raw { number: String },
    Saved { card_hash: String, card_mask: String },
}

impl From<&SavedCardEntity> for CardMaterial {
    fn from(card: &SavedCardEntity) -> Self {
        CardMaterial::Saved {
            card_hash: card.card_hash.clone(),
            card_mask: card.card_mask.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub approved: bool,
    pub card_mask: Option<String>,
}

impl Authorization {
    fn declined() -> Self {
        Self {
            approved: false,
            card_mask: None,
        }
    }
}

/// Acquirer boundary. Swapping the implementation never touches the payment flow.
pub trait CardAuthorizer: Send + Sync {
    fn authorize(&self, material: &CardMaterial) -> Authorization;
}

pub struct FixedCardAuthorizer {
    accepted_number: String,
}

impl FixedCardAuthorizer {
    pub fn new(accepted_number: impl Into<String>) -> Self {
        Self {
            accepted_number: accepted_number.into(),
        }
    }
}

impl Default for FixedCardAuthorizer {
    fn default() -> Self {
        Self::new(ACCEPTED_CARD_NUMBER)
    }
}

impl CardAuthorizer for FixedCardAuthorizer {
    fn authorize(&self, material: &CardMaterial) -> Authorization {
        match material {
            CardMaterial::Raw { number } => {
                let number = normalize_card_number(number);
                if number != self.accepted_number {
                    return Authorization::declined();
                }
                Authorization {
                    approved: true,
                    card_mask: Some(mask_card_number(&number)),
                }
            }
            CardMaterial::Saved {
                card_hash,
                card_mask,
            } => {
                if !tokens::verify_secret(&self.accepted_number, card_hash) {
                    return Authorization::declined();
                }
                Authorization {
                    approved: true,
                    card_mask: Some(card_mask.clone()),
                }
            }
        }
    }
}

pub fn normalize_card_number(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn mask_card_number(number: &str) -> String {
    let digits: Vec<char> = number.chars().collect();
    let last_four: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    format!("**** {last_four}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approves_accepted_number_with_spaces() {
        let authorizer = FixedCardAuthorizer::default();
        let result = authorizer.authorize(&CardMaterial::Raw {
            number: "4444 4444 4444 4444".to_string(),
        });
        assert!(result.approved);
        assert_eq!(result.card_mask.as_deref(), Some("**** 4444"));
    }

    #[test]
    fn declines_any_other_number() {
        let authorizer = FixedCardAuthorizer::default();
        let result = authorizer.authorize(&CardMaterial::Raw {
            number: "4111111111111111".to_string(),
        });
        assert_eq!(result, Authorization::declined());
    }

    #[test]
    fn saved_card_is_checked_against_its_hash() {
        let authorizer = FixedCardAuthorizer::default();
        let good = CardMaterial::Saved {
            card_hash: tokens::hash_secret(ACCEPTED_CARD_NUMBER).unwrap(),
            card_mask: "**** 4444".to_string(),
        };
        let bad = CardMaterial::Saved {
            card_hash: tokens::hash_secret("4111111111111111").unwrap(),
            card_mask: "**** 1111".to_string(),
        };

        assert_eq!(
            authorizer.authorize(&good).card_mask.as_deref(),
            Some("**** 4444")
        );
        assert!(!authorizer.authorize(&bad).approved);
    }

    #[test]
    fn mask_handles_short_input() {
        assert_eq!(mask_card_number("12"), "**** 12");
    }
}
