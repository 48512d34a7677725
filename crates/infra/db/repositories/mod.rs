pub mod payments;
pub mod saved_cards;
pub mod successful_operations;
