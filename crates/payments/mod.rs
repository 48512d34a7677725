pub mod card_authorizer;
