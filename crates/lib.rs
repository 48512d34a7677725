pub mod domain;
pub mod infra;
pub mod notifications;
pub mod observability;
pub mod payments;
pub mod security;
pub mod webhooks;
