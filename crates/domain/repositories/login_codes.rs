use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCodeEntry {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[automock]
#[async_trait]
pub trait LoginCodeRepository {
    /// Replaces any outstanding code for the email.
    async fn put_code(&self, email: &str, entry: LoginCodeEntry) -> Result<()>;

    async fn find_code(&self, email: &str) -> Result<Option<LoginCodeEntry>>;

    async fn evict_code(&self, email: &str) -> Result<()>;
}
