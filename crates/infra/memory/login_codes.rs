use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::domain::repositories::login_codes::{LoginCodeEntry, LoginCodeRepository};

/// Keyed login-code store owned by whoever constructs it. Expiry is carried on each
/// entry and enforced by the reader. Every write sweeps out entries that have
/// already expired, so codes that are never verified do not accumulate.
#[derive(Default)]
pub struct LoginCodeMemory {
    codes: Mutex<HashMap<String, LoginCodeEntry>>,
}

impl LoginCodeMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoginCodeRepository for LoginCodeMemory {
    async fn put_code(&self, email: &str, entry: LoginCodeEntry) -> Result<()> {
        let now = Utc::now();
        let mut codes = self.codes.lock().await;
        codes.retain(|_, held| held.expires_at >= now);
        codes.insert(email.to_string(), entry);
        Ok(())
    }

    async fn find_code(&self, email: &str) -> Result<Option<LoginCodeEntry>> {
        Ok(self.codes.lock().await.get(email).cloned())
    }

    async fn evict_code(&self, email: &str) -> Result<()> {
        self.codes.lock().await.remove(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn entry(code: &str, expires_in: Duration) -> LoginCodeEntry {
        LoginCodeEntry {
            code: code.to_string(),
            expires_at: Utc::now() + expires_in,
        }
    }

    #[tokio::test]
    async fn write_sweeps_expired_codes() {
        let store = LoginCodeMemory::new();
        for i in 0..1_000 {
            let email = format!("abandoned-{i}@example.com");
            store
                .put_code(&email, entry("1234", Duration::minutes(-1)))
                .await
                .unwrap();
        }

        store
            .put_code("payer@example.com", entry("5678", Duration::minutes(5)))
            .await
            .unwrap();

        assert_eq!(store.codes.lock().await.len(), 1);
        let live = store.find_code("payer@example.com").await.unwrap();
        assert_eq!(live.map(|held| held.code), Some("5678".to_string()));
        assert!(store.find_code("abandoned-0@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_keeps_live_codes_for_other_emails() {
        let store = LoginCodeMemory::new();
        store
            .put_code("first@example.com", entry("1111", Duration::minutes(5)))
            .await
            .unwrap();
        store
            .put_code("second@example.com", entry("2222", Duration::minutes(5)))
            .await
            .unwrap();

        assert!(store.find_code("first@example.com").await.unwrap().is_some());
        assert_eq!(store.codes.lock().await.len(), 2);
    }
}
