use crate::config::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub stage: Stage,
    pub backend_server: BackendServer,
    pub storage: StorageBackend,
    pub database: Database,
    pub checkout: Checkout,
    pub webhook: Webhook,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Checkout {
    pub base_url: String,
    pub currency_code: String,
    pub currency_symbol: String,
    pub invoice_ttl_minutes: i64,
    pub otp_length: usize,
    pub login_code_ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct Webhook {
    pub secret: String,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for Checkout {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            currency_code: "USD".to_string(),
            currency_symbol: "$".to_string(),
            invoice_ttl_minutes: 15,
            otp_length: 4,
            login_code_ttl_minutes: 10,
        }
    }
}
