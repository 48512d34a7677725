use std::str::FromStr;

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::config::{
    config_model::{
        BackendServer, Checkout, Database, DotEnvyConfig, StorageBackend, Webhook,
    },
    stage::Stage,
};

const DEVELOPMENT_WEBHOOK_SECRET: &str = "default_secret_key_change_in_production";

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let stage = get_stage();

    let backend_server = BackendServer {
        port: env_parse("SERVER_PORT_BACKEND", 8000)?,
        body_limit: env_parse("SERVER_BODY_LIMIT", 1)?,
        timeout: env_parse("SERVER_TIMEOUT", 30)?,
    };

    let storage = match env_string("STORAGE_BACKEND").as_deref() {
        None | Some("postgres") => StorageBackend::Postgres,
        Some("memory") => StorageBackend::Memory,
        Some(other) => bail!("STORAGE_BACKEND is invalid: {other}"),
    };

    let database = Database {
        url: env_string("DATABASE_URL"),
    };
    if storage == StorageBackend::Postgres && database.url.is_none() {
        bail!("DATABASE_URL is required when STORAGE_BACKEND is postgres");
    }

    let defaults = Checkout::default();
    let checkout = Checkout {
        base_url: env_string("BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url),
        currency_code: env_string("CURRENCY_CODE").unwrap_or(defaults.currency_code),
        currency_symbol: env_string("CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),
        invoice_ttl_minutes: env_parse("INVOICE_TTL_MINUTES", defaults.invoice_ttl_minutes)?,
        otp_length: env_parse("OTP_LENGTH", defaults.otp_length)?,
        login_code_ttl_minutes: env_parse(
            "LOGIN_CODE_TTL_MINUTES",
            defaults.login_code_ttl_minutes,
        )?,
    };

    let secret = match env_string("WEBHOOK_SECRET") {
        Some(secret) => secret,
        None if stage == Stage::Production => {
            bail!("WEBHOOK_SECRET is required in production")
        }
        None => {
            warn!("WEBHOOK_SECRET is not set; using the development secret");
            DEVELOPMENT_WEBHOOK_SECRET.to_string()
        }
    };

    let webhook = Webhook {
        secret,
        max_attempts: env_parse("WEBHOOK_MAX_ATTEMPTS", 3)?,
        base_delay_ms: env_parse("WEBHOOK_BASE_DELAY_MS", 1000)?,
        timeout_secs: env_parse("WEBHOOK_TIMEOUT_SECS", 10)?,
    };

    Ok(DotEnvyConfig {
        stage,
        backend_server,
        storage,
        database,
        checkout,
        webhook,
    })
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or("".to_string());
    Stage::try_from(&stage_str).unwrap_or_default()
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_string(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_parsing_is_case_insensitive() {
        assert_eq!(
            Stage::try_from(&"Production".to_string()).unwrap(),
            Stage::Production
        );
        assert!(Stage::try_from(&"staging".to_string()).is_err());
    }

    #[test]
    fn env_parse_falls_back_and_rejects_garbage() {
        unsafe {
            std::env::remove_var("PAYMENT_TEST_UNSET_NUMBER");
            std::env::set_var("PAYMENT_TEST_BAD_NUMBER", "ten");
            std::env::set_var("PAYMENT_TEST_GOOD_NUMBER", " 42 ");
        }

        assert_eq!(env_parse::<u32>("PAYMENT_TEST_UNSET_NUMBER", 7).unwrap(), 7);
        assert!(env_parse::<u32>("PAYMENT_TEST_BAD_NUMBER", 7).is_err());
        assert_eq!(env_parse::<u32>("PAYMENT_TEST_GOOD_NUMBER", 7).unwrap(), 42);
    }
}
