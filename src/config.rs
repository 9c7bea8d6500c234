use std::{env, path::PathBuf};

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub payment_success_rate: f64,
    pub refund_success_rate: f64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8000);
        let access_token_expire_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .ok()
            .and_then(|m| m.parse::<i64>().ok())
            .filter(|m| *m > 0)
            .unwrap_or(30);
        let payment_success_rate = rate_from_env("PAYMENT_SUCCESS_RATE", 0.95);
        let refund_success_rate = rate_from_env("REFUND_SUCCESS_RATE", 0.98);

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            host,
            port,
            jwt_secret,
            access_token_expire_minutes,
            payment_success_rate,
            refund_success_rate,
        })
    }

    /// Config for tests and tools that manage their own data directory.
    pub fn for_data_dir(data_dir: impl Into<PathBuf>, jwt_secret: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            jwt_secret: jwt_secret.into(),
            access_token_expire_minutes: 30,
            payment_success_rate: 0.95,
            refund_success_rate: 0.98,
        }
    }
}

fn rate_from_env(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|r| r.parse::<f64>().ok())
        .filter(|r| (0.0..=1.0).contains(r))
        .unwrap_or(default)
}
