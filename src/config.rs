use crate::errors::{PricingError, PricingResult};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub quote_base_url: String,
    pub rate_symbol: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> PricingResult<Self> {
        dotenvy::dotenv().ok();

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| PricingError::Config(format!("SERVER_PORT: {e}")))?;

        Ok(Self {
            data_dir: PathBuf::from(env_var_or("DATA_DIR", "data")),
            quote_base_url: env_var_or("QUOTE_BASE_URL", "https://query1.finance.yahoo.com"),
            rate_symbol: env_var_or("RATE_SYMBOL", "^TNX"),
            server_port,
        })
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
