pub mod bsm;
pub mod facade;
pub mod inputs;
pub mod rate;
pub mod volatility;

use crate::errors::PricingError;

/// European option side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl std::str::FromStr for OptionType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(Self::Call),
            "put" => Ok(Self::Put),
            other => Err(PricingError::InvalidParameters {
                field: "option_type",
                reason: format!("expected 'call' or 'put', got '{other}'"),
            }),
        }
    }
}
