use crate::errors::{PricingError, PricingResult};
use crate::market::provider::QuoteProvider;
use crate::market::store::{MarketDataStore, SnapshotStore};
use crate::pricing::bsm::BsmEngine;
use crate::pricing::inputs::PricingParameters;
use crate::pricing::rate::RateProvider;
use crate::pricing::OptionType;
use chrono::NaiveDate;

/// Expiry format accepted at the boundary: month-day-year.
const EXPIRY_FORMAT: &str = "%m-%d-%Y";

/// An immutable European option contract. Prices are computed on demand,
/// never cached on the contract; market data can change between calls.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OptionContract {
    pub ticker: String,
    pub option_type: OptionType,
    pub strike: f64,
    pub expiry: NaiveDate,
}

/// Snapshot of one pricing call: the contract, the exact parameters the
/// engine saw, and the resulting price.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OptionPricingResult {
    pub contract: OptionContract,
    pub parameters: PricingParameters,
    pub price: f64,
}

/// Single entry point for "price this option". Orchestrates the data
/// store, volatility estimator, rate provider and engine in sequence; any
/// component failure short-circuits with that component's error unchanged.
pub struct PricingFacade<P, S> {
    store: MarketDataStore<P, S>,
    rates: RateProvider<P>,
    engine: BsmEngine,
}

impl<P: QuoteProvider + Clone, S: SnapshotStore> PricingFacade<P, S> {
    pub fn new(provider: P, snapshots: S) -> Self {
        let rates = RateProvider::new(provider.clone());
        Self::with_rates(provider, snapshots, rates)
    }

    pub fn with_rate_symbol(provider: P, snapshots: S, rate_symbol: &str) -> Self {
        let rates = RateProvider::with_symbol(provider.clone(), rate_symbol);
        Self::with_rates(provider, snapshots, rates)
    }

    fn with_rates(provider: P, snapshots: S, rates: RateProvider<P>) -> Self {
        Self {
            store: MarketDataStore::new(provider, snapshots),
            rates,
            engine: BsmEngine::new(),
        }
    }

    pub fn store(&self) -> &MarketDataStore<P, S> {
        &self.store
    }

    /// Price one European option as of `as_of`. Each call works from a
    /// fresh snapshot of the day's market data; nothing is memoized on the
    /// contract between calls.
    pub async fn price_option(
        &self,
        ticker: &str,
        strike: f64,
        expiry_date: &str,
        option_type: OptionType,
        as_of: NaiveDate,
    ) -> PricingResult<OptionPricingResult> {
        if ticker.trim().is_empty() {
            return Err(PricingError::InvalidParameters {
                field: "ticker",
                reason: "must be non-empty".to_string(),
            });
        }
        let expiry = NaiveDate::parse_from_str(expiry_date, EXPIRY_FORMAT).map_err(|e| {
            PricingError::InvalidParameters {
                field: "expiry_date",
                reason: format!("expected {EXPIRY_FORMAT} (e.g. 12-18-2026): {e}"),
            }
        })?;

        let series = self.store.get_or_fetch(ticker, as_of).await?;
        let rate = self.rates.risk_free_rate(as_of).await?;
        let parameters = PricingParameters::assemble(&series, strike, expiry, as_of, rate)?;
        let price = self.engine.price(&parameters, option_type)?;

        tracing::info!(ticker, strike, %expiry, ?option_type, price, "option priced");

        Ok(OptionPricingResult {
            contract: OptionContract {
                ticker: ticker.to_string(),
                option_type,
                strike,
                expiry,
            },
            parameters,
            price,
        })
    }
}
