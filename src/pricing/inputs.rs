use crate::errors::{PricingError, PricingResult};
use crate::market::series::PriceSeries;
use crate::pricing::volatility::annualized_volatility;
use chrono::NaiveDate;

/// Calendar-day denominator for time to expiry.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// The five BSM inputs, assembled upstream of the engine. Validation of
/// the domain bounds (S, K, T, sigma > 0) happens in the engine so that
/// the resolved values remain visible in error reports.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PricingParameters {
    /// S: spot price of the underlying (latest cleaned close).
    pub spot: f64,
    /// K: strike price.
    pub strike: f64,
    /// r: annualized risk-free rate, decimal.
    pub rate: f64,
    /// T: years to expiry.
    pub time_to_expiry: f64,
    /// sigma: annualized volatility.
    pub sigma: f64,
}

impl PricingParameters {
    /// Assemble the parameter set from a cleaned series and the pricing
    /// request. `as_of` is the request timestamp, not the series' last
    /// date. T is deliberately NOT clamped: an expiry at or before `as_of`
    /// yields T <= 0, which the engine rejects rather than pricing it.
    pub fn assemble(
        series: &PriceSeries,
        strike: f64,
        expiry: NaiveDate,
        as_of: NaiveDate,
        rate: f64,
    ) -> PricingResult<Self> {
        let sigma = annualized_volatility(series)?;
        let spot = series
            .last_close()
            .ok_or_else(|| PricingError::InsufficientData {
                ticker: series.ticker.clone(),
                observed: 0,
                required: 1,
            })?;
        let time_to_expiry = (expiry - as_of).num_days() as f64 / DAYS_PER_YEAR;

        Ok(Self {
            spot,
            strike,
            rate,
            time_to_expiry,
            sigma,
        })
    }
}
