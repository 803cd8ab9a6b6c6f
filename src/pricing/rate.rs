use crate::errors::{PricingError, PricingResult};
use crate::market::provider::QuoteProvider;
use chrono::NaiveDate;

/// Reference instrument for the risk-free rate: the CBOE 10-year treasury
/// yield index, quoted in percentage points.
pub const RATE_SYMBOL: &str = "^TNX";

/// Supplies the annualized risk-free rate from the reference instrument's
/// latest close in the [as_of - 1 day, as_of] window.
pub struct RateProvider<P> {
    provider: P,
    symbol: String,
}

impl<P: QuoteProvider> RateProvider<P> {
    pub fn new(provider: P) -> Self {
        Self::with_symbol(provider, RATE_SYMBOL)
    }

    pub fn with_symbol(provider: P, symbol: &str) -> Self {
        Self {
            provider,
            symbol: symbol.to_string(),
        }
    }

    /// Latest close of the yield index over yesterday-through-today,
    /// converted from percentage points to a decimal rate.
    pub async fn risk_free_rate(&self, as_of: NaiveDate) -> PricingResult<f64> {
        let start = as_of - chrono::Duration::days(1);
        let window = format!("{start}..{as_of}");

        let bars = self
            .provider
            .daily_history(&self.symbol, start, as_of)
            .await
            .map_err(|e| PricingError::RateUnavailable {
                symbol: self.symbol.clone(),
                window: window.clone(),
                reason: e.to_string(),
            })?;

        let latest = bars
            .iter()
            .filter_map(|b| b.close.map(|c| (b.date, c)))
            .max_by_key(|&(date, _)| date);

        match latest {
            Some((date, close)) => {
                let rate = close / 100.0;
                tracing::debug!(symbol = %self.symbol, %date, rate, "risk-free rate resolved");
                Ok(rate)
            }
            None => Err(PricingError::RateUnavailable {
                symbol: self.symbol.clone(),
                window,
                reason: "no quote in window".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::provider::testing::{bars_ending, FakeProvider};

    fn day(s: &str) -> NaiveDate {
        s.parse().expect("date")
    }

    #[tokio::test]
    async fn test_rate_is_latest_close_over_100() {
        let as_of = day("2026-08-21");
        let provider = FakeProvider::new().with_symbol(RATE_SYMBOL, bars_ending(as_of, &[4.1, 4.3]));
        let rates = RateProvider::new(provider);

        let r = rates.risk_free_rate(as_of).await.expect("rate");
        assert!((r - 0.043).abs() < 1e-12, "r={r}");
    }

    #[tokio::test]
    async fn test_provider_failure_maps_to_rate_unavailable() {
        let rates = RateProvider::new(FakeProvider::new());
        let err = rates
            .risk_free_rate(day("2026-08-21"))
            .await
            .expect_err("should fail");
        assert!(
            matches!(err, PricingError::RateUnavailable { ref symbol, .. } if symbol == RATE_SYMBOL),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn test_no_close_in_window_is_rate_unavailable() {
        let as_of = day("2026-08-21");
        let bars = vec![crate::market::series::DailyBar {
            date: as_of,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
        }];
        let provider = FakeProvider::new().with_symbol(RATE_SYMBOL, bars);
        let rates = RateProvider::new(provider);

        let err = rates.risk_free_rate(as_of).await.expect_err("should fail");
        assert!(matches!(err, PricingError::RateUnavailable { .. }), "unexpected: {err}");
    }
}
