use crate::errors::{PricingError, PricingResult};
use crate::market::series::PriceSeries;

/// Trading days per year used to annualize daily volatility. Fixed by
/// convention, not configurable.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Minimum valid return observations for a sample standard deviation.
const MIN_OBSERVATIONS: usize = 2;

/// Annualized realized volatility: the sample standard deviation (ddof = 1,
/// the standard financial convention) of daily simple returns, scaled by
/// sqrt(252).
pub fn annualized_volatility(series: &PriceSeries) -> PricingResult<f64> {
    let returns: Vec<f64> = series.returns().collect();
    if returns.len() < MIN_OBSERVATIONS {
        return Err(PricingError::InsufficientData {
            ticker: series.ticker.clone(),
            observed: returns.len(),
            required: MIN_OBSERVATIONS,
        });
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let var = returns
        .iter()
        .map(|r| {
            let d = r - mean;
            d * d
        })
        .sum::<f64>()
        / (n - 1.0);

    Ok(var.sqrt() * TRADING_DAYS_PER_YEAR.sqrt())
}
