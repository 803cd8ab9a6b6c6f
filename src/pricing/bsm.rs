use crate::errors::{PricingError, PricingResult};
use crate::pricing::inputs::PricingParameters;
use crate::pricing::OptionType;
use statrs::distribution::{ContinuousCDF, Normal};

/// Black-Scholes-Merton closed-form pricing for European options.
///
/// d1 = (ln(S/K) + (r + sigma^2/2) T) / (sigma sqrt(T))
/// d2 = d1 - sigma sqrt(T)
/// call = S N(d1) - K e^(-rT) N(d2)
/// put  = call - S + K e^(-rT)        (put-call parity)
///
/// Model assumptions, fixed: European exercise only, no dividends, no
/// transaction costs, log-normal returns.
///
/// Pure function of its inputs: no I/O, no state, deterministic.
pub struct BsmEngine {
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BsmEngine {
    pub fn new() -> Self {
        // Normal::new(0, 1) only fails if std_dev <= 0; this is safe.
        Self {
            normal: Normal::new(0.0, 1.0).unwrap_or(Normal::standard()),
        }
    }

    /// Price one option from validated parameters. S, K, T and sigma must
    /// each be finite and strictly positive; T <= 0 or sigma <= 0 is an
    /// error, never a degenerate price.
    pub fn price(&self, params: &PricingParameters, option_type: OptionType) -> PricingResult<f64> {
        validate(params)?;

        let call = self.call_price(params);
        match option_type {
            OptionType::Call => Ok(call),
            OptionType::Put => {
                let discounted_strike =
                    params.strike * (-params.rate * params.time_to_expiry).exp();
                Ok(call - params.spot + discounted_strike)
            }
        }
    }

    fn call_price(&self, p: &PricingParameters) -> f64 {
        let sqrt_t = p.time_to_expiry.sqrt();
        let d1 = ((p.spot / p.strike).ln() + (p.rate + 0.5 * p.sigma * p.sigma) * p.time_to_expiry)
            / (p.sigma * sqrt_t);
        let d2 = d1 - p.sigma * sqrt_t;
        let discounted_strike = p.strike * (-p.rate * p.time_to_expiry).exp();

        p.spot * self.normal.cdf(d1) - discounted_strike * self.normal.cdf(d2)
    }
}

impl Default for BsmEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(p: &PricingParameters) -> PricingResult<()> {
    check_positive("spot", p.spot)?;
    check_positive("strike", p.strike)?;
    check_positive("time_to_expiry", p.time_to_expiry)?;
    check_positive("sigma", p.sigma)?;
    if !p.rate.is_finite() {
        return Err(PricingError::InvalidParameters {
            field: "rate",
            reason: format!("must be finite, got {}", p.rate),
        });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> PricingResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PricingError::InvalidParameters {
            field,
            reason: format!("must be finite and > 0, got {value}"),
        });
    }
    Ok(())
}
