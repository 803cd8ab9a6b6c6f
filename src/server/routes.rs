use crate::errors::PricingError;
use crate::market::provider::YahooFinanceProvider;
use crate::market::store::FsSnapshotStore;
use crate::pricing::facade::PricingFacade;
use crate::pricing::OptionType;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use std::sync::Arc;

pub type SharedFacade = Arc<PricingFacade<YahooFinanceProvider, FsSnapshotStore>>;

type ApiError = (StatusCode, Json<serde_json::Value>);

#[derive(serde::Deserialize)]
pub struct TickerQuery {
    pub ticker: String,
}

#[derive(serde::Deserialize)]
pub struct OptionPriceQuery {
    pub ticker: String,
    pub expiry_date: String,
    pub strike_price: f64,
    pub option_type: Option<String>,
}

/// GET /market-data/save -- fetch and persist the trailing year for a ticker
pub async fn save_market_data(
    State(facade): State<SharedFacade>,
    Query(q): Query<TickerQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let as_of = chrono::Utc::now().date_naive();
    let series = facade
        .store()
        .get_or_fetch(&q.ticker, as_of)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::json!({
        "ticker": series.ticker,
        "as_of": as_of,
        "rows": series.len(),
    })))
}

/// GET /market-data -- the day's cleaned series for a ticker (fetches if needed)
pub async fn show_market_data(
    State(facade): State<SharedFacade>,
    Query(q): Query<TickerQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let as_of = chrono::Utc::now().date_naive();
    let series = facade
        .store()
        .get_or_fetch(&q.ticker, as_of)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::json!({
        "ticker": series.ticker,
        "as_of": as_of,
        "points": series.points,
    })))
}

/// GET /option-price -- price a European option off fresh market data
pub async fn option_price(
    State(facade): State<SharedFacade>,
    Query(q): Query<OptionPriceQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let option_type = match q.option_type.as_deref() {
        Some(s) => s.parse::<OptionType>().map_err(error_response)?,
        None => OptionType::Call,
    };
    let as_of = chrono::Utc::now().date_naive();

    let result = facade
        .price_option(&q.ticker, q.strike_price, &q.expiry_date, option_type, as_of)
        .await
        .map_err(error_response)?;
    Ok(Json(serde_json::json!(result)))
}

fn error_response(e: PricingError) -> ApiError {
    let status = match &e {
        PricingError::InvalidParameters { .. } => StatusCode::BAD_REQUEST,
        PricingError::InsufficientData { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PricingError::DataUnavailable { .. } | PricingError::RateUnavailable { .. } => {
            StatusCode::BAD_GATEWAY
        }
        PricingError::DataCorrupt { .. } | PricingError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(serde_json::json!({ "error": e.to_string() })))
}
