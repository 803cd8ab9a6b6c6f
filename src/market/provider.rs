use crate::errors::{PricingError, PricingResult};
use crate::market::series::DailyBar;
use chrono::{NaiveDate, NaiveTime};
use reqwest::Client;

/// Bounded retry for transient provider failures.
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY_MS: u64 = 500;

/// A source of historical daily OHLCV rows. Implemented by the Yahoo
/// chart API in production and by canned fakes in tests.
pub trait QuoteProvider: Send + Sync {
    fn daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> impl std::future::Future<Output = PricingResult<Vec<DailyBar>>> + Send;
}

/// Yahoo Finance chart API client. All methods return Result, never panic.
#[derive(Clone)]
pub struct YahooFinanceProvider {
    client: Client,
    base_url: String,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .pool_max_idle_per_host(4)
                .build()
                .unwrap_or_default(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PricingResult<Vec<DailyBar>> {
        let window = format!("{start}..{end}");
        let unavailable = |reason: String| PricingError::DataUnavailable {
            ticker: symbol.to_string(),
            window: window.clone(),
            reason,
        };

        // period2 is exclusive; push it one day past `end` so the end date
        // itself is covered.
        let period1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = (end + chrono::Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();
        let encoded = symbol.replace('^', "%5E");
        let url = format!(
            "{}/v8/finance/chart/{encoded}?period1={period1}&period2={period2}&interval=1d",
            self.base_url
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(unavailable(format!("HTTP {status}: {body}")));
        }

        let data: ChartResponse = resp
            .json()
            .await
            .map_err(|e| unavailable(format!("parse: {e}")))?;

        chart_to_bars(symbol, &window, data)
    }
}

impl QuoteProvider for YahooFinanceProvider {
    async fn daily_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> PricingResult<Vec<DailyBar>> {
        let mut attempt = 1;
        loop {
            match self.fetch_chart(symbol, start, end).await {
                Ok(bars) => return Ok(bars),
                Err(e) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(symbol, attempt, error = %e, "history fetch failed, retrying");
                    tokio::time::sleep(std::time::Duration::from_millis(
                        RETRY_DELAY_MS * attempt as u64,
                    ))
                    .await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// Yahoo chart response shape (fields we do not read are omitted):
// {
//   "chart": {
//     "result": [{
//       "timestamp": [1704412800, ...],
//       "indicators": { "quote": [{ "open": [...], "high": [...],
//                                    "low": [...], "close": [...],
//                                    "volume": [...] }] }
//     }],
//     "error": null
//   }
// }

#[derive(serde::Deserialize)]
struct ChartResponse {
    chart: Option<ChartBody>,
}

#[derive(serde::Deserialize)]
struct ChartBody {
    result: Option<Vec<ChartResult>>,
}

#[derive(serde::Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(serde::Deserialize)]
struct Indicators {
    quote: Option<Vec<QuoteBlock>>,
}

#[derive(serde::Deserialize)]
struct QuoteBlock {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

fn chart_to_bars(symbol: &str, window: &str, data: ChartResponse) -> PricingResult<Vec<DailyBar>> {
    let unavailable = |reason: &str| PricingError::DataUnavailable {
        ticker: symbol.to_string(),
        window: window.to_string(),
        reason: reason.to_string(),
    };

    let result = data
        .chart
        .and_then(|c| c.result)
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
        .ok_or_else(|| unavailable("no chart result in response"))?;

    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result
        .indicators
        .and_then(|i| i.quote)
        .and_then(|mut q| if q.is_empty() { None } else { Some(q.remove(0)) })
        .ok_or_else(|| unavailable("no quote block in response"))?;

    let at = |v: &Option<Vec<Option<f64>>>, i: usize| {
        v.as_ref().and_then(|v| v.get(i).copied().flatten())
    };

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, ts) in timestamps.iter().enumerate() {
        let Some(dt) = chrono::DateTime::from_timestamp(*ts, 0) else {
            continue;
        };
        bars.push(DailyBar {
            date: dt.date_naive(),
            open: at(&quote.open, i),
            high: at(&quote.high, i),
            low: at(&quote.low, i),
            close: at(&quote.close, i),
            volume: quote.volume.as_ref().and_then(|v| v.get(i).copied().flatten()),
        });
    }
    Ok(bars)
}
