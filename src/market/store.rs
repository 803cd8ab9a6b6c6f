use crate::errors::{PricingError, PricingResult};
use crate::market::provider::QuoteProvider;
use crate::market::series::{DailyBar, PriceSeries};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Trailing history window fetched per ticker, in calendar days.
const HISTORY_WINDOW_DAYS: i64 = 365;

const CLEANED_HEADER: &str = "date,open,high,low,close,volume,daily_return";
const RAW_HEADER: &str = "date,open,high,low,close,volume";

/// Cache key for one snapshot: one ticker, one fetch day. Tickers are
/// lowercased so "SPY" and "spy" share a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub ticker: String,
    pub date: NaiveDate,
}

impl SnapshotKey {
    pub fn new(ticker: &str, date: NaiveDate) -> Self {
        Self {
            ticker: ticker.trim().to_lowercase(),
            date,
        }
    }
}

/// Keyed persistence for fetched market data. File-backed in production,
/// in-memory in tests; pricing logic never sees paths. The raw artifact is
/// write-only audit output; the cleaned artifact is the read-back cache.
pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &SnapshotKey) -> PricingResult<Option<PriceSeries>>;
    fn put(&self, key: &SnapshotKey, series: &PriceSeries) -> PricingResult<()>;
    fn put_raw(&self, key: &SnapshotKey, bars: &[DailyBar]) -> PricingResult<()>;
}

// ── Filesystem store (CSV, one file pair per ticker per day) ──

/// Writes `{ticker}_{date}_data.csv` (cleaned, with a daily_return column)
/// and `raw_{ticker}_{date}_data.csv` under the data dir. Writes go through
/// a temp file and rename, so a crash never leaves a half-written snapshot.
pub struct FsSnapshotStore {
    dir: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn cleaned_path(&self, key: &SnapshotKey) -> PathBuf {
        self.dir.join(format!("{}_{}_data.csv", key.ticker, key.date))
    }

    fn raw_path(&self, key: &SnapshotKey) -> PathBuf {
        self.dir
            .join(format!("raw_{}_{}_data.csv", key.ticker, key.date))
    }

    fn write_atomic(&self, path: &Path, contents: &str) -> PricingResult<()> {
        let corrupt = |reason: String| PricingError::DataCorrupt {
            key: path.display().to_string(),
            reason,
        };
        std::fs::create_dir_all(&self.dir).map_err(|e| corrupt(format!("create dir: {e}")))?;
        let tmp = path.with_extension("csv.tmp");
        std::fs::write(&tmp, contents).map_err(|e| corrupt(format!("write: {e}")))?;
        std::fs::rename(&tmp, path).map_err(|e| corrupt(format!("rename: {e}")))?;
        Ok(())
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn get(&self, key: &SnapshotKey) -> PricingResult<Option<PriceSeries>> {
        let path = self.cleaned_path(key);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PricingError::DataCorrupt {
                    key: path.display().to_string(),
                    reason: format!("read: {e}"),
                })
            }
        };

        let series =
            parse_cleaned_csv(&key.ticker, &contents).map_err(|reason| PricingError::DataCorrupt {
                key: path.display().to_string(),
                reason,
            })?;

        // A present-but-empty snapshot is not a cache hit; refetch.
        if series.is_empty() {
            return Ok(None);
        }
        Ok(Some(series))
    }

    fn put(&self, key: &SnapshotKey, series: &PriceSeries) -> PricingResult<()> {
        self.write_atomic(&self.cleaned_path(key), &format_cleaned_csv(series))
    }

    fn put_raw(&self, key: &SnapshotKey, bars: &[DailyBar]) -> PricingResult<()> {
        self.write_atomic(&self.raw_path(key), &format_raw_csv(bars))
    }
}

fn format_cleaned_csv(series: &PriceSeries) -> String {
    let mut out = String::from(CLEANED_HEADER);
    out.push('\n');
    for p in &series.points {
        let ret = p.daily_return.map(|r| r.to_string()).unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{},{},{},{ret}\n",
            p.date, p.open, p.high, p.low, p.close, p.volume
        ));
    }
    out
}

fn format_raw_csv(bars: &[DailyBar]) -> String {
    fn cell<T: std::fmt::Display>(v: &Option<T>) -> String {
        v.as_ref().map(|x| x.to_string()).unwrap_or_default()
    }
    let mut out = String::from(RAW_HEADER);
    out.push('\n');
    for b in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            b.date,
            cell(&b.open),
            cell(&b.high),
            cell(&b.low),
            cell(&b.close),
            cell(&b.volume)
        ));
    }
    out
}

fn parse_cleaned_csv(ticker: &str, contents: &str) -> Result<PriceSeries, String> {
    let mut lines = contents.lines();
    match lines.next() {
        Some(h) if h == CLEANED_HEADER => {}
        _ => return Err("missing or unexpected header".to_string()),
    }

    let mut points = Vec::new();
    for (i, line) in lines.enumerate() {
        if line.is_empty() {
            continue;
        }
        let lineno = i + 2;
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 7 {
            return Err(format!(
                "line {lineno}: expected 7 fields, got {}",
                fields.len()
            ));
        }
        let num = |idx: usize, name: &str| -> Result<f64, String> {
            fields[idx]
                .parse::<f64>()
                .map_err(|e| format!("line {lineno}: {name}: {e}"))
        };
        points.push(crate::market::series::PricePoint {
            date: fields[0]
                .parse::<NaiveDate>()
                .map_err(|e| format!("line {lineno}: date: {e}"))?,
            open: num(1, "open")?,
            high: num(2, "high")?,
            low: num(3, "low")?,
            close: num(4, "close")?,
            volume: fields[5]
                .parse::<u64>()
                .map_err(|e| format!("line {lineno}: volume: {e}"))?,
            daily_return: if fields[6].is_empty() {
                None
            } else {
                Some(num(6, "daily_return")?)
            },
        });
    }

    Ok(PriceSeries {
        ticker: ticker.to_string(),
        points,
    })
}

// ── In-memory store for tests ──

#[cfg(test)]
#[derive(Default)]
pub struct MemorySnapshotStore {
    cleaned: std::sync::Mutex<HashMap<SnapshotKey, PriceSeries>>,
    raw: std::sync::Mutex<HashMap<SnapshotKey, Vec<DailyBar>>>,
}

#[cfg(test)]
impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw_count(&self) -> usize {
        self.raw.lock().expect("lock").len()
    }
}

#[cfg(test)]
impl SnapshotStore for MemorySnapshotStore {
    fn get(&self, key: &SnapshotKey) -> PricingResult<Option<PriceSeries>> {
        Ok(self.cleaned.lock().expect("lock").get(key).cloned())
    }

    fn put(&self, key: &SnapshotKey, series: &PriceSeries) -> PricingResult<()> {
        self.cleaned
            .lock()
            .expect("lock")
            .insert(key.clone(), series.clone());
        Ok(())
    }

    fn put_raw(&self, key: &SnapshotKey, bars: &[DailyBar]) -> PricingResult<()> {
        self.raw
            .lock()
            .expect("lock")
            .insert(key.clone(), bars.to_vec());
        Ok(())
    }
}

// ── Market data store ──

/// Fetches and persists daily history per ticker, one provider round trip
/// per ticker per calendar day. Concurrent first fetches for the same
/// ticker are serialized behind a per-ticker async mutex, so exactly one
/// request pays for the network call.
pub struct MarketDataStore<P, S> {
    provider: P,
    snapshots: S,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<P: QuoteProvider, S: SnapshotStore> MarketDataStore<P, S> {
    pub fn new(provider: P, snapshots: S) -> Self {
        Self {
            provider,
            snapshots,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the trailing 365-day window from the provider, persist the raw
    /// and cleaned artifacts, and return the cleaned series. The ticker is
    /// normalized (lowercased) before it reaches the provider or the key.
    pub async fn fetch(&self, ticker: &str, as_of: NaiveDate) -> PricingResult<PriceSeries> {
        let key = SnapshotKey::new(ticker, as_of);
        let start = as_of - chrono::Duration::days(HISTORY_WINDOW_DAYS);
        let window = format!("{start}..{as_of}");

        let bars = self.provider.daily_history(&key.ticker, start, as_of).await?;
        if bars.is_empty() {
            return Err(PricingError::DataUnavailable {
                ticker: key.ticker,
                window,
                reason: "provider returned no rows".to_string(),
            });
        }

        self.snapshots.put_raw(&key, &bars)?;

        let series = PriceSeries::from_raw(&key.ticker, &bars);
        if series.is_empty() {
            return Err(PricingError::DataUnavailable {
                ticker: key.ticker,
                window,
                reason: format!("no usable rows after cleaning ({} raw rows)", bars.len()),
            });
        }
        self.snapshots.put(&key, &series)?;

        tracing::info!(ticker = %key.ticker, rows = series.len(), %as_of, "fetched and persisted history");
        Ok(series)
    }

    /// Cached read: returns the day's persisted snapshot if one exists,
    /// otherwise fetches and persists it. Idempotent within a calendar day.
    pub async fn get_or_fetch(&self, ticker: &str, as_of: NaiveDate) -> PricingResult<PriceSeries> {
        let key = SnapshotKey::new(ticker, as_of);
        let guard = self.ticker_lock(&key.ticker).await;
        let _held = guard.lock().await;

        if let Some(series) = self.snapshots.get(&key)? {
            tracing::debug!(ticker, %as_of, "snapshot cache hit");
            return Ok(series);
        }
        self.fetch(ticker, as_of).await
    }

    async fn ticker_lock(&self, ticker: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(ticker.to_string()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::provider::testing::{bars_ending, FakeProvider};

    fn day(s: &str) -> NaiveDate {
        s.parse().expect("date")
    }

    fn sample_provider(as_of: NaiveDate) -> FakeProvider {
        FakeProvider::new().with_symbol("spy", bars_ending(as_of, &[100.0, 101.0, 100.5, 102.0]))
    }

    #[tokio::test]
    async fn test_get_or_fetch_is_idempotent_within_day() {
        let as_of = day("2026-08-21");
        let provider = sample_provider(as_of);
        let store = MarketDataStore::new(provider.clone(), MemorySnapshotStore::new());

        let first = store.get_or_fetch("SPY", as_of).await.expect("first");
        let second = store.get_or_fetch("SPY", as_of).await.expect("second");

        assert_eq!(first, second);
        assert_eq!(provider.calls_for("spy"), 1, "second call must hit the cache");
    }

    #[tokio::test]
    async fn test_new_day_refetches() {
        let as_of = day("2026-08-21");
        let provider = sample_provider(as_of);
        let store = MarketDataStore::new(provider.clone(), MemorySnapshotStore::new());

        store.get_or_fetch("SPY", as_of).await.expect("day one");
        store
            .get_or_fetch("SPY", as_of + chrono::Duration::days(1))
            .await
            .expect("day two");

        assert_eq!(provider.calls_for("spy"), 2);
    }

    #[tokio::test]
    async fn test_fetch_persists_raw_and_cleaned() {
        let as_of = day("2026-08-21");
        let store = MarketDataStore::new(sample_provider(as_of), MemorySnapshotStore::new());

        store.fetch("SPY", as_of).await.expect("fetch");

        assert_eq!(store.snapshots.raw_count(), 1);
        let cached = store
            .snapshots
            .get(&SnapshotKey::new("SPY", as_of))
            .expect("get")
            .expect("cleaned snapshot present");
        assert_eq!(cached.last_close(), Some(102.0));
    }

    #[tokio::test]
    async fn test_unknown_ticker_is_data_unavailable() {
        let as_of = day("2026-08-21");
        let store = MarketDataStore::new(FakeProvider::new(), MemorySnapshotStore::new());

        let err = store.get_or_fetch("NOPE", as_of).await.expect_err("should fail");
        assert!(
            matches!(err, PricingError::DataUnavailable { ref ticker, .. } if ticker == "nope"),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn test_all_rows_unusable_is_data_unavailable() {
        let as_of = day("2026-08-21");
        let bars = vec![DailyBar {
            date: as_of,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
        }];
        let provider = FakeProvider::new().with_symbol("spy", bars);
        let store = MarketDataStore::new(provider, MemorySnapshotStore::new());

        let err = store.fetch("SPY", as_of).await.expect_err("should fail");
        assert!(matches!(err, PricingError::DataUnavailable { .. }), "unexpected: {err}");
    }

    #[tokio::test]
    async fn test_concurrent_first_fetch_is_single_flight() {
        let as_of = day("2026-08-21");
        let provider = sample_provider(as_of);
        let store = Arc::new(MarketDataStore::new(
            provider.clone(),
            MemorySnapshotStore::new(),
        ));

        let a = tokio::spawn({
            let store = store.clone();
            async move { store.get_or_fetch("SPY", as_of).await }
        });
        let b = tokio::spawn({
            let store = store.clone();
            async move { store.get_or_fetch("SPY", as_of).await }
        });

        a.await.expect("join").expect("a");
        b.await.expect("join").expect("b");
        assert_eq!(provider.calls_for("spy"), 1, "only one task may fetch");
    }

    // ── FsSnapshotStore ──

    fn temp_store(tag: &str) -> FsSnapshotStore {
        let dir = std::env::temp_dir().join(format!("option_pricer_{tag}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        FsSnapshotStore::new(dir)
    }

    #[test]
    fn test_fs_store_round_trip() {
        let store = temp_store("round_trip");
        let as_of = day("2026-08-21");
        let bars = bars_ending(as_of, &[100.0, 102.5]);
        let key = SnapshotKey::new("SPY", as_of);
        // fetch() hands the store series labeled with the normalized ticker
        let series = PriceSeries::from_raw(&key.ticker, &bars);

        store.put_raw(&key, &bars).expect("put_raw");
        store.put(&key, &series).expect("put");

        let loaded = store.get(&key).expect("get").expect("present");
        assert_eq!(loaded, series);
    }

    #[test]
    fn test_fs_store_missing_is_none() {
        let store = temp_store("missing");
        let key = SnapshotKey::new("SPY", day("2026-08-21"));
        assert!(store.get(&key).expect("get").is_none());
    }

    #[test]
    fn test_fs_store_corrupt_file_is_data_corrupt() {
        let store = temp_store("corrupt");
        let key = SnapshotKey::new("SPY", day("2026-08-21"));
        std::fs::create_dir_all(&store.dir).expect("dir");
        std::fs::write(
            store.cleaned_path(&key),
            format!("{CLEANED_HEADER}\n2026-08-21,not_a_number,1,1,1,1,\n"),
        )
        .expect("write");

        let err = store.get(&key).expect_err("should fail");
        assert!(matches!(err, PricingError::DataCorrupt { .. }), "unexpected: {err}");
    }

    #[test]
    fn test_fs_store_header_only_snapshot_is_none() {
        let store = temp_store("empty");
        let key = SnapshotKey::new("SPY", day("2026-08-21"));
        std::fs::create_dir_all(&store.dir).expect("dir");
        std::fs::write(store.cleaned_path(&key), format!("{CLEANED_HEADER}\n")).expect("write");

        // empty snapshot is not a hit; caller falls through to a refetch
        assert!(store.get(&key).expect("get").is_none());
    }
}
