use chrono::NaiveDate;

/// One OHLCV row as returned by the quote provider. Any field may be
/// missing (exchange holidays, partial rows); cleaning drops such rows.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
}

/// One cleaned observation. `daily_return` is the simple return against
/// the prior close; absent for the first row of a series.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub daily_return: Option<f64>,
}

/// Cleaned daily history for one ticker. Dates are strictly increasing
/// with no duplicates; an immutable snapshot once built.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceSeries {
    pub ticker: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a cleaned series from raw provider rows: drop rows with any
    /// missing field, sort ascending by date, drop duplicate dates (first
    /// occurrence wins), then derive simple daily returns.
    pub fn from_raw(ticker: &str, bars: &[DailyBar]) -> Self {
        let mut rows: Vec<(NaiveDate, f64, f64, f64, f64, u64)> = bars
            .iter()
            .filter_map(|b| Some((b.date, b.open?, b.high?, b.low?, b.close?, b.volume?)))
            .collect();
        rows.sort_by_key(|r| r.0);
        rows.dedup_by_key(|r| r.0);

        let mut points = Vec::with_capacity(rows.len());
        let mut prev_close: Option<f64> = None;
        for (date, open, high, low, close, volume) in rows {
            let daily_return = prev_close.map(|p| (close - p) / p);
            points.push(PricePoint {
                date,
                open,
                high,
                low,
                close,
                volume,
                daily_return,
            });
            prev_close = Some(close);
        }

        Self {
            ticker: ticker.to_string(),
            points,
        }
    }

    /// Latest close, the spot price of the underlying.
    pub fn last_close(&self) -> Option<f64> {
        self.points.last().map(|p| p.close)
    }

    /// Valid daily return observations, in date order.
    pub fn returns(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().filter_map(|p| p.daily_return)
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: Option<f64>) -> DailyBar {
        DailyBar {
            date: date.parse().expect("date"),
            open: close,
            high: close,
            low: close,
            close,
            volume: close.map(|_| 1_000),
        }
    }

    #[test]
    fn test_clean_sorts_and_derives_returns() {
        let bars = vec![
            bar("2026-01-06", Some(102.0)),
            bar("2026-01-05", Some(100.0)),
            bar("2026-01-07", Some(99.96)),
        ];
        let series = PriceSeries::from_raw("TEST", &bars);

        assert_eq!(series.len(), 3);
        assert!(series.points.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(series.points[0].daily_return, None);
        let r1 = series.points[1].daily_return.expect("return");
        assert!((r1 - 0.02).abs() < 1e-12, "r1={r1}");
        let r2 = series.points[2].daily_return.expect("return");
        assert!((r2 - (99.96 - 102.0) / 102.0).abs() < 1e-12, "r2={r2}");
    }

    #[test]
    fn test_clean_drops_missing_and_duplicate_rows() {
        let bars = vec![
            bar("2026-01-05", Some(100.0)),
            bar("2026-01-06", None),
            bar("2026-01-07", Some(101.0)),
            bar("2026-01-07", Some(999.0)),
        ];
        let series = PriceSeries::from_raw("TEST", &bars);

        assert_eq!(series.len(), 2);
        assert_eq!(series.last_close(), Some(101.0));
        // return spans the gap left by the dropped row
        let r = series.points[1].daily_return.expect("return");
        assert!((r - 0.01).abs() < 1e-12, "r={r}");
    }

    #[test]
    fn test_empty_input_gives_empty_series() {
        let series = PriceSeries::from_raw("TEST", &[]);
        assert!(series.is_empty());
        assert_eq!(series.last_close(), None);
        assert_eq!(series.returns().count(), 0);
    }
}
