// ── Chart series ──

use chrono::{DateTime, Utc};
use serde::Serialize;

use tradewatch_api::models::PnlSeries;

/// One `(timestamp, value)` chart sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Zip parallel date/value arrays into chart points.
///
/// Samples with a null timestamp are skipped. A null or missing value
/// becomes `0.0`.
pub fn time_series_points(dates: &[Option<DateTime<Utc>>], values: &[Option<f64>]) -> Vec<ChartPoint> {
    dates
        .iter()
        .enumerate()
        .filter_map(|(i, date)| {
            let time = (*date)?;
            let value = values.get(i).copied().flatten().unwrap_or(0.0);
            Some(ChartPoint { time, value })
        })
        .collect()
}

/// Chart points for a PnL series response.
pub fn pnl_points(series: &PnlSeries) -> Vec<ChartPoint> {
    time_series_points(&series.dates, &series.values)
}

/// Running total of `points`, for cumulative PnL charts.
pub fn cumulative_points(points: &[ChartPoint]) -> Vec<ChartPoint> {
    points
        .iter()
        .scan(0.0, |total, p| {
            *total += p.value;
            Some(ChartPoint {
                time: p.time,
                value: *total,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, d, 0, 0, 0).single().unwrap_or_default()
    }

    #[test]
    fn null_dates_are_skipped() {
        let points = time_series_points(
            &[Some(day(1)), None, Some(day(3))],
            &[Some(1.0), Some(2.0), Some(3.0)],
        );
        assert_eq!(
            points,
            vec![
                ChartPoint { time: day(1), value: 1.0 },
                ChartPoint { time: day(3), value: 3.0 },
            ]
        );
    }

    #[test]
    fn missing_values_default_to_zero() {
        let points = time_series_points(&[Some(day(1)), Some(day(2)), Some(day(3))], &[None, Some(5.0)]);
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![0.0, 5.0, 0.0]);
    }

    #[test]
    fn cumulative_sums_in_order() {
        let points = time_series_points(
            &[Some(day(1)), Some(day(2)), Some(day(3))],
            &[Some(1.0), Some(-3.0), Some(4.5)],
        );
        let values: Vec<f64> = cumulative_points(&points).iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, -2.0, 2.5]);
    }
}
