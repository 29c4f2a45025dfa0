// =============================================================================
// SAMPLE DATA PROVIDER
// =============================================================================
// Synthetic revenue series shown when there are too few real orders to draw a
// meaningful chart. Purely decorative: the numbers mean nothing.
//
// value(i) = max(0, BASE + TREND * sin(i * PI / 3) + VOLATILITY * u)
// with u drawn uniformly from [-1, 1].
// =============================================================================

use std::f64::consts::PI;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::dashboard::weekday_labels;
use crate::models::ChartPoint;

const BASE: f64 = 25_000.0;
const VOLATILITY: f64 = 8_000.0;
const TREND: f64 = 6_000.0;

pub trait SampleDataProvider: Send + Sync + 'static {
    /// Seven points labelled with the seven days ending at `today`
    fn series(&self, today: NaiveDate) -> Vec<ChartPoint>;
}

fn generate<R: Rng>(rng: &mut R, today: NaiveDate) -> Vec<ChartPoint> {
    weekday_labels(today)
        .into_iter()
        .enumerate()
        .map(|(i, label)| {
            let trend = TREND * (i as f64 * PI / 3.0).sin();
            let noise = VOLATILITY * rng.gen_range(-1.0..=1.0);
            ChartPoint::new(label, (BASE + trend + noise).max(0.0).round())
        })
        .collect()
}

/// Fresh randomness on every call; each render may differ
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSampleData;

impl SampleDataProvider for RandomSampleData {
    fn series(&self, today: NaiveDate) -> Vec<ChartPoint> {
        generate(&mut rand::thread_rng(), today)
    }
}

/// Same seed, same series
#[derive(Debug, Clone, Copy)]
pub struct SeededSampleData {
    pub seed: u64,
}

impl SampleDataProvider for SeededSampleData {
    fn series(&self, today: NaiveDate) -> Vec<ChartPoint> {
        generate(&mut StdRng::seed_from_u64(self.seed), today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn test_seeded_series_is_reproducible() {
        let provider = SeededSampleData { seed: 7 };
        assert_eq!(provider.series(today()), provider.series(today()));
    }

    #[test]
    fn test_series_has_seven_labelled_non_negative_points() {
        let series = RandomSampleData.series(today());
        assert_eq!(series.len(), 7);
        // 2026-10-16 is a Friday
        assert_eq!(series.last().unwrap().label, "Fri");
        assert_eq!(series.first().unwrap().label, "Sat");
        for point in &series {
            assert!(point.value >= 0.0);
            assert!(point.value <= BASE + TREND + VOLATILITY);
        }
    }
}
