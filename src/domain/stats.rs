//! Summary statistics for risk and importance vectors.

use serde::Serialize;

/// Point estimate plus distribution statistics.
///
/// Non-finite values (NaN, ±inf) are excluded from every statistic except the point
/// estimate; with no finite values left the statistics are NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub point: f64,
    pub mean: f64,
    pub median: f64,
    pub p5: f64,
    pub p95: f64,
    pub sd: f64,
}

impl Summary {
    pub const HEADERS: [&'static str; 6] = ["PE", "Mean", "Median", "5th", "95th", "SD"];

    pub fn new(point: f64, values: &[f64]) -> Self {
        let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Self {
                point,
                mean: f64::NAN,
                median: f64::NAN,
                p5: f64::NAN,
                p95: f64::NAN,
                sd: f64::NAN,
            };
        }
        finite.sort_by(f64::total_cmp);

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Self {
            point,
            mean,
            median: percentile(&finite, 50.0),
            p5: percentile(&finite, 5.0),
            p95: percentile(&finite, 95.0),
            sd: variance.sqrt(),
        }
    }

    /// All-zero summary recorded for events absent from every cut set.
    pub fn zero() -> Self {
        Self {
            point: 0.0,
            mean: 0.0,
            median: 0.0,
            p5: 0.0,
            p95: 0.0,
            sd: 0.0,
        }
    }

    pub fn as_row(&self) -> [f64; 6] {
        [self.point, self.mean, self.median, self.p5, self.p95, self.sd]
    }
}

/// Percentile of sorted data with linear interpolation between closest ranks.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = q / 100.0 * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Division that yields NaN instead of ±inf for a zero denominator.
pub fn guarded_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        f64::NAN
    } else {
        numerator / denominator
    }
}
