use serde::{Serialize, Deserialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Which interval `SummaryStat::interval` reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    /// t-based confidence interval for the mean.
    Confidence,
    /// Percentile interval of the observations themselves.
    Prediction,
}

/// Summary statistics of a batch of observations.
///
/// Statistics of an empty batch are `NaN`; variance needs at least two
/// observations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStat {
    pub name: String,
    data: Vec<f64>,
    sorted: Vec<f64>,
    total: f64,
    mean: f64,
    variance: f64,
}

impl SummaryStat {
    pub fn new<S: Into<String>>(name: S, data: Vec<f64>) -> Self {
        let n = data.len();
        let total: f64 = data.iter().sum();
        let mean = if n > 0 { total / n as f64 } else { std::f64::NAN };
        let variance = if n > 1 {
            data.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (n - 1) as f64
        }
        else {
            std::f64::NAN
        };

        let mut sorted = data.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        Self { name: name.into(), data, sorted, total, mean, variance }
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (n - 1 denominator).
    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn stdev(&self) -> f64 {
        self.variance.sqrt()
    }

    pub fn standard_error(&self) -> f64 {
        self.stdev() / (self.count() as f64).sqrt()
    }

    pub fn min(&self) -> f64 {
        self.sorted.first().copied().unwrap_or(std::f64::NAN)
    }

    pub fn max(&self) -> f64 {
        self.sorted.last().copied().unwrap_or(std::f64::NAN)
    }

    /// Percentile `q` in [0, 100], linearly interpolated between order statistics.
    pub fn percentile(&self, q: f64) -> f64 {
        let n = self.sorted.len();
        if n == 0 {
            return std::f64::NAN;
        }
        let position = (q / 100.0).max(0.0).min(1.0) * (n - 1) as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let weight = position - lower as f64;
        self.sorted[lower] * (1.0 - weight) + self.sorted[upper] * weight
    }

    /// Two-sided `1 - alpha` confidence interval for the mean.
    pub fn confidence_interval(&self, alpha: f64) -> (f64, f64) {
        let n = self.count();
        if n < 2 {
            return (std::f64::NAN, std::f64::NAN);
        }
        let half_length = match StudentsT::new(0.0, 1.0, (n - 1) as f64) {
            Ok(t) => t.inverse_cdf(1.0 - alpha / 2.0) * self.standard_error(),
            Err(_) => std::f64::NAN,
        };
        (self.mean - half_length, self.mean + half_length)
    }

    /// Interval containing the central `1 - alpha` of the observations.
    pub fn prediction_interval(&self, alpha: f64) -> (f64, f64) {
        (self.percentile(100.0 * alpha / 2.0), self.percentile(100.0 * (1.0 - alpha / 2.0)))
    }

    pub fn interval(&self, kind: IntervalKind, alpha: f64) -> (f64, f64) {
        match kind {
            IntervalKind::Confidence => self.confidence_interval(alpha),
            IntervalKind::Prediction => self.prediction_interval(alpha),
        }
    }

    /// e.g. `"8.61 (8.52, 8.70)"`.
    pub fn formatted_mean_and_interval(&self, kind: IntervalKind, alpha: f64, decimals: usize) -> String {
        let (lower, upper) = self.interval(kind, alpha);
        format!(
            "{:.*} ({:.*}, {:.*})",
            decimals, self.mean, decimals, lower, decimals, upper
        )
    }
}
