use log::warn;
use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::{Beta, Gamma};
use serde::Serialize;

use crate::errors::*;

/// When the requested variance is impossible for a Beta with the given
/// mean, the fit uses this fraction of the largest possible variance.
pub const BETA_VARIANCE_CAP: f64 = 0.5;

/// A distribution fitted to a mean and standard deviation.
#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub enum Fitted {
    /// Zero mean, zero spread, or a mean on the boundary of the support.
    Constant(f64),
    Gamma { shape: f64, scale: f64 },
    Beta { alpha: f64, beta: f64 },
}

impl Fitted {
    /// Builds the distribution to draw from.
    pub fn sampler(&self) -> Result<FittedSampler> {
        match *self {
            Fitted::Constant(value) => Ok(FittedSampler::Constant(value)),
            Fitted::Gamma { shape, scale } => Gamma::new(shape, scale)
                .map(FittedSampler::Gamma)
                .map_err(|e| Error::Distribution(format!("Gamma({}, {}): {:?}", shape, scale, e))),
            Fitted::Beta { alpha, beta } => Beta::new(alpha, beta)
                .map(FittedSampler::Beta)
                .map_err(|e| Error::Distribution(format!("Beta({}, {}): {:?}", alpha, beta, e))),
        }
    }
}

/// A constructed [`Fitted`] distribution.
#[derive(Debug, Copy, Clone)]
pub enum FittedSampler {
    Constant(f64),
    Gamma(Gamma<f64>),
    Beta(Beta<f64>),
}

impl Distribution<f64> for FittedSampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            FittedSampler::Constant(value) => *value,
            FittedSampler::Gamma(gamma) => gamma.sample(rng),
            FittedSampler::Beta(beta) => beta.sample(rng),
        }
    }
}

/// Method-of-moments Gamma for a non-negative quantity.
pub fn fit_gamma(mean: f64, stdev: f64) -> Result<Fitted> {
    check_moments(mean, stdev)?;
    if mean == 0.0 || stdev == 0.0 {
        return Ok(Fitted::Constant(mean));
    }
    let variance = stdev * stdev;
    Ok(Fitted::Gamma { shape: mean * mean / variance, scale: variance / mean })
}

/// Method-of-moments Beta for a quantity in [0, 1].
pub fn fit_beta(mean: f64, stdev: f64) -> Result<Fitted> {
    check_moments(mean, stdev)?;
    if mean > 1.0 {
        return Err(Error::Distribution(format!("Beta mean must be at most 1, got {}", mean)));
    }
    if mean == 0.0 || mean == 1.0 || stdev == 0.0 {
        return Ok(Fitted::Constant(mean));
    }

    let max_variance = mean * (1.0 - mean);
    let mut variance = stdev * stdev;
    if variance >= max_variance {
        warn!(
            "standard deviation {} is too large for a Beta with mean {}; capping variance at {}",
            stdev, mean, max_variance * BETA_VARIANCE_CAP
        );
        variance = max_variance * BETA_VARIANCE_CAP;
    }

    let common = max_variance / variance - 1.0;
    Ok(Fitted::Beta { alpha: mean * common, beta: (1.0 - mean) * common })
}

fn check_moments(mean: f64, stdev: f64) -> Result<()> {
    if !mean.is_finite() || mean < 0.0 || !stdev.is_finite() || stdev < 0.0 {
        return Err(Error::Distribution(format!(
            "cannot fit mean {} and standard deviation {}", mean, stdev
        )));
    }
    Ok(())
}

/// A fitted parameter whose draws are clamped to
/// `[0.5 · mean, min(upper_bound, 1.5 · mean)]`.
#[derive(Debug, Copy, Clone, Serialize)]
pub struct ClampedParameter {
    pub mean: f64,
    pub lower: f64,
    pub upper: f64,
    pub distribution: Fitted,
    #[serde(skip)]
    sampler: FittedSampler,
}

impl ClampedParameter {
    pub fn cost(mean: f64, cv_divisor: f64) -> Result<Self> {
        let distribution = fit_gamma(mean, mean / cv_divisor)?;
        Self::with_bounds(mean, std::f64::INFINITY, distribution)
    }

    pub fn utility(mean: f64, cv_divisor: f64) -> Result<Self> {
        let distribution = fit_beta(mean, mean / cv_divisor)?;
        Self::with_bounds(mean, 1.0, distribution)
    }

    fn with_bounds(mean: f64, upper_bound: f64, distribution: Fitted) -> Result<Self> {
        Ok(Self {
            mean,
            lower: 0.5 * mean,
            upper: upper_bound.min(1.5 * mean),
            distribution,
            sampler: distribution.sampler()?,
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.sampler.sample(rng).max(self.lower).min(self.upper)
    }
}
