//! Streaming statistics over trial results

use serde::{Deserialize, Serialize};

/// z value for a two-sided 95% confidence interval
pub const Z_95: f64 = 1.959_963_985;

/// Welford accumulator: mean and variance in one pass without storing samples
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample standard deviation
    pub fn std_dev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).sqrt()
    }

    /// Standard error of the mean
    pub fn std_err(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.std_dev() / (self.count as f64).sqrt()
    }

    /// Half-width of the 95% interval relative to the mean.
    ///
    /// Infinite until there are two samples and a non-zero mean, so an
    /// empty or degenerate accumulator never looks converged.
    pub fn relative_half_width(&self) -> f64 {
        if self.count < 2 || self.mean == 0.0 {
            return f64::INFINITY;
        }
        (Z_95 * self.std_err() / self.mean).abs()
    }

    pub fn summary(&self) -> Summary {
        let half = Z_95 * self.std_err();
        Summary {
            count: self.count,
            mean: self.mean,
            std_dev: self.std_dev(),
            std_err: self.std_err(),
            ci_low: self.mean - half,
            ci_high: self.mean + half,
            min: self.min,
            max: self.max,
        }
    }
}

/// Aggregate of one tracked quantity across trials
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: u64,
    pub mean: f64,
    pub std_dev: f64,
    pub std_err: f64,
    /// Lower bound of the 95% confidence interval of the mean
    pub ci_low: f64,
    pub ci_high: f64,
    pub min: f64,
    pub max: f64,
}
