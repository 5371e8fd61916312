// src/sampler.rs
//
// Randomized initial account balance.
//
// The caller specifies the target mean and standard deviation of the
// starting balance; the log-normal parameters are recovered by moment
// matching so sampled balances actually have those moments.

use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, LogNormal};

use crate::error::EnvError;

/// Log-normal initial-balance sampler parameterized by target moments.
#[derive(Debug, Clone)]
pub struct InitialBalanceSampler {
    mu: f64,
    sigma: f64,
    dist: LogNormal<f64>,
}

impl InitialBalanceSampler {
    /// Build from a target mean and standard deviation:
    /// `mu = ln(mean^2 / sqrt(mean^2 + stddev^2))`,
    /// `sigma = sqrt(ln(1 + (stddev / mean)^2))`.
    pub fn from_moments(mean: f64, stddev: f64) -> Result<Self, EnvError> {
        if !(mean > 0.0) || !(stddev >= 0.0) || !mean.is_finite() || !stddev.is_finite() {
            return Err(EnvError::InvalidBalanceMoments { mean, stddev });
        }
        let mu = (mean * mean / (mean * mean + stddev * stddev).sqrt()).ln();
        let sigma = (stddev / mean).powi(2).ln_1p().sqrt();
        let dist = LogNormal::new(mu, sigma)
            .map_err(|_| EnvError::InvalidBalanceMoments { mean, stddev })?;
        Ok(Self { mu, sigma, dist })
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Draw one starting balance from the episode RNG.
    pub fn sample(&self, rng: &mut ChaCha8Rng) -> f64 {
        self.dist.sample(rng)
    }
}
