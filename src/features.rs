// src/features.rs
//
// Read-only price/feature cache.
//
// Built once per environment construction: every configured price field of
// every trading symbol, evaluated at every time point via the simulator's
// point-in-time lookup. Columns are stacked per symbol in configuration
// order, so row t is [sym0.f0, sym0.f1, ..., symN.fK]. The optional worker
// pool parallelizes the per-timestamp fetch; results are merged back in
// input order, so the cache is identical with and without the pool.

use ndarray::{s, Array2, ArrayView2};
use rayon::prelude::*;
use rayon::ThreadPool;

use crate::error::EnvError;
use crate::simulator::MarginSimulator;
use crate::types::{PriceField, TimestampMs};

/// Immutable time-indexed feature matrix shared by every episode.
#[derive(Debug, Clone)]
pub struct PriceFeatureCache {
    features: Array2<f64>,
    num_fields: usize,
}

impl PriceFeatureCache {
    /// Evaluate the simulator's price lookup over the full time axis.
    ///
    /// With a pool, timestamps of each symbol are fetched in parallel;
    /// `collect` preserves input order regardless of worker completion
    /// order. Fails if any (symbol, time) pair has no price.
    pub fn build<S: MarginSimulator + Sync>(
        sim: &S,
        symbols: &[String],
        fields: &[PriceField],
        time_points: &[TimestampMs],
        pool: Option<&ThreadPool>,
    ) -> Result<Self, EnvError> {
        let mut per_symbol: Vec<Vec<Vec<f64>>> = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            let fetch = |t: &TimestampMs| -> Result<Vec<f64>, EnvError> {
                let point = sim.price_at(symbol, *t).ok_or(EnvError::MissingPrice {
                    symbol: symbol.clone(),
                    time: *t,
                })?;
                Ok(fields.iter().map(|&f| point.field(f)).collect())
            };

            let rows: Vec<Vec<f64>> = match pool {
                Some(pool) => {
                    pool.install(|| time_points.par_iter().map(fetch).collect::<Result<_, _>>())?
                }
                None => time_points.iter().map(fetch).collect::<Result<_, _>>()?,
            };
            per_symbol.push(rows);
        }

        let num_fields = fields.len();
        let num_columns = symbols.len() * num_fields;
        let mut flat = Vec::with_capacity(time_points.len() * num_columns);
        for t in 0..time_points.len() {
            for rows in &per_symbol {
                flat.extend_from_slice(&rows[t]);
            }
        }
        let features = Array2::from_shape_vec((time_points.len(), num_columns), flat)
            .map_err(|_| EnvError::NoData)?;

        Ok(Self {
            features,
            num_fields,
        })
    }

    /// Number of time points.
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.features.nrows() == 0
    }

    /// Total feature columns: `num_symbols * num_fields`.
    pub fn num_columns(&self) -> usize {
        self.features.ncols()
    }

    /// The trailing `window_size` rows ending at `end_tick` inclusive.
    pub fn window(&self, end_tick: usize, window_size: usize) -> Array2<f64> {
        self.features
            .slice(s![end_tick + 1 - window_size..=end_tick, ..])
            .to_owned()
    }

    /// Columns of one symbol across the full time axis.
    pub fn symbol_features(&self, symbol_index: usize) -> ArrayView2<'_, f64> {
        let start = symbol_index * self.num_fields;
        self.features.slice(s![.., start..start + self.num_fields])
    }
}
