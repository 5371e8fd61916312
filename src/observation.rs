// src/observation.rs
//
// Structured observation assembly.
//
// Reads the simulator's account scalars, the trailing feature window and
// the per-symbol open-order tensor, then applies the configured elementwise
// transform to every component. Pure given the simulator state and cache.

use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::config::ObsTransform;
use crate::features::PriceFeatureCache;
use crate::simulator::MarginSimulator;

/// Observation handed to the policy each step.
///
/// Shapes are fixed for the lifetime of the environment:
/// `features` is `window_size x num_columns`, `orders` is
/// `num_symbols x max_orders x 3` ([entry_price, volume, profit],
/// zero-padded past the open orders).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub features: Array2<f64>,
    pub orders: Array3<f64>,
}

impl Observation {
    /// Canonical JSON bytes for byte-for-byte trajectory comparison.
    pub fn to_canonical_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Assembles observations for a fixed symbol set and window.
#[derive(Debug, Clone)]
pub struct ObservationBuilder {
    symbols: Vec<String>,
    window_size: usize,
    max_orders: usize,
    transform: ObsTransform,
}

impl ObservationBuilder {
    pub fn new(
        symbols: Vec<String>,
        window_size: usize,
        max_orders: usize,
        transform: ObsTransform,
    ) -> Self {
        Self {
            symbols,
            window_size,
            max_orders,
            transform,
        }
    }

    /// Build the observation for `current_tick`.
    pub fn build<S: MarginSimulator>(
        &self,
        sim: &S,
        cache: &PriceFeatureCache,
        current_tick: usize,
    ) -> Observation {
        let mut features = cache.window(current_tick, self.window_size);

        let mut orders = Array3::zeros((self.symbols.len(), self.max_orders, 3));
        for (i, symbol) in self.symbols.iter().enumerate() {
            for (j, order) in sim
                .symbol_orders(symbol)
                .iter()
                .take(self.max_orders)
                .enumerate()
            {
                orders[[i, j, 0]] = order.entry_price;
                orders[[i, j, 1]] = order.volume;
                orders[[i, j, 2]] = order.profit;
            }
        }

        let t = &self.transform;
        features.mapv_inplace(|x| t.apply(x));
        orders.mapv_inplace(|x| t.apply(x));

        Observation {
            balance: t.apply(sim.balance()),
            equity: t.apply(sim.equity()),
            margin: t.apply(sim.margin()),
            features,
            orders,
        }
    }
}
