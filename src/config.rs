// src/config.rs
//
// Construction-time configuration for the trading environment.
// Single source of truth for every knob enumerated by the external
// interface: symbols, observation window, fee policy, order capacity,
// randomization toggles, reward shaping and RNG seeding.

use serde::{Deserialize, Serialize};

use crate::types::{PriceField, TimestampMs};

/// Fee charged on order creation: either one fixed rate for every symbol
/// or a per-symbol resolver.
#[derive(Debug, Clone, Copy)]
pub enum Fee {
    Fixed(f64),
    PerSymbol(fn(&str) -> f64),
}

impl Fee {
    pub fn resolve(&self, symbol: &str) -> f64 {
        match self {
            Fee::Fixed(rate) => *rate,
            Fee::PerSymbol(resolver) => resolver(symbol),
        }
    }
}

impl Default for Fee {
    fn default() -> Self {
        Fee::Fixed(0.0005)
    }
}

/// Scalar reward mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardMode {
    /// `(current_equity - prev_equity) / initial_balance * 100`.
    Linear,
    /// `ln(current_equity / prev_equity)`, floored on non-positive equity.
    Log,
}

/// Elementwise observation transform.
#[derive(Debug, Clone, Copy)]
pub enum ObsTransform {
    /// Pass values through unchanged.
    Identity,
    /// Inverse hyperbolic sine: symmetric log-like compression that stays
    /// near-linear around zero and preserves sign.
    Asinh,
    Custom(fn(f64) -> f64),
}

impl ObsTransform {
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            ObsTransform::Identity => x,
            ObsTransform::Asinh => x.asinh(),
            ObsTransform::Custom(f) => f(x),
        }
    }
}

/// Environment configuration.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    /// Symbols the policy trades, in observation/action order.
    pub trading_symbols: Vec<String>,
    /// Number of trailing feature rows per observation.
    pub window_size: usize,
    /// Explicit time axis; when None, the first trading symbol's full
    /// series axis is used.
    pub time_points: Option<Vec<TimestampMs>>,
    /// Price fields extracted into the feature cache, per symbol.
    pub price_fields: Vec<PriceField>,
    /// Fee policy for order creation.
    pub fee: Fee,
    /// Order slots per symbol. Forced to 1 when the simulator runs
    /// without hedge (multi-order) mode.
    pub symbol_max_orders: usize,
    /// Worker threads for the feature-cache precompute; None = sequential.
    pub worker_threads: Option<usize>,
    /// Elementwise observation transform.
    pub transform: ObsTransform,
    /// Draw the starting balance from a log-normal on each reset.
    pub randomize_initial_balance: bool,
    /// Target (mean, stddev) of the randomized starting balance.
    /// None = (10_000, 1_000).
    pub initial_balance_moments: Option<(f64, f64)>,
    /// Sample a random [start, end] sub-window of the time axis per episode.
    pub time_split: bool,
    /// Minimum episode length under time_split, in ticks.
    pub min_time_split_length: usize,
    /// Maximum episode length under time_split, in ticks.
    pub max_time_split_length: usize,
    /// Annualized risk-free rate used by the risk-premium adjustment.
    pub risk_free_rate: f64,
    /// Subtract `balance * risk_free_rate / 365.25` from each step reward,
    /// so a zero-activity policy does not look optimal.
    pub risk_premium: bool,
    /// Terminate the episode when equity reaches exactly zero.
    pub done_if_equity_zero: bool,
    /// Terminate when `equity / initial_balance` falls below this ratio.
    pub loss_cut: Option<f64>,
    /// Reward mode.
    pub reward: RewardMode,
    /// Sentinel reward when log mode sees non-positive equity.
    pub log_reward_floor: f64,
    /// Multiplier mapping the unit-range volume component to tradable
    /// volume.
    pub volume_scale: f64,
    /// Seed for the environment RNG at construction.
    pub seed: u64,
}

impl EnvConfig {
    /// Config with the standard defaults for the given symbols and window.
    pub fn new(trading_symbols: Vec<String>, window_size: usize) -> Self {
        Self {
            trading_symbols,
            window_size,
            ..Self::default()
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            trading_symbols: Vec::new(),
            window_size: 10,
            time_points: None,
            price_fields: vec![PriceField::Close, PriceField::Open],
            fee: Fee::default(),
            symbol_max_orders: 1,
            worker_threads: None,
            transform: ObsTransform::Asinh,
            randomize_initial_balance: false,
            initial_balance_moments: None,
            time_split: false,
            min_time_split_length: 10,
            max_time_split_length: 200,
            risk_free_rate: 0.02,
            risk_premium: false,
            done_if_equity_zero: false,
            loss_cut: None,
            reward: RewardMode::Linear,
            log_reward_floor: -10.0,
            volume_scale: 100.0,
            seed: 42,
        }
    }
}
