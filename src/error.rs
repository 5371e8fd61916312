// src/error.rs
//
// Typed errors for the environment.
// - EnvError:   fatal, construction-time only. The environment is unusable.
// - OrderError: non-fatal, recorded per symbol on the step's intent record.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::TimestampMs;

/// Fatal configuration / construction errors.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("no trading symbols provided")]
    NoSymbols,

    #[error("no price data available")]
    NoData,

    #[error("symbol '{0}' not found in simulator metadata")]
    UnknownSymbol(String),

    #[error("no unit symbol for profit currency '{0}'")]
    MissingUnitSymbol(String),

    #[error("no price for symbol '{symbol}' at time {time}")]
    MissingPrice { symbol: String, time: TimestampMs },

    #[error("not enough time points: have {have}, window size {window}")]
    NotEnoughTimePoints { have: usize, window: usize },

    #[error(
        "time-split bounds infeasible: min length {min_length}, max length {max_length}, \
         {time_points} time points"
    )]
    TimeSplitInfeasible {
        min_length: usize,
        max_length: usize,
        time_points: usize,
    },

    #[error("invalid initial-balance moments: mean {mean}, stddev {stddev}")]
    InvalidBalanceMoments { mean: f64, stddev: f64 },

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Non-fatal per-symbol order failures, recorded on the step's intent
/// record. These never abort a step.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum OrderError {
    /// No free order slot under multi-order (hedge) mode.
    #[error("cannot add more orders")]
    NoCapacity,

    /// The simulator rejected the order request.
    #[error("order rejected: {0}")]
    Rejected(String),
}
