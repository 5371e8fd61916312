//! margin-gym: episodic trading environment over a position/margin
//! simulator.
//!
//! The crate wraps an external margin simulator (consumed through the
//! narrow [`MarginSimulator`] trait) in a gym-style episodic interface so
//! sequential trading policies can be trained and evaluated:
//!
//! - `reset(seed)` starts an episode on a fresh clone of the prototype
//!   simulator, optionally with a randomized starting balance and a
//!   randomized time sub-window;
//! - `step(action)` decodes a bounded continuous action vector into
//!   per-symbol order operations, applies them with per-symbol failure
//!   capture, advances simulator time and returns the observation,
//!   scalar reward and termination/truncation flags.
//!
//! # Architecture
//!
//! - **action** — pure decoding of the flat action vector into close/hold
//!   probabilities and a signed volume per symbol.
//! - **orders** — the stochastic order lifecycle against the simulator.
//! - **clock** — tick bookkeeping and randomized sub-window selection.
//! - **reward** — equity-transition reward and stopping conditions.
//! - **features** — the read-only price/feature cache, precomputed once
//!   per environment (optionally on a worker pool).
//! - **observation** — windowed observation assembly.
//! - **env** — the episode engine tying the pieces together, plus a
//!   lockstep multi-environment wrapper.
//! - **sim** — a compact in-memory reference simulator for tests and the
//!   rollout harness.
//!
//! Determinism: each environment owns a single `ChaCha8Rng` stream,
//! seeded at construction. `reset` reseeds it **only** when given an
//! explicit seed; otherwise the stream persists across episodes. Callers
//! wanting fully independent episodes must pass a seed on every reset.

pub mod action;
pub mod clock;
pub mod config;
pub mod env;
pub mod error;
pub mod features;
pub mod logging;
pub mod observation;
pub mod orders;
pub mod reward;
pub mod sampler;
pub mod sim;
pub mod simulator;
pub mod types;

// --- Re-exports for ergonomic external use ---------------------------------

pub use action::{ActionDecoder, DecodedAction, DecodedIntent};
pub use clock::EpisodeClock;
pub use config::{EnvConfig, Fee, ObsTransform, RewardMode};
pub use env::{Environment, StepInfo, StepOutcome, TradingEnv, VecEnv};
pub use error::{EnvError, OrderError};
pub use features::PriceFeatureCache;
pub use logging::{EpisodeSink, FileSink, NoopSink};
pub use observation::{Observation, ObservationBuilder};
pub use orders::{
    modified_volume, ClosedOrderRecord, OrderIntentRecord, OrderLifecycleController,
};
pub use reward::RewardPolicy;
pub use sampler::InitialBalanceSampler;
pub use sim::ReferenceSimulator;
pub use simulator::{MarginSimulator, OrderValidationError};
pub use types::{
    OpenOrder, OrderDirection, OrderId, PriceField, PricePoint, SymbolInfo, TimestampMs,
};
