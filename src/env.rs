// src/env.rs
//
// Episode engine: orchestrates action decoding, the order lifecycle, the
// clock, the reward policy and observation assembly over a cloned
// simulator, and keeps the per-step history for later inspection.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::action::ActionDecoder;
use crate::clock::EpisodeClock;
use crate::config::EnvConfig;
use crate::error::EnvError;
use crate::features::PriceFeatureCache;
use crate::observation::{Observation, ObservationBuilder};
use crate::orders::{ClosedOrderRecord, OrderIntentRecord, OrderLifecycleController};
use crate::reward::RewardPolicy;
use crate::sampler::InitialBalanceSampler;
use crate::simulator::MarginSimulator;
use crate::types::TimestampMs;

/// Per-step info record, appended to the episode history.
///
/// The reset entry carries no order or reward fields. `step_reward` is the
/// unadjusted reward; the risk-premium correction only touches the value
/// returned from `step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// One intent record per trading symbol, in configuration order.
    pub order_intents: Vec<OrderIntentRecord>,
    /// Closed-order records per trading symbol, in configuration order.
    pub closed_orders: Vec<Vec<ClosedOrderRecord>>,
    pub balance: f64,
    pub equity: f64,
    pub margin: f64,
    pub free_margin: f64,
    pub margin_level: f64,
    pub step_reward: Option<f64>,
}

/// Result of one environment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    /// Domain stopping condition (bankruptcy, loss-cut).
    pub terminated: bool,
    /// Time window exhausted.
    pub truncated: bool,
    pub info: StepInfo,
}

/// Explicit episodic-environment interface: reset, step, render, close.
pub trait Environment {
    /// Start a new episode. Reseeds the environment RNG only when `seed`
    /// is Some; otherwise the RNG stream persists across episodes.
    fn reset(&mut self, seed: Option<u64>) -> (Observation, StepInfo);
    /// Advance one tick. The action length is a caller contract.
    fn step(&mut self, action: &[f64]) -> StepOutcome;
    /// Human-readable account summary.
    fn render(&self) -> String;
    /// Discard episode state.
    fn close(&mut self);
}

/// Episodic trading environment over an external margin simulator.
///
/// The prototype simulator passed at construction is never mutated;
/// every `reset` starts the episode from a fresh clone of it.
#[derive(Debug)]
pub struct TradingEnv<S: MarginSimulator> {
    cfg: EnvConfig,
    prototype: S,
    sim: S,
    cache: PriceFeatureCache,
    clock: EpisodeClock,
    decoder: ActionDecoder,
    controller: OrderLifecycleController,
    reward_policy: RewardPolicy,
    obs_builder: ObservationBuilder,
    sampler: Option<InitialBalanceSampler>,
    rng: ChaCha8Rng,
    initial_balance: f64,
    history: Vec<StepInfo>,
    symbol_max_orders: usize,
}

impl<S: MarginSimulator + Sync> TradingEnv<S> {
    /// Validate the configuration against the simulator and precompute the
    /// feature cache. All failures here are fatal; a constructed
    /// environment never fails at step time.
    pub fn new(simulator: S, cfg: EnvConfig) -> Result<Self, EnvError> {
        if cfg.trading_symbols.is_empty() {
            return Err(EnvError::NoSymbols);
        }
        if simulator.symbols().is_empty() {
            return Err(EnvError::NoData);
        }
        for symbol in &cfg.trading_symbols {
            let info = simulator
                .symbol_info(symbol)
                .ok_or_else(|| EnvError::UnknownSymbol(symbol.clone()))?;
            if simulator.unit_symbol(&info.currency_profit).is_none() {
                return Err(EnvError::MissingUnitSymbol(info.currency_profit));
            }
        }

        let time_points: Vec<TimestampMs> = match &cfg.time_points {
            Some(points) => points.clone(),
            None => simulator
                .time_points(&cfg.trading_symbols[0])
                .ok_or(EnvError::NoData)?,
        };
        if time_points.len() <= cfg.window_size {
            return Err(EnvError::NotEnoughTimePoints {
                have: time_points.len(),
                window: cfg.window_size,
            });
        }

        if cfg.time_split {
            let initial_start = cfg.window_size - 1;
            let max_end = time_points.len() - 1;
            // A zero minimum would allow end == start windows, which never
            // truncate and would run the clock off the time axis.
            let feasible = cfg.min_time_split_length >= 1
                && cfg.max_time_split_length > cfg.min_time_split_length
                && max_end > cfg.min_time_split_length
                && max_end - cfg.min_time_split_length > initial_start;
            if !feasible {
                return Err(EnvError::TimeSplitInfeasible {
                    min_length: cfg.min_time_split_length,
                    max_length: cfg.max_time_split_length,
                    time_points: time_points.len(),
                });
            }
        }

        // Without hedge mode the simulator keeps at most one order per
        // symbol, so extra slots would never fill.
        let symbol_max_orders = if simulator.hedge() {
            cfg.symbol_max_orders
        } else {
            1
        };

        let pool = match cfg.worker_threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| EnvError::WorkerPool(e.to_string()))?,
            ),
            None => None,
        };
        let cache = PriceFeatureCache::build(
            &simulator,
            &cfg.trading_symbols,
            &cfg.price_fields,
            &time_points,
            pool.as_ref(),
        )?;
        // The pool only serves the precompute; it shuts down here.
        drop(pool);

        let sampler = if cfg.randomize_initial_balance {
            let (mean, stddev) = cfg.initial_balance_moments.unwrap_or((10_000.0, 1_000.0));
            Some(InitialBalanceSampler::from_moments(mean, stddev)?)
        } else {
            None
        };

        let time_points = Arc::new(time_points);
        let clock = EpisodeClock::new(Arc::clone(&time_points), cfg.window_size);
        let decoder = ActionDecoder::new(
            cfg.trading_symbols.len(),
            symbol_max_orders,
            cfg.volume_scale,
        );
        let controller = OrderLifecycleController::new(symbol_max_orders, cfg.fee);
        let reward_policy = RewardPolicy::from_config(&cfg);
        let obs_builder = ObservationBuilder::new(
            cfg.trading_symbols.clone(),
            cfg.window_size,
            symbol_max_orders,
            cfg.transform,
        );
        let rng = ChaCha8Rng::seed_from_u64(cfg.seed);
        let sim = simulator.clone();
        let initial_balance = sim.balance();

        Ok(Self {
            cfg,
            prototype: simulator,
            sim,
            cache,
            clock,
            decoder,
            controller,
            reward_policy,
            obs_builder,
            sampler,
            rng,
            initial_balance,
            history: Vec::new(),
            symbol_max_orders,
        })
    }

    /// Expected action vector length.
    pub fn action_len(&self) -> usize {
        self.decoder.action_len()
    }

    /// Effective order slots per symbol (1 when hedge mode is off).
    pub fn symbol_max_orders(&self) -> usize {
        self.symbol_max_orders
    }

    pub fn current_tick(&self) -> usize {
        self.clock.current_tick()
    }

    pub fn start_tick(&self) -> usize {
        self.clock.start_tick()
    }

    pub fn end_tick(&self) -> usize {
        self.clock.end_tick()
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    /// Per-step info records of the current episode, oldest first.
    pub fn history(&self) -> &[StepInfo] {
        &self.history
    }

    /// The simulator owned by the current episode.
    pub fn simulator(&self) -> &S {
        &self.sim
    }

    pub fn config(&self) -> &EnvConfig {
        &self.cfg
    }

    fn account_info(&self) -> StepInfo {
        StepInfo {
            order_intents: Vec::new(),
            closed_orders: Vec::new(),
            balance: self.sim.balance(),
            equity: self.sim.equity(),
            margin: self.sim.margin(),
            free_margin: self.sim.free_margin(),
            margin_level: self.sim.margin_level(),
            step_reward: None,
        }
    }

    fn do_reset(&mut self, seed: Option<u64>) -> (Observation, StepInfo) {
        if let Some(seed) = seed {
            self.rng = ChaCha8Rng::seed_from_u64(seed);
        }

        self.clock.reset_full();
        self.sim = self.prototype.clone();
        self.initial_balance = self.sim.balance();

        if let Some(sampler) = &self.sampler {
            let balance = sampler.sample(&mut self.rng);
            self.sim.set_funds(balance);
            self.initial_balance = balance;
        }
        if self.cfg.time_split {
            self.clock.sample_window(
                &mut self.rng,
                self.cfg.min_time_split_length,
                self.cfg.max_time_split_length,
            );
        }

        self.sim.set_current_time(self.clock.current_time());

        let info = self.account_info();
        self.history = vec![info.clone()];
        let observation = self
            .obs_builder
            .build(&self.sim, &self.cache, self.clock.current_tick());

        (observation, info)
    }

    fn do_step(&mut self, action: &[f64]) -> StepOutcome {
        assert!(
            !self.history.is_empty(),
            "reset must be called before step"
        );

        let decoded = self.decoder.decode(action);
        let (order_intents, closed_orders) = self.controller.apply(
            &mut self.sim,
            &self.cfg.trading_symbols,
            &decoded,
            &mut self.rng,
        );

        let delta = self.clock.advance();
        self.sim.advance_time(delta);

        // The previous entry always exists; reset seeds the history.
        let prev_equity = self.history[self.history.len() - 1].equity;
        let step_reward =
            self.reward_policy
                .step_reward(prev_equity, self.sim.equity(), self.initial_balance);
        let terminated = self
            .reward_policy
            .terminated(self.sim.equity(), self.initial_balance);

        let mut info = self.account_info();
        info.order_intents = order_intents;
        info.closed_orders = closed_orders;
        info.step_reward = Some(step_reward);

        let observation = self
            .obs_builder
            .build(&self.sim, &self.cache, self.clock.current_tick());
        self.history.push(info.clone());

        let reward = self.reward_policy.adjust(step_reward, self.sim.balance());

        StepOutcome {
            observation,
            reward,
            terminated,
            truncated: self.clock.truncated(),
            info,
        }
    }
}

impl<S: MarginSimulator + Sync> Environment for TradingEnv<S> {
    fn reset(&mut self, seed: Option<u64>) -> (Observation, StepInfo) {
        self.do_reset(seed)
    }

    fn step(&mut self, action: &[f64]) -> StepOutcome {
        self.do_step(action)
    }

    fn render(&self) -> String {
        format!(
            "balance: {:.6} ~ equity: {:.6} ~ margin: {:.6} ~ free margin: {:.6} ~ margin level: {:.6}",
            self.sim.balance(),
            self.sim.equity(),
            self.sim.margin(),
            self.sim.free_margin(),
            self.sim.margin_level(),
        )
    }

    fn close(&mut self) {
        self.history.clear();
    }
}

/// N independent environments stepped in lockstep.
pub struct VecEnv<S: MarginSimulator> {
    envs: Vec<TradingEnv<S>>,
}

impl<S: MarginSimulator + Sync> VecEnv<S> {
    pub fn new(envs: Vec<TradingEnv<S>>) -> Self {
        Self { envs }
    }

    pub fn num_envs(&self) -> usize {
        self.envs.len()
    }

    /// Reset every environment; missing seeds leave the RNG stream as-is.
    pub fn reset_all(&mut self, seeds: Option<&[u64]>) -> Vec<(Observation, StepInfo)> {
        self.envs
            .iter_mut()
            .enumerate()
            .map(|(i, env)| env.reset(seeds.and_then(|s| s.get(i).copied())))
            .collect()
    }

    /// Step every environment with its own action.
    pub fn step_all(&mut self, actions: &[Vec<f64>]) -> Vec<StepOutcome> {
        assert_eq!(
            actions.len(),
            self.envs.len(),
            "actions length must match number of environments"
        );
        self.envs
            .iter_mut()
            .zip(actions)
            .map(|(env, action)| env.step(action))
            .collect()
    }

    pub fn envs(&self) -> &[TradingEnv<S>] {
        &self.envs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::testkit::two_symbol_sim;

    fn make_env(points: usize) -> TradingEnv<crate::sim::ReferenceSimulator> {
        let sim = two_symbol_sim(true, points);
        let cfg = EnvConfig {
            symbol_max_orders: 2,
            ..EnvConfig::new(vec!["EURUSD".to_string(), "GBPUSD".to_string()], 10)
        };
        TradingEnv::new(sim, cfg).unwrap()
    }

    #[test]
    fn reset_seeds_history_and_observation() {
        let mut env = make_env(100);
        let (obs, info) = env.reset(Some(42));

        assert_eq!(env.history().len(), 1);
        assert!(info.order_intents.is_empty());
        assert!(info.step_reward.is_none());
        assert_eq!(obs.features.dim(), (10, 4));
        assert_eq!(obs.orders.dim(), (2, 2, 3));
        assert_eq!(env.current_tick(), 9);
    }

    #[test]
    fn step_appends_history_and_advances_the_clock() {
        let mut env = make_env(100);
        env.reset(Some(42));

        let action = vec![0.0; env.action_len()];
        let outcome = env.step(&action);

        assert_eq!(env.current_tick(), 10);
        assert_eq!(env.history().len(), 2);
        assert_eq!(outcome.info.order_intents.len(), 2);
        assert!(outcome.info.step_reward.is_some());
        assert!(!outcome.truncated);
        // Zero action decodes to even hold odds.
        for record in &outcome.info.order_intents {
            assert!((record.hold_probability - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn history_length_tracks_ticks() {
        let mut env = make_env(60);
        env.reset(Some(1));
        let action = vec![0.0; env.action_len()];
        for _ in 0..20 {
            env.step(&action);
            assert_eq!(
                env.history().len(),
                env.current_tick() - env.start_tick() + 1
            );
        }
    }

    #[test]
    fn truncates_exactly_at_end_tick() {
        let mut env = make_env(15);
        env.reset(Some(3));
        let action = vec![0.0; env.action_len()];
        // start 9, end 14: five steps to the end.
        for _ in 0..4 {
            assert!(!env.step(&action).truncated);
        }
        let outcome = env.step(&action);
        assert!(outcome.truncated);
        assert_eq!(env.current_tick(), env.end_tick());
    }

    #[test]
    #[should_panic(expected = "reset must be called")]
    fn step_before_reset_panics() {
        let mut env = make_env(30);
        env.step(&vec![0.0; 8]);
    }

    #[test]
    #[should_panic(expected = "action vector length")]
    fn wrong_action_length_panics() {
        let mut env = make_env(30);
        env.reset(None);
        env.step(&[0.0; 3]);
    }

    #[test]
    fn construction_errors_are_fatal() {
        let sim = two_symbol_sim(true, 100);
        // Unknown symbol.
        let err = TradingEnv::new(
            sim.clone(),
            EnvConfig::new(vec!["USDJPY".to_string()], 10),
        )
        .unwrap_err();
        assert!(matches!(err, EnvError::UnknownSymbol(_)));

        // Window larger than the axis.
        let err = TradingEnv::new(
            sim.clone(),
            EnvConfig::new(vec!["EURUSD".to_string()], 100),
        )
        .unwrap_err();
        assert!(matches!(err, EnvError::NotEnoughTimePoints { .. }));

        // No symbols.
        let err = TradingEnv::new(sim.clone(), EnvConfig::new(vec![], 10)).unwrap_err();
        assert!(matches!(err, EnvError::NoSymbols));

        // A zero minimum episode length under time-split.
        let cfg = EnvConfig {
            time_split: true,
            min_time_split_length: 0,
            ..EnvConfig::new(vec!["EURUSD".to_string()], 10)
        };
        let err = TradingEnv::new(sim, cfg).unwrap_err();
        assert!(matches!(err, EnvError::TimeSplitInfeasible { .. }));
    }

    #[test]
    fn overfull_prototype_steps_without_panicking() {
        use crate::types::OrderDirection;

        // Prototype carries more open orders on a symbol than the
        // configured slot count.
        let mut sim = two_symbol_sim(true, 100);
        sim.set_current_time(0);
        sim.create_order(OrderDirection::Buy, "EURUSD", 1.0, 0.0)
            .unwrap();
        sim.create_order(OrderDirection::Buy, "EURUSD", 1.0, 0.0)
            .unwrap();

        let cfg = EnvConfig {
            symbol_max_orders: 1,
            ..EnvConfig::new(vec!["EURUSD".to_string(), "GBPUSD".to_string()], 10)
        };
        let mut env = TradingEnv::new(sim, cfg).unwrap();
        env.reset(Some(42));

        // Ask to keep the orders open and open another one.
        let action = vec![-1.0, -1.0, 0.5, -1.0, -1.0, 0.5];
        let outcome = env.step(&action);

        let eur = &outcome.info.order_intents[0];
        assert_eq!(eur.capacity, 0);
        assert!(matches!(
            eur.error,
            Some(crate::error::OrderError::NoCapacity)
        ));
    }

    #[test]
    fn hedge_off_forces_single_slot() {
        let sim = two_symbol_sim(false, 100);
        let cfg = EnvConfig {
            symbol_max_orders: 4,
            ..EnvConfig::new(vec!["EURUSD".to_string()], 10)
        };
        let env = TradingEnv::new(sim, cfg).unwrap();
        assert_eq!(env.symbol_max_orders(), 1);
        assert_eq!(env.action_len(), 3);
    }

    #[test]
    fn vec_env_steps_in_lockstep() {
        let mut vec_env = VecEnv::new(vec![make_env(50), make_env(50)]);
        let results = vec_env.reset_all(Some(&[7, 8]));
        assert_eq!(results.len(), 2);

        let len = vec_env.envs()[0].action_len();
        let actions = vec![vec![0.0; len], vec![0.0; len]];
        let outcomes = vec_env.step_all(&actions);
        assert_eq!(outcomes.len(), 2);
    }
}
