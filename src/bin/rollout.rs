// src/bin/rollout.rs
//
// Random-policy rollout harness over the reference simulator.
//
// Builds a synthetic two-symbol market, runs a number of episodes with a
// uniform random policy and prints a per-episode summary. Optionally
// writes per-step JSONL telemetry.

use std::path::PathBuf;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use margin_gym::{
    EnvConfig, Environment, EpisodeSink, FileSink, NoopSink, ReferenceSimulator, RewardMode,
    SymbolInfo, TimestampMs, TradingEnv,
};

#[derive(Parser, Debug)]
#[command(name = "rollout", about = "Random-policy rollouts over the reference simulator")]
struct Args {
    /// Number of episodes to run.
    #[arg(long, default_value_t = 3)]
    episodes: usize,

    /// Number of synthetic hourly time points.
    #[arg(long, default_value_t = 500)]
    points: usize,

    /// Observation window size.
    #[arg(long, default_value_t = 10)]
    window: usize,

    /// Order slots per symbol.
    #[arg(long, default_value_t = 2)]
    max_orders: usize,

    /// Sample a random time sub-window per episode.
    #[arg(long, default_value_t = false)]
    time_split: bool,

    /// Use the logarithmic reward.
    #[arg(long, default_value_t = false)]
    log_reward: bool,

    /// RNG seed for the environment and the random policy.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Worker threads for the feature-cache precompute.
    #[arg(long)]
    workers: Option<usize>,

    /// Write per-step JSONL telemetry to this file.
    #[arg(long)]
    log: Option<PathBuf>,
}

fn synthetic_market(points: usize) -> ReferenceSimulator {
    let mut sim = ReferenceSimulator::new(10_000.0, true);
    let hour = 3_600_000i64;
    let times: Vec<TimestampMs> = (0..points).map(|i| i as i64 * hour).collect();

    let info = |currency: &str| SymbolInfo {
        volume_min: 0.01,
        volume_max: 10.0,
        volume_step: 0.01,
        currency_profit: currency.to_string(),
    };

    let eurusd: Vec<f64> = (0..points)
        .map(|i| 1.10 + 0.02 * ((i as f64) * 0.05).sin() + 0.0001 * i as f64)
        .collect();
    let gbpusd: Vec<f64> = (0..points)
        .map(|i| 1.30 + 0.03 * ((i as f64) * 0.03).cos() - 0.00005 * i as f64)
        .collect();
    sim.add_symbol("EURUSD", info("USD"), times.clone(), eurusd);
    sim.add_symbol("GBPUSD", info("USD"), times, gbpusd);
    sim
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let sim = synthetic_market(args.points);
    let cfg = EnvConfig {
        symbol_max_orders: args.max_orders,
        time_split: args.time_split,
        worker_threads: args.workers,
        reward: if args.log_reward {
            RewardMode::Log
        } else {
            RewardMode::Linear
        },
        seed: args.seed,
        ..EnvConfig::new(
            vec!["EURUSD".to_string(), "GBPUSD".to_string()],
            args.window,
        )
    };
    let mut env = TradingEnv::new(sim, cfg)?;

    let mut sink: Box<dyn EpisodeSink> = match &args.log {
        Some(path) => Box::new(FileSink::create(path)?),
        None => Box::new(NoopSink),
    };

    let mut policy_rng = ChaCha8Rng::seed_from_u64(args.seed ^ 0x5eed);
    let action_len = env.action_len();

    for episode in 0..args.episodes {
        env.reset(Some(args.seed + episode as u64));
        let mut total_reward = 0.0;
        let mut steps = 0usize;
        let mut errors = 0usize;

        loop {
            let action: Vec<f64> = (0..action_len)
                .map(|_| policy_rng.gen_range(-1.0..1.0))
                .collect();
            let outcome = env.step(&action);
            total_reward += outcome.reward;
            steps += 1;
            errors += outcome
                .info
                .order_intents
                .iter()
                .filter(|r| r.error.is_some())
                .count();
            sink.log_step(episode, env.current_tick(), outcome.reward, &outcome.info);

            if outcome.terminated || outcome.truncated {
                break;
            }
        }

        println!(
            "episode {episode}: steps={steps} total_reward={total_reward:.4} \
             order_errors={errors} | {}",
            env.render()
        );
    }

    Ok(())
}
