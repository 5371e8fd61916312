// tests/common/mod.rs
//
// Shared fixtures for the integration suites: a two-symbol in-memory
// market on an hourly axis.

use margin_gym::{ReferenceSimulator, SymbolInfo, TimestampMs};

pub const HOUR_MS: i64 = 3_600_000;

pub fn usd_symbol_info() -> SymbolInfo {
    SymbolInfo {
        volume_min: 0.01,
        volume_max: 10.0,
        volume_step: 0.01,
        currency_profit: "USD".to_string(),
    }
}

/// Hedge-mode simulator with EURUSD and GBPUSD over `points` hourly ticks.
pub fn two_symbol_market(points: usize) -> ReferenceSimulator {
    let mut sim = ReferenceSimulator::new(10_000.0, true);
    let times: Vec<TimestampMs> = (0..points).map(|i| i as i64 * HOUR_MS).collect();
    let eurusd: Vec<f64> = (0..points)
        .map(|i| 1.10 + 0.005 * ((i as f64) * 0.11).sin() + 0.0002 * i as f64)
        .collect();
    let gbpusd: Vec<f64> = (0..points)
        .map(|i| 1.30 - 0.0001 * i as f64 + 0.004 * ((i as f64) * 0.07).cos())
        .collect();
    sim.add_symbol("EURUSD", usd_symbol_info(), times.clone(), eurusd);
    sim.add_symbol("GBPUSD", usd_symbol_info(), times, gbpusd);
    sim
}
