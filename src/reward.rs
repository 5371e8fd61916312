// src/reward.rs
//
// Scalar reward from the equity transition, plus the episode's domain
// stopping conditions. Never raises: degenerate equity transitions under
// the log policy map to a finite sentinel floor.

use crate::config::{EnvConfig, RewardMode};

/// Reward and termination policy for one environment.
#[derive(Debug, Clone)]
pub struct RewardPolicy {
    mode: RewardMode,
    log_floor: f64,
    risk_premium: bool,
    risk_free_rate: f64,
    done_if_equity_zero: bool,
    loss_cut: Option<f64>,
}

impl RewardPolicy {
    pub fn from_config(cfg: &EnvConfig) -> Self {
        Self {
            mode: cfg.reward,
            log_floor: cfg.log_reward_floor,
            risk_premium: cfg.risk_premium,
            risk_free_rate: cfg.risk_free_rate,
            done_if_equity_zero: cfg.done_if_equity_zero,
            loss_cut: cfg.loss_cut,
        }
    }

    /// Reward for the equity transition `prev_equity -> current_equity`.
    pub fn step_reward(&self, prev_equity: f64, current_equity: f64, initial_balance: f64) -> f64 {
        match self.mode {
            RewardMode::Linear => (current_equity - prev_equity) / initial_balance * 100.0,
            RewardMode::Log => {
                if prev_equity > 0.0 && current_equity > 0.0 {
                    (current_equity / prev_equity).ln()
                } else {
                    self.log_floor
                }
            }
        }
    }

    /// Risk-premium adjustment, applied to the returned reward only (the
    /// history keeps the unadjusted value).
    pub fn adjust(&self, reward: f64, balance: f64) -> f64 {
        if self.risk_premium {
            reward - balance * self.risk_free_rate / 365.25
        } else {
            reward
        }
    }

    /// Domain stopping condition: bankruptcy and/or loss-cut breach.
    /// Independent from end-of-window truncation.
    pub fn terminated(&self, equity: f64, initial_balance: f64) -> bool {
        let bankrupt = self.done_if_equity_zero && equity == 0.0;
        let cut = self
            .loss_cut
            .map(|ratio| equity / initial_balance < ratio)
            .unwrap_or(false);
        bankrupt || cut
    }
}
