// src/clock.rs
//
// Episode tick bookkeeping: start/current/end indices into the shared time
// axis, optional randomized sub-window selection and the elapsed-time delta
// handed to the simulator on each advance.

use std::sync::Arc;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::types::TimestampMs;

/// Owns the tick indices of the running episode.
///
/// Invariants: `initial_start_tick <= start_tick <= current_tick <= end_tick
/// <= max_end_tick`.
#[derive(Debug, Clone)]
pub struct EpisodeClock {
    time_points: Arc<Vec<TimestampMs>>,
    initial_start_tick: usize,
    max_end_tick: usize,
    start_tick: usize,
    end_tick: usize,
    current_tick: usize,
    truncated: bool,
}

impl EpisodeClock {
    /// The fixed full-range bounds: start at `window_size - 1`, end at the
    /// last time point.
    pub fn new(time_points: Arc<Vec<TimestampMs>>, window_size: usize) -> Self {
        let initial_start_tick = window_size - 1;
        let max_end_tick = time_points.len() - 1;
        Self {
            time_points,
            initial_start_tick,
            max_end_tick,
            start_tick: initial_start_tick,
            end_tick: max_end_tick,
            current_tick: initial_start_tick,
            truncated: false,
        }
    }

    /// Reset to the fixed full-range episode bounds.
    pub fn reset_full(&mut self) {
        self.start_tick = self.initial_start_tick;
        self.end_tick = self.max_end_tick;
        self.current_tick = self.start_tick;
        self.truncated = false;
    }

    /// Draw a random sub-window bounded by the min/max episode length.
    ///
    /// Both draws use exclusive upper bounds:
    /// `start ∈ [initial_start, max_end - min_length)` and
    /// `end ∈ [start + min_length, min(max_end, start + max_length))`.
    /// Feasibility is validated at environment construction.
    pub fn sample_window(
        &mut self,
        rng: &mut ChaCha8Rng,
        min_length: usize,
        max_length: usize,
    ) {
        self.start_tick = rng.gen_range(self.initial_start_tick..self.max_end_tick - min_length);
        let high = (self.start_tick + max_length).min(self.max_end_tick);
        self.end_tick = rng.gen_range(self.start_tick + min_length..high);
        self.current_tick = self.start_tick;
        self.truncated = false;
    }

    /// Advance one tick; flips `truncated` exactly when the end tick is
    /// reached. Returns the elapsed time between the previous and current
    /// tick.
    pub fn advance(&mut self) -> TimestampMs {
        self.current_tick += 1;
        if self.current_tick == self.end_tick {
            self.truncated = true;
        }
        self.time_points[self.current_tick] - self.time_points[self.current_tick - 1]
    }

    pub fn current_time(&self) -> TimestampMs {
        self.time_points[self.current_tick]
    }

    pub fn current_tick(&self) -> usize {
        self.current_tick
    }

    pub fn start_tick(&self) -> usize {
        self.start_tick
    }

    pub fn end_tick(&self) -> usize {
        self.end_tick
    }

    pub fn max_end_tick(&self) -> usize {
        self.max_end_tick
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }
}
