// src/action.rs
//
// Pure decoding of the flat action vector into per-symbol intents.
//
// The policy emits one bounded segment per symbol:
//   [close_logit_1 .. close_logit_M, hold_logit, signed_volume]
// Close/hold components are inverse-tanh'd back to logits (after clamping
// strictly inside (-1, 1)) and squashed through a logistic to recover
// probabilities; the volume component is scaled by a fixed multiplier.

use serde::{Deserialize, Serialize};

/// Decoded per-symbol intent: probabilities plus the raw signed volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedIntent {
    /// One close probability per order slot, each in (0, 1).
    pub close_probabilities: Vec<f64>,
    /// Probability of holding (taking no open action), in (0, 1).
    pub hold_probability: f64,
    /// Scaled signed volume; sign selects the order direction.
    pub signed_volume: f64,
}

/// Decoded action: one intent per trading symbol, in configuration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedAction {
    pub intents: Vec<DecodedIntent>,
}

/// Stateless decoder for the fixed-layout action vector.
#[derive(Debug, Clone, Copy)]
pub struct ActionDecoder {
    num_symbols: usize,
    max_orders: usize,
    volume_scale: f64,
}

/// Clamp margin keeping logits finite through atanh.
const LOGIT_CLAMP: f64 = 1e-3;

fn inverse_tanh_probability(component: f64) -> f64 {
    let logit = component.clamp(-1.0 + LOGIT_CLAMP, 1.0 - LOGIT_CLAMP).atanh();
    1.0 / (1.0 + (-logit).exp())
}

impl ActionDecoder {
    pub fn new(num_symbols: usize, max_orders: usize, volume_scale: f64) -> Self {
        Self {
            num_symbols,
            max_orders,
            volume_scale,
        }
    }

    /// Expected action vector length: `num_symbols * (max_orders + 2)`.
    pub fn action_len(&self) -> usize {
        self.num_symbols * (self.max_orders + 2)
    }

    /// Decode a full action vector. The length is a caller contract;
    /// malformed lengths panic rather than degrade.
    pub fn decode(&self, action: &[f64]) -> DecodedAction {
        assert_eq!(
            action.len(),
            self.action_len(),
            "action vector length must be num_symbols * (max_orders + 2)"
        );

        let k = self.max_orders + 2;
        let intents = action
            .chunks_exact(k)
            .map(|segment| {
                let close_probabilities = segment[..self.max_orders]
                    .iter()
                    .map(|&c| inverse_tanh_probability(c))
                    .collect();
                let hold_probability = inverse_tanh_probability(segment[self.max_orders]);
                let signed_volume = segment[self.max_orders + 1] * self.volume_scale;
                DecodedIntent {
                    close_probabilities,
                    hold_probability,
                    signed_volume,
                }
            })
            .collect();

        DecodedAction { intents }
    }
}
