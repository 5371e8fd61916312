// src/orders.rs
//
// Stochastic order lifecycle: sample hold/close decisions from the decoded
// probabilities, close the selected orders, then try to open a new one
// within the symbol's slot capacity. Failures are recorded per symbol and
// never abort the step.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::action::DecodedAction;
use crate::config::Fee;
use crate::error::OrderError;
use crate::simulator::MarginSimulator;
use crate::types::{OrderDirection, OrderId, SymbolInfo};

/// Outcome of this step's order handling for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntentRecord {
    pub symbol: String,
    /// Id of the order opened this step, if any.
    pub order_id: Option<OrderId>,
    /// Sampled hold decision.
    pub hold: bool,
    pub hold_probability: f64,
    /// Raw requested signed volume (scaled, unclipped).
    pub volume: f64,
    /// Volume after clipping to the symbol bounds and snapping to the step.
    pub modified_volume: f64,
    /// Free order slots after this step's closes.
    pub capacity: usize,
    /// Direction of the opened order; None when no order was opened.
    pub direction: Option<OrderDirection>,
    /// Fee rate charged on the opened order.
    pub fee: Option<f64>,
    /// Margin reserved by the opened order.
    pub margin: Option<f64>,
    pub error: Option<OrderError>,
}

/// Record of one order closed this step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedOrderRecord {
    pub order_id: OrderId,
    pub symbol: String,
    pub direction: OrderDirection,
    pub volume: f64,
    pub fee: f64,
    pub margin: f64,
    pub profit: f64,
    /// Close probability the decision was sampled from.
    pub close_probability: f64,
}

/// Clip `volume` into the symbol's bounds and snap it to the volume step.
pub fn modified_volume(info: &SymbolInfo, volume: f64) -> f64 {
    let v = volume.abs().clamp(info.volume_min, info.volume_max);
    (v / info.volume_step).round() * info.volume_step
}

/// Applies one decoded action against the simulator.
#[derive(Debug, Clone)]
pub struct OrderLifecycleController {
    max_orders: usize,
    fee: Fee,
}

impl OrderLifecycleController {
    pub fn new(max_orders: usize, fee: Fee) -> Self {
        Self { max_orders, fee }
    }

    /// Run the close/open lifecycle for every symbol.
    ///
    /// RNG draw order is fixed (per symbol: hold first, then one close
    /// decision per existing order) so trajectories are reproducible under
    /// a seed. Returns one intent record per symbol plus the per-symbol
    /// closed-order records, both in `symbols` order.
    pub fn apply<S: MarginSimulator>(
        &self,
        sim: &mut S,
        symbols: &[String],
        decoded: &DecodedAction,
        rng: &mut ChaCha8Rng,
    ) -> (Vec<OrderIntentRecord>, Vec<Vec<ClosedOrderRecord>>) {
        let hedge = sim.hedge();
        let mut intents = Vec::with_capacity(symbols.len());
        let mut closed = Vec::with_capacity(symbols.len());

        for (symbol, intent) in symbols.iter().zip(&decoded.intents) {
            let hold = rng.gen_bool(intent.hold_probability);

            let mut error: Option<OrderError> = None;
            let info = sim.symbol_info(symbol);
            let adjusted = info
                .as_ref()
                .map(|i| modified_volume(i, intent.signed_volume))
                .unwrap_or(0.0);
            if info.is_none() {
                error = Some(OrderError::Rejected(format!(
                    "unknown symbol '{symbol}'"
                )));
            }

            let open_orders = sim.symbol_orders(symbol);
            let mut closed_here = Vec::new();
            for (order, &p) in open_orders.iter().zip(&intent.close_probabilities) {
                if !rng.gen_bool(p) {
                    continue;
                }
                match sim.close_order(order.id) {
                    Ok(snapshot) => closed_here.push(ClosedOrderRecord {
                        order_id: snapshot.id,
                        symbol: snapshot.symbol,
                        direction: snapshot.direction,
                        volume: snapshot.volume,
                        fee: snapshot.fee,
                        margin: snapshot.margin,
                        profit: snapshot.profit,
                        close_probability: p,
                    }),
                    Err(e) => {
                        if error.is_none() {
                            error = Some(OrderError::Rejected(e.to_string()));
                        }
                    }
                }
            }

            // A prototype simulator may enter the episode holding more
            // orders on a symbol than the configured slot count; that
            // reports zero capacity rather than underflowing.
            let still_open = open_orders.len() - closed_here.len();
            let capacity = self.max_orders.saturating_sub(still_open);

            let mut record = OrderIntentRecord {
                symbol: symbol.clone(),
                order_id: None,
                hold,
                hold_probability: intent.hold_probability,
                volume: intent.signed_volume,
                modified_volume: adjusted,
                capacity,
                direction: None,
                fee: None,
                margin: None,
                error,
            };

            if record.error.is_none() {
                if hedge && capacity == 0 {
                    record.error = Some(OrderError::NoCapacity);
                } else if !hold {
                    let direction = OrderDirection::from_signed_volume(intent.signed_volume);
                    let fee = self.fee.resolve(symbol);
                    match sim.create_order(direction, symbol, adjusted, fee) {
                        Ok(order) => {
                            record.order_id = Some(order.id);
                            record.direction = Some(direction);
                            record.fee = Some(fee);
                            record.margin = Some(order.margin);
                        }
                        Err(e) => {
                            record.error = Some(OrderError::Rejected(e.to_string()));
                        }
                    }
                }
            }

            intents.push(record);
            closed.push(closed_here);
        }

        (intents, closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::DecodedIntent;
    use crate::sim::testkit::two_symbol_sim;
    use crate::simulator::MarginSimulator;
    use rand::SeedableRng;

    fn intent(close: Vec<f64>, hold: f64, volume: f64) -> DecodedIntent {
        DecodedIntent {
            close_probabilities: close,
            hold_probability: hold,
            signed_volume: volume,
        }
    }

    fn symbols() -> Vec<String> {
        vec!["EURUSD".to_string(), "GBPUSD".to_string()]
    }

    #[test]
    fn modified_volume_clips_and_snaps() {
        let info = SymbolInfo {
            volume_min: 0.01,
            volume_max: 10.0,
            volume_step: 0.01,
            currency_profit: "USD".to_string(),
        };
        // Boundary raw components +-1 scale to +-100 and clip to the max.
        assert_eq!(modified_volume(&info, 100.0), 10.0);
        assert_eq!(modified_volume(&info, -100.0), 10.0);
        // Below the floor clips up.
        assert_eq!(modified_volume(&info, 0.001), 0.01);
        // Snapping to the step.
        let v = modified_volume(&info, 1.234);
        assert!((v - 1.23).abs() < 1e-12);
        let steps = v / info.volume_step;
        assert!((steps - steps.round()).abs() < 1e-9);
    }

    #[test]
    fn certain_open_creates_one_order_per_symbol() {
        let mut sim = two_symbol_sim(true, 50);
        sim.set_current_time(0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let controller = OrderLifecycleController::new(2, Fee::Fixed(0.0));

        // hold probability 0 => always open; no existing orders to close.
        let decoded = DecodedAction {
            intents: vec![
                intent(vec![0.0, 0.0], 0.0, 2.0),
                intent(vec![0.0, 0.0], 0.0, -3.0),
            ],
        };
        let (records, closed) = controller.apply(&mut sim, &symbols(), &decoded, &mut rng);

        assert_eq!(records.len(), 2);
        assert!(closed.iter().all(|c| c.is_empty()));
        assert_eq!(records[0].direction, Some(OrderDirection::Buy));
        assert_eq!(records[1].direction, Some(OrderDirection::Sell));
        assert!(records[0].order_id.is_some());
        assert!(records[1].order_id.is_some());
        assert!(records[0].error.is_none());
        assert_eq!(sim.symbol_orders("EURUSD").len(), 1);
        assert_eq!(sim.symbol_orders("GBPUSD").len(), 1);
    }

    #[test]
    fn certain_hold_takes_no_action() {
        let mut sim = two_symbol_sim(true, 50);
        sim.set_current_time(0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let controller = OrderLifecycleController::new(1, Fee::Fixed(0.0));

        let decoded = DecodedAction {
            intents: vec![intent(vec![0.0], 1.0, 2.0), intent(vec![0.0], 1.0, -3.0)],
        };
        let (records, _) = controller.apply(&mut sim, &symbols(), &decoded, &mut rng);

        for r in &records {
            assert!(r.hold);
            assert!(r.order_id.is_none());
            assert!(r.error.is_none());
        }
        assert_eq!(sim.open_order_count(), 0);
    }

    #[test]
    fn full_slots_yield_capacity_error_without_touching_other_symbols() {
        let mut sim = two_symbol_sim(true, 50);
        sim.set_current_time(0);
        sim.create_order(OrderDirection::Buy, "EURUSD", 1.0, 0.0)
            .unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let controller = OrderLifecycleController::new(1, Fee::Fixed(0.0));

        // Close probability 0 keeps the slot occupied; hold probability 0
        // asks to open on both symbols.
        let decoded = DecodedAction {
            intents: vec![intent(vec![0.0], 0.0, 2.0), intent(vec![0.0], 0.0, -3.0)],
        };
        let (records, closed) = controller.apply(&mut sim, &symbols(), &decoded, &mut rng);

        assert_eq!(records[0].error, Some(OrderError::NoCapacity));
        assert!(records[0].order_id.is_none());
        assert_eq!(records[0].capacity, 0);
        assert!(closed[0].is_empty());

        // The second symbol is unaffected.
        assert!(records[1].error.is_none());
        assert!(records[1].order_id.is_some());
        assert_eq!(sim.symbol_orders("GBPUSD").len(), 1);
    }

    #[test]
    fn overfull_symbol_reports_zero_capacity() {
        let mut sim = two_symbol_sim(true, 50);
        sim.set_current_time(0);
        // Two pre-existing orders against a single configured slot.
        sim.create_order(OrderDirection::Buy, "EURUSD", 1.0, 0.0)
            .unwrap();
        sim.create_order(OrderDirection::Buy, "EURUSD", 1.0, 0.0)
            .unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let controller = OrderLifecycleController::new(1, Fee::Fixed(0.0));

        // Keep both orders open and ask to open another.
        let decoded = DecodedAction {
            intents: vec![
                intent(vec![0.0], 0.0, 2.0),
                intent(vec![0.0], 0.0, -3.0),
            ],
        };
        let (records, closed) = controller.apply(&mut sim, &symbols(), &decoded, &mut rng);

        assert_eq!(records[0].capacity, 0);
        assert_eq!(records[0].error, Some(OrderError::NoCapacity));
        assert!(records[0].order_id.is_none());
        assert!(closed[0].is_empty());
        assert_eq!(sim.symbol_orders("EURUSD").len(), 2);

        // The other symbol proceeds normally.
        assert!(records[1].error.is_none());
        assert!(records[1].order_id.is_some());
    }

    #[test]
    fn certain_close_frees_the_slot_and_reopens() {
        let mut sim = two_symbol_sim(true, 50);
        sim.set_current_time(0);
        let first = sim
            .create_order(OrderDirection::Buy, "EURUSD", 1.0, 0.0)
            .unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let controller = OrderLifecycleController::new(1, Fee::Fixed(0.0));

        let decoded = DecodedAction {
            intents: vec![intent(vec![1.0], 0.0, -2.0), intent(vec![1.0], 1.0, 0.0)],
        };
        let (records, closed) = controller.apply(&mut sim, &symbols(), &decoded, &mut rng);

        assert_eq!(closed[0].len(), 1);
        assert_eq!(closed[0][0].order_id, first.id);
        assert_eq!(closed[0][0].close_probability, 1.0);
        assert_eq!(records[0].capacity, 1);
        assert!(records[0].error.is_none());
        assert_eq!(records[0].direction, Some(OrderDirection::Sell));
        assert_eq!(sim.symbol_orders("EURUSD").len(), 1);
        assert_ne!(sim.symbol_orders("EURUSD")[0].id, first.id);
    }

    #[test]
    fn validation_rejection_is_recorded_not_raised() {
        let mut sim = two_symbol_sim(true, 50);
        sim.set_funds(0.0);
        sim.set_current_time(0);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let controller = OrderLifecycleController::new(1, Fee::Fixed(0.0));

        let decoded = DecodedAction {
            intents: vec![intent(vec![0.0], 0.0, 5.0), intent(vec![0.0], 1.0, 0.0)],
        };
        let (records, _) = controller.apply(&mut sim, &symbols(), &decoded, &mut rng);

        match &records[0].error {
            Some(OrderError::Rejected(reason)) => {
                assert!(reason.contains("free margin"), "{reason}");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(records[0].order_id.is_none());
        assert_eq!(sim.open_order_count(), 0);
    }
}
