// src/simulator.rs
//
// Narrow contract consumed from the external position/margin simulator.
//
// The environment never looks inside the simulator: order bookkeeping,
// margin/equity/profit arithmetic, fee application and time progression
// all live behind this trait. Episodes run against a clone of a prototype
// simulator, so implementors must be `Clone`.

use thiserror::Error;

use crate::types::{OpenOrder, OrderDirection, OrderId, PricePoint, SymbolInfo, TimestampMs};

/// Rejection of an order request on economic or structural grounds
/// (volume bounds, free margin, duplicate position, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct OrderValidationError {
    pub reason: String,
}

impl OrderValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// External position/margin simulator contract.
///
/// All mutation happens through `create_order`, `close_order`,
/// `advance_time`, `set_current_time` and `set_funds`; everything else is
/// a read-only view of the simulator's state.
pub trait MarginSimulator: Clone {
    // ----- Account readbacks -----
    fn balance(&self) -> f64;
    fn equity(&self) -> f64;
    fn margin(&self) -> f64;
    fn free_margin(&self) -> f64 {
        self.equity() - self.margin()
    }
    /// Equity / margin ratio; infinite when no margin is reserved.
    fn margin_level(&self) -> f64 {
        let margin = self.margin();
        if margin > 0.0 {
            self.equity() / margin
        } else {
            f64::INFINITY
        }
    }

    /// Whether more than one concurrent order per symbol is permitted.
    fn hedge(&self) -> bool;

    // ----- Metadata -----
    /// Symbols for which the simulator holds price data.
    fn symbols(&self) -> Vec<String>;
    fn symbol_info(&self, symbol: &str) -> Option<SymbolInfo>;
    /// Symbol that converts `currency` into the account unit, if any.
    fn unit_symbol(&self, currency: &str) -> Option<String>;
    /// Full time axis of a symbol's price series.
    fn time_points(&self, symbol: &str) -> Option<Vec<TimestampMs>>;

    // ----- Orders -----
    /// Open orders on `symbol`, in creation order.
    fn symbol_orders(&self, symbol: &str) -> Vec<OpenOrder>;
    fn create_order(
        &mut self,
        direction: OrderDirection,
        symbol: &str,
        volume: f64,
        fee: f64,
    ) -> Result<OpenOrder, OrderValidationError>;
    /// Close an open order, realizing its profit. Returns the closed
    /// order's final snapshot.
    fn close_order(&mut self, id: OrderId) -> Result<OpenOrder, OrderValidationError>;

    // ----- Time -----
    fn set_current_time(&mut self, time: TimestampMs);
    fn advance_time(&mut self, delta_ms: TimestampMs);
    /// Point-in-time price lookup on the symbol's series.
    fn price_at(&self, symbol: &str, time: TimestampMs) -> Option<PricePoint>;

    // ----- Episode initialization -----
    /// Overwrite both balance and equity with `amount` (randomized episode
    /// starts).
    fn set_funds(&mut self, amount: f64);
}
