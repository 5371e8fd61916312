// src/types.rs
//
// Common shared types for the margin-gym environment.

use serde::{Deserialize, Serialize};

/// Millisecond timestamp since Unix epoch.
pub type TimestampMs = i64;

/// Simulator-assigned order identifier.
pub type OrderId = u64;

/// Buy or sell direction for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderDirection {
    Buy,
    Sell,
}

impl OrderDirection {
    /// Sign convention: Buy = +1, Sell = -1.
    pub fn sign(&self) -> f64 {
        match self {
            OrderDirection::Buy => 1.0,
            OrderDirection::Sell => -1.0,
        }
    }

    /// Direction implied by a signed volume. Non-positive volume maps to Sell.
    pub fn from_signed_volume(volume: f64) -> Self {
        if volume > 0.0 {
            OrderDirection::Buy
        } else {
            OrderDirection::Sell
        }
    }
}

/// One priced point of a symbol's series (OHLC).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PricePoint {
    /// A flat candle where all four fields equal `price`.
    pub fn flat(price: f64) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    pub fn field(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::High => self.high,
            PriceField::Low => self.low,
            PriceField::Close => self.close,
        }
    }
}

/// Selectable price field for the feature cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
}

/// Per-symbol trading metadata exposed by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Smallest tradable volume.
    pub volume_min: f64,
    /// Largest tradable volume.
    pub volume_max: f64,
    /// Volume granularity; tradable volumes are integer multiples of this.
    pub volume_step: f64,
    /// Currency in which profit on this symbol is denominated.
    pub currency_profit: String,
}

/// Snapshot of an open order as reported by the simulator.
///
/// `profit` and `margin` reflect the simulator's current mark, not the
/// values at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub id: OrderId,
    pub symbol: String,
    pub direction: OrderDirection,
    pub volume: f64,
    /// Fee rate agreed at creation.
    pub fee: f64,
    pub entry_price: f64,
    pub entry_time: TimestampMs,
    pub margin: f64,
    pub profit: f64,
}
