// src/sim.rs
//
// In-memory reference simulator implementing the MarginSimulator contract.
//
// Used by the test suites and the rollout binary. The margin model is
// deliberately small: margin = volume * price / leverage, profit marked at
// the latest close price, fee charged on entry notional. It is not the
// production simulator and makes no attempt to model swaps, slippage or
// multi-currency conversion chains.

use std::collections::BTreeMap;

use crate::simulator::{MarginSimulator, OrderValidationError};
use crate::types::{
    OpenOrder, OrderDirection, OrderId, PricePoint, SymbolInfo, TimestampMs,
};

/// A symbol's candle series on a fixed time axis.
#[derive(Debug, Clone)]
struct SymbolSeries {
    time_points: Vec<TimestampMs>,
    candles: Vec<PricePoint>,
}

impl SymbolSeries {
    /// Index of the last point at or before `time`.
    fn index_at(&self, time: TimestampMs) -> Option<usize> {
        match self.time_points.binary_search(&time) {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
    }
}

/// Compact in-memory margin simulator.
#[derive(Debug, Clone)]
pub struct ReferenceSimulator {
    unit: String,
    balance: f64,
    equity: f64,
    leverage: f64,
    hedge: bool,
    current_time: TimestampMs,
    next_order_id: OrderId,
    orders: Vec<OpenOrder>,
    series: BTreeMap<String, SymbolSeries>,
    infos: BTreeMap<String, SymbolInfo>,
}

impl ReferenceSimulator {
    pub fn new(balance: f64, hedge: bool) -> Self {
        Self {
            unit: "USD".to_string(),
            balance,
            equity: balance,
            leverage: 100.0,
            hedge,
            current_time: 0,
            next_order_id: 1,
            orders: Vec::new(),
            series: BTreeMap::new(),
            infos: BTreeMap::new(),
        }
    }

    pub fn with_leverage(mut self, leverage: f64) -> Self {
        self.leverage = leverage;
        self
    }

    /// Register a symbol with flat candles derived from `closes`.
    ///
    /// `time_points` and `closes` must have equal lengths and the time axis
    /// must be strictly increasing.
    pub fn add_symbol(
        &mut self,
        symbol: &str,
        info: SymbolInfo,
        time_points: Vec<TimestampMs>,
        closes: Vec<f64>,
    ) {
        assert_eq!(time_points.len(), closes.len(), "series length mismatch");
        let candles = closes.iter().map(|&c| PricePoint::flat(c)).collect();
        self.series.insert(
            symbol.to_string(),
            SymbolSeries {
                time_points,
                candles,
            },
        );
        self.infos.insert(symbol.to_string(), info);
    }

    pub fn open_order_count(&self) -> usize {
        self.orders.len()
    }

    fn close_price(&self, symbol: &str, time: TimestampMs) -> Option<f64> {
        let series = self.series.get(symbol)?;
        let idx = series.index_at(time)?;
        Some(series.candles[idx].close)
    }

    /// Re-mark every open order at the current time and refresh equity.
    fn recompute(&mut self) {
        let marks: Vec<Option<f64>> = self
            .orders
            .iter()
            .map(|o| self.close_price(&o.symbol, self.current_time))
            .collect();
        for (order, mark) in self.orders.iter_mut().zip(marks) {
            if let Some(price) = mark {
                let gross = order.direction.sign() * (price - order.entry_price) * order.volume;
                let fee_cost = order.fee * order.volume * order.entry_price;
                order.profit = gross - fee_cost;
            }
        }
        self.equity = self.balance + self.orders.iter().map(|o| o.profit).sum::<f64>();
    }
}

impl MarginSimulator for ReferenceSimulator {
    fn balance(&self) -> f64 {
        self.balance
    }

    fn equity(&self) -> f64 {
        self.equity
    }

    fn margin(&self) -> f64 {
        self.orders.iter().map(|o| o.margin).sum()
    }

    fn hedge(&self) -> bool {
        self.hedge
    }

    fn symbols(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }

    fn symbol_info(&self, symbol: &str) -> Option<SymbolInfo> {
        self.infos.get(symbol).cloned()
    }

    fn unit_symbol(&self, currency: &str) -> Option<String> {
        if currency == self.unit {
            return Some(currency.to_string());
        }
        self.series
            .keys()
            .find(|s| s.starts_with(currency) && s.ends_with(&self.unit))
            .cloned()
    }

    fn time_points(&self, symbol: &str) -> Option<Vec<TimestampMs>> {
        self.series.get(symbol).map(|s| s.time_points.clone())
    }

    fn symbol_orders(&self, symbol: &str) -> Vec<OpenOrder> {
        self.orders
            .iter()
            .filter(|o| o.symbol == symbol)
            .cloned()
            .collect()
    }

    fn create_order(
        &mut self,
        direction: OrderDirection,
        symbol: &str,
        volume: f64,
        fee: f64,
    ) -> Result<OpenOrder, OrderValidationError> {
        let info = self
            .infos
            .get(symbol)
            .ok_or_else(|| OrderValidationError::new(format!("unknown symbol '{symbol}'")))?;

        if volume < info.volume_min || volume > info.volume_max {
            return Err(OrderValidationError::new(format!(
                "volume {volume} outside [{}, {}]",
                info.volume_min, info.volume_max
            )));
        }
        let steps = volume / info.volume_step;
        if (steps - steps.round()).abs() > 1e-6 {
            return Err(OrderValidationError::new(format!(
                "volume {volume} not a multiple of step {}",
                info.volume_step
            )));
        }
        if !self.hedge && self.orders.iter().any(|o| o.symbol == symbol) {
            return Err(OrderValidationError::new(format!(
                "symbol '{symbol}' already has an open order"
            )));
        }

        let entry_price = self
            .close_price(symbol, self.current_time)
            .ok_or_else(|| {
                OrderValidationError::new(format!("no price for '{symbol}' at current time"))
            })?;

        let margin = volume * entry_price / self.leverage;
        let free_margin = self.equity - self.margin();
        if margin > free_margin {
            return Err(OrderValidationError::new(format!(
                "not enough free margin: required {margin:.2}, available {free_margin:.2}"
            )));
        }

        let fee_cost = fee * volume * entry_price;
        let order = OpenOrder {
            id: self.next_order_id,
            symbol: symbol.to_string(),
            direction,
            volume,
            fee,
            entry_price,
            entry_time: self.current_time,
            margin,
            profit: -fee_cost,
        };
        self.next_order_id += 1;
        self.orders.push(order.clone());
        self.recompute();
        Ok(order)
    }

    fn close_order(&mut self, id: OrderId) -> Result<OpenOrder, OrderValidationError> {
        self.recompute();
        let idx = self
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| OrderValidationError::new(format!("no open order with id {id}")))?;
        let order = self.orders.remove(idx);
        self.balance += order.profit;
        self.recompute();
        Ok(order)
    }

    fn set_current_time(&mut self, time: TimestampMs) {
        self.current_time = time;
        self.recompute();
    }

    fn advance_time(&mut self, delta_ms: TimestampMs) {
        self.current_time += delta_ms;
        self.recompute();
    }

    fn price_at(&self, symbol: &str, time: TimestampMs) -> Option<PricePoint> {
        let series = self.series.get(symbol)?;
        let idx = series.index_at(time)?;
        Some(series.candles[idx])
    }

    fn set_funds(&mut self, amount: f64) {
        self.balance = amount;
        self.equity = amount;
        self.recompute();
    }
}

#[cfg(test)]
pub(crate) mod testkit {
    use super::*;

    pub fn symbol_info(currency_profit: &str) -> SymbolInfo {
        SymbolInfo {
            volume_min: 0.01,
            volume_max: 10.0,
            volume_step: 0.01,
            currency_profit: currency_profit.to_string(),
        }
    }

    /// Simulator with two USD-profit symbols on an hourly axis.
    pub fn two_symbol_sim(hedge: bool, points: usize) -> ReferenceSimulator {
        let mut sim = ReferenceSimulator::new(10_000.0, hedge);
        let hour = 3_600_000i64;
        let times: Vec<TimestampMs> = (0..points).map(|i| i as i64 * hour).collect();
        let eurusd: Vec<f64> = (0..points).map(|i| 1.10 + 0.001 * (i as f64)).collect();
        let gbpusd: Vec<f64> = (0..points)
            .map(|i| 1.30 - 0.0005 * (i as f64) + 0.002 * ((i as f64) * 0.7).sin())
            .collect();
        sim.add_symbol("EURUSD", symbol_info("USD"), times.clone(), eurusd);
        sim.add_symbol("GBPUSD", symbol_info("USD"), times, gbpusd);
        sim
    }
}

#[cfg(test)]
mod tests {
    use super::testkit::two_symbol_sim;
    use super::*;

    #[test]
    fn open_mark_and_close_long() {
        let mut sim = two_symbol_sim(true, 100);
        sim.set_current_time(0);

        let order = sim
            .create_order(OrderDirection::Buy, "EURUSD", 1.0, 0.0)
            .unwrap();
        assert_eq!(order.entry_price, 1.10);
        assert!((sim.margin() - 1.10 / 100.0).abs() < 1e-12);

        // Price moves up 10 ticks: +0.01 per unit volume.
        sim.advance_time(10 * 3_600_000);
        let marked = &sim.symbol_orders("EURUSD")[0];
        assert!((marked.profit - 0.01).abs() < 1e-9);
        assert!((sim.equity() - (10_000.0 + 0.01)).abs() < 1e-9);

        let closed = sim.close_order(order.id).unwrap();
        assert!((closed.profit - 0.01).abs() < 1e-9);
        assert!((sim.balance() - 10_000.01).abs() < 1e-9);
        assert_eq!(sim.open_order_count(), 0);
    }

    #[test]
    fn fee_reduces_profit() {
        let mut sim = two_symbol_sim(true, 100);
        sim.set_current_time(0);
        let order = sim
            .create_order(OrderDirection::Buy, "EURUSD", 1.0, 0.001)
            .unwrap();
        // Entry fee only: profit = -fee * volume * entry.
        assert!((order.profit + 0.001 * 1.10).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_volume_and_duplicate_position() {
        let mut sim = two_symbol_sim(false, 100);
        sim.set_current_time(0);

        assert!(sim
            .create_order(OrderDirection::Buy, "EURUSD", 100.0, 0.0)
            .is_err());
        assert!(sim
            .create_order(OrderDirection::Buy, "EURUSD", 0.015, 0.0)
            .is_err());

        sim.create_order(OrderDirection::Buy, "EURUSD", 1.0, 0.0)
            .unwrap();
        let err = sim
            .create_order(OrderDirection::Sell, "EURUSD", 1.0, 0.0)
            .unwrap_err();
        assert!(err.reason.contains("already has an open order"));
    }

    #[test]
    fn rejects_when_free_margin_exhausted() {
        let mut sim = two_symbol_sim(true, 100).with_leverage(1.0);
        sim.set_funds(1.0);
        sim.set_current_time(0);
        let err = sim
            .create_order(OrderDirection::Buy, "EURUSD", 10.0, 0.0)
            .unwrap_err();
        assert!(err.reason.contains("free margin"));
    }

    #[test]
    fn unit_symbol_resolution() {
        let sim = two_symbol_sim(true, 10);
        assert_eq!(sim.unit_symbol("USD").as_deref(), Some("USD"));
        assert_eq!(sim.unit_symbol("EUR").as_deref(), Some("EURUSD"));
        assert_eq!(sim.unit_symbol("JPY"), None);
    }
}
