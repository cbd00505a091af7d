//! Scripted in-memory collaborators for engine tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use notional_deploy_core::{
    AccountSnapshot, BrokerService, DeployerConfig, OrderRequest, OrderStatus, OutcomeRow,
    PollingConfig, PriceService, PriceSnapshot, Result, ServiceError, SubmittedOrder, Symbol,
    SymbolSource,
};
use notional_deploy_engine::RunCoordinator;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// =============================================================================
// Broker
// =============================================================================

/// How a symbol's position reacts to a buy.
#[derive(Debug, Clone, Copy)]
pub enum FillPlan {
    /// The position grows by `qty` after `reads` unchanged position reads.
    After { reads: u32, qty: Decimal },
    /// The position never changes.
    Never,
}

/// One scripted buy-submission failure.
#[derive(Debug, Clone)]
pub enum SubmitScript {
    /// The broker refuses; nothing lands.
    Fail(ServiceError),
    /// The order lands at the broker but the caller sees an error.
    LandThenFail(ServiceError),
}

#[derive(Default)]
pub struct BrokerState {
    pub buying_power: Decimal,
    pub account_error: Option<ServiceError>,
    pub positions: HashMap<String, Decimal>,
    pub fills: HashMap<String, FillPlan>,
    pub submit_scripts: HashMap<String, VecDeque<SubmitScript>>,
    pub initial_status: HashMap<String, OrderStatus>,
    pub status_scripts: HashMap<String, VecDeque<OrderStatus>>,
    pub position_errors: HashSet<String>,
    pub exit_errors: HashSet<String>,

    /// Orders the broker accepted, in submission order.
    pub submitted: Vec<OrderRequest>,
    /// Every buy submission call, including failed ones, by client order id.
    pub buy_calls: Vec<String>,
    pub account_calls: usize,

    pending: HashMap<String, (u32, Decimal)>,
    orders: HashMap<String, String>,
    by_client_id: HashMap<String, SubmittedOrder>,
    next_id: u32,
}

pub struct FakeBroker {
    pub state: Mutex<BrokerState>,
}

impl FakeBroker {
    pub fn new(buying_power: Decimal) -> Self {
        Self {
            state: Mutex::new(BrokerState {
                buying_power,
                ..BrokerState::default()
            }),
        }
    }

    pub fn with<F: FnOnce(&mut BrokerState)>(self, f: F) -> Self {
        f(&mut self.state.lock().unwrap());
        self
    }

    pub fn buys(&self) -> Vec<OrderRequest> {
        self.state
            .lock()
            .unwrap()
            .submitted
            .iter()
            .filter(|o| matches!(o, OrderRequest::MarketBuy(_)))
            .cloned()
            .collect()
    }

    pub fn exits(&self) -> Vec<OrderRequest> {
        self.state
            .lock()
            .unwrap()
            .submitted
            .iter()
            .filter(|o| matches!(o, OrderRequest::OcoExit(_)))
            .cloned()
            .collect()
    }

    pub fn buy_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().buy_calls.clone()
    }
}

impl BrokerState {
    fn land(&mut self, request: &OrderRequest, client_order_id: Option<String>) -> SubmittedOrder {
        self.next_id += 1;
        let id = format!("ord-{}", self.next_id);
        let symbol = request.symbol().to_string();
        self.orders.insert(id.clone(), symbol.clone());

        let status = match request {
            OrderRequest::MarketBuy(_) => {
                let plan = self
                    .fills
                    .get(&symbol)
                    .copied()
                    .unwrap_or(FillPlan::After { reads: 1, qty: dec!(0.5) });
                if let FillPlan::After { reads, qty } = plan {
                    self.pending.insert(symbol.clone(), (reads, qty));
                }
                self.initial_status
                    .get(&symbol)
                    .cloned()
                    .unwrap_or(OrderStatus::PendingNew)
            }
            OrderRequest::OcoExit(_) => OrderStatus::New,
        };

        let order = SubmittedOrder {
            id,
            client_order_id: client_order_id.clone(),
            status,
        };
        if let Some(cid) = client_order_id {
            self.by_client_id.insert(cid, order.clone());
        }
        self.submitted.push(request.clone());
        order
    }
}

#[async_trait]
impl BrokerService for FakeBroker {
    async fn account(&self) -> Result<AccountSnapshot> {
        let mut state = self.state.lock().unwrap();
        state.account_calls += 1;
        if let Some(err) = state.account_error.clone() {
            return Err(err);
        }
        Ok(AccountSnapshot {
            buying_power: state.buying_power,
            status: Some("ACTIVE".to_string()),
        })
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<SubmittedOrder> {
        let mut state = self.state.lock().unwrap();
        let symbol = order.symbol().to_string();

        match order {
            OrderRequest::MarketBuy(buy) => {
                state.buy_calls.push(buy.client_order_id.clone());
                if state.by_client_id.contains_key(&buy.client_order_id) {
                    return Err(ServiceError::DuplicateClientOrderId(
                        "client_order_id must be unique".to_string(),
                    ));
                }
                let script = state
                    .submit_scripts
                    .get_mut(&symbol)
                    .and_then(VecDeque::pop_front);
                match script {
                    Some(SubmitScript::Fail(err)) => Err(err),
                    Some(SubmitScript::LandThenFail(err)) => {
                        state.land(order, Some(buy.client_order_id.clone()));
                        Err(err)
                    }
                    None => Ok(state.land(order, Some(buy.client_order_id.clone()))),
                }
            }
            OrderRequest::OcoExit(_) => {
                if state.exit_errors.contains(&symbol) {
                    return Err(ServiceError::rejected(422, "insufficient qty available for order"));
                }
                Ok(state.land(order, None))
            }
        }
    }

    async fn order_status(&self, order_id: &str) -> Result<OrderStatus> {
        let mut state = self.state.lock().unwrap();
        let symbol = state
            .orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(order_id.to_string()))?;
        Ok(state
            .status_scripts
            .get_mut(&symbol)
            .and_then(VecDeque::pop_front)
            .unwrap_or(OrderStatus::Accepted))
    }

    async fn order_by_client_id(&self, client_order_id: &str) -> Result<SubmittedOrder> {
        let state = self.state.lock().unwrap();
        state
            .by_client_id
            .get(client_order_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(client_order_id.to_string()))
    }

    async fn position_qty(&self, symbol: &Symbol) -> Result<Decimal> {
        let mut state = self.state.lock().unwrap();
        let key = symbol.to_string();
        if state.position_errors.contains(&key) {
            return Err(ServiceError::Network("connection reset".to_string()));
        }

        let mut applied = None;
        if let Some((reads, qty)) = state.pending.get_mut(&key) {
            if *reads == 0 {
                applied = Some(*qty);
            } else {
                *reads -= 1;
            }
        }
        if let Some(qty) = applied {
            state.pending.remove(&key);
            *state.positions.entry(key.clone()).or_insert(Decimal::ZERO) += qty;
        }

        Ok(state.positions.get(&key).copied().unwrap_or(Decimal::ZERO))
    }
}

// =============================================================================
// Prices
// =============================================================================

#[derive(Default)]
pub struct FakePrices {
    pub snapshots: HashMap<String, PriceSnapshot>,
    pub calls: Mutex<Vec<String>>,
}

impl FakePrices {
    pub fn with_trade(mut self, symbol: &str, price: Decimal) -> Self {
        self.snapshots.insert(
            symbol.to_string(),
            PriceSnapshot {
                trade: Some(price),
                ..PriceSnapshot::default()
            },
        );
        self
    }

    pub fn with_snapshot(mut self, symbol: &str, snapshot: PriceSnapshot) -> Self {
        self.snapshots.insert(symbol.to_string(), snapshot);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceService for FakePrices {
    async fn snapshot(&self, symbol: &Symbol) -> Result<PriceSnapshot> {
        self.calls.lock().unwrap().push(symbol.to_string());
        Ok(self
            .snapshots
            .get(symbol.as_str())
            .cloned()
            .unwrap_or_default())
    }
}

// =============================================================================
// List
// =============================================================================

#[derive(Default)]
pub struct FakeList {
    pub raw: Vec<String>,
    pub read_error: Option<ServiceError>,
    pub clear_error: Option<ServiceError>,
    pub record_error: Option<ServiceError>,
    pub clears: Mutex<usize>,
    pub recorded: Mutex<Vec<OutcomeRow>>,
}

impl FakeList {
    pub fn new(raw: &[&str]) -> Self {
        Self {
            raw: raw.iter().map(|s| (*s).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn clears(&self) -> usize {
        *self.clears.lock().unwrap()
    }

    pub fn recorded(&self) -> Vec<OutcomeRow> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl SymbolSource for FakeList {
    async fn read_symbols(&self) -> Result<Vec<String>> {
        match &self.read_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.raw.clone()),
        }
    }

    async fn clear_symbols(&self) -> Result<()> {
        *self.clears.lock().unwrap() += 1;
        match &self.clear_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn record_outcomes(&self, rows: &[OutcomeRow]) -> Result<()> {
        if let Some(err) = &self.record_error {
            return Err(err.clone());
        }
        self.recorded.lock().unwrap().extend_from_slice(rows);
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub fn test_config() -> DeployerConfig {
    DeployerConfig {
        polling: PollingConfig {
            acceptance_attempts: 5,
            fill_attempts: 5,
            ..PollingConfig::immediate()
        },
        ..DeployerConfig::default()
    }
}

pub fn coordinator(
    config: DeployerConfig,
    broker: &Arc<FakeBroker>,
    prices: &Arc<FakePrices>,
) -> RunCoordinator {
    RunCoordinator::new(config, broker.clone(), prices.clone())
}

pub fn sym(s: &str) -> Symbol {
    Symbol::parse(s).unwrap()
}
