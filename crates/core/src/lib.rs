//! Core types, configuration and collaborator contracts for notional
//! capital deployment.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod money;
pub mod symbol;
pub mod traits;
pub mod types;

pub use config::{
    AllocationConfig, BrokerConfig, DeployerConfig, ExitConfig, PollingConfig, SheetConfig,
    SymbolListConfig, ALPACA_DATA_URL, ALPACA_PAPER_URL,
};
pub use config_loader::{ConfigLoader, DEFAULT_CONFIG_PATH};
pub use error::{Result, ServiceError};
pub use symbol::{normalize_symbols, Symbol};
pub use traits::{BrokerService, PriceService, SymbolSource};
pub use types::{
    AccountSnapshot, MarketBuy, OcoExit, OrderRequest, OrderStatus, OutcomeRow, PriceSnapshot,
    Quote, SubmittedOrder,
};
