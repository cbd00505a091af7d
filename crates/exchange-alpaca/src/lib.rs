//! Alpaca adapter: trading API (account, orders, positions) and market
//! data snapshots behind the core `BrokerService` and `PriceService` traits.
//!
//! # Example
//!
//! ```no_run
//! use notional_deploy_alpaca::{AlpacaClient, AlpacaClientConfig};
//! use notional_deploy_core::BrokerService;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AlpacaClient::from_env(AlpacaClientConfig::default())?;
//! let account = client.account().await?;
//! println!("buying power: {}", account.buying_power);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
mod service;
mod types;

pub use auth::{AlpacaAuthConfig, AlpacaCredentials};
pub use client::{AlpacaClient, AlpacaClientConfig};
pub use error::{AlpacaError, Result};
