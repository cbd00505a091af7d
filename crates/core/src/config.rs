use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Default Alpaca paper trading endpoint.
pub const ALPACA_PAPER_URL: &str = "https://paper-api.alpaca.markets";

/// Default Alpaca market data endpoint.
pub const ALPACA_DATA_URL: &str = "https://data.alpaca.markets";

/// Complete configuration for one deployment run.
///
/// Built once at startup by [`crate::ConfigLoader`] and passed by reference
/// into the planner and the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployerConfig {
    pub allocation: AllocationConfig,
    pub exits: ExitConfig,
    pub polling: PollingConfig,
    pub broker: BrokerConfig,
    pub sheet: SheetConfig,
    pub symbols: SymbolListConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Fraction of buying power allotted to each symbol before capping.
    pub buy_fraction: Decimal,
    /// Smallest notional the broker accepts for a fractional buy.
    pub min_notional: Decimal,
    /// Fraction of buying power a single run may commit across all symbols.
    pub spend_cap_fraction: Decimal,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            buy_fraction: dec!(0.07),
            min_notional: dec!(1.00),
            spend_cap_fraction: dec!(0.90),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    pub take_profit_pct: Decimal,
    pub stop_loss_pct: Decimal,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            take_profit_pct: dec!(0.05),
            stop_loss_pct: dec!(0.03),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub acceptance_attempts: u32,
    pub acceptance_interval_ms: u64,
    pub fill_attempts: u32,
    pub fill_interval_ms: u64,
    /// Attempts for the buy submission itself (transient errors only).
    pub submit_attempts: u32,
    pub submit_backoff_ms: u64,
    /// Pause after every symbol, whatever its outcome.
    pub symbol_pause_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            acceptance_attempts: 12,
            acceptance_interval_ms: 1000,
            fill_attempts: 60,
            fill_interval_ms: 1000,
            submit_attempts: 3,
            submit_backoff_ms: 500,
            symbol_pause_ms: 400,
        }
    }
}

impl PollingConfig {
    #[must_use]
    pub fn acceptance_interval(&self) -> Duration {
        Duration::from_millis(self.acceptance_interval_ms)
    }

    #[must_use]
    pub fn fill_interval(&self) -> Duration {
        Duration::from_millis(self.fill_interval_ms)
    }

    #[must_use]
    pub fn submit_backoff(&self) -> Duration {
        Duration::from_millis(self.submit_backoff_ms)
    }

    #[must_use]
    pub fn symbol_pause(&self) -> Duration {
        Duration::from_millis(self.symbol_pause_ms)
    }

    /// Zero-wait polling, for tests and dry runs.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            acceptance_interval_ms: 0,
            fill_interval_ms: 0,
            submit_backoff_ms: 0,
            symbol_pause_ms: 0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub base_url: String,
    pub data_url: String,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: ALPACA_PAPER_URL.to_string(),
            data_url: ALPACA_DATA_URL.to_string(),
            requests_per_minute: 200,
            timeout_secs: 30,
        }
    }
}

impl BrokerConfig {
    /// True when the base URL points at the paper trading host.
    #[must_use]
    pub fn is_paper(&self) -> bool {
        self.base_url.contains("paper-api.alpaca.markets")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Spreadsheet key. When absent the spreadsheet is looked up by `sheet_name`.
    pub sheet_id: Option<String>,
    pub sheet_name: String,
    pub worksheet: String,
    pub symbol_column: String,
    pub log_columns: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            sheet_id: None,
            sheet_name: "Active-Investing".to_string(),
            worksheet: "Alpaca Integration".to_string(),
            symbol_column: "A".to_string(),
            log_columns: "C:D".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolListConfig {
    /// First-row values treated as a column header rather than a symbol.
    pub header_tokens: Vec<String>,
}

impl Default for SymbolListConfig {
    fn default() -> Self {
        Self {
            header_tokens: ["TICKER", "TICKERS", "SYMBOL", "SYMBOLS"]
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl DeployerConfig {
    /// Rejects values that would make a run meaningless or unsafe.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Configuration`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        let a = &self.allocation;
        check_fraction("allocation.buy_fraction", a.buy_fraction)?;
        check_fraction("allocation.spend_cap_fraction", a.spend_cap_fraction)?;
        if a.min_notional <= Decimal::ZERO {
            return Err(ServiceError::Configuration(format!(
                "allocation.min_notional must be positive, got {}",
                a.min_notional
            )));
        }

        check_fraction("exits.take_profit_pct", self.exits.take_profit_pct)?;
        check_fraction("exits.stop_loss_pct", self.exits.stop_loss_pct)?;
        // A stop at or below zero would be a meaningless trigger.
        if self.exits.stop_loss_pct >= Decimal::ONE {
            return Err(ServiceError::Configuration(
                "exits.stop_loss_pct must be below 1".to_string(),
            ));
        }

        let p = &self.polling;
        for (name, value) in [
            ("polling.acceptance_attempts", p.acceptance_attempts),
            ("polling.fill_attempts", p.fill_attempts),
            ("polling.submit_attempts", p.submit_attempts),
        ] {
            if value == 0 {
                return Err(ServiceError::Configuration(format!(
                    "{name} must be at least 1"
                )));
            }
        }

        if !self.broker.base_url.starts_with("https://") {
            return Err(ServiceError::Configuration(format!(
                "broker.base_url looks wrong: '{}'",
                self.broker.base_url
            )));
        }
        if self.broker.requests_per_minute == 0 {
            return Err(ServiceError::Configuration(
                "broker.requests_per_minute must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn check_fraction(name: &str, value: Decimal) -> Result<()> {
    if value <= Decimal::ZERO || value > Decimal::ONE {
        return Err(ServiceError::Configuration(format!(
            "{name} must be in (0, 1], got {value}"
        )));
    }
    Ok(())
}
