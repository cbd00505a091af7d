//! Capped capital allocation and the buy → confirm → exit order lifecycle.
//!
//! [`RunCoordinator`] reads a symbol list once, plans a shared per-symbol
//! allocation under a spend cap, then processes symbols strictly in order:
//! notional market buy, acceptance poll, position-delta fill poll, reference
//! price, and a one-cancels-other exit sized to the confirmed delta.

pub mod allocation;
pub mod coordinator;
pub mod error;
pub mod exits;
pub mod fill;
pub mod price;
pub mod retry;
pub mod types;

pub use allocation::{allocate, plan_budget, projected_allocations, Allocation};
pub use coordinator::{RunCoordinator, RunPreview};
pub use error::{RunAbort, SymbolError};
pub use exits::{exit_prices, ExitOrderBuilder};
pub use fill::{client_order_id, FillConfirmer};
pub use price::{reference_price, PriceResolver, PriceSource};
pub use retry::{poll_until, Polled};
pub use types::{BudgetPlan, OrderLifecycleRecord, Outcome, RunResult, RunSummary};
