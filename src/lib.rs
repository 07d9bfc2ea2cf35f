//! Trading journal engine: a persisted trade ledger with realized P&L
//! derivation and portfolio statistics.
//!
//! The calculations in [`calculations`] are pure functions over in-memory
//! trades. [`commands`] mediates between a [`db::TradeStore`] and those
//! calculations the way an application layer would.

pub mod calculations;
pub mod commands;
pub mod db;
pub mod error;
pub mod models;

pub use calculations::{calculate_pnl, calculate_pnl_percentage, calculate_stats};
pub use db::{Database, TradeStore};
pub use error::{JournalError, Result};
pub use models::{
    MarketCategory, ProfitFactor, Trade, TradeDirection, TradeDraft, TradeFilters, TradeStatus,
    TradeUpdate, TradingStats,
};
