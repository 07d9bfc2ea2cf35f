pub mod format;
pub mod performance;
pub mod pnl;
pub mod stats;

pub use format::{format_currency, format_percentage};
pub use performance::{daily_performance, symbol_performance, trade_calendar};
pub use pnl::{calculate_pnl, calculate_pnl_percentage, realize, Realization};
pub use stats::{calculate_stats, max_drawdown};
