use serde::{Deserialize, Serialize};

/// Gross profit over gross loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfitFactor {
    Ratio(f64),
    /// Profitable with no losing trades at all.
    Unbounded,
}

impl ProfitFactor {
    pub fn as_f64(&self) -> f64 {
        match self {
            ProfitFactor::Ratio(value) => *value,
            ProfitFactor::Unbounded => f64::INFINITY,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, ProfitFactor::Unbounded)
    }
}

impl Default for ProfitFactor {
    fn default() -> Self {
        ProfitFactor::Ratio(0.0)
    }
}

/// Portfolio-level metrics over the closed trades of a ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradingStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub break_even_trades: usize,
    pub open_trades: usize,
    pub win_rate: f64,
    pub net_pnl: f64,
    pub total_profit: f64,
    pub total_loss: f64,
    pub average_win: f64,
    pub average_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub profit_factor: ProfitFactor,
    pub max_drawdown: f64,
    /// Closed trades left out because they carry no usable P&L.
    pub skipped_trades: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPerformance {
    pub date: String, // YYYY-MM-DD, UTC
    pub profit: f64,
    pub loss: f64,
    pub daily_pnl: f64,
    pub cumulative_pnl: f64,
    pub balance: f64,
    pub trade_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolPerformance {
    pub symbol: String,
    pub trades: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub pnl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOutcome {
    Profit,
    Loss,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    pub date: String,
    pub trade_count: usize,
    pub pnl: f64,
    pub outcome: DayOutcome,
}
