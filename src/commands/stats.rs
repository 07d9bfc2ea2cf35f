use crate::calculations::{calculate_stats, daily_performance, symbol_performance, trade_calendar};
use crate::commands::settings::get_settings;
use crate::db::{Database, TradeStore};
use crate::error::{JournalError, Result};
use crate::models::{CalendarDay, DailyPerformance, SymbolPerformance, Trade, TradeFilters, TradingStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const DAY_SECS: i64 = 24 * 60 * 60;

/// Look-back window for dashboard views.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateRange {
    Today,
    Week,
    Month,
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    Year,
    #[default]
    All,
}

impl FromStr for DateRange {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "today" => Ok(DateRange::Today),
            "week" => Ok(DateRange::Week),
            "month" => Ok(DateRange::Month),
            "3months" => Ok(DateRange::ThreeMonths),
            "6months" => Ok(DateRange::SixMonths),
            "year" => Ok(DateRange::Year),
            "all" | "" => Ok(DateRange::All),
            other => Err(JournalError::InvalidInput(format!("Unknown date range: {}", other))),
        }
    }
}

impl DateRange {
    /// Earliest trade date included, relative to `now`.
    pub fn threshold(&self, now: DateTime<Utc>) -> Option<i64> {
        let ts = now.timestamp();
        match self {
            DateRange::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc().timestamp()),
            DateRange::Week => Some(ts - 7 * DAY_SECS),
            DateRange::Month => Some(ts - 30 * DAY_SECS),
            DateRange::ThreeMonths => Some(ts - 90 * DAY_SECS),
            DateRange::SixMonths => Some(ts - 180 * DAY_SECS),
            DateRange::Year => Some(ts - 365 * DAY_SECS),
            DateRange::All => None,
        }
    }
}

fn ledger(store: &dyn TradeStore, range: DateRange) -> Result<Vec<Trade>> {
    let filters = TradeFilters {
        date_from: range.threshold(Utc::now()),
        ..Default::default()
    };
    store.list(&filters)
}

pub fn get_dashboard_stats(store: &dyn TradeStore, range: DateRange) -> Result<TradingStats> {
    let trades = ledger(store, range)?;
    let stats = calculate_stats(&trades);
    if stats.skipped_trades > 0 {
        log::warn!(
            "{} closed trades without P&L were excluded from statistics",
            stats.skipped_trades
        );
    }
    Ok(stats)
}

/// Daily P&L over the range, with balances starting from the configured capital.
pub fn get_equity_curve(db: &Database, range: DateRange) -> Result<Vec<DailyPerformance>> {
    let initial_capital = get_settings(db)?.initial_capital;
    daily_performance(&ledger(db, range)?, initial_capital)
}

pub fn get_symbol_performance(store: &dyn TradeStore, range: DateRange) -> Result<Vec<SymbolPerformance>> {
    Ok(symbol_performance(&ledger(store, range)?))
}

pub fn get_trade_calendar(store: &dyn TradeStore, range: DateRange) -> Result<Vec<CalendarDay>> {
    trade_calendar(&ledger(store, range)?)
}
