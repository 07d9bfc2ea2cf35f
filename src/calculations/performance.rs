use crate::error::{JournalError, Result};
use crate::models::{CalendarDay, DailyPerformance, DayOutcome, SymbolPerformance, Trade};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

fn utc_day(timestamp: i64) -> Result<NaiveDate> {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| JournalError::InvalidInput(format!("Invalid timestamp: {}", timestamp)))
}

fn realized_pnl(trade: &Trade) -> Option<f64> {
    trade.pnl.filter(|pnl| trade.is_closed() && pnl.is_finite())
}

/// Per-day profit, loss and running equity of closed trades, oldest day first.
pub fn daily_performance(trades: &[Trade], initial_capital: f64) -> Result<Vec<DailyPerformance>> {
    let mut days: BTreeMap<NaiveDate, (f64, f64, usize)> = BTreeMap::new();

    for trade in trades {
        let Some(pnl) = realized_pnl(trade) else {
            continue;
        };
        let entry = days.entry(utc_day(trade.trade_date)?).or_insert((0.0, 0.0, 0));
        if pnl > 0.0 {
            entry.0 += pnl;
        } else if pnl < 0.0 {
            entry.1 += pnl;
        }
        entry.2 += 1;
    }

    let mut cumulative_pnl = 0.0;
    let mut result = Vec::with_capacity(days.len());

    for (date, (profit, loss, trade_count)) in days {
        let daily_pnl = profit + loss;
        cumulative_pnl += daily_pnl;
        result.push(DailyPerformance {
            date: date.format("%Y-%m-%d").to_string(),
            profit,
            loss: loss.abs(),
            daily_pnl,
            cumulative_pnl,
            balance: initial_capital + cumulative_pnl,
            trade_count,
        });
    }

    Ok(result)
}

/// Trade count, win rate and realized P&L per symbol, best symbol first.
pub fn symbol_performance(trades: &[Trade]) -> Vec<SymbolPerformance> {
    let mut symbols: HashMap<&str, (usize, usize, f64)> = HashMap::new();

    for trade in trades {
        let entry = symbols.entry(trade.symbol.as_str()).or_insert((0, 0, 0.0));
        entry.0 += 1;
        if let Some(pnl) = realized_pnl(trade) {
            if pnl > 0.0 {
                entry.1 += 1;
            }
            entry.2 += pnl;
        }
    }

    let mut result: Vec<SymbolPerformance> = symbols
        .into_iter()
        .map(|(symbol, (trades, wins, pnl))| SymbolPerformance {
            symbol: symbol.to_string(),
            trades,
            wins,
            win_rate: if trades > 0 { (wins as f64 / trades as f64) * 100.0 } else { 0.0 },
            pnl,
        })
        .collect();

    result.sort_by(|a, b| b.pnl.total_cmp(&a.pnl).then_with(|| a.symbol.cmp(&b.symbol)));
    result
}

/// Trades per UTC day with the day's realized P&L, for calendar views.
pub fn trade_calendar(trades: &[Trade]) -> Result<Vec<CalendarDay>> {
    let mut days: BTreeMap<NaiveDate, (usize, f64)> = BTreeMap::new();

    for trade in trades {
        let entry = days.entry(utc_day(trade.trade_date)?).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += realized_pnl(trade).unwrap_or(0.0);
    }

    Ok(days
        .into_iter()
        .map(|(date, (trade_count, pnl))| CalendarDay {
            date: date.format("%Y-%m-%d").to_string(),
            trade_count,
            pnl,
            outcome: if pnl > 0.0 {
                DayOutcome::Profit
            } else if pnl < 0.0 {
                DayOutcome::Loss
            } else {
                DayOutcome::Flat
            },
        })
        .collect())
}
