//! Portfolio statistics over a trade ledger.
//!
//! Only closed trades count. A closed trade without a finite `pnl` is a data
//! integrity violation: it is excluded from every figure, logged, and reported
//! through `TradingStats::skipped_trades`.

use crate::models::{ProfitFactor, Trade, TradingStats};

pub fn calculate_stats(trades: &[Trade]) -> TradingStats {
    let open_trades = trades.iter().filter(|t| !t.is_closed()).count();

    let mut skipped_trades = 0;
    let mut closed: Vec<(i64, f64)> = Vec::new();
    for trade in trades.iter().filter(|t| t.is_closed()) {
        match trade.pnl {
            Some(pnl) if pnl.is_finite() => closed.push((trade.trade_date, pnl)),
            other => {
                log::warn!(
                    "Skipping closed trade {} ({}) with unusable P&L {:?}",
                    trade.id,
                    trade.symbol,
                    other
                );
                skipped_trades += 1;
            }
        }
    }

    let total_trades = closed.len();
    if total_trades == 0 {
        return TradingStats {
            open_trades,
            skipped_trades,
            ..TradingStats::default()
        };
    }

    let wins: Vec<f64> = closed.iter().map(|&(_, pnl)| pnl).filter(|&pnl| pnl > 0.0).collect();
    let losses: Vec<f64> = closed.iter().map(|&(_, pnl)| pnl).filter(|&pnl| pnl < 0.0).collect();
    let break_even_trades = closed.iter().filter(|&&(_, pnl)| pnl == 0.0).count();

    let win_rate = (wins.len() as f64 / total_trades as f64) * 100.0;

    let total_profit: f64 = wins.iter().sum();
    let total_loss = losses.iter().sum::<f64>().abs();
    let net_pnl: f64 = closed.iter().map(|&(_, pnl)| pnl).sum();

    let average_win = if wins.is_empty() { 0.0 } else { total_profit / wins.len() as f64 };
    let average_loss = if losses.is_empty() { 0.0 } else { total_loss / losses.len() as f64 };

    let largest_win = wins.iter().copied().fold(0.0, f64::max);
    let largest_loss = losses.iter().copied().fold(0.0, f64::min).abs();

    let profit_factor = if total_loss > 0.0 {
        ProfitFactor::Ratio(total_profit / total_loss)
    } else if total_profit > 0.0 {
        ProfitFactor::Unbounded
    } else {
        ProfitFactor::Ratio(0.0)
    };

    // Stable sort: same-timestamp trades keep ledger order.
    closed.sort_by_key(|&(date, _)| date);
    let max_drawdown = max_drawdown(closed.iter().map(|&(_, pnl)| pnl));

    TradingStats {
        total_trades,
        winning_trades: wins.len(),
        losing_trades: losses.len(),
        break_even_trades,
        open_trades,
        win_rate,
        net_pnl,
        total_profit,
        total_loss,
        average_win,
        average_loss,
        largest_win,
        largest_loss,
        profit_factor,
        max_drawdown,
        skipped_trades,
    }
}

/// Largest peak-to-trough decline of running equity, starting from flat.
pub fn max_drawdown<I>(pnls: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut running = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_drawdown = 0.0_f64;

    for pnl in pnls {
        running += pnl;
        if running > peak {
            peak = running;
        }
        let drawdown = peak - running;
        if drawdown > max_drawdown {
            max_drawdown = drawdown;
        }
    }

    max_drawdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketCategory, TradeDirection, TradeStatus};

    const EPS: f64 = 1e-9;

    fn closed(id: &str, date: i64, pnl: f64) -> Trade {
        Trade {
            id: id.to_string(),
            trade_date: date,
            market_category: MarketCategory::Stocks,
            symbol: "AAPL".to_string(),
            direction: TradeDirection::Long,
            entry_price: 100.0,
            exit_price: Some(100.0 + pnl),
            quantity: 1.0,
            status: TradeStatus::Closed,
            pnl: Some(pnl),
            pnl_percentage: Some(pnl),
            manual_pnl: false,
            notes: String::new(),
            screenshot_url: None,
            tags: vec![],
            created_at: date,
            updated_at: date,
        }
    }

    fn open(id: &str, date: i64) -> Trade {
        Trade {
            status: TradeStatus::Open,
            exit_price: None,
            pnl: None,
            pnl_percentage: None,
            ..closed(id, date, 0.0)
        }
    }

    #[test]
    fn test_empty_ledger_is_zeroed() {
        let stats = calculate_stats(&[]);
        assert_eq!(stats, TradingStats::default());
        assert_eq!(stats.profit_factor, ProfitFactor::Ratio(0.0));
    }

    #[test]
    fn test_open_only_ledger_matches_empty() {
        let stats = calculate_stats(&[open("a", 1), open("b", 2)]);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.open_trades, 2);
        assert_eq!(stats.net_pnl, 0.0);
        assert_eq!(stats.profit_factor, ProfitFactor::Ratio(0.0));
        assert_eq!(stats.max_drawdown, 0.0);
    }

    #[test]
    fn test_single_winner() {
        let stats = calculate_stats(&[closed("a", 1, 100.0)]);
        assert_eq!(stats.total_trades, 1);
        assert_eq!(stats.win_rate, 100.0);
        assert_eq!(stats.total_profit, 100.0);
        assert_eq!(stats.total_loss, 0.0);
        assert_eq!(stats.largest_win, 100.0);
        assert!(stats.profit_factor.is_unbounded());
        assert_eq!(stats.profit_factor.as_f64(), f64::INFINITY);
        assert_eq!(stats.max_drawdown, 0.0);
    }

    #[test]
    fn test_single_loser() {
        let stats = calculate_stats(&[closed("a", 1, -50.0)]);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.total_loss, 50.0);
        assert_eq!(stats.average_loss, 50.0);
        assert_eq!(stats.largest_loss, 50.0);
        assert_eq!(stats.max_drawdown, 50.0);
        assert_eq!(stats.profit_factor, ProfitFactor::Ratio(0.0));
    }

    #[test]
    fn test_drawdown_sequence() {
        let trades = vec![closed("a", 1, 100.0), closed("b", 2, -150.0), closed("c", 3, 30.0)];
        let stats = calculate_stats(&trades);
        assert!((stats.max_drawdown - 150.0).abs() < EPS);
        assert!((stats.net_pnl + 20.0).abs() < EPS);
        assert!((stats.profit_factor.as_f64() - 130.0 / 150.0).abs() < EPS);
    }

    #[test]
    fn test_out_of_order_input_is_sorted_before_drawdown() {
        let sorted = vec![
            closed("a", 10, 50.0),
            closed("b", 20, -80.0),
            closed("c", 30, 120.0),
            closed("d", 40, -200.0),
            closed("e", 50, 40.0),
        ];
        let mut shuffled = sorted.clone();
        shuffled.reverse();
        shuffled.swap(0, 2);

        let expected = calculate_stats(&sorted);
        let actual = calculate_stats(&shuffled);
        assert_eq!(expected.max_drawdown, actual.max_drawdown);
        assert!((expected.max_drawdown - 200.0).abs() < EPS);
    }

    #[test]
    fn test_same_date_keeps_ledger_order() {
        // Ledger order +100, -150 at the same timestamp: peak 100, trough -50.
        let trades = vec![closed("a", 5, 100.0), closed("b", 5, -150.0)];
        assert_eq!(calculate_stats(&trades).max_drawdown, 150.0);

        // Reversed ledger order: trough -150 first from a flat start.
        let trades = vec![closed("b", 5, -150.0), closed("a", 5, 100.0)];
        assert_eq!(calculate_stats(&trades).max_drawdown, 150.0);

        let trades = vec![closed("a", 5, 100.0), closed("b", 5, -60.0), closed("c", 5, -60.0)];
        assert_eq!(calculate_stats(&trades).max_drawdown, 120.0);
    }

    #[test]
    fn test_partition_and_averages() {
        let trades = vec![
            closed("a", 1, 200.0),
            closed("b", 2, 100.0),
            closed("c", 3, -60.0),
            closed("d", 4, -20.0),
            closed("e", 5, 0.0),
            open("f", 6),
        ];
        let stats = calculate_stats(&trades);
        assert_eq!(stats.total_trades, 5);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 2);
        assert_eq!(stats.break_even_trades, 1);
        assert_eq!(stats.open_trades, 1);
        assert!((stats.win_rate - 40.0).abs() < EPS);
        assert!((stats.total_profit - 300.0).abs() < EPS);
        assert!((stats.total_loss - 80.0).abs() < EPS);
        assert!((stats.net_pnl - 220.0).abs() < EPS);
        assert!((stats.average_win - 150.0).abs() < EPS);
        assert!((stats.average_loss - 40.0).abs() < EPS);
        assert_eq!(stats.largest_win, 200.0);
        assert_eq!(stats.largest_loss, 60.0);
        assert!((stats.profit_factor.as_f64() - 3.75).abs() < EPS);
        assert!((stats.max_drawdown - 80.0).abs() < EPS);
    }

    #[test]
    fn test_all_break_even_has_zero_profit_factor() {
        let stats = calculate_stats(&[closed("a", 1, 0.0), closed("b", 2, 0.0)]);
        assert_eq!(stats.total_trades, 2);
        assert_eq!(stats.break_even_trades, 2);
        assert_eq!(stats.profit_factor, ProfitFactor::Ratio(0.0));
    }

    #[test]
    fn test_closed_trade_without_pnl_is_skipped() {
        let mut broken = closed("x", 2, 0.0);
        broken.pnl = None;
        let mut nan = closed("y", 3, 0.0);
        nan.pnl = Some(f64::NAN);

        let stats = calculate_stats(&[closed("a", 1, 40.0), broken, nan]);
        assert_eq!(stats.total_trades, 1);
        assert_eq!(stats.skipped_trades, 2);
        assert_eq!(stats.net_pnl, 40.0);
        assert_eq!(stats.win_rate, 100.0);
    }

    #[test]
    fn test_only_broken_trades_return_zeroed_stats() {
        let mut broken = closed("x", 2, 0.0);
        broken.pnl = None;
        let stats = calculate_stats(&[broken]);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.skipped_trades, 1);
        assert_eq!(stats.profit_factor, ProfitFactor::Ratio(0.0));
    }

    #[test]
    fn test_calculation_is_idempotent() {
        let trades = vec![closed("a", 3, 12.5), closed("b", 1, -7.25), closed("c", 2, 3.0)];
        let first = calculate_stats(&trades);
        let second = calculate_stats(&trades);
        assert_eq!(first, second);
        assert_eq!(first.net_pnl.to_bits(), second.net_pnl.to_bits());
        assert_eq!(first.max_drawdown.to_bits(), second.max_drawdown.to_bits());
    }

    #[test]
    fn test_max_drawdown_walk() {
        assert_eq!(max_drawdown(Vec::<f64>::new()), 0.0);
        assert_eq!(max_drawdown(vec![100.0, -150.0, 30.0]), 150.0);
        assert_eq!(max_drawdown(vec![10.0, 10.0, 10.0]), 0.0);
    }
}
