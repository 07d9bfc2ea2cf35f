use crate::error::{JournalError, Result};
use crate::models::{TradeDirection, TradeStatus};

/// Realized P&L of a position in account currency.
///
/// No domain checks here; callers validate prices and quantity at the form boundary.
pub fn calculate_pnl(
    entry_price: f64,
    exit_price: f64,
    quantity: f64,
    direction: TradeDirection,
) -> f64 {
    match direction {
        TradeDirection::Long => (exit_price - entry_price) * quantity,
        TradeDirection::Short => (entry_price - exit_price) * quantity,
    }
}

/// Return relative to entry price, in percent.
pub fn calculate_pnl_percentage(
    entry_price: f64,
    exit_price: f64,
    direction: TradeDirection,
) -> Result<f64> {
    if entry_price == 0.0 || !entry_price.is_finite() {
        return Err(JournalError::InvalidInput(format!(
            "Cannot compute percentage return from entry price {}",
            entry_price
        )));
    }

    let move_pct = match direction {
        TradeDirection::Long => (exit_price - entry_price) / entry_price,
        TradeDirection::Short => (entry_price - exit_price) / entry_price,
    };
    Ok(move_pct * 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Realization {
    pub pnl: f64,
    pub pnl_percentage: f64,
}

/// Derives the stored P&L pair for a trade at creation or update time.
///
/// Open trades and trades without an exit price realize nothing. A manual
/// override replaces the computed P&L; the percentage always follows prices.
pub fn realize(
    entry_price: f64,
    exit_price: Option<f64>,
    quantity: f64,
    direction: TradeDirection,
    status: TradeStatus,
    manual_pnl: Option<f64>,
) -> Result<Option<Realization>> {
    let exit_price = match (status, exit_price) {
        (TradeStatus::Closed, Some(exit)) => exit,
        _ => return Ok(None),
    };

    let pnl_percentage = calculate_pnl_percentage(entry_price, exit_price, direction)?;
    let pnl = match manual_pnl {
        Some(value) => value,
        None => calculate_pnl(entry_price, exit_price, quantity, direction),
    };

    Ok(Some(Realization { pnl, pnl_percentage }))
}
