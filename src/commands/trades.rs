use crate::calculations::realize;
use crate::db::TradeStore;
use crate::error::{JournalError, Result};
use crate::models::trade::validate_pricing;
use crate::models::{Trade, TradeDraft, TradeFilters, TradeStatus, TradeUpdate};
use chrono::Utc;

fn new_trade_id() -> String {
    format!("TRADE-{}-{}", Utc::now().timestamp_millis(), uuid::Uuid::new_v4())
}

pub fn get_trades(store: &dyn TradeStore, filters: Option<TradeFilters>) -> Result<Vec<Trade>> {
    store.list(&filters.unwrap_or_default())
}

pub fn get_trade(store: &dyn TradeStore, id: &str) -> Result<Trade> {
    store.get(id)
}

/// Records a new trade, deriving its realized P&L from the draft.
pub fn create_trade(store: &dyn TradeStore, draft: TradeDraft) -> Result<Trade> {
    draft.validate()?;

    let realization = realize(
        draft.entry_price,
        draft.exit_price,
        draft.quantity,
        draft.direction,
        draft.status,
        draft.pnl,
    )?;
    let now = Utc::now().timestamp();

    let trade = Trade {
        id: new_trade_id(),
        trade_date: draft.trade_date,
        market_category: draft.market_category,
        symbol: draft.symbol.trim().to_string(),
        direction: draft.direction,
        entry_price: draft.entry_price,
        exit_price: draft.exit_price,
        quantity: draft.quantity,
        status: draft.status,
        pnl: realization.map(|r| r.pnl),
        pnl_percentage: realization.map(|r| r.pnl_percentage),
        manual_pnl: realization.is_some() && draft.pnl.is_some(),
        notes: draft.notes,
        screenshot_url: draft.screenshot_url,
        tags: draft.tags,
        created_at: now,
        updated_at: now,
    };

    let created = store.create(&trade)?;
    log::info!("Created trade {} ({} {})", created.id, created.direction, created.symbol);
    Ok(created)
}

/// Applies a partial edit and re-derives P&L.
///
/// A previous manual P&L survives only while the pricing fields keep their values.
pub fn update_trade(store: &dyn TradeStore, id: &str, update: TradeUpdate) -> Result<Trade> {
    let existing = store.get(id)?;
    let pricing_changed = update.changes_pricing(&existing);

    let manual_pnl = match update.pnl {
        Some(pnl) if !pnl.is_finite() => {
            return Err(JournalError::InvalidInput(format!(
                "P&L override must be a finite number, got {}",
                pnl
            )));
        }
        Some(pnl) => Some(pnl),
        None if existing.manual_pnl && !pricing_changed => existing.pnl,
        None => None,
    };

    let mut trade = existing;
    if let Some(trade_date) = update.trade_date {
        trade.trade_date = trade_date;
    }
    if let Some(category) = update.market_category {
        trade.market_category = category;
    }
    if let Some(symbol) = update.symbol {
        if symbol.trim().is_empty() {
            return Err(JournalError::InvalidInput("Symbol must not be empty".to_string()));
        }
        trade.symbol = symbol.trim().to_string();
    }
    if let Some(direction) = update.direction {
        trade.direction = direction;
    }
    if let Some(entry_price) = update.entry_price {
        trade.entry_price = entry_price;
    }
    if let Some(exit_price) = update.exit_price {
        trade.exit_price = Some(exit_price);
    }
    if let Some(quantity) = update.quantity {
        trade.quantity = quantity;
    }
    if let Some(status) = update.status {
        trade.status = status;
    }
    if let Some(notes) = update.notes {
        trade.notes = notes;
    }
    if let Some(screenshot_url) = update.screenshot_url {
        trade.screenshot_url = Some(screenshot_url);
    }
    if let Some(tags) = update.tags {
        trade.tags = tags;
    }

    validate_pricing(trade.entry_price, trade.exit_price, trade.quantity, trade.status)?;

    let realization = realize(
        trade.entry_price,
        trade.exit_price,
        trade.quantity,
        trade.direction,
        trade.status,
        manual_pnl,
    )?;
    trade.pnl = realization.map(|r| r.pnl);
    trade.pnl_percentage = realization.map(|r| r.pnl_percentage);
    trade.manual_pnl = realization.is_some() && manual_pnl.is_some();
    trade.updated_at = Utc::now().timestamp();

    store.update(&trade)
}

pub fn delete_trade(store: &dyn TradeStore, id: &str) -> Result<bool> {
    let deleted = store.delete(id)?;
    if deleted {
        log::info!("Deleted trade {}", id);
    }
    Ok(deleted)
}

/// Copies a trade as a new open position with no execution data.
pub fn duplicate_trade(store: &dyn TradeStore, id: &str) -> Result<Trade> {
    let original = store.get(id)?;
    let now = Utc::now().timestamp();

    let notes = if original.notes.is_empty() {
        "(Copy)".to_string()
    } else {
        format!("{} (Copy)", original.notes)
    };

    let copy = Trade {
        id: new_trade_id(),
        trade_date: now,
        exit_price: None,
        status: TradeStatus::Open,
        pnl: None,
        pnl_percentage: None,
        manual_pnl: false,
        notes,
        created_at: now,
        updated_at: now,
        ..original
    };

    store.create(&copy)
}

pub fn delete_all_trades(store: &dyn TradeStore) -> Result<usize> {
    let count = store.delete_all()?;
    log::info!("Deleted all {} trades", count);
    Ok(count)
}
