use crate::calculations::realize;
use crate::commands::settings::{get_settings, update_settings};
use crate::db::{Database, TradeStore};
use crate::error::{JournalError, Result};
use crate::models::trade::validate_pricing;
use crate::models::{Settings, Trade, TradeFilters, UpdateSettingsInput};
use chrono::Utc;
use serde::{Deserialize, Serialize};

const BACKUP_VERSION: &str = "1.0.0";

#[derive(Debug, Serialize, Deserialize)]
pub struct BackupData {
    pub settings: Settings,
    pub trades: Vec<Trade>,
    pub export_date: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
struct TradeCsvRow<'a> {
    id: &'a str,
    date: String,
    market_category: &'static str,
    symbol: &'a str,
    direction: &'static str,
    entry_price: f64,
    exit_price: Option<f64>,
    quantity: f64,
    status: &'static str,
    pnl: Option<f64>,
    pnl_percentage: Option<f64>,
    manual_pnl: bool,
    tags: String,
    notes: &'a str,
}

impl<'a> TryFrom<&'a Trade> for TradeCsvRow<'a> {
    type Error = JournalError;

    fn try_from(trade: &'a Trade) -> Result<Self> {
        let date = chrono::DateTime::from_timestamp(trade.trade_date, 0)
            .ok_or_else(|| {
                JournalError::InvalidInput(format!(
                    "Invalid timestamp: {} for trade {}",
                    trade.trade_date, trade.id
                ))
            })?
            .to_rfc3339();

        Ok(TradeCsvRow {
            id: &trade.id,
            date,
            market_category: trade.market_category.as_str(),
            symbol: &trade.symbol,
            direction: trade.direction.as_str(),
            entry_price: trade.entry_price,
            exit_price: trade.exit_price,
            quantity: trade.quantity,
            status: trade.status.as_str(),
            pnl: trade.pnl,
            pnl_percentage: trade.pnl_percentage,
            manual_pnl: trade.manual_pnl,
            tags: trade.tags.join(";"),
            notes: &trade.notes,
        })
    }
}

/// Export all data to JSON
pub fn export_all_data(db: &Database) -> Result<String> {
    let settings = get_settings(db)?;
    let trades = db.list(&TradeFilters::default())?;

    let backup = BackupData {
        settings,
        trades,
        export_date: Utc::now().to_rfc3339(),
        version: BACKUP_VERSION.to_string(),
    };

    Ok(serde_json::to_string_pretty(&backup)?)
}

/// Checks a backed-up trade and re-derives its P&L from prices, keeping a
/// stored manual override.
fn restore_trade(mut trade: Trade) -> Result<Trade> {
    let reject = |reason: String| {
        JournalError::DataIntegrity(format!("Backup trade {}: {}", trade.id, reason))
    };

    if trade.id.trim().is_empty() || trade.symbol.trim().is_empty() {
        return Err(reject("missing id or symbol".to_string()));
    }
    validate_pricing(trade.entry_price, trade.exit_price, trade.quantity, trade.status)
        .map_err(|e| reject(e.to_string()))?;

    let manual_pnl = if trade.manual_pnl && trade.is_closed() {
        match trade.pnl {
            Some(pnl) if pnl.is_finite() => Some(pnl),
            other => return Err(reject(format!("manual P&L is not a number: {:?}", other))),
        }
    } else {
        None
    };

    let realization = realize(
        trade.entry_price,
        trade.exit_price,
        trade.quantity,
        trade.direction,
        trade.status,
        manual_pnl,
    )
    .map_err(|e| reject(e.to_string()))?;

    trade.pnl = realization.map(|r| r.pnl);
    trade.pnl_percentage = realization.map(|r| r.pnl_percentage);
    trade.manual_pnl = realization.is_some() && manual_pnl.is_some();
    Ok(trade)
}

/// Import data from JSON backup. Existing trades with the same id are overwritten.
///
/// Every trade is checked before anything is written; one bad record rejects the backup.
pub fn import_all_data(db: &Database, json_data: &str) -> Result<(usize, usize)> {
    let backup: BackupData = serde_json::from_str(json_data)?;
    let trades = backup
        .trades
        .into_iter()
        .map(restore_trade)
        .collect::<Result<Vec<_>>>()?;

    update_settings(
        db,
        UpdateSettingsInput {
            currency: Some(backup.settings.currency),
            initial_capital: Some(backup.settings.initial_capital),
        },
    )?;

    let mut imported_trades = 0;
    for trade in &trades {
        db.replace(trade)?;
        imported_trades += 1;
    }

    log::info!(
        "Imported backup v{} from {} with {} trades",
        backup.version,
        backup.export_date,
        imported_trades
    );

    Ok((1, imported_trades)) // (settings_updated, trades_imported)
}

/// Export the filtered ledger as CSV, newest trade first.
pub fn export_trades_csv(store: &dyn TradeStore, filters: Option<TradeFilters>) -> Result<String> {
    let trades = store.list(&filters.unwrap_or_default())?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    for trade in &trades {
        writer.serialize(TradeCsvRow::try_from(trade)?)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| JournalError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| JournalError::Csv(e.to_string()))
}
