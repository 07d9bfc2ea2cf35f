use crate::db::Database;
use crate::error::{JournalError, Result};
use crate::models::{Trade, TradeFilters};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension};

/// Persistence collaborator for the trade ledger.
///
/// Callers receive a store explicitly; nothing in the crate holds one globally.
pub trait TradeStore {
    fn list(&self, filters: &TradeFilters) -> Result<Vec<Trade>>;
    fn get(&self, id: &str) -> Result<Trade>;
    fn create(&self, trade: &Trade) -> Result<Trade>;
    fn update(&self, trade: &Trade) -> Result<Trade>;
    /// Inserts or overwrites a record by id, used when restoring backups.
    fn replace(&self, trade: &Trade) -> Result<()>;
    fn delete(&self, id: &str) -> Result<bool>;
    fn delete_all(&self) -> Result<usize>;
}

const TRADE_COLUMNS: &str = "id, trade_date, market_category, symbol, direction, entry_price, exit_price, \
     quantity, status, pnl, pnl_percentage, manual_pnl, notes, screenshot_url, tags, created_at, updated_at";

const TAGS_COLUMN: usize = 14;

/// Helper function to map a database row to a Trade struct
fn map_row_to_trade(row: &rusqlite::Row) -> rusqlite::Result<Trade> {
    let tags_json: String = row.get(TAGS_COLUMN)?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(TAGS_COLUMN, Type::Text, Box::new(e))
    })?;

    Ok(Trade {
        id: row.get(0)?,
        trade_date: row.get(1)?,
        market_category: row.get(2)?,
        symbol: row.get(3)?,
        direction: row.get(4)?,
        entry_price: row.get(5)?,
        exit_price: row.get(6)?,
        quantity: row.get(7)?,
        status: row.get(8)?,
        pnl: row.get(9)?,
        pnl_percentage: row.get(10)?,
        manual_pnl: row.get::<_, i32>(11)? == 1,
        notes: row.get(12)?,
        screenshot_url: row.get(13)?,
        tags,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn fetch_trade(conn: &Connection, id: &str) -> Result<Trade> {
    conn.query_row(
        &format!("SELECT {} FROM trades WHERE id = ?", TRADE_COLUMNS),
        [id],
        map_row_to_trade,
    )
    .optional()?
    .ok_or_else(|| JournalError::NotFound(id.to_string()))
}

fn write_trade(conn: &Connection, verb: &str, trade: &Trade) -> Result<usize> {
    let tags = serde_json::to_string(&trade.tags)?;
    let written = conn.execute(
        &format!(
            "{} INTO trades ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            verb, TRADE_COLUMNS
        ),
        rusqlite::params![
            trade.id,
            trade.trade_date,
            trade.market_category,
            trade.symbol,
            trade.direction,
            trade.entry_price,
            trade.exit_price,
            trade.quantity,
            trade.status,
            trade.pnl,
            trade.pnl_percentage,
            trade.manual_pnl as i32,
            trade.notes,
            trade.screenshot_url,
            tags,
            trade.created_at,
            trade.updated_at,
        ],
    )?;
    Ok(written)
}

impl TradeStore for Database {
    fn list(&self, filters: &TradeFilters) -> Result<Vec<Trade>> {
        let conn = self.conn()?;

        let mut query = format!("SELECT {} FROM trades WHERE 1=1", TRADE_COLUMNS);
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(category) = filters.market_category {
            conditions.push("market_category = ?");
            params.push(Box::new(category));
        }
        if let Some(symbol) = &filters.symbol {
            // LIKE is case-insensitive for ASCII in SQLite
            conditions.push("symbol LIKE ?");
            params.push(Box::new(format!("%{}%", symbol)));
        }
        if let Some(direction) = filters.direction {
            conditions.push("direction = ?");
            params.push(Box::new(direction));
        }
        if let Some(status) = filters.status {
            conditions.push("status = ?");
            params.push(Box::new(status));
        }
        if let Some(date_from) = filters.date_from {
            conditions.push("trade_date >= ?");
            params.push(Box::new(date_from));
        }
        if let Some(date_to) = filters.date_to {
            conditions.push("trade_date <= ?");
            params.push(Box::new(date_to));
        }
        if filters.profit_only {
            conditions.push("pnl > 0");
        }
        if filters.loss_only {
            conditions.push("pnl < 0");
        }

        if !conditions.is_empty() {
            query.push_str(&format!(" AND {}", conditions.join(" AND ")));
        }

        query.push_str(" ORDER BY trade_date DESC, created_at DESC, id");

        if let (Some(page), Some(limit)) = (filters.page, filters.limit) {
            if page < 1 || limit < 1 {
                return Err(JournalError::InvalidInput(format!(
                    "Invalid pagination: page {} limit {}",
                    page, limit
                )));
            }
            query.push_str(" LIMIT ? OFFSET ?");
            params.push(Box::new(limit));
            params.push(Box::new((page - 1) * limit));
        }

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query)?;
        let trades = stmt
            .query_map(param_refs.as_slice(), map_row_to_trade)?
            .collect::<rusqlite::Result<Vec<Trade>>>()?;

        Ok(trades)
    }

    fn get(&self, id: &str) -> Result<Trade> {
        let conn = self.conn()?;
        fetch_trade(&conn, id)
    }

    fn create(&self, trade: &Trade) -> Result<Trade> {
        let conn = self.conn()?;
        write_trade(&conn, "INSERT", trade)?;
        fetch_trade(&conn, &trade.id)
    }

    fn update(&self, trade: &Trade) -> Result<Trade> {
        let conn = self.conn()?;
        let tags = serde_json::to_string(&trade.tags)?;

        let changed = conn.execute(
            "UPDATE trades SET
                trade_date = ?, market_category = ?, symbol = ?, direction = ?,
                entry_price = ?, exit_price = ?, quantity = ?, status = ?,
                pnl = ?, pnl_percentage = ?, manual_pnl = ?, notes = ?,
                screenshot_url = ?, tags = ?, updated_at = ?
             WHERE id = ?",
            rusqlite::params![
                trade.trade_date,
                trade.market_category,
                trade.symbol,
                trade.direction,
                trade.entry_price,
                trade.exit_price,
                trade.quantity,
                trade.status,
                trade.pnl,
                trade.pnl_percentage,
                trade.manual_pnl as i32,
                trade.notes,
                trade.screenshot_url,
                tags,
                trade.updated_at,
                trade.id,
            ],
        )?;

        if changed == 0 {
            return Err(JournalError::NotFound(trade.id.clone()));
        }
        fetch_trade(&conn, &trade.id)
    }

    fn replace(&self, trade: &Trade) -> Result<()> {
        let conn = self.conn()?;
        write_trade(&conn, "REPLACE", trade)?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM trades WHERE id = ?", [id])?;
        Ok(removed > 0)
    }

    fn delete_all(&self) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM trades", [])?)
    }
}
