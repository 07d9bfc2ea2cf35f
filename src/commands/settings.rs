use crate::db::Database;
use crate::error::{JournalError, Result};
use crate::models::{Settings, UpdateSettingsInput};
use rusqlite::Connection;

pub(crate) fn read_settings(conn: &Connection) -> Result<Settings> {
    let settings = conn.query_row(
        "SELECT id, currency, initial_capital, created_at, updated_at FROM settings WHERE id = 1",
        [],
        |row| {
            Ok(Settings {
                id: row.get(0)?,
                currency: row.get(1)?,
                initial_capital: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        },
    )?;
    Ok(settings)
}

pub fn get_settings(db: &Database) -> Result<Settings> {
    let conn = db.conn()?;
    read_settings(&conn)
}

pub fn update_settings(db: &Database, settings: UpdateSettingsInput) -> Result<Settings> {
    let conn = db.conn()?;

    // Build dynamic UPDATE query
    let mut updates = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(currency) = settings.currency {
        let currency = currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(JournalError::InvalidInput(format!(
                "Currency must be a 3-letter code, got {}",
                currency
            )));
        }
        updates.push("currency = ?");
        values.push(Box::new(currency));
    }
    if let Some(initial_capital) = settings.initial_capital {
        if !initial_capital.is_finite() || initial_capital < 0.0 {
            return Err(JournalError::InvalidInput(format!(
                "Initial capital must be zero or positive, got {}",
                initial_capital
            )));
        }
        updates.push("initial_capital = ?");
        values.push(Box::new(initial_capital));
    }

    updates.push("updated_at = strftime('%s', 'now')");

    let query = format!("UPDATE settings SET {} WHERE id = 1", updates.join(", "));
    let params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
    conn.execute(&query, params.as_slice())?;

    read_settings(&conn)
}
