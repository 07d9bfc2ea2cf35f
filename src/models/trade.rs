use crate::error::{JournalError, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stores a fieldless enum as its lowercase text form.
macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: JournalError| FromSqlError::Other(Box::new(e)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    #[serde(alias = "buy")]
    Long,
    #[serde(alias = "sell")]
    Short,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Long => "long",
            TradeDirection::Short => "short",
        }
    }
}

impl FromStr for TradeDirection {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "long" | "buy" => Ok(TradeDirection::Long),
            "short" | "sell" => Ok(TradeDirection::Short),
            other => Err(JournalError::InvalidInput(format!("Unknown direction: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Open => "open",
            TradeStatus::Closed => "closed",
        }
    }
}

impl FromStr for TradeStatus {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(TradeStatus::Open),
            "closed" => Ok(TradeStatus::Closed),
            other => Err(JournalError::InvalidInput(format!("Unknown status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketCategory {
    Forex,
    Stocks,
    Crypto,
    Commodities,
    Indices,
    Metals,
}

impl MarketCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketCategory::Forex => "forex",
            MarketCategory::Stocks => "stocks",
            MarketCategory::Crypto => "crypto",
            MarketCategory::Commodities => "commodities",
            MarketCategory::Indices => "indices",
            MarketCategory::Metals => "metals",
        }
    }
}

impl FromStr for MarketCategory {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "forex" => Ok(MarketCategory::Forex),
            "stocks" => Ok(MarketCategory::Stocks),
            "crypto" => Ok(MarketCategory::Crypto),
            "commodities" => Ok(MarketCategory::Commodities),
            "indices" => Ok(MarketCategory::Indices),
            "metals" => Ok(MarketCategory::Metals),
            other => Err(JournalError::InvalidInput(format!("Unknown market category: {}", other))),
        }
    }
}

sql_text_enum!(TradeDirection);
sql_text_enum!(TradeStatus);
sql_text_enum!(MarketCategory);

/// A stored journal entry.
///
/// `pnl` and `pnl_percentage` are only set on closed trades with an exit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub trade_date: i64,
    pub market_category: MarketCategory,
    pub symbol: String,
    pub direction: TradeDirection,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub status: TradeStatus,
    pub pnl: Option<f64>,
    pub pnl_percentage: Option<f64>,
    #[serde(default)]
    pub manual_pnl: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub screenshot_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,

    pub created_at: i64,
    pub updated_at: i64,
}

impl Trade {
    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }
}

/// Validated form input for a new trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeDraft {
    pub trade_date: i64,
    pub market_category: MarketCategory,
    pub symbol: String,
    pub direction: TradeDirection,
    pub entry_price: f64,
    pub exit_price: Option<f64>,
    pub quantity: f64,
    pub status: TradeStatus,
    /// Directly entered profit or loss, replacing the computed value.
    #[serde(default)]
    pub pnl: Option<f64>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub screenshot_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl TradeDraft {
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            return Err(JournalError::InvalidInput("Symbol must not be empty".to_string()));
        }
        validate_pricing(
            self.entry_price,
            self.exit_price,
            self.quantity,
            self.status,
        )?;
        if let Some(pnl) = self.pnl {
            if !pnl.is_finite() {
                return Err(JournalError::InvalidInput(format!(
                    "P&L override must be a finite number, got {}",
                    pnl
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn validate_pricing(
    entry_price: f64,
    exit_price: Option<f64>,
    quantity: f64,
    status: TradeStatus,
) -> Result<()> {
    if !entry_price.is_finite() || entry_price <= 0.0 {
        return Err(JournalError::InvalidInput(format!(
            "Entry price must be positive, got {}",
            entry_price
        )));
    }
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(JournalError::InvalidInput(format!(
            "Quantity must be positive, got {}",
            quantity
        )));
    }
    match exit_price {
        Some(exit) if !exit.is_finite() || exit <= 0.0 => Err(JournalError::InvalidInput(format!(
            "Exit price must be positive, got {}",
            exit
        ))),
        None if status == TradeStatus::Closed => Err(JournalError::InvalidInput(
            "A closed trade requires an exit price".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Partial edit of an existing trade. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeUpdate {
    pub trade_date: Option<i64>,
    pub market_category: Option<MarketCategory>,
    pub symbol: Option<String>,
    pub direction: Option<TradeDirection>,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub quantity: Option<f64>,
    pub status: Option<TradeStatus>,
    pub pnl: Option<f64>,
    pub notes: Option<String>,
    pub screenshot_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl TradeUpdate {
    /// True when the update changes anything the realized P&L of `current` is
    /// derived from. Resending a stored value is not a change.
    pub fn changes_pricing(&self, current: &Trade) -> bool {
        self.entry_price.is_some_and(|v| v != current.entry_price)
            || self.exit_price.is_some_and(|v| current.exit_price != Some(v))
            || self.quantity.is_some_and(|v| v != current.quantity)
            || self.direction.is_some_and(|v| v != current.direction)
            || self.status.is_some_and(|v| v != current.status)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeFilters {
    pub market_category: Option<MarketCategory>,
    pub symbol: Option<String>,
    pub direction: Option<TradeDirection>,
    pub status: Option<TradeStatus>,
    pub date_from: Option<i64>,
    pub date_to: Option<i64>,
    #[serde(default)]
    pub profit_only: bool,
    #[serde(default)]
    pub loss_only: bool,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> TradeDraft {
        TradeDraft {
            trade_date: 1_683_711_000,
            market_category: MarketCategory::Forex,
            symbol: "EUR/USD".to_string(),
            direction: TradeDirection::Long,
            entry_price: 1.0750,
            exit_price: Some(1.0820),
            quantity: 100_000.0,
            status: TradeStatus::Closed,
            pnl: None,
            notes: String::new(),
            screenshot_url: None,
            tags: vec![],
        }
    }

    #[test]
    fn test_direction_accepts_buy_sell_aliases() {
        let long: TradeDirection = serde_json::from_str("\"buy\"").unwrap();
        let short: TradeDirection = serde_json::from_str("\"sell\"").unwrap();
        assert_eq!(long, TradeDirection::Long);
        assert_eq!(short, TradeDirection::Short);
        assert_eq!("SELL".parse::<TradeDirection>().unwrap(), TradeDirection::Short);
        assert_eq!(serde_json::to_string(&TradeDirection::Long).unwrap(), "\"long\"");
    }

    #[test]
    fn test_unknown_enum_values_are_rejected() {
        assert!("sideways".parse::<TradeDirection>().is_err());
        assert!("pending".parse::<TradeStatus>().is_err());
        assert!("bonds".parse::<MarketCategory>().is_err());
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_draft_rejects_bad_values() {
        let mut d = draft();
        d.symbol = "  ".to_string();
        assert!(matches!(d.validate(), Err(JournalError::InvalidInput(_))));

        let mut d = draft();
        d.entry_price = 0.0;
        assert!(matches!(d.validate(), Err(JournalError::InvalidInput(_))));

        let mut d = draft();
        d.quantity = -1.0;
        assert!(matches!(d.validate(), Err(JournalError::InvalidInput(_))));

        let mut d = draft();
        d.exit_price = Some(f64::NAN);
        assert!(matches!(d.validate(), Err(JournalError::InvalidInput(_))));

        let mut d = draft();
        d.pnl = Some(f64::INFINITY);
        assert!(matches!(d.validate(), Err(JournalError::InvalidInput(_))));
    }

    #[test]
    fn test_closed_draft_requires_exit_price() {
        let mut d = draft();
        d.exit_price = None;
        assert!(d.validate().is_err());

        d.status = TradeStatus::Open;
        assert!(d.validate().is_ok());
    }

    #[test]
    fn test_update_pricing_detection() {
        let d = draft();
        let stored = Trade {
            id: "TRADE-1".to_string(),
            trade_date: d.trade_date,
            market_category: d.market_category,
            symbol: d.symbol,
            direction: d.direction,
            entry_price: d.entry_price,
            exit_price: d.exit_price,
            quantity: d.quantity,
            status: d.status,
            pnl: Some(650.0),
            pnl_percentage: Some(0.6512),
            manual_pnl: true,
            notes: String::new(),
            screenshot_url: None,
            tags: vec![],
            created_at: 0,
            updated_at: 0,
        };

        assert!(!TradeUpdate { notes: Some("x".into()), ..Default::default() }.changes_pricing(&stored));
        assert!(TradeUpdate { quantity: Some(2.0), ..Default::default() }.changes_pricing(&stored));
        assert!(TradeUpdate { status: Some(TradeStatus::Open), ..Default::default() }.changes_pricing(&stored));
        assert!(TradeUpdate { exit_price: Some(1.0850), ..Default::default() }.changes_pricing(&stored));

        // A form resending every stored value changes nothing
        let resent = TradeUpdate {
            direction: Some(TradeDirection::Long),
            entry_price: Some(1.0750),
            exit_price: Some(1.0820),
            quantity: Some(100_000.0),
            status: Some(TradeStatus::Closed),
            ..Default::default()
        };
        assert!(!resent.changes_pricing(&stored));
    }
}
