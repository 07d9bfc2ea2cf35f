pub mod connection;
pub mod migration_runner;
pub mod trade_store;

pub use connection::Database;
pub use trade_store::TradeStore;
