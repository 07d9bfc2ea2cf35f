pub mod settings;
pub mod stats;
pub mod trade;

pub use settings::*;
pub use stats::*;
pub use trade::*;
