pub mod export;
pub mod settings;
pub mod stats;
pub mod trades;

pub use export::*;
pub use settings::*;
pub use stats::*;
pub use trades::*;
