pub mod trade;

// Re-export commonly used types
pub use trade::{ExitReason, OpenPosition, TradeDirection, TradeRecord};
