pub mod accounting;
pub mod curve;
pub mod engine;
pub mod executor;
pub mod freshness;
pub mod ledger;
pub mod monitor;
pub mod retry;
pub mod strategy;

pub use accounting::{Accountant, LiveAccountant, SimulatedAccountant};
pub use engine::{CurveNotification, DecisionEngine, EngineSettings, Outcome};
pub use executor::{DryRunExecutor, TradeExecution, TradeExecutor};
pub use freshness::FreshnessFilter;
pub use monitor::{CurveMonitor, CurveMonitorConfig};
pub use retry::RetryPolicy;
pub use strategy::ExitRules;
