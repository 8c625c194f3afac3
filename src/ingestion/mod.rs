pub mod collector;
pub mod pipeline;

pub use collector::{Collector, CollectorSettings, CycleReport};
pub use pipeline::{process_trade, TradeOutcome};
