pub mod alerts;
pub mod classifier;
pub mod position_tracker;
pub mod scorer;

pub use alerts::{build_alert, settle, Settlement};
pub use classifier::{classify, is_fresh, record_trade, wallet_stats, FreshnessRules, WalletStats};
pub use position_tracker::{apply_trade, PositionUpdate};
pub use scorer::{score_trade, RiskAssessment, ScoringContext, ScoringWeights, Tier, WalletHistory};
