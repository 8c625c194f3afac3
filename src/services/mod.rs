pub mod notifier;
pub mod resolution;

pub use notifier::Notifier;
pub use resolution::{dismiss_alert, run_sweep, SweepReport};
