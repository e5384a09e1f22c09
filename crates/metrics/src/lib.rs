//! Metrics & usage (§4.10): the pub/sub bus every provider's metrics
//! channel publishes to, and the `UsageCollector` a session republishes
//! through for callers to fold.

pub mod bus;
pub mod collector;

pub use bus::MetricsBus;
pub use collector::{ModelUsage, UsageCollector};
