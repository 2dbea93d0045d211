pub mod aggregate;
pub mod summary;
pub mod trace;

pub use aggregate::{Aggregator, LatencyAggregate, LatencySummary};
pub use summary::{LatencyAggregator, LatencySender};
pub use trace::{TraceLayer, TraceService, Traced};
