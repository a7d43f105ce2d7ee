//! Aggregation of traces into per-client statistics

mod aggregator;
mod contextualized;
mod path_errors;

pub use aggregator::StatsAggregator;
pub use contextualized::{ContextualizedStats, FieldStat, QueryLatencyStats, TypeStat};
pub use path_errors::PathErrorStats;
