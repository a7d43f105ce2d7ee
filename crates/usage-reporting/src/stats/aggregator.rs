//! Stats for one operation, partitioned by client identity

use std::collections::HashMap;

use super::contextualized::ContextualizedStats;
use crate::proto::{self, StatsContext, Trace};
use crate::report::{estimated_bytes_for_string, SizeEstimator};

/// Folds traces into per-client [`ContextualizedStats`].
///
/// A context entry is created the first time its client identity is seen
/// and lives until the report window is flushed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsAggregator {
    per_context: HashMap<StatsContext, ContextualizedStats>,
}

impl StatsAggregator {
    /// Create an aggregator with no clients
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `trace` into the stats of the client that sent it
    pub fn add_trace(&mut self, trace: &Trace, size: &mut SizeEstimator) {
        let context = StatsContext {
            client_name: trace.client_name.clone(),
            client_version: trace.client_version.clone(),
            client_reference_id: trace.client_reference_id.clone(),
        };

        let stats = self.per_context.entry(context).or_insert_with_key(|context| {
            size.add(
                20 + estimated_bytes_for_string(&context.client_name)
                    + estimated_bytes_for_string(&context.client_version),
            );
            ContextualizedStats::new(context.clone())
        });
        stats.add_trace(trace, size);
    }

    /// Stats for one client, if it sent any trace
    pub fn get(&self, context: &StatsContext) -> Option<&ContextualizedStats> {
        self.per_context.get(context)
    }

    /// Number of distinct clients
    pub fn len(&self) -> usize {
        self.per_context.len()
    }

    /// True when no trace was added
    pub fn is_empty(&self) -> bool {
        self.per_context.is_empty()
    }

    /// Convert into one outbound entry per client
    pub fn to_proto(&self) -> Vec<proto::ContextualizedStats> {
        self.per_context
            .values()
            .map(ContextualizedStats::to_proto)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_trace(name: &str, version: &str, reference_id: &str) -> Trace {
        Trace {
            client_name: name.to_string(),
            client_version: version.to_string(),
            client_reference_id: reference_id.to_string(),
            duration_ns: 1_000_000,
            ..Trace::default()
        }
    }

    #[test]
    fn test_partitions_by_client_identity() {
        let mut aggregator = StatsAggregator::new();
        let mut size = SizeEstimator::new();

        aggregator.add_trace(&client_trace("web", "1.0", ""), &mut size);
        aggregator.add_trace(&client_trace("web", "1.0", ""), &mut size);
        aggregator.add_trace(&client_trace("web", "2.0", ""), &mut size);
        aggregator.add_trace(&client_trace("web", "2.0", "ref-1"), &mut size);

        assert_eq!(aggregator.len(), 3);
        let web_1 = aggregator
            .get(&StatsContext {
                client_name: "web".to_string(),
                client_version: "1.0".to_string(),
                client_reference_id: String::new(),
            })
            .unwrap();
        assert_eq!(web_1.query_latency_stats.request_count, 2);
    }

    #[test]
    fn test_new_context_grows_size_estimate() {
        let mut aggregator = StatsAggregator::new();
        let mut size = SizeEstimator::new();

        aggregator.add_trace(&client_trace("ios", "3", ""), &mut size);
        assert_eq!(size.bytes(), 20 + (2 + 3) + (2 + 1));

        aggregator.add_trace(&client_trace("ios", "3", ""), &mut size);
        assert_eq!(size.bytes(), 20 + (2 + 3) + (2 + 1));
    }

    #[test]
    fn test_to_proto_has_entry_per_context() {
        let mut aggregator = StatsAggregator::new();
        let mut size = SizeEstimator::new();
        aggregator.add_trace(&client_trace("a", "1", ""), &mut size);
        aggregator.add_trace(&client_trace("b", "1", ""), &mut size);

        let mut names: Vec<_> = aggregator
            .to_proto()
            .into_iter()
            .map(|stats| stats.context.unwrap().client_name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }
}
