//! Report accumulation for one flush window
//!
//! A [`Report`] collects, per stats report key, the traces selected for
//! sending verbatim and the aggregated stats of everything else. It keeps a
//! running size estimate that callers compare against their flush
//! threshold.

mod key;
mod size;

pub use key::{
    operation_count, stats_report_key, PARSE_FAILURE_KEY, UNKNOWN_OPERATION_NAME_KEY,
    VALIDATION_FAILURE_KEY,
};
pub use size::{estimated_bytes_for_string, SizeEstimator};

use std::collections::HashMap;

use prost::Message;

use crate::proto::{self, ReportHeader, Trace};
use crate::stats::StatsAggregator;

/// Everything reported for a single operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationReport {
    /// Prost-encoded traces, in the order they were added
    pub traces: Vec<Vec<u8>>,
    /// Stats of traces not sent verbatim
    pub stats: StatsAggregator,
}

impl OperationReport {
    /// Convert into the outbound bundle
    pub fn to_proto(&self) -> proto::TracesAndStats {
        proto::TracesAndStats {
            trace: self.traces.clone(),
            stats_with_context: self.stats.to_proto(),
        }
    }
}

/// The live accumulator of one report window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    operations: HashMap<String, OperationReport>,
    size: SizeEstimator,
    operation_count: u64,
}

impl Report {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a finished trace under `stats_report_key`.
    ///
    /// With `as_raw_trace` the trace is encoded and kept verbatim, otherwise
    /// it is folded into the stats for the trace's client.
    pub fn add_trace(&mut self, stats_report_key: &str, trace: &Trace, as_raw_trace: bool) {
        let size = &mut self.size;
        if !self.operations.contains_key(stats_report_key) {
            size.add(estimated_bytes_for_string(stats_report_key));
        }
        let operation = self
            .operations
            .entry(stats_report_key.to_string())
            .or_default();

        if as_raw_trace {
            let encoded = trace.encode_to_vec();
            size.add(2 + encoded.len());
            operation.traces.push(encoded);
        } else {
            operation.stats.add_trace(trace, size);
        }

        self.operation_count += operation_count(stats_report_key);
    }

    /// Everything recorded under `stats_report_key`
    pub fn operation(&self, stats_report_key: &str) -> Option<&OperationReport> {
        self.operations.get(stats_report_key)
    }

    /// All operations with their keys, in no particular order
    pub fn operations(&self) -> impl Iterator<Item = (&str, &OperationReport)> {
        self.operations
            .iter()
            .map(|(key, operation)| (key.as_str(), operation))
    }

    /// True until the first trace is added
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Estimated encoded size so far
    pub fn size_bytes(&self) -> usize {
        self.size.bytes()
    }

    /// Operations counted so far
    pub fn operation_count(&self) -> u64 {
        self.operation_count
    }

    /// Stamp the accumulated data into an outbound message
    pub fn to_proto(&self, header: ReportHeader, end_time: prost_types::Timestamp) -> proto::Report {
        proto::Report {
            header: Some(header),
            traces_per_query: self
                .operations
                .iter()
                .map(|(key, operation)| (key.clone(), operation.to_proto()))
                .collect(),
            end_time: Some(end_time),
            operation_count: self.operation_count,
        }
    }
}
