//! The in-memory state of one reporting process

use std::mem;

use tracing::{debug, warn};

use crate::config::ReportingConfig;
use crate::proto::Trace;
use crate::report::Report;
use crate::sampling::TraceSampler;

/// Routes finished traces into the live report.
///
/// The sampler outlives report windows so that a fingerprint seen just
/// before a flush still suppresses duplicates just after it.
#[derive(Debug)]
pub struct UsageAccumulator {
    sampler: TraceSampler,
    report: Report,
    send_traces: bool,
    max_report_size: usize,
}

impl UsageAccumulator {
    /// Create an accumulator with an empty report and sampler
    pub fn new(config: &ReportingConfig) -> Self {
        Self {
            sampler: TraceSampler::new(config.trace_cache_max_bytes),
            report: Report::new(),
            send_traces: config.send_traces,
            max_report_size: config.max_uncompressed_report_size,
        }
    }

    /// Add a trace, returning whether the report should be flushed now
    pub fn add_trace(&mut self, stats_report_key: &str, trace: &Trace) -> bool {
        let as_raw_trace = self.send_traces
            && match self.sampler.should_send_as_trace(stats_report_key, trace) {
                Ok(send) => send,
                Err(e) => {
                    warn!(key = %stats_report_key, error = %e, "Cannot sample trace; aggregating it");
                    false
                }
            };

        self.report.add_trace(stats_report_key, trace, as_raw_trace);

        let size = self.report.size_bytes();
        if size >= self.max_report_size {
            debug!(size, max = self.max_report_size, "Report reached size limit");
            return true;
        }
        false
    }

    /// The report being accumulated
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Swap in an empty report and return the accumulated one
    pub fn take_report(&mut self) -> Report {
        mem::take(&mut self.report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost_types::Timestamp;

    const KEY: &str = "# Q\n{a}";

    fn trace(end_seconds: i64) -> Trace {
        Trace {
            end_time: Some(Timestamp {
                seconds: end_seconds,
                nanos: 0,
            }),
            duration_ns: 2_000_000,
            ..Trace::default()
        }
    }

    #[test]
    fn test_first_trace_raw_then_stats() {
        let mut accumulator = UsageAccumulator::new(&ReportingConfig::default());
        assert!(!accumulator.add_trace(KEY, &trace(100)));
        assert!(!accumulator.add_trace(KEY, &trace(100)));

        let operation = accumulator.report().operation(KEY).unwrap();
        assert_eq!(operation.traces.len(), 1);
        assert_eq!(operation.stats.len(), 1);
    }

    #[test]
    fn test_send_traces_off_aggregates_everything() {
        let config = ReportingConfig {
            send_traces: false,
            ..ReportingConfig::default()
        };
        let mut accumulator = UsageAccumulator::new(&config);
        accumulator.add_trace(KEY, &trace(100));
        accumulator.add_trace(KEY, &trace(200));

        let operation = accumulator.report().operation(KEY).unwrap();
        assert!(operation.traces.is_empty());
    }

    #[test]
    fn test_unstopped_trace_is_aggregated() {
        let mut accumulator = UsageAccumulator::new(&ReportingConfig::default());
        accumulator.add_trace(KEY, &Trace::default());

        let operation = accumulator.report().operation(KEY).unwrap();
        assert!(operation.traces.is_empty());
        assert!(!operation.stats.is_empty());
    }

    #[test]
    fn test_size_threshold() {
        let config = ReportingConfig {
            max_uncompressed_report_size: 64,
            ..ReportingConfig::default()
        };
        let mut accumulator = UsageAccumulator::new(&config);
        let mut flushed = false;
        for second in 0..10 {
            flushed |= accumulator.add_trace(KEY, &trace(second * 60));
        }
        assert!(flushed);
    }

    #[test]
    fn test_take_report_keeps_sampler() {
        let mut accumulator = UsageAccumulator::new(&ReportingConfig::default());
        accumulator.add_trace(KEY, &trace(100));

        let taken = accumulator.take_report();
        assert_eq!(taken.operation(KEY).unwrap().traces.len(), 1);
        assert!(accumulator.report().is_empty());

        // same fingerprint after the swap goes to stats
        accumulator.add_trace(KEY, &trace(100));
        assert!(accumulator.report().operation(KEY).unwrap().traces.is_empty());
    }
}
