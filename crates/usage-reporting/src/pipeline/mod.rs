//! Reporting pipeline
//!
//! The pipeline receives finished traces from request handlers, folds them
//! into the live report, and periodically hands finished reports to a
//! [`ReportSink`]. All aggregation state is owned by one task, so producers
//! never contend on it.

mod accumulator;
mod sink;

pub use accumulator::UsageAccumulator;
pub use sink::{ChannelSink, ReportSink};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::ReportingConfig;
use crate::error::{Error, Result};
use crate::proto::{self, Trace};

/// Shortest flush interval the loop will run with
const MIN_REPORT_INTERVAL: Duration = Duration::from_millis(1);

/// A finished trace together with the key it is reported under
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTrace {
    /// Key the trace is reported under
    pub stats_report_key: String,
    /// The finished trace
    pub trace: Trace,
}

impl CompletedTrace {
    /// Pair a trace with its stats report key
    pub fn new(stats_report_key: impl Into<String>, trace: Trace) -> Self {
        Self {
            stats_report_key: stats_report_key.into(),
            trace,
        }
    }
}

/// Producer handle for submitting traces to a running [`Pipeline`].
///
/// The pipeline flushes one last time and stops once every sender is
/// dropped.
#[derive(Debug, Clone)]
pub struct TraceSender {
    trace_tx: mpsc::Sender<CompletedTrace>,
}

impl TraceSender {
    /// Submit a trace, waiting for channel capacity
    pub async fn submit(&self, trace: CompletedTrace) -> Result<()> {
        self.trace_tx
            .send(trace)
            .await
            .map_err(|e| Error::Channel(e.to_string()))
    }

    /// Submit a trace without waiting; fails when the channel is full
    pub fn try_submit(&self, trace: CompletedTrace) -> Result<()> {
        self.trace_tx
            .try_send(trace)
            .map_err(|e| Error::Channel(e.to_string()))
    }

    /// Submit a trace without waiting, logging and dropping it on failure.
    ///
    /// Suitable for request paths that must never fail because of telemetry.
    pub fn submit_or_drop(&self, trace: CompletedTrace) {
        if let Err(e) = self.try_submit(trace) {
            warn!(error = %e, "Dropping trace; usage reporting queue unavailable");
        }
    }

    /// Get pipeline statistics
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            queue_capacity: self.trace_tx.capacity(),
            queue_max_capacity: self.trace_tx.max_capacity(),
        }
    }
}

/// Pipeline statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Current queue capacity (available slots)
    pub queue_capacity: usize,
    /// Maximum queue capacity
    pub queue_max_capacity: usize,
}

/// Event loop owning the usage accumulator
pub struct Pipeline {
    config: ReportingConfig,
    accumulator: UsageAccumulator,
    sink: Arc<dyn ReportSink>,
    trace_rx: mpsc::Receiver<CompletedTrace>,
}

impl Pipeline {
    /// Create a pipeline and the sender feeding it
    pub fn new(config: ReportingConfig, sink: Arc<dyn ReportSink>) -> (Self, TraceSender) {
        let (trace_tx, trace_rx) = mpsc::channel(config.channel_capacity.max(1));
        let pipeline = Self {
            accumulator: UsageAccumulator::new(&config),
            config,
            sink,
            trace_rx,
        };
        (pipeline, TraceSender { trace_tx })
    }

    /// Spawn the pipeline on the current runtime
    pub fn spawn(
        config: ReportingConfig,
        sink: Arc<dyn ReportSink>,
    ) -> (TraceSender, tokio::task::JoinHandle<()>) {
        let (pipeline, sender) = Self::new(config, sink);
        (sender, tokio::spawn(pipeline.run()))
    }

    /// Run until every [`TraceSender`] is dropped
    pub async fn run(mut self) {
        // tokio intervals reject a zero period
        let period = self.config.report_interval().max(MIN_REPORT_INTERVAL);
        let mut flush_interval = interval_at(Instant::now() + period, period);
        flush_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = self.config.report_interval_ms,
            max_report_size = self.config.max_uncompressed_report_size,
            send_traces = self.config.send_traces,
            "Usage reporting pipeline started"
        );

        loop {
            tokio::select! {
                received = self.trace_rx.recv() => {
                    let Some(completed) = received else {
                        self.flush().await;
                        info!("Usage reporting pipeline stopped");
                        break;
                    };

                    let full = self
                        .accumulator
                        .add_trace(&completed.stats_report_key, &completed.trace);
                    if full || self.config.send_reports_immediately {
                        self.flush().await;
                    }
                }

                _ = flush_interval.tick() => {
                    self.flush().await;
                }
            }
        }
    }

    async fn flush(&mut self) {
        let report = self.accumulator.take_report();
        if report.is_empty() {
            return;
        }

        let size = report.size_bytes();
        let outbound = report.to_proto(
            self.config.report_header(),
            proto::timestamp(Utc::now()),
        );
        debug!(
            operations = outbound.traces_per_query.len(),
            operation_count = outbound.operation_count,
            estimated_bytes = size,
            "Flushing usage report"
        );

        if let Err(e) = self.sink.send(outbound).await {
            error!(error = %e, "Failed to send usage report");
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("accumulator", &self.accumulator)
            .finish_non_exhaustive()
    }
}
