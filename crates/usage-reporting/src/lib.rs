//! # Usage Reporting
//!
//! Usage-reporting telemetry engine for GraphQL servers.
//!
//! Records a trace of every request as its fields resolve, decides per
//! operation whether to send the trace verbatim or only aggregate it, and
//! folds aggregated traces into compact per-client statistics with
//! logarithmic latency histograms.
//!
//! ## Architecture
//!
//! - **Trace**: per-request [`TraceTreeBuilder`] and a walker over finished
//!   traces, including federated sub-traces
//! - **Stats**: per-client latency, cache, field and error-path statistics
//! - **Sampling**: bounded fingerprint cache choosing which traces to send
//! - **Report**: per-operation accumulation with a running size estimate
//! - **Pipeline**: a tokio task flushing reports to a [`ReportSink`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use usage_reporting::prelude::*;
//!
//! # async fn run() -> usage_reporting::Result<()> {
//! let config = Config::load(None)?;
//! let (sink, _reports) = ChannelSink::new();
//! let (sender, _task) = Pipeline::spawn(config.reporting, Arc::new(sink));
//!
//! let builder = TraceTreeBuilder::new();
//! builder.start_timing()?;
//! let path = ResponsePath::root().child_key("me");
//! builder.will_resolve_field(&path, "Query", "User", "me")?.complete();
//! builder.stop_timing()?;
//!
//! let key = stats_report_key(Some("Me"), "query Me{me{id}}");
//! sender.submit(CompletedTrace::new(key, builder.finish()?)).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod histogram;
pub mod logging;
pub mod pipeline;
pub mod privacy;
pub mod proto;
pub mod report;
pub mod sampling;
pub mod stats;
pub mod trace;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{CompletedTrace, Pipeline, ReportSink, TraceSender};
pub use trace::TraceTreeBuilder;

/// Re-exports for convenience
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::histogram::DurationHistogram;
    pub use crate::pipeline::{
        ChannelSink, CompletedTrace, Pipeline, ReportSink, TraceSender, UsageAccumulator,
    };
    pub use crate::privacy::SendValues;
    pub use crate::report::{stats_report_key, Report};
    pub use crate::sampling::TraceSampler;
    pub use crate::stats::StatsAggregator;
    pub use crate::trace::{
        ClientInfo, ErrorRewriter, GraphQlError, PathSegment, ResponsePath, TraceTreeBuilder,
    };
}
