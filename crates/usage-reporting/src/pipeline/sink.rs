//! Destinations for finished reports

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::proto;

/// Receives every non-empty report the pipeline flushes.
///
/// Errors are logged by the pipeline and the report is dropped.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver one report
    async fn send(&self, report: proto::Report) -> Result<()>;
}

/// Sink forwarding reports into a channel, for embedding the pipeline in a
/// process that owns its own transport
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<proto::Report>,
}

impl ChannelSink {
    /// Create a sink and the receiver its reports arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<proto::Report>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ReportSink for ChannelSink {
    async fn send(&self, report: proto::Report) -> Result<()> {
        self.tx
            .send(report)
            .map_err(|e| Error::Channel(e.to_string()))
    }
}
