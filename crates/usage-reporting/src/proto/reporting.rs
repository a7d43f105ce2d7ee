//! Outbound usage report messages
//!
//! Histogram fields carry the sparse encoding produced by
//! [`DurationHistogram::to_array`](crate::histogram::DurationHistogram::to_array).

use std::collections::HashMap;

/// Identifies the reporting server
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReportHeader {
    /// Host the report was produced on.
    #[prost(string, tag = "5")]
    pub hostname: String,
    /// Name and version of the reporting agent.
    #[prost(string, tag = "6")]
    pub agent_version: String,
    /// Language runtime of the agent.
    #[prost(string, tag = "8")]
    pub runtime_version: String,
    /// Operating system and architecture.
    #[prost(string, tag = "9")]
    pub uname: String,
    /// Graph the report belongs to, `name@variant`.
    #[prost(string, tag = "12")]
    pub graph_ref: String,
}

/// Client identity that stats are keyed by
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct StatsContext {
    /// Client name as reported by the caller.
    #[prost(string, tag = "2")]
    pub client_name: String,
    /// Client version as reported by the caller.
    #[prost(string, tag = "3")]
    pub client_version: String,
    /// Client reference id.
    #[prost(string, tag = "4")]
    pub client_reference_id: String,
}

/// Error counts for one response path segment and its descendants
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PathErrorStats {
    /// Keyed by field name.
    #[prost(map = "string, message", tag = "1")]
    pub children: HashMap<String, PathErrorStats>,
    /// Errors recorded at this path.
    #[prost(uint64, tag = "4")]
    pub errors_count: u64,
    /// Erroring nodes recorded at this path.
    #[prost(uint64, tag = "5")]
    pub requests_with_errors_count: u64,
}

/// Request-level counters and histograms
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryLatencyStats {
    /// Request durations outside full-query cache hits.
    #[prost(sint64, repeated, tag = "13")]
    pub latency_count: Vec<i64>,
    /// Requests seen.
    #[prost(uint64, tag = "2")]
    pub request_count: u64,
    /// Requests served entirely from cache.
    #[prost(uint64, tag = "3")]
    pub cache_hits: u64,
    /// Requests whose query text came from the persisted query store.
    #[prost(uint64, tag = "4")]
    pub persisted_query_hits: u64,
    /// Requests that registered their query text.
    #[prost(uint64, tag = "5")]
    pub persisted_query_misses: u64,
    /// Durations of full-query cache hits.
    #[prost(sint64, repeated, tag = "14")]
    pub cache_latency_count: Vec<i64>,
    /// Error counts by response path.
    #[prost(message, optional, tag = "7")]
    pub root_error_stats: Option<PathErrorStats>,
    /// Requests with at least one error.
    #[prost(uint64, tag = "8")]
    pub requests_with_errors_count: u64,
    /// Max-age of publicly cacheable responses.
    #[prost(sint64, repeated, tag = "15")]
    pub public_cache_ttl_count: Vec<i64>,
    /// Max-age of privately cacheable responses.
    #[prost(sint64, repeated, tag = "16")]
    pub private_cache_ttl_count: Vec<i64>,
    /// Requests for registered operations.
    #[prost(uint64, tag = "11")]
    pub registered_operation_count: u64,
    /// Requests rejected as forbidden operations.
    #[prost(uint64, tag = "12")]
    pub forbidden_operation_count: u64,
}

/// Execution counters for one field
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FieldStat {
    /// Declared return type.
    #[prost(string, tag = "3")]
    pub return_type: String,
    /// Errors raised by the field.
    #[prost(uint64, tag = "4")]
    pub errors_count: u64,
    /// Times the field was resolved.
    #[prost(uint64, tag = "5")]
    pub count: u64,
    /// Resolutions with at least one error.
    #[prost(uint64, tag = "6")]
    pub requests_with_errors_count: u64,
    /// Resolver durations.
    #[prost(sint64, repeated, tag = "9")]
    pub latency_count: Vec<i64>,
}

/// Field stats of one parent type
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypeStat {
    /// Keyed by field name.
    #[prost(map = "string, message", tag = "3")]
    pub per_field_stat: HashMap<String, FieldStat>,
}

/// Aggregated stats for one client identity over one report window
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContextualizedStats {
    /// Client the stats belong to.
    #[prost(message, optional, tag = "1")]
    pub context: Option<StatsContext>,
    /// Request-level stats.
    #[prost(message, optional, tag = "2")]
    pub query_latency_stats: Option<QueryLatencyStats>,
    /// Keyed by parent type name.
    #[prost(map = "string, message", tag = "3")]
    pub per_type_stat: HashMap<String, TypeStat>,
}

/// Everything reported for one stats report key
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TracesAndStats {
    /// Pre-encoded `Trace` messages. Wire-identical to `repeated Trace`.
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub trace: Vec<Vec<u8>>,
    /// Aggregated stats, one entry per client.
    #[prost(message, repeated, tag = "2")]
    pub stats_with_context: Vec<ContextualizedStats>,
}

/// Top-level message sent to the collector
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Report {
    /// Reporting agent identity.
    #[prost(message, optional, tag = "1")]
    pub header: Option<ReportHeader>,
    /// Keyed by stats report key.
    #[prost(map = "string, message", tag = "5")]
    pub traces_per_query: HashMap<String, TracesAndStats>,
    /// Time the report window closed.
    #[prost(message, optional, tag = "2")]
    pub end_time: Option<prost_types::Timestamp>,
    /// Operations counted in this report.
    #[prost(uint64, tag = "6")]
    pub operation_count: u64,
}
