//! Stats for a single client identity

use std::collections::HashMap;

use super::path_errors::PathErrorStats;
use crate::histogram::DurationHistogram;
use crate::proto::trace::cache_policy::Scope;
use crate::proto::{self, StatsContext, Trace};
use crate::report::{estimated_bytes_for_string, SizeEstimator};
use crate::trace::walk;

/// Request-level counters and histograms
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryLatencyStats {
    /// Request durations outside full-query cache hits
    pub latency_count: DurationHistogram,
    /// Requests seen
    pub request_count: u64,
    /// Requests served entirely from cache
    pub cache_hits: u64,
    /// Persisted query hits
    pub persisted_query_hits: u64,
    /// Persisted query registrations
    pub persisted_query_misses: u64,
    /// Durations of full-query cache hits
    pub cache_latency_count: DurationHistogram,
    /// Error counts by response path
    pub root_error_stats: PathErrorStats,
    /// Requests with at least one error anywhere
    pub requests_with_errors_count: u64,
    /// Max-age of publicly cacheable responses
    pub public_cache_ttl_count: DurationHistogram,
    /// Max-age of privately cacheable responses
    pub private_cache_ttl_count: DurationHistogram,
    /// Requests for registered operations
    pub registered_operation_count: u64,
    /// Requests rejected as forbidden
    pub forbidden_operation_count: u64,
}

impl QueryLatencyStats {
    /// Convert into the wire form
    pub fn to_proto(&self) -> proto::QueryLatencyStats {
        proto::QueryLatencyStats {
            latency_count: self.latency_count.to_array(),
            request_count: self.request_count,
            cache_hits: self.cache_hits,
            persisted_query_hits: self.persisted_query_hits,
            persisted_query_misses: self.persisted_query_misses,
            cache_latency_count: self.cache_latency_count.to_array(),
            root_error_stats: Some(self.root_error_stats.to_proto()),
            requests_with_errors_count: self.requests_with_errors_count,
            public_cache_ttl_count: self.public_cache_ttl_count.to_array(),
            private_cache_ttl_count: self.private_cache_ttl_count.to_array(),
            registered_operation_count: self.registered_operation_count,
            forbidden_operation_count: self.forbidden_operation_count,
        }
    }
}

/// Execution counters for one (parent type, field) pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldStat {
    /// Declared return type, from the first resolution seen
    pub return_type: String,
    /// Errors raised by the field
    pub errors_count: u64,
    /// Resolutions counted
    pub count: u64,
    /// Resolutions with at least one error
    pub requests_with_errors_count: u64,
    /// Resolver durations
    pub latency_count: DurationHistogram,
}

impl FieldStat {
    /// Empty stats for a field returning `return_type`
    pub fn new(return_type: impl Into<String>) -> Self {
        Self {
            return_type: return_type.into(),
            ..Self::default()
        }
    }

    /// Convert into the wire form
    pub fn to_proto(&self) -> proto::FieldStat {
        proto::FieldStat {
            return_type: self.return_type.clone(),
            errors_count: self.errors_count,
            count: self.count,
            requests_with_errors_count: self.requests_with_errors_count,
            latency_count: self.latency_count.to_array(),
        }
    }
}

/// Field stats of one parent type, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeStat {
    /// Keyed by field name
    pub per_field_stat: HashMap<String, FieldStat>,
}

impl TypeStat {
    /// Convert into the wire form
    pub fn to_proto(&self) -> proto::TypeStat {
        proto::TypeStat {
            per_field_stat: self
                .per_field_stat
                .iter()
                .map(|(name, stat)| (name.clone(), stat.to_proto()))
                .collect(),
        }
    }
}

/// Everything aggregated for one client identity in a report window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextualizedStats {
    /// Client identity these stats belong to
    pub context: StatsContext,
    /// Request-level counters and histograms
    pub query_latency_stats: QueryLatencyStats,
    /// Keyed by parent type name
    pub per_type_stat: HashMap<String, TypeStat>,
}

impl ContextualizedStats {
    /// Empty stats for `context`
    pub fn new(context: StatsContext) -> Self {
        Self {
            context,
            query_latency_stats: QueryLatencyStats::default(),
            per_type_stat: HashMap::new(),
        }
    }

    /// Fold one trace into these stats.
    ///
    /// Aliased fields are counted under their schema field name. A request
    /// counts as erroring once, however many of its nodes had errors.
    pub fn add_trace(&mut self, trace: &Trace, size: &mut SizeEstimator) {
        let stats = &mut self.query_latency_stats;
        stats.request_count += 1;

        if trace.full_query_cache_hit {
            stats.cache_latency_count.increment_duration(trace.duration_ns);
            stats.cache_hits += 1;
        } else {
            stats.latency_count.increment_duration(trace.duration_ns);
            if let Some(policy) = trace.cache_policy.as_ref().filter(|p| p.max_age_ns > 0) {
                let max_age_ns = policy.max_age_ns as u64;
                match policy.scope() {
                    Scope::Public => stats.public_cache_ttl_count.increment_duration(max_age_ns),
                    Scope::Private => stats.private_cache_ttl_count.increment_duration(max_age_ns),
                    Scope::Unknown => {}
                }
            }
        }

        if trace.persisted_query_hit {
            stats.persisted_query_hits += 1;
        }
        if trace.persisted_query_register {
            stats.persisted_query_misses += 1;
        }
        if trace.forbidden_operation {
            stats.forbidden_operation_count += 1;
        }
        if trace.registered_operation {
            stats.registered_operation_count += 1;
        }

        let mut has_error = false;
        let root_error_stats = &mut stats.root_error_stats;
        let per_type_stat = &mut self.per_type_stat;

        walk(trace, |node, path| {
            let errors = node.error.len() as u64;
            if errors > 0 {
                has_error = true;
                let entry = root_error_stats.descend(path, size);
                entry.errors_count += errors;
                entry.requests_with_errors_count += 1;
            }

            let Some(field_name) = node.field_name() else {
                return false;
            };
            if node.parent_type.is_empty() || node.r#type.is_empty() {
                return false;
            }
            if node.end_time < node.start_time {
                return false;
            }

            let type_stat = per_type_stat
                .entry(node.parent_type.clone())
                .or_insert_with(|| {
                    size.add(10 + estimated_bytes_for_string(&node.parent_type));
                    TypeStat::default()
                });
            let field_stat = type_stat
                .per_field_stat
                .entry(field_name.to_string())
                .or_insert_with(|| {
                    size.add(
                        estimated_bytes_for_string(field_name)
                            + estimated_bytes_for_string(&node.r#type)
                            + 10,
                    );
                    FieldStat::new(node.r#type.clone())
                });

            field_stat.errors_count += errors;
            field_stat.count += 1;
            field_stat.requests_with_errors_count += u64::from(errors > 0);
            field_stat
                .latency_count
                .increment_duration(node.end_time - node.start_time);
            false
        });

        if has_error {
            self.query_latency_stats.requests_with_errors_count += 1;
        }
    }

    /// Stats for `field_name` on `parent_type`, if the field was seen
    pub fn field_stat(&self, parent_type: &str, field_name: &str) -> Option<&FieldStat> {
        self.per_type_stat
            .get(parent_type)?
            .per_field_stat
            .get(field_name)
    }

    /// Convert into the wire form
    pub fn to_proto(&self) -> proto::ContextualizedStats {
        proto::ContextualizedStats {
            context: Some(self.context.clone()),
            query_latency_stats: Some(self.query_latency_stats.to_proto()),
            per_type_stat: self
                .per_type_stat
                .iter()
                .map(|(name, stat)| (name.clone(), stat.to_proto()))
                .collect(),
        }
    }
}
