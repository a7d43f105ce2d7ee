//! Per-operation decision between sending a full trace and stats only
//!
//! Every trace gets a coarse fingerprint built from its stats report key,
//! its duration bucket and the minute it ended in. Traces containing errors
//! additionally carry the 5-second window they ended in. The first trace
//! with a given fingerprint is sent verbatim; later ones only feed stats.
//!
//! Fingerprints live in an LRU bounded by the total length of the stored
//! keys rather than by entry count.

use ordered_hash_map::OrderedHashMap;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::histogram::duration_to_bucket;
use crate::proto::Trace;
use crate::trace::has_errors;

/// Default byte budget of the fingerprint cache
pub const DEFAULT_CACHE_MAX_BYTES: usize = 1024 * 1024;

/// Decides which traces are sent in full
#[derive(Debug)]
pub struct TraceSampler {
    seen: OrderedHashMap<String, ()>,
    bytes: usize,
    max_bytes: usize,
}

impl Default for TraceSampler {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_MAX_BYTES)
    }
}

impl TraceSampler {
    /// Create a sampler whose cache holds at most `max_bytes` of keys
    pub fn new(max_bytes: usize) -> Self {
        Self {
            seen: OrderedHashMap::new(),
            bytes: 0,
            max_bytes,
        }
    }

    /// Whether `trace` should be reported as a full trace.
    ///
    /// Fails with [`Error::MissingEndTime`] for traces that were never
    /// stopped.
    pub fn should_send_as_trace(&mut self, stats_report_key: &str, trace: &Trace) -> Result<bool> {
        let cache_key = fingerprint(stats_report_key, trace)?;

        if self.seen.contains_key(&cache_key) {
            self.seen.move_to_back(&cache_key);
            debug!(key = %stats_report_key, "Similar trace already sent, folding into stats");
            return Ok(false);
        }

        self.bytes += cache_key.len();
        self.seen.insert(cache_key, ());
        self.evict();
        Ok(true)
    }

    /// Number of fingerprints currently remembered
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// True when no fingerprint is remembered
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Total length of the remembered fingerprints
    pub fn cached_bytes(&self) -> usize {
        self.bytes
    }

    fn evict(&mut self) {
        while self.bytes > self.max_bytes {
            match self.seen.pop_front_entry() {
                Some((key, ())) => self.bytes -= key.len(),
                None => break,
            }
        }
    }
}

fn fingerprint(stats_report_key: &str, trace: &Trace) -> Result<String> {
    let end_time = trace.end_time.as_ref().ok_or(Error::MissingEndTime)?;
    let error_window = if has_errors(trace) {
        json!(end_time.seconds.div_euclid(5))
    } else {
        Value::String(String::new())
    };

    let key = json!([
        stats_report_key,
        duration_to_bucket(trace.duration_ns as f64),
        end_time.seconds.div_euclid(60),
        error_window,
    ]);
    Ok(serde_json::to_string(&key)?)
}
