//! Logarithmic duration histogram
//!
//! Bucket `i` covers durations of roughly `1000 * 1.1^i` nanoseconds, so the
//! fixed domain of 384 buckets spans one microsecond to well over a day.
//! Histograms travel on the wire in a sparse form where runs of empty buckets
//! collapse into a single negative "skip" marker.

use crate::error::{Error, Result};

/// Number of buckets in every histogram
pub const BUCKET_COUNT: usize = 384;

/// Storage reserved up front; covers durations up to about one second
const INITIAL_CAPACITY: usize = 74;

/// Map a duration in nanoseconds onto a bucket index.
///
/// Non-positive and NaN inputs land in bucket 0; anything at or beyond the
/// top of the domain saturates into the last bucket.
pub fn duration_to_bucket(duration_ns: f64) -> usize {
    let unbounded = ((duration_ns / 1000.0).ln() / 1.1_f64.ln()).ceil();
    if unbounded.is_nan() || unbounded <= 0.0 {
        0
    } else if unbounded >= BUCKET_COUNT as f64 {
        BUCKET_COUNT - 1
    } else {
        unbounded as usize
    }
}

/// Histogram of durations over a fixed logarithmic domain
#[derive(Debug, Clone, Default)]
pub struct DurationHistogram {
    buckets: Vec<i64>,
}

impl DurationHistogram {
    /// Create an empty histogram
    pub fn new() -> Self {
        Self {
            buckets: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Rebuild a histogram from its sparse encoding.
    ///
    /// A negative entry skips that many buckets; any other entry is written
    /// at the cursor, which then advances by one.
    pub fn from_array(encoded: &[i64]) -> Result<Self> {
        let mut histogram = Self::new();
        let mut cursor = 0usize;
        for &value in encoded {
            if value < 0 {
                cursor = cursor.saturating_add(value.unsigned_abs() as usize);
            } else {
                histogram.increment_bucket(cursor, value)?;
                cursor += 1;
            }
        }
        Ok(histogram)
    }

    /// Count one occurrence of `duration_ns`
    pub fn increment_duration(&mut self, duration_ns: u64) {
        self.increment_duration_by(duration_ns, 1);
    }

    /// Count `count` occurrences of `duration_ns`
    pub fn increment_duration_by(&mut self, duration_ns: u64, count: i64) {
        // duration_to_bucket never leaves the domain
        self.add(duration_to_bucket(duration_ns as f64), count);
    }

    /// Add `count` to a bucket, growing storage as needed
    pub fn increment_bucket(&mut self, bucket: usize, count: i64) -> Result<()> {
        if bucket >= BUCKET_COUNT {
            return Err(Error::BucketOutOfRange {
                bucket,
                max: BUCKET_COUNT - 1,
            });
        }
        self.add(bucket, count);
        Ok(())
    }

    /// Add every bucket of `other` into this histogram
    pub fn combine(&mut self, other: &DurationHistogram) {
        for (bucket, &count) in other.buckets.iter().enumerate() {
            self.add(bucket, count);
        }
    }

    /// Count stored in a bucket (zero for untouched buckets)
    pub fn get(&self, bucket: usize) -> i64 {
        self.buckets.get(bucket).copied().unwrap_or(0)
    }

    /// True when every bucket is zero
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|&count| count == 0)
    }

    /// Number of non-zero buckets
    pub fn populated_buckets(&self) -> usize {
        self.buckets.iter().filter(|&&count| count != 0).count()
    }

    /// Serialize into the sparse encoding.
    ///
    /// A single empty bucket is written as a literal `0`, longer runs as
    /// `-run_length`, and trailing empty buckets are dropped.
    pub fn to_array(&self) -> Vec<i64> {
        let mut out = Vec::new();
        let mut buffered_zeroes: i64 = 0;

        for &count in &self.buckets {
            if count == 0 {
                buffered_zeroes += 1;
                continue;
            }
            match buffered_zeroes {
                0 => {}
                1 => out.push(0),
                run => out.push(-run),
            }
            out.push(count);
            buffered_zeroes = 0;
        }

        out
    }

    fn add(&mut self, bucket: usize, count: i64) {
        if bucket >= self.buckets.len() {
            self.buckets.resize(bucket + 1, 0);
        }
        self.buckets[bucket] += count;
    }
}

impl PartialEq for DurationHistogram {
    fn eq(&self, other: &Self) -> bool {
        let len = self.buckets.len().max(other.buckets.len());
        (0..len).all(|bucket| self.get(bucket) == other.get(bucket))
    }
}

impl Eq for DurationHistogram {}
