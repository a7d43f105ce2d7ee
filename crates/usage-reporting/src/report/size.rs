//! Approximate encoded size of a report under construction

/// Estimated cost of a length-delimited string field
pub fn estimated_bytes_for_string(value: &str) -> usize {
    2 + value.len()
}

/// Running byte estimate consulted to decide when to flush a report.
///
/// This only tracks what is added; it is an approximation of the encoded
/// size, not an exact count.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SizeEstimator {
    bytes: usize,
}

impl SizeEstimator {
    /// Start from zero bytes
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `bytes` to the estimate
    pub fn add(&mut self, bytes: usize) {
        self.bytes += bytes;
    }

    /// Current estimate
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_cost() {
        assert_eq!(estimated_bytes_for_string(""), 2);
        assert_eq!(estimated_bytes_for_string("Query"), 7);
    }

    #[test]
    fn test_accumulates() {
        let mut size = SizeEstimator::new();
        size.add(10);
        size.add(estimated_bytes_for_string("abc"));
        assert_eq!(size.bytes(), 15);
    }
}
