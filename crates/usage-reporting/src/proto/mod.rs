//! Wire model for traces and usage reports
//!
//! These messages are both the in-memory trace representation and the
//! protobuf encoding shipped to the collector. Tag numbers are a contract
//! with the collector and must not be reused.

mod execution;
mod reporting;

pub use execution::*;
pub use reporting::*;

/// Convert a wall-clock time into a protobuf timestamp
pub fn timestamp(at: chrono::DateTime<chrono::Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: at.timestamp(),
        nanos: at.timestamp_subsec_nanos() as i32,
    }
}
