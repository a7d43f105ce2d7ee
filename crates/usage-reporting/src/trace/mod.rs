//! Per-request execution traces
//!
//! [`TraceTreeBuilder`] records a trace while a request executes, and
//! [`walk`] traverses a finished trace, descending into the subgraph
//! traces embedded in a gateway query plan.

mod builder;
mod error;
mod path;
pub(crate) mod walker;

pub use builder::{ClientInfo, FieldCompletion, TraceTreeBuilder};
pub use error::{ErrorLocation, ErrorRewriter, GraphQlError};
pub use path::{PathSegment, ResponsePath};
pub use walker::{has_errors, walk};
