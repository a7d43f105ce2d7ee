//! GraphQL errors as seen by the trace builder, and the rewrite hook

use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use super::path::PathSegment;
use crate::error::BoxError;
use crate::proto::trace;

/// Extension key marking an error that originated in a subgraph
const SERVICE_NAME_EXTENSION: &str = "serviceName";

/// Source location of an error in the operation document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

/// An error produced while executing a request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphQlError {
    /// Human-readable message
    pub message: String,
    /// Locations in the operation document
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ErrorLocation>,
    /// Response path the error belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    /// Arbitrary error metadata
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extensions: Map<String, Value>,
}

impl GraphQlError {
    /// Create an error with only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Attach the response path the error belongs to
    pub fn with_path(mut self, path: impl IntoIterator<Item = PathSegment>) -> Self {
        self.path = Some(path.into_iter().collect());
        self
    }

    /// Attach a source location
    pub fn with_location(mut self, line: u32, column: u32) -> Self {
        self.locations.push(ErrorLocation { line, column });
        self
    }

    /// Set an extension entry
    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }

    /// Errors forwarded from a subgraph are already part of its nested trace
    pub fn is_from_subgraph(&self) -> bool {
        self.extensions
            .get(SERVICE_NAME_EXTENSION)
            .is_some_and(|value| !value.is_null())
    }

    /// Convert into the wire form, with a JSON snapshot of the whole error
    pub(crate) fn to_proto(&self) -> trace::Error {
        let json = serde_json::to_string(self).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to serialize GraphQL error for trace");
            String::new()
        });

        trace::Error {
            message: self.message.clone(),
            location: self
                .locations
                .iter()
                .map(|location| trace::Location {
                    line: location.line,
                    column: location.column,
                })
                .collect(),
            time_ns: 0,
            json,
        }
    }
}

/// Hook that may redact or drop errors before they are recorded.
///
/// `Ok(Some(_))` replaces the message and extensions, `Ok(None)` drops the
/// error, and `Err(_)` keeps the original. An empty extensions map in the
/// rewritten error removes all extensions.
pub trait ErrorRewriter: Send + Sync {
    /// Rewrite or drop one error before it is recorded
    fn rewrite(&self, error: GraphQlError) -> Result<Option<GraphQlError>, BoxError>;
}

impl<F> ErrorRewriter for F
where
    F: Fn(GraphQlError) -> Result<Option<GraphQlError>, BoxError> + Send + Sync,
{
    fn rewrite(&self, error: GraphQlError) -> Result<Option<GraphQlError>, BoxError> {
        self(error)
    }
}

/// Run the rewrite hook, falling back to the original error on failure.
///
/// Only the message and extensions of a rewritten error are used; its path
/// and locations always come from the original.
pub(crate) fn rewrite_error(
    rewriter: Option<&dyn ErrorRewriter>,
    error: &GraphQlError,
) -> Option<GraphQlError> {
    let Some(rewriter) = rewriter else {
        return Some(error.clone());
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| rewriter.rewrite(error.clone())));
    match outcome {
        Ok(Ok(Some(rewritten))) => Some(GraphQlError {
            message: rewritten.message,
            locations: error.locations.clone(),
            path: error.path.clone(),
            extensions: rewritten.extensions,
        }),
        Ok(Ok(None)) => None,
        Ok(Err(e)) => {
            warn!(error = %e, "Error rewrite hook failed; reporting original error");
            Some(error.clone())
        }
        Err(_) => {
            warn!("Error rewrite hook panicked; reporting original error");
            Some(error.clone())
        }
    }
}
