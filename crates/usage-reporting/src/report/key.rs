//! Keys that partition a report by operation

/// Key for requests that failed to parse
pub const PARSE_FAILURE_KEY: &str = "## GraphQLParseFailure\n";

/// Key for requests that failed validation
pub const VALIDATION_FAILURE_KEY: &str = "## GraphQLValidationFailure\n";

/// Key for requests naming an operation absent from the document
pub const UNKNOWN_OPERATION_NAME_KEY: &str = "## GraphQLUnknownOperationName\n";

/// Build the key an operation's traces and stats are reported under.
///
/// Anonymous operations use `-` as their name.
pub fn stats_report_key(operation_name: Option<&str>, signature: &str) -> String {
    let name = operation_name.filter(|name| !name.is_empty()).unwrap_or("-");
    format!("# {name}\n{signature}")
}

/// How many operations a trace under `key` stands for.
///
/// Requests that never reached execution are reported but not counted.
pub fn operation_count(key: &str) -> u64 {
    if key.starts_with("## ") {
        0
    } else {
        1
    }
}
