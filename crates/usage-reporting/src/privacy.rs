//! Filtering of variable values and request headers before they are
//! attached to a trace

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::proto::trace::{http::Method, Details, HeaderValues, Http};

/// Placeholder for variable values that cannot be encoded as JSON
pub const UNSERIALIZABLE_VALUE: &str = "[Unable to convert value to JSON]";

/// Headers that are never reported, whatever the policy
const SENSITIVE_HEADERS: [&str; 3] = ["authorization", "cookie", "set-cookie"];

/// Which named values may be reported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendValues {
    /// Report nothing
    #[default]
    None,
    /// Report everything
    All,
    /// Report everything except the listed names
    ExceptNames(Vec<String>),
    /// Report only the listed names
    OnlyNames(Vec<String>),
}

impl SendValues {
    /// Whether the value called `name` may be reported
    pub fn allows(&self, name: &str) -> bool {
        self.allows_by(|listed| listed == name)
    }

    /// Like [`allows`](Self::allows), comparing names case-insensitively
    pub fn allows_ignore_case(&self, name: &str) -> bool {
        self.allows_by(|listed| listed.eq_ignore_ascii_case(name))
    }

    fn allows_by(&self, matches: impl Fn(&str) -> bool) -> bool {
        match self {
            SendValues::None => false,
            SendValues::All => true,
            SendValues::ExceptNames(names) => !names.iter().any(|listed| matches(listed)),
            SendValues::OnlyNames(names) => names.iter().any(|listed| matches(listed)),
        }
    }
}

/// JSON-encode operation variables under `policy`.
///
/// Every variable keeps its name; hidden ones are reported as an empty
/// string.
pub fn variables_json<'a, K, V, I>(variables: I, policy: &SendValues) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, &'a V)>,
    K: AsRef<str>,
    V: Serialize + ?Sized + 'a,
{
    variables
        .into_iter()
        .map(|(name, value)| {
            let name = name.as_ref();
            let encoded = if policy.allows(name) {
                serde_json::to_string(value).unwrap_or_else(|e| {
                    debug!(variable = %name, error = %e, "Variable value is not JSON serializable");
                    serde_json::Value::from(UNSERIALIZABLE_VALUE).to_string()
                })
            } else {
                String::new()
            };
            (name.to_string(), encoded)
        })
        .collect()
}

/// Operation details to attach to a trace
pub fn trace_details<'a, K, V, I>(
    operation_name: Option<&str>,
    variables: I,
    policy: &SendValues,
) -> Details
where
    I: IntoIterator<Item = (K, &'a V)>,
    K: AsRef<str>,
    V: Serialize + ?Sized + 'a,
{
    Details {
        variables_json: variables_json(variables, policy),
        operation_name: operation_name.unwrap_or_default().to_string(),
    }
}

/// Filter request headers under `policy`.
///
/// Names are lower-cased and repeated headers keep all their values.
pub fn request_headers<I, K, V>(headers: I, policy: &SendValues) -> HashMap<String, HeaderValues>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut filtered: HashMap<String, HeaderValues> = HashMap::new();
    if matches!(policy, SendValues::None) {
        return filtered;
    }

    for (name, value) in headers {
        let name = name.as_ref().to_ascii_lowercase();
        if SENSITIVE_HEADERS.contains(&name.as_str()) || !policy.allows_ignore_case(&name) {
            continue;
        }
        filtered.entry(name).or_default().value.push(value.into());
    }
    filtered
}

/// HTTP metadata to attach to a trace
pub fn http_metadata<I, K, V>(method: &str, headers: I, policy: &SendValues) -> Http
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    Http {
        method: Method::parse(method) as i32,
        request_headers: request_headers(headers, policy),
        status_code: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    fn variables() -> Vec<(&'static str, Value)> {
        vec![
            ("id", json!(42)),
            ("password", json!("hunter2")),
            ("filter", json!({"active": true})),
        ]
    }

    fn encode(policy: &SendValues) -> HashMap<String, String> {
        let vars = variables();
        variables_json(vars.iter().map(|(name, value)| (*name, value)), policy)
    }

    #[test]
    fn test_variables_none_keeps_names_only() {
        let encoded = encode(&SendValues::None);
        assert_eq!(encoded.len(), 3);
        assert!(encoded.values().all(String::is_empty));
    }

    #[test]
    fn test_variables_all() {
        let encoded = encode(&SendValues::All);
        assert_eq!(encoded["id"], "42");
        assert_eq!(encoded["password"], "\"hunter2\"");
        assert_eq!(encoded["filter"], r#"{"active":true}"#);
    }

    #[test]
    fn test_variables_except_names() {
        let encoded = encode(&SendValues::ExceptNames(vec!["password".to_string()]));
        assert_eq!(encoded["password"], "");
        assert_eq!(encoded["id"], "42");
    }

    #[test]
    fn test_variables_only_names_is_case_sensitive() {
        let encoded = encode(&SendValues::OnlyNames(vec!["ID".to_string(), "filter".to_string()]));
        assert_eq!(encoded["id"], "");
        assert_eq!(encoded["filter"], r#"{"active":true}"#);
    }

    #[test]
    fn test_unserializable_variable() {
        let mut bad = BTreeMap::new();
        bad.insert((1, 2), "tuple keys are not valid JSON object keys");
        let encoded = variables_json([("bad", &bad)], &SendValues::All);
        assert_eq!(encoded["bad"], "\"[Unable to convert value to JSON]\"");
    }

    #[test]
    fn test_trace_details() {
        let vars = variables();
        let details = trace_details(
            Some("GetUser"),
            vars.iter().map(|(name, value)| (*name, value)),
            &SendValues::None,
        );
        assert_eq!(details.operation_name, "GetUser");
        assert_eq!(details.variables_json.len(), 3);
    }

    fn headers() -> Vec<(&'static str, &'static str)> {
        vec![
            ("Authorization", "Bearer secret"),
            ("Cookie", "session=1"),
            ("Set-Cookie", "session=2"),
            ("Accept", "application/json"),
            ("X-Trace", "a"),
            ("x-trace", "b"),
        ]
    }

    #[test]
    fn test_headers_none() {
        assert!(request_headers(headers(), &SendValues::None).is_empty());
    }

    #[test]
    fn test_headers_all_drops_sensitive_and_lowercases() {
        let filtered = request_headers(headers(), &SendValues::All);
        let mut names: Vec<_> = filtered.keys().cloned().collect();
        names.sort();
        assert_eq!(names, vec!["accept", "x-trace"]);
        assert_eq!(filtered["x-trace"].value, vec!["a", "b"]);
    }

    #[rstest]
    #[case(SendValues::ExceptNames(vec!["ACCEPT".to_string()]), vec!["x-trace"])]
    #[case(SendValues::OnlyNames(vec!["Accept".to_string()]), vec!["accept"])]
    #[case(SendValues::OnlyNames(vec!["authorization".to_string()]), vec![])]
    fn test_headers_name_lists(#[case] policy: SendValues, #[case] expected: Vec<&str>) {
        let filtered = request_headers(headers(), &policy);
        let mut names: Vec<_> = filtered.keys().map(String::as_str).collect();
        names.sort();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_http_metadata() {
        let http = http_metadata("post", headers(), &SendValues::All);
        assert_eq!(http.method, Method::Post as i32);
        assert!(http.request_headers.contains_key("accept"));
    }

    #[test]
    fn test_policy_from_config_value() {
        let policy: SendValues = serde_json::from_value(json!({"only_names": ["id"]})).unwrap();
        assert_eq!(policy, SendValues::OnlyNames(vec!["id".to_string()]));
        let policy: SendValues = serde_json::from_value(json!("all")).unwrap();
        assert_eq!(policy, SendValues::All);
    }
}
