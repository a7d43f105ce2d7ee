//! Drives a request from trace recording through to a flushed report

use std::sync::Arc;

use pretty_assertions::assert_eq;
use prost::Message;
use serde_json::json;

use usage_reporting::config::ReportingConfig;
use usage_reporting::histogram::{DurationHistogram, BUCKET_COUNT};
use usage_reporting::pipeline::{ChannelSink, CompletedTrace, Pipeline, UsageAccumulator};
use usage_reporting::privacy::{http_metadata, trace_details, SendValues};
use usage_reporting::proto::{self, Trace};
use usage_reporting::report::stats_report_key;
use usage_reporting::trace::{ClientInfo, GraphQlError, PathSegment, ResponsePath, TraceTreeBuilder};

fn record_request(fail_email: bool) -> Trace {
    let builder = TraceTreeBuilder::new();
    builder.start_timing().unwrap();
    builder.set_client_info(ClientInfo {
        name: "web".to_string(),
        version: "1.2.3".to_string(),
        reference_id: String::new(),
    });

    let user = ResponsePath::root().child_key("user");
    let email = user.child_key("email");
    let name = user.child_key("displayName");

    let user_done = builder
        .will_resolve_field(&user, "Query", "User", "user")
        .unwrap();
    let email_done = builder
        .will_resolve_field(&email, "User", "String", "email")
        .unwrap();
    let name_done = builder
        .will_resolve_field(&name, "User", "String!", "name")
        .unwrap();
    name_done.complete();
    email_done.complete();
    user_done.complete();

    if fail_email {
        builder
            .did_encounter_errors(&[GraphQlError::new("email service down")
                .with_path(vec![PathSegment::from("user"), PathSegment::from("email")])])
            .unwrap();
    }

    let variables = [("id", json!("42"))];
    builder.set_details(trace_details(
        Some("GetUser"),
        variables.iter().map(|(name, value)| (*name, value)),
        &SendValues::None,
    ));
    builder.set_http(http_metadata(
        "POST",
        [("Authorization", "secret"), ("Accept", "application/json")],
        &SendValues::All,
    ));

    builder.stop_timing().unwrap();
    builder.finish().unwrap()
}

#[test]
fn test_recorded_trace_shape() {
    let trace = record_request(true);
    let root = trace.root.as_ref().unwrap();
    assert_eq!(root.child.len(), 1);

    let user = &root.child[0];
    assert_eq!(user.response_name(), Some("user"));
    let names: Vec<_> = user.child.iter().filter_map(|c| c.response_name()).collect();
    assert_eq!(names, vec!["email", "displayName"]);
    assert_eq!(user.child[0].error.len(), 1);
    assert_eq!(user.child[1].original_field_name, "name");

    let details = trace.details.as_ref().unwrap();
    assert_eq!(details.variables_json["id"], "");
    let http = trace.http.as_ref().unwrap();
    assert!(!http.request_headers.contains_key("authorization"));
    assert!(http.request_headers.contains_key("accept"));
}

/// Pin the timing fields the sampler fingerprints on
fn ended_at(mut trace: Trace, end_seconds: i64, duration_ns: u64) -> Trace {
    trace.end_time = Some(prost_types::Timestamp {
        seconds: end_seconds,
        nanos: 0,
    });
    trace.duration_ns = duration_ns;
    trace
}

#[test]
fn test_accumulator_samples_then_aggregates() {
    let key = stats_report_key(Some("GetUser"), "query GetUser{user{email displayName}}");
    let mut accumulator = UsageAccumulator::new(&ReportingConfig::default());

    let first = ended_at(record_request(false), 1_700_000_000, 4_000_000);
    let second = ended_at(record_request(false), 1_700_000_010, 4_000_000);
    let next_minute = ended_at(record_request(false), 1_700_000_100, 4_000_000);
    accumulator.add_trace(&key, &first);
    accumulator.add_trace(&key, &second);
    accumulator.add_trace(&key, &next_minute);

    let report = accumulator.take_report();
    assert_eq!(report.operation_count(), 3);

    let operation = report.operation(&key).unwrap();
    assert_eq!(operation.traces.len(), 2);
    assert_eq!(operation.stats.len(), 1);

    let sent: Vec<Trace> = operation
        .traces
        .iter()
        .map(|bytes| Trace::decode(bytes.as_slice()).unwrap())
        .collect();
    assert_eq!(sent, vec![first, next_minute]);

    let aggregated = &operation.stats.to_proto()[0];
    assert_eq!(
        aggregated.query_latency_stats.as_ref().unwrap().request_count,
        1
    );
}

#[test]
fn test_error_paths_are_aggregated() {
    let key = stats_report_key(Some("GetUser"), "query GetUser{user{email displayName}}");
    let config = ReportingConfig {
        send_traces: false,
        ..ReportingConfig::default()
    };
    let mut accumulator = UsageAccumulator::new(&config);
    for _ in 0..3 {
        accumulator.add_trace(&key, &record_request(true));
    }
    accumulator.add_trace(&key, &record_request(false));

    let report = accumulator.take_report();
    let stats = report.operation(&key).unwrap().stats.to_proto();
    assert_eq!(stats.len(), 1);
    let stats = &stats[0];
    assert_eq!(stats.context.as_ref().unwrap().client_name, "web");

    let latency = stats.query_latency_stats.as_ref().unwrap();
    assert_eq!(latency.request_count, 4);
    assert_eq!(latency.requests_with_errors_count, 3);
    let email_errors =
        &latency.root_error_stats.as_ref().unwrap().children["user"].children["email"];
    assert_eq!(email_errors.errors_count, 3);
    assert_eq!(email_errors.requests_with_errors_count, 3);

    let histogram = DurationHistogram::from_array(&latency.latency_count).unwrap();
    let total: i64 = (0..BUCKET_COUNT).map(|bucket| histogram.get(bucket)).sum();
    assert_eq!(total, 4);

    let user_fields = &stats.per_type_stat["User"].per_field_stat;
    assert_eq!(user_fields["email"].count, 4);
    assert_eq!(user_fields["email"].errors_count, 3);
    assert_eq!(user_fields["name"].return_type, "String!");
    assert!(!user_fields.contains_key("displayName"));
}

#[tokio::test]
async fn test_pipeline_delivers_report() {
    let (sink, mut reports) = ChannelSink::new();
    let config = ReportingConfig {
        graph_ref: "my-graph@current".to_string(),
        ..ReportingConfig::default()
    };
    let (sender, handle) = Pipeline::spawn(config, Arc::new(sink));
    let key = stats_report_key(None, "{user{email}}");

    sender
        .submit(CompletedTrace::new(key.clone(), record_request(true)))
        .await
        .unwrap();
    drop(sender);
    handle.await.unwrap();

    let report: proto::Report = reports.recv().await.unwrap();
    assert_eq!(report.header.as_ref().unwrap().graph_ref, "my-graph@current");
    assert_eq!(report.operation_count, 1);
    assert_eq!(report.traces_per_query[&key].trace.len(), 1);

    let decoded = proto::Report::decode(report.encode_to_vec().as_slice()).unwrap();
    assert_eq!(decoded, report);
}
