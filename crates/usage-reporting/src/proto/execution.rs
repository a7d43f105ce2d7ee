//! Per-request execution trace messages

use std::collections::HashMap;

/// One request's execution telemetry
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Trace {
    /// Wall-clock time the request finished.
    #[prost(message, optional, tag = "3")]
    pub end_time: Option<prost_types::Timestamp>,
    /// Wall-clock time the request started.
    #[prost(message, optional, tag = "4")]
    pub start_time: Option<prost_types::Timestamp>,
    /// Operation details (variables, operation name).
    #[prost(message, optional, tag = "6")]
    pub details: Option<trace::Details>,
    /// Client name as reported by the caller.
    #[prost(string, tag = "7")]
    pub client_name: String,
    /// Client version as reported by the caller.
    #[prost(string, tag = "8")]
    pub client_version: String,
    /// HTTP request metadata.
    #[prost(message, optional, tag = "10")]
    pub http: Option<trace::Http>,
    /// Monotonic duration of the whole request.
    #[prost(uint64, tag = "11")]
    pub duration_ns: u64,
    /// Root of the resolver tree. Absent for gateway traces, which use `query_plan`.
    #[prost(message, optional, tag = "14")]
    pub root: Option<trace::Node>,
    /// Cache policy computed for the whole response.
    #[prost(message, optional, tag = "18")]
    pub cache_policy: Option<trace::CachePolicy>,
    /// Client reference id, the third component of a client identity.
    #[prost(string, tag = "23")]
    pub client_reference_id: String,
    /// The operation was found in an operation registry.
    #[prost(bool, tag = "24")]
    pub registered_operation: bool,
    /// The operation was rejected by an operation registry.
    #[prost(bool, tag = "25")]
    pub forbidden_operation: bool,
    /// Federated execution plan whose fetches embed subgraph traces.
    #[prost(message, optional, tag = "26")]
    pub query_plan: Option<trace::QueryPlanNode>,
    /// The whole response was served from a cache.
    #[prost(bool, tag = "27")]
    pub full_query_cache_hit: bool,
    /// The query text was found in the persisted query store.
    #[prost(bool, tag = "28")]
    pub persisted_query_hit: bool,
    /// The query text was registered in the persisted query store.
    #[prost(bool, tag = "29")]
    pub persisted_query_register: bool,
}

/// Nested message and enum types in `Trace`.
pub mod trace {
    use super::HashMap;

    /// Cache policy computed for a response
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CachePolicy {
        /// Visibility of the cached response, a `cache_policy::Scope`.
        #[prost(enumeration = "cache_policy::Scope", tag = "1")]
        pub scope: i32,
        /// Maximum age in nanoseconds.
        #[prost(int64, tag = "2")]
        pub max_age_ns: i64,
    }

    /// Nested types in `CachePolicy`.
    pub mod cache_policy {
        /// Who may reuse a cached response
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum Scope {
            /// Scope was not reported
            Unknown = 0,
            /// Shared caches may store the response
            Public = 1,
            /// Only the requesting client may store the response
            Private = 2,
        }
    }

    /// Operation details attached to a trace
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Details {
        /// Variable name to JSON-encoded value. Hidden variables map to "".
        #[prost(map = "string, string", tag = "4")]
        pub variables_json: HashMap<String, String>,
        /// Operation name, empty for anonymous operations.
        #[prost(string, tag = "3")]
        pub operation_name: String,
    }

    /// An error recorded on a node
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Error {
        /// Possibly rewritten message.
        #[prost(string, tag = "1")]
        pub message: String,
        /// Source locations in the operation document.
        #[prost(message, repeated, tag = "2")]
        pub location: Vec<Location>,
        /// Offset from trace start when the error was recorded.
        #[prost(uint64, tag = "3")]
        pub time_ns: u64,
        /// JSON snapshot of the reported error.
        #[prost(string, tag = "4")]
        pub json: String,
    }

    /// Line and column in the operation document
    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct Location {
        /// 1-based line.
        #[prost(uint32, tag = "1")]
        pub line: u32,
        /// 1-based column.
        #[prost(uint32, tag = "2")]
        pub column: u32,
    }

    /// All values of one request header
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct HeaderValues {
        /// Values in the order they were received.
        #[prost(string, repeated, tag = "1")]
        pub value: Vec<String>,
    }

    /// HTTP metadata of the request
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Http {
        /// Request method, an `http::Method`.
        #[prost(enumeration = "http::Method", tag = "1")]
        pub method: i32,
        /// Lower-cased header name to values, after privacy filtering.
        #[prost(map = "string, message", tag = "4")]
        pub request_headers: HashMap<String, HeaderValues>,
        /// Response status code, 0 when unknown.
        #[prost(uint32, tag = "6")]
        pub status_code: u32,
    }

    /// Nested types in `Http`.
    pub mod http {
        /// HTTP request method
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
        #[repr(i32)]
        pub enum Method {
            /// Unrecognized method
            Unknown = 0,
            /// `OPTIONS`
            Options = 1,
            /// `GET`
            Get = 2,
            /// `HEAD`
            Head = 3,
            /// `POST`
            Post = 4,
            /// `PUT`
            Put = 5,
            /// `DELETE`
            Delete = 6,
            /// `TRACE`
            Trace = 7,
            /// `CONNECT`
            Connect = 8,
            /// `PATCH`
            Patch = 9,
        }

        impl Method {
            /// Parse an HTTP method name, case-insensitively
            pub fn parse(name: &str) -> Self {
                match name.to_ascii_uppercase().as_str() {
                    "OPTIONS" => Self::Options,
                    "GET" => Self::Get,
                    "HEAD" => Self::Head,
                    "POST" => Self::Post,
                    "PUT" => Self::Put,
                    "DELETE" => Self::Delete,
                    "TRACE" => Self::Trace,
                    "CONNECT" => Self::Connect,
                    "PATCH" => Self::Patch,
                    _ => Self::Unknown,
                }
            }
        }
    }

    /// One resolved field, list index or subgraph boundary.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Node {
        /// Schema field name when the response name is an alias.
        #[prost(string, tag = "14")]
        pub original_field_name: String,
        /// Declared return type, e.g. `[User!]`.
        #[prost(string, tag = "3")]
        pub r#type: String,
        /// Type that declares the field, e.g. `Query`.
        #[prost(string, tag = "13")]
        pub parent_type: String,
        /// Offset from trace start.
        #[prost(uint64, tag = "8")]
        pub start_time: u64,
        /// Offset from trace start; 0 while the field is unresolved.
        #[prost(uint64, tag = "9")]
        pub end_time: u64,
        /// Errors attributed to this node.
        #[prost(message, repeated, tag = "11")]
        pub error: Vec<Error>,
        /// Children in resolution order.
        #[prost(message, repeated, tag = "12")]
        pub child: Vec<Node>,
        /// Response name or list index; absent on the root.
        #[prost(oneof = "node::Id", tags = "1, 2")]
        pub id: Option<node::Id>,
    }

    /// Nested types in `Node`.
    pub mod node {
        /// Identity of a node within its parent
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Id {
            /// Field response name (the alias when aliased)
            #[prost(string, tag = "1")]
            ResponseName(String),
            /// Position within a list
            #[prost(uint32, tag = "2")]
            Index(u32),
        }
    }

    impl Node {
        /// Response name, if this node is a field rather than a list index
        pub fn response_name(&self) -> Option<&str> {
            match &self.id {
                Some(node::Id::ResponseName(name)) => Some(name),
                _ => None,
            }
        }

        /// Name used for field statistics: the schema field, not the alias
        pub fn field_name(&self) -> Option<&str> {
            if self.original_field_name.is_empty() {
                self.response_name()
            } else {
                Some(&self.original_field_name)
            }
        }
    }

    /// A step of a federated query plan.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct QueryPlanNode {
        /// The plan step, absent when empty.
        #[prost(oneof = "query_plan_node::Node", tags = "1, 2, 3, 4")]
        pub node: Option<query_plan_node::Node>,
    }

    /// Nested types in `QueryPlanNode`.
    pub mod query_plan_node {
        use super::super::Trace;
        use super::QueryPlanNode;

        /// Steps run one after another
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct SequenceNode {
            /// Steps in execution order.
            #[prost(message, repeated, tag = "1")]
            pub nodes: Vec<QueryPlanNode>,
        }

        /// Steps run concurrently
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ParallelNode {
            /// Concurrent steps.
            #[prost(message, repeated, tag = "1")]
            pub nodes: Vec<QueryPlanNode>,
        }

        /// A request to one subgraph
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct FetchNode {
            /// Name of the subgraph.
            #[prost(string, tag = "1")]
            pub service_name: String,
            /// The subgraph returned a trace that could not be decoded.
            #[prost(bool, tag = "2")]
            pub trace_parsing_failed: bool,
            /// Trace reported by the subgraph for this fetch.
            #[prost(message, optional, boxed, tag = "3")]
            pub trace: Option<Box<Trace>>,
            /// Offset from the gateway trace start when the fetch was sent.
            #[prost(uint64, tag = "4")]
            pub sent_time_offset: u64,
        }

        /// A step applied at a path of the response so far
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct FlattenNode {
            /// Where in the response the inner step's results are merged.
            #[prost(message, repeated, tag = "1")]
            pub response_path: Vec<ResponsePathElement>,
            /// The inner step.
            #[prost(message, optional, boxed, tag = "2")]
            pub node: Option<Box<QueryPlanNode>>,
        }

        /// One segment of a flatten path
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct ResponsePathElement {
            /// Field name or index, absent when unset.
            #[prost(oneof = "response_path_element::Id", tags = "1, 2")]
            pub id: Option<response_path_element::Id>,
        }

        /// Nested types in `ResponsePathElement`.
        pub mod response_path_element {
            /// Segment of a flatten path
            #[derive(Clone, PartialEq, ::prost::Oneof)]
            pub enum Id {
                /// Field response name
                #[prost(string, tag = "1")]
                FieldName(String),
                /// List index
                #[prost(uint32, tag = "2")]
                Index(u32),
            }
        }

        /// Kind of plan step
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Node {
            /// Sequential steps
            #[prost(message, tag = "1")]
            Sequence(SequenceNode),
            /// Concurrent steps
            #[prost(message, tag = "2")]
            Parallel(ParallelNode),
            /// Subgraph request
            #[prost(message, tag = "3")]
            Fetch(FetchNode),
            /// Step applied at a response path
            #[prost(message, tag = "4")]
            Flatten(FlattenNode),
        }
    }
}
