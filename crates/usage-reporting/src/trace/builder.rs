//! Per-request trace tree builder
//!
//! One builder lives for the duration of a request. Resolver callbacks may
//! run concurrently on different response paths, so the tree is kept as an
//! arena indexed by the dotted path key and only turned into nested
//! [`Node`]s when the trace is finished.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;
use tracing::warn;

use super::error::{rewrite_error, ErrorRewriter, GraphQlError};
use super::path::{segments_key, PathSegment, ResponsePath};
use crate::error::{Error, Result};
use crate::proto::trace::{cache_policy, node, CachePolicy, Details, Http, Node, QueryPlanNode};
use crate::proto::{timestamp, Trace};

/// Client identity attached to a trace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client name
    pub name: String,
    /// Client version
    pub version: String,
    /// Client reference id
    pub reference_id: String,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    NotStarted,
    Running { started: Instant },
    Stopped { started: Instant },
    Finished,
}

#[derive(Debug, Default)]
struct NodeEntry {
    node: Node,
    children: Vec<usize>,
}

#[derive(Debug)]
struct TreeState {
    phase: Phase,
    trace: Trace,
    nodes: Vec<NodeEntry>,
    by_path: HashMap<String, usize>,
}

impl TreeState {
    fn new() -> Self {
        let mut by_path = HashMap::new();
        by_path.insert(String::new(), 0);
        Self {
            phase: Phase::NotStarted,
            trace: Trace::default(),
            nodes: vec![NodeEntry::default()],
            by_path,
        }
    }

    fn ensure_running(&self, operation: &str) -> Result<Instant> {
        match self.phase {
            Phase::Running { started } => Ok(started),
            Phase::NotStarted => Err(Error::phase(format!(
                "{operation} called before start_timing"
            ))),
            Phase::Stopped { .. } | Phase::Finished => Err(Error::phase(format!(
                "{operation} called after stop_timing"
            ))),
        }
    }

    fn elapsed_ns(&self) -> Option<u64> {
        match self.phase {
            Phase::Running { started } | Phase::Stopped { started } => {
                Some(started.elapsed().as_nanos() as u64)
            }
            Phase::NotStarted | Phase::Finished => None,
        }
    }

    /// Create the node for `path`, creating missing ancestors on the way
    fn new_node(&mut self, path: &ResponsePath) -> usize {
        let id = path.last().map(|segment| match segment {
            PathSegment::Key(key) => node::Id::ResponseName(key.clone()),
            PathSegment::Index(index) => node::Id::Index(*index),
        });

        let index = self.nodes.len();
        self.nodes.push(NodeEntry {
            node: Node {
                id,
                ..Node::default()
            },
            children: Vec::new(),
        });
        self.by_path.insert(path.key_string(), index);

        let parent = self.ensure_parent(path);
        self.nodes[parent].children.push(index);
        index
    }

    fn ensure_parent(&mut self, path: &ResponsePath) -> usize {
        let parent_path = path.parent().unwrap_or_default();
        match self.by_path.get(&parent_path.key_string()) {
            Some(&index) => index,
            None => self.new_node(&parent_path),
        }
    }

    fn materialize(&mut self, index: usize) -> Node {
        let children = std::mem::take(&mut self.nodes[index].children);
        let mut node = std::mem::take(&mut self.nodes[index].node);
        node.child = children
            .into_iter()
            .map(|child| self.materialize(child))
            .collect();
        node
    }
}

/// Records one request's execution trace.
///
/// Cloning yields another handle to the same trace, so resolver callbacks
/// can each hold one.
#[derive(Clone)]
pub struct TraceTreeBuilder {
    state: Arc<Mutex<TreeState>>,
    rewriter: Option<Arc<dyn ErrorRewriter>>,
}

impl Default for TraceTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceTreeBuilder {
    /// Create a builder that records errors as-is
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(TreeState::new())),
            rewriter: None,
        }
    }

    /// Create a builder that passes errors through `rewriter` first
    pub fn with_error_rewriter(rewriter: Arc<dyn ErrorRewriter>) -> Self {
        Self {
            rewriter: Some(rewriter),
            ..Self::new()
        }
    }

    /// Capture the wall-clock start and the monotonic reference point
    pub fn start_timing(&self) -> Result<()> {
        let mut state = self.state.lock();
        match state.phase {
            Phase::NotStarted => {
                state.trace.start_time = Some(timestamp(Utc::now()));
                state.phase = Phase::Running {
                    started: Instant::now(),
                };
                Ok(())
            }
            Phase::Running { .. } => Err(Error::phase("start_timing called twice")),
            Phase::Stopped { .. } | Phase::Finished => {
                Err(Error::phase("start_timing called after stop_timing"))
            }
        }
    }

    /// Record the total duration and the wall-clock end
    pub fn stop_timing(&self) -> Result<()> {
        let mut state = self.state.lock();
        match state.phase {
            Phase::Running { started } => {
                state.trace.duration_ns = started.elapsed().as_nanos() as u64;
                state.trace.end_time = Some(timestamp(Utc::now()));
                state.phase = Phase::Stopped { started };
                Ok(())
            }
            Phase::NotStarted => Err(Error::phase("stop_timing called before start_timing")),
            Phase::Stopped { .. } | Phase::Finished => {
                Err(Error::phase("stop_timing called twice"))
            }
        }
    }

    /// Open a node for a field about to be resolved.
    ///
    /// `field_name` is the schema field; when it differs from the response
    /// name at the end of `path` the field was aliased and the schema name
    /// is kept for stats.
    pub fn will_resolve_field(
        &self,
        path: &ResponsePath,
        parent_type: &str,
        return_type: &str,
        field_name: &str,
    ) -> Result<FieldCompletion> {
        let mut state = self.state.lock();
        let started = state.ensure_running("will_resolve_field")?;
        if path.is_root() {
            return Err(Error::phase("will_resolve_field called with the root path"));
        }

        // a child may have resolved first and created this node as an ancestor
        let index = match state.by_path.get(&path.key_string()) {
            Some(&existing) => existing,
            None => state.new_node(path),
        };
        let node = &mut state.nodes[index].node;
        node.r#type = return_type.to_string();
        node.parent_type = parent_type.to_string();
        node.start_time = started.elapsed().as_nanos() as u64;
        if let Some(PathSegment::Key(response_name)) = path.last() {
            if response_name != field_name {
                node.original_field_name = field_name.to_string();
            }
        }

        Ok(FieldCompletion {
            state: Arc::clone(&self.state),
            index,
        })
    }

    /// Attach errors to the nodes their paths address.
    ///
    /// Errors carrying a subgraph marker are skipped; they already live in
    /// the fetch's nested trace.
    pub fn did_encounter_errors(&self, errors: &[GraphQlError]) -> Result<()> {
        self.state.lock().ensure_running("did_encounter_errors")?;

        for error in errors {
            if error.is_from_subgraph() {
                continue;
            }
            let Some(reported) = rewrite_error(self.rewriter.as_deref(), error) else {
                continue;
            };
            self.add_error(&reported)?;
        }
        Ok(())
    }

    fn add_error(&self, error: &GraphQlError) -> Result<()> {
        let mut state = self.state.lock();
        let started = state.ensure_running("did_encounter_errors")?;

        let mut index = 0;
        if let Some(path) = &error.path {
            let key = segments_key(path);
            match state.by_path.get(&key) {
                Some(&found) => index = found,
                None => warn!(
                    path = %key,
                    "Could not find node for error path; attaching error to root node"
                ),
            }
        }

        let mut proto = error.to_proto();
        proto.time_ns = started.elapsed().as_nanos() as u64;
        state.nodes[index].node.error.push(proto);
        Ok(())
    }

    /// Record which client sent the request
    pub fn set_client_info(&self, client: ClientInfo) {
        self.update(|trace| {
            trace.client_name = client.name;
            trace.client_version = client.version;
            trace.client_reference_id = client.reference_id;
        });
    }

    /// Record the cache policy computed for the response
    pub fn set_cache_policy(&self, scope: cache_policy::Scope, max_age_ns: i64) {
        self.update(|trace| {
            trace.cache_policy = Some(CachePolicy {
                scope: scope as i32,
                max_age_ns,
            });
        });
    }

    /// Mark the response as served entirely from cache
    pub fn set_full_query_cache_hit(&self, hit: bool) {
        self.update(|trace| trace.full_query_cache_hit = hit);
    }

    /// Mark the query text as found in the persisted query store
    pub fn set_persisted_query_hit(&self, hit: bool) {
        self.update(|trace| trace.persisted_query_hit = hit);
    }

    /// Mark the query text as registered in the persisted query store
    pub fn set_persisted_query_register(&self, register: bool) {
        self.update(|trace| trace.persisted_query_register = register);
    }

    /// Mark the operation as found in an operation registry
    pub fn set_registered_operation(&self, registered: bool) {
        self.update(|trace| trace.registered_operation = registered);
    }

    /// Mark the operation as rejected by an operation registry
    pub fn set_forbidden_operation(&self, forbidden: bool) {
        self.update(|trace| trace.forbidden_operation = forbidden);
    }

    /// Attach a gateway query plan whose fetches carry subgraph traces
    pub fn set_query_plan(&self, plan: QueryPlanNode) {
        self.update(|trace| trace.query_plan = Some(plan));
    }

    /// Attach HTTP request metadata
    pub fn set_http(&self, http: Http) {
        self.update(|trace| trace.http = Some(http));
    }

    /// Attach operation details
    pub fn set_details(&self, details: Details) {
        self.update(|trace| trace.details = Some(details));
    }

    fn update(&self, apply: impl FnOnce(&mut Trace)) {
        apply(&mut self.state.lock().trace);
    }

    /// Assemble the finished trace. Only valid once timing has stopped.
    pub fn finish(&self) -> Result<Trace> {
        let mut state = self.state.lock();
        match state.phase {
            Phase::Stopped { .. } => {}
            Phase::Finished => return Err(Error::phase("finish called twice")),
            Phase::NotStarted | Phase::Running { .. } => {
                return Err(Error::phase("finish called before stop_timing"))
            }
        }

        let root = state.materialize(0);
        let mut trace = std::mem::take(&mut state.trace);
        trace.root = Some(root);
        state.nodes.clear();
        state.by_path.clear();
        state.phase = Phase::Finished;
        Ok(trace)
    }
}

/// Completion handle returned by [`TraceTreeBuilder::will_resolve_field`].
///
/// Dropping it without calling [`complete`](Self::complete) leaves the
/// field without an end time.
#[must_use = "call complete() when the field has resolved"]
pub struct FieldCompletion {
    state: Arc<Mutex<TreeState>>,
    index: usize,
}

impl FieldCompletion {
    /// Record the field's end time
    pub fn complete(self) {
        let mut state = self.state.lock();
        let Some(elapsed) = state.elapsed_ns() else {
            return;
        };
        if let Some(entry) = state.nodes.get_mut(self.index) {
            entry.node.end_time = elapsed;
        }
    }
}
