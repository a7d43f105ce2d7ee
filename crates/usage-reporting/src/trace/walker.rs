//! Depth-first traversal of trace trees, including federated sub-traces

use crate::proto::trace::query_plan_node::Node as PlanNode;
use crate::proto::trace::{Node, QueryPlanNode};
use crate::proto::Trace;

/// Visit every node of `trace` with its path of response names.
///
/// List indices do not extend the path. Nodes of subgraph traces embedded
/// in the query plan are visited under a synthetic `service:<name>`
/// segment. `visit` returning `true` stops the whole walk, in which case
/// `walk` returns `true` as well.
pub fn walk<F>(trace: &Trace, mut visit: F) -> bool
where
    F: FnMut(&Node, &[&str]) -> bool,
{
    let mut path = Vec::new();
    if let Some(root) = &trace.root {
        if walk_node(root, &mut path, &mut visit) {
            return true;
        }
    }
    if let Some(plan) = &trace.query_plan {
        if walk_plan(plan, &mut path, &mut visit) {
            return true;
        }
    }
    false
}

/// True if any node of the trace, or of any embedded subgraph trace,
/// carries an error. Stops at the first one found.
pub fn has_errors(trace: &Trace) -> bool {
    walk(trace, |node, _| !node.error.is_empty())
}

fn walk_node<'a, F>(node: &'a Node, path: &mut Vec<&'a str>, visit: &mut F) -> bool
where
    F: FnMut(&Node, &[&str]) -> bool,
{
    if visit(node, path.as_slice()) {
        return true;
    }

    for child in &node.child {
        let name = child.response_name();
        if let Some(name) = name {
            path.push(name);
        }
        let stop = walk_node(child, path, visit);
        if name.is_some() {
            path.pop();
        }
        if stop {
            return true;
        }
    }
    false
}

fn walk_plan<'a, F>(plan: &'a QueryPlanNode, path: &mut Vec<&'a str>, visit: &mut F) -> bool
where
    F: FnMut(&Node, &[&str]) -> bool,
{
    match &plan.node {
        Some(PlanNode::Fetch(fetch)) => {
            let Some(root) = fetch.trace.as_ref().and_then(|trace| trace.root.as_ref()) else {
                return false;
            };
            if fetch.service_name.is_empty() {
                return false;
            }
            let segment = format!("service:{}", fetch.service_name);
            let mut service_path: Vec<&str> = path.iter().copied().collect();
            service_path.push(&segment);
            walk_node(root, &mut service_path, visit)
        }
        Some(PlanNode::Flatten(flatten)) => match &flatten.node {
            Some(inner) => walk_plan(inner, path, visit),
            None => false,
        },
        Some(PlanNode::Parallel(parallel)) => parallel
            .nodes
            .iter()
            .any(|node| walk_plan(node, path, visit)),
        Some(PlanNode::Sequence(sequence)) => sequence
            .nodes
            .iter()
            .any(|node| walk_plan(node, path, visit)),
        None => false,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::proto::trace::query_plan_node::{FetchNode, FlattenNode, ParallelNode, SequenceNode};
    use crate::proto::trace::{node, Error as NodeError};
    use pretty_assertions::assert_eq;

    pub(crate) fn field(name: &str, children: Vec<Node>) -> Node {
        Node {
            id: Some(node::Id::ResponseName(name.to_string())),
            child: children,
            ..Node::default()
        }
    }

    pub(crate) fn index(i: u32, children: Vec<Node>) -> Node {
        Node {
            id: Some(node::Id::Index(i)),
            child: children,
            ..Node::default()
        }
    }

    pub(crate) fn with_error(mut node: Node, message: &str) -> Node {
        node.error.push(NodeError {
            message: message.to_string(),
            ..NodeError::default()
        });
        node
    }

    pub(crate) fn fetch(service: &str, root: Node) -> QueryPlanNode {
        QueryPlanNode {
            node: Some(PlanNode::Fetch(FetchNode {
                service_name: service.to_string(),
                trace: Some(Box::new(Trace {
                    root: Some(root),
                    ..Trace::default()
                })),
                ..FetchNode::default()
            })),
        }
    }

    fn collect_paths(trace: &Trace) -> Vec<String> {
        let mut paths = Vec::new();
        walk(trace, |_, path| {
            paths.push(path.join("."));
            false
        });
        paths
    }

    #[test]
    fn test_walks_in_child_order_skipping_indices() {
        let trace = Trace {
            root: Some(Node {
                child: vec![
                    field("users", vec![index(0, vec![field("email", vec![])])]),
                    field("me", vec![]),
                ],
                ..Node::default()
            }),
            ..Trace::default()
        };

        assert_eq!(
            collect_paths(&trace),
            vec!["", "users", "users", "users.email", "me"]
        );
    }

    #[test]
    fn test_walks_query_plan() {
        let plan = QueryPlanNode {
            node: Some(PlanNode::Sequence(SequenceNode {
                nodes: vec![
                    fetch("accounts", Node {
                        child: vec![field("me", vec![])],
                        ..Node::default()
                    }),
                    QueryPlanNode {
                        node: Some(PlanNode::Flatten(FlattenNode {
                            response_path: vec![],
                            node: Some(Box::new(QueryPlanNode {
                                node: Some(PlanNode::Parallel(ParallelNode {
                                    nodes: vec![fetch("reviews", Node {
                                        child: vec![field("reviews", vec![])],
                                        ..Node::default()
                                    })],
                                })),
                            })),
                        })),
                    },
                ],
            })),
        };
        let trace = Trace {
            query_plan: Some(plan),
            ..Trace::default()
        };

        assert_eq!(
            collect_paths(&trace),
            vec![
                "service:accounts",
                "service:accounts.me",
                "service:reviews",
                "service:reviews.reviews"
            ]
        );
    }

    #[test]
    fn test_fetch_without_trace_is_skipped() {
        let trace = Trace {
            query_plan: Some(QueryPlanNode {
                node: Some(PlanNode::Fetch(FetchNode {
                    service_name: "accounts".to_string(),
                    trace_parsing_failed: true,
                    ..FetchNode::default()
                })),
            }),
            ..Trace::default()
        };
        assert!(collect_paths(&trace).is_empty());
    }

    #[test]
    fn test_stop_halts_walk() {
        let trace = Trace {
            root: Some(Node {
                child: vec![
                    with_error(field("a", vec![field("deep", vec![])]), "boom"),
                    field("b", vec![]),
                ],
                ..Node::default()
            }),
            query_plan: Some(fetch("accounts", field("c", vec![]))),
            ..Trace::default()
        };

        let mut visited = Vec::new();
        let stopped = walk(&trace, |node, _| {
            visited.push(node.response_name().unwrap_or("<root>").to_string());
            !node.error.is_empty()
        });

        assert!(stopped);
        assert_eq!(visited, vec!["<root>", "a"]);
    }

    #[test]
    fn test_has_errors_in_subgraph() {
        let clean = Trace {
            root: Some(field("a", vec![])),
            ..Trace::default()
        };
        assert!(!has_errors(&clean));

        let federated = Trace {
            query_plan: Some(QueryPlanNode {
                node: Some(PlanNode::Parallel(ParallelNode {
                    nodes: vec![
                        fetch("accounts", field("me", vec![])),
                        fetch("reviews", with_error(field("reviews", vec![]), "down")),
                    ],
                })),
            }),
            ..Trace::default()
        };
        assert!(has_errors(&federated));
    }
}
