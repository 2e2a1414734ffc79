//! The expansion dispatch loop (spec.md §4.6, §6).
//!
//! Grounded on `router.py`'s expansion block inside `ClientRouter.call_action`:
//! build the initial object queue from the compiled trees, then alternate
//! issuing requests for the current queue and collecting their responses,
//! discovering further nested objects to expand as responses arrive, until
//! the queue and all outstanding work are empty.
//!
//! The original interleaves non-blocking sends and polls across a shared
//! per-service client. This engine instead issues one round's worth of
//! expansion calls concurrently via [`pysoa_core::JobDispatcher`] (which
//! models a complete send-then-receive round trip) and awaits the whole
//! round before discovering the next one — a full-round batching of the
//! same issue-phase/collect-phase structure rather than raw interleaved
//! send/receive.

use crate::path::{self, PathSegment};
use crate::tree::{ExpansionNode, ExpansionParent, TypeNode};
use futures::future::join_all;
use pysoa_core::{ActionRequest, Context, Control, DispatchError, JobDispatcher, JobRequest};
use serde_json::Value;

/// A failure encountered while expanding a response.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ExpansionEngineError {
    /// The expansion action returned errors and the expansion node was
    /// configured with `raise_action_errors = true`.
    #[error("expansion `{expansion}` via {service}.{action} returned errors")]
    ActionError {
        /// The expansion name that failed.
        expansion: String,
        /// The service that was called.
        service: String,
        /// The action that was called.
        action: String,
    },
    /// The transport or service could not be reached for an expansion whose
    /// node was configured with `raise_action_errors = true`.
    #[error("dispatching expansion `{expansion}` failed: {source}")]
    Dispatch {
        /// The expansion name that failed.
        expansion: String,
        /// The underlying dispatch failure.
        #[source]
        source: DispatchError,
    },
    /// The object being expanded lacked the expansion's configured source field.
    #[error("object being expanded has no `{field}` field for expansion `{expansion}`")]
    MissingSourceField {
        /// The expansion name.
        expansion: String,
        /// The missing field.
        field: String,
    },
}

struct QueuedExpansion<'a> {
    path: path::Path,
    node: &'a ExpansionNode,
}

/// Walk `root` against the compiled `trees`, dispatching and splicing in
/// every expansion that hasn't already been satisfied.
///
/// `root` is the action response body the caller asked to expand; it is
/// mutated in place. Returns `Ok(())` once the queue and all outstanding
/// dispatch calls are drained, or the first error from a node configured
/// with `raise_action_errors = true`.
pub async fn expand(
    dispatcher: &dyn JobDispatcher,
    context: &Context,
    root: &mut Value,
    trees: &[TypeNode],
) -> Result<(), ExpansionEngineError> {
    let mut queue: Vec<QueuedExpansion<'_>> = Vec::new();
    for tree in trees {
        for object_path in tree.find_objects(root) {
            for node in tree.expansions() {
                queue.push(QueuedExpansion {
                    path: object_path.clone(),
                    node,
                });
            }
        }
    }

    while !queue.is_empty() {
        let round = std::mem::take(&mut queue);
        let calls = round.into_iter().filter_map(|queued| {
            let object = path::resolve(root, &queued.path)?;
            let object_map = object.as_object()?;
            if object_map.contains_key(&queued.node.dest_field) {
                // Already satisfied; idempotent, nothing to do (spec §4.6).
                return None;
            }
            let identifier = object_map.get(&queued.node.source_field)?.clone();
            Some(issue_one(dispatcher, context, queued, identifier))
        });

        let results = join_all(calls).await;
        for result in results {
            let (queued, outcome) = result?;
            let Some(value) = outcome else {
                continue;
            };

            let nested = collect_nested(queued.node, &value);

            if let Some(Value::Object(map)) = path::resolve_mut(root, &queued.path) {
                map.remove(&queued.node.source_field);
                map.insert(queued.node.dest_field.clone(), value);
            }

            for (relative, child) in nested {
                let mut absolute = queued.path.clone();
                absolute.push(PathSegment::Key(queued.node.dest_field.clone()));
                absolute.extend(relative);
                queue.push(QueuedExpansion {
                    path: absolute,
                    node: child,
                });
            }
        }
    }

    Ok(())
}

fn collect_nested<'a>(
    node: &'a ExpansionNode,
    value: &Value,
) -> Vec<(path::Path, &'a ExpansionNode)> {
    let mut out = Vec::new();
    for child in node.expansions() {
        for relative in child.find_objects(value) {
            out.push((relative, child));
        }
    }
    out
}

type IssueOutcome<'a> = Result<(QueuedExpansion<'a>, Option<Value>), ExpansionEngineError>;

async fn issue_one<'a>(
    dispatcher: &dyn JobDispatcher,
    context: &Context,
    queued: QueuedExpansion<'a>,
    identifier: Value,
) -> IssueOutcome<'a> {
    let node = queued.node;
    let mut body = pysoa_core::empty_object();
    body.insert(node.request_field.clone(), identifier);

    let job = JobRequest {
        actions: vec![ActionRequest::with_body(node.action.clone(), body)],
        control: Control::new(Vec::new(), false),
        context: context.clone(),
    };

    let dispatched = dispatcher.dispatch_job(&node.service, job).await;

    let response = match dispatched {
        Ok(response) => response,
        Err(source) => {
            return if node.raise_action_errors {
                Err(ExpansionEngineError::Dispatch {
                    expansion: node.name.clone(),
                    source,
                })
            } else {
                Ok((queued, None))
            };
        }
    };

    let failed = response.is_job_error()
        || response
            .actions
            .first()
            .is_none_or(pysoa_core::ActionResponse::has_errors);

    if failed {
        return if node.raise_action_errors {
            Err(ExpansionEngineError::ActionError {
                expansion: node.name.clone(),
                service: node.service.clone(),
                action: node.action.clone(),
            })
        } else {
            Ok((queued, None))
        };
    }

    let value = response
        .actions
        .first()
        .and_then(|action| action.body.get(&node.response_field))
        .cloned();

    Ok((queued, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ExpansionNode;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pysoa_core::{ActionResponse, JobResponse};
    use serde_json::json;
    use std::collections::HashMap;

    struct FakeDispatcher {
        responses: Mutex<HashMap<String, Value>>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl JobDispatcher for FakeDispatcher {
        async fn dispatch_job(
            &self,
            service: &str,
            job: JobRequest,
        ) -> Result<JobResponse, DispatchError> {
            self.calls.lock().push(service.to_string());
            let mut body = pysoa_core::empty_object();
            if let Some(value) = self.responses.lock().get(service) {
                body.insert("user".to_string(), value.clone());
            }
            Ok(JobResponse {
                actions: vec![ActionResponse::new(job.actions[0].action.clone(), body)],
                errors: Vec::new(),
                context: job.context,
            })
        }
    }

    #[tokio::test]
    async fn splices_expansion_result_and_removes_source_field() {
        let mut responses = HashMap::new();
        responses.insert(
            "users".to_string(),
            json!({"_type": "user", "id": 9, "name": "Ada"}),
        );
        let dispatcher = FakeDispatcher {
            responses: Mutex::new(responses),
            calls: Mutex::new(Vec::new()),
        };

        let mut root = TypeNode::new("post");
        root.add_expansion(ExpansionNode::new(
            "user",
            "author",
            "author_id",
            "author",
            "users",
            "get_user",
            "id",
            "user",
            true,
        ));

        let mut value = json!({"_type": "post", "author_id": 9});
        expand(&dispatcher, &pysoa_core::empty_object(), &mut value, &[root])
            .await
            .unwrap();

        assert_eq!(
            value,
            json!({"_type": "post", "author": {"_type": "user", "id": 9, "name": "Ada"}})
        );
        assert_eq!(dispatcher.calls.lock().as_slice(), ["users"]);
    }

    #[tokio::test]
    async fn already_populated_destination_is_left_untouched() {
        let dispatcher = FakeDispatcher {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        };

        let mut root = TypeNode::new("post");
        root.add_expansion(ExpansionNode::new(
            "user",
            "author",
            "author_id",
            "author",
            "users",
            "get_user",
            "id",
            "user",
            true,
        ));

        let mut value = json!({"_type": "post", "author_id": 9, "author": {"cached": true}});
        expand(&dispatcher, &pysoa_core::empty_object(), &mut value, &[root])
            .await
            .unwrap();

        assert!(dispatcher.calls.lock().is_empty());
        assert_eq!(value["author"], json!({"cached": true}));
    }
}
