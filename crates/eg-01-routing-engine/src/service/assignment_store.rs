//! Assignment persistence over the key-value port.
//!
//! An assignment is stored as one value (see [`crate::domain::codec`]) at
//! `kv_prefix + routing_key`. Appends are read-modify-write cycles guarded
//! by the store's conditional put, so concurrent registrations for the same
//! key are linearized and none is lost.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::deadline::within;
use super::stats::RoutingStats;
use crate::domain::{
    decode_node_list, encode_node_list, AppendOutcome, Assignment, InternalReason, NodeId,
    RetryOutcome, RetryPolicy, Revision, RoutingError, RoutingKey,
};
use crate::ports::{KeyValueStore, PutOutcome};

pub struct AssignmentStore {
    kv: Arc<dyn KeyValueStore>,
    prefix: String,
    retry: RetryPolicy,
    stats: Arc<RoutingStats>,
}

impl AssignmentStore {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        prefix: impl Into<String>,
        retry: RetryPolicy,
        stats: Arc<RoutingStats>,
    ) -> Self {
        Self {
            kv,
            prefix: prefix.into(),
            retry,
            stats,
        }
    }

    pub fn storage_key(&self, key: &RoutingKey) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Read the assignment for `key`. `None` if nothing was ever stored.
    pub async fn get(
        &self,
        key: &RoutingKey,
        deadline: Instant,
    ) -> Result<Option<Assignment>, RoutingError> {
        let storage_key = self.storage_key(key);
        let stored = within(deadline, "assignment read", self.kv.get(&storage_key))
            .await?
            .map_err(|e| RoutingError::internal(InternalReason::Store, e.to_string()))?;

        let Some(stored) = stored else {
            return Ok(None);
        };
        Ok(Some(Assignment {
            key: key.clone(),
            nodes: decode_node_list(&stored.value)?,
            revision: stored.revision,
        }))
    }

    /// Append `node` to the assignment for `key` unless it is already there.
    ///
    /// Conflicting writes are retried with backoff per the retry policy.
    /// Fails with `Internal(ConflictRetriesExhausted)` when the policy gives
    /// up and `Internal(DeadlineExceeded)` when the next attempt could not
    /// start before `deadline`.
    pub async fn append_if_absent(
        &self,
        key: &RoutingKey,
        node: &NodeId,
        deadline: Instant,
    ) -> Result<AppendOutcome, RoutingError> {
        let storage_key = self.storage_key(key);
        let mut runner = self.retry.runner();
        let mut attempts = 0u32;

        loop {
            let (mut nodes, revision) = match self.get(key, deadline).await? {
                Some(assignment) => (assignment.nodes, assignment.revision),
                None => (Vec::new(), Revision::ABSENT),
            };

            if nodes.contains(node) {
                return Ok(AppendOutcome {
                    nodes,
                    already_present: true,
                    attempts,
                });
            }

            nodes.push(node.clone());
            attempts += 1;
            let put = self
                .kv
                .put(&storage_key, encode_node_list(&nodes), revision);
            let outcome = within(deadline, "assignment write", put)
                .await?
                .map_err(|e| RoutingError::internal(InternalReason::Store, e.to_string()))?;

            match outcome {
                PutOutcome::Written(_) => {
                    return Ok(AppendOutcome {
                        nodes,
                        already_present: false,
                        attempts,
                    });
                }
                PutOutcome::Conflict => {
                    RoutingStats::bump(&self.stats.cas_conflicts);
                    match runner.next_outcome() {
                        RetryOutcome::RetryAfter(delay) => {
                            if Instant::now() + delay >= deadline {
                                return Err(RoutingError::internal(
                                    InternalReason::DeadlineExceeded,
                                    format!("retrying write for {key} would pass the request deadline"),
                                ));
                            }
                            debug!(key = %key, node_id = %node, attempt = attempts, ?delay, "assignment write conflicted, retrying");
                            tokio::time::sleep(delay).await;
                        }
                        RetryOutcome::GiveUp => {
                            warn!(key = %key, node_id = %node, attempts, "giving up on contended assignment write");
                            return Err(RoutingError::internal(
                                InternalReason::ConflictRetriesExhausted,
                                format!("write for {key} conflicted {attempts} times"),
                            ));
                        }
                    }
                }
            }
        }
    }
}
