//! Engine settings.

use std::time::Duration;

use crate::domain::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingConfig {
    /// Prepended to a routing key to form its store key
    pub kv_prefix: String,
    /// Catalog service the worker nodes register under
    pub service_name: String,
    /// Prepended to a chain name to form the catalog tag
    pub tag_prefix: String,
    /// Deadline applied when the caller does not supply one
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            kv_prefix: "event-catcher/nodes/".to_string(),
            service_name: "streaming-node".to_string(),
            tag_prefix: "chain:".to_string(),
            request_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}
