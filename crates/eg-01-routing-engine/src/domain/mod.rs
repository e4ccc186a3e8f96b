//! # Domain Layer
//!
//! Pure routing logic: identifiers, the authorization set, the per-key
//! round-robin selector, the node-list codec and retry policy.

pub mod assignment;
pub mod authorization;
pub mod codec;
pub mod errors;
pub mod retry;
pub mod selector;
pub mod value_objects;

pub use assignment::{AppendOutcome, Assignment, RegisterResponse, RegistrationStatus};
pub use authorization::AuthorizationGuard;
pub use codec::{decode_node_list, encode_node_list, DELIMITER};
pub use errors::{CodecError, ErrorCode, InternalReason, RoutingError, SelectionError};
pub use retry::{RetryOutcome, RetryPolicy, RetryPolicyRunner};
pub use selector::RoundRobinSelector;
pub use value_objects::{NodeId, ResolvedEndpoint, Revision, RoutingKey, ServiceInstance};
