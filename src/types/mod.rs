//! Data model for the synthesizer.
//!
//! - `ComputeUnit`: a backend function, referenced by name
//! - `PermissionGrant`: an IAM statement attached to a unit
//! - `ResourceNode`: one segment of the REST path tree, addressed by `NodeId`
//! - `HttpMethod`: the methods a node can bind

mod compute_unit;
mod http_method;
mod permission;
mod resource_node;

pub use compute_unit::ComputeUnit;
pub use http_method::HttpMethod;
pub use permission::{Effect, PermissionGrant};
pub use resource_node::{MethodBinding, MethodTarget, NodeId, ResourceNode};
