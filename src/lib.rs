// src/lib.rs
pub use context::{CorsMode, EndpointType, StackContext};
pub use description::{
    GrantAttachment, MethodDescription, ResourceDescription, StackDescription, synthesize_json,
};
pub use error::SynthError;
pub use synthesizer::Synthesizer;
pub use template::{DeploymentTemplate, ResourceType, TemplateOutput, TemplateResource, TreeOutline};
pub use types::{
    ComputeUnit, Effect, HttpMethod, MethodBinding, MethodTarget, NodeId, PermissionGrant,
    ResourceNode,
};

pub mod cors;
pub mod logical_id;
pub mod sample;
pub mod template;

mod context;
mod description;
mod error;
mod synthesizer;
mod types;
