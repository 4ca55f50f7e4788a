//! Declarative stack descriptions.
//!
//! A description is plain data (usually JSON) listing compute units,
//! permission attachments and the resource tree. Loading one replays it
//! through the `Synthesizer` API, so the same validation applies as for
//! programmatic use.
//!
//! ```json
//! {
//!   "stack": { "stack_name": "Inventory", "api_id": "ItemsApi", "api_name": "Items" },
//!   "units": [
//!     { "name": "getAll", "entry_point": "get_all.handler",
//!       "runtime": "python3.7", "source_location": "src" }
//!   ],
//!   "grants": [
//!     { "units": ["getAll"],
//!       "grant": { "effect": "Allow", "actions": ["ec2:Describe*"], "resources": ["*"] } }
//!   ],
//!   "resources": [
//!     { "path_segment": "items", "cors": true,
//!       "methods": [{ "method": "GET", "unit": "getAll" }] }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::context::StackContext;
use crate::error::SynthError;
use crate::synthesizer::Synthesizer;
use crate::template::DeploymentTemplate;
use crate::types::{ComputeUnit, HttpMethod, NodeId, PermissionGrant};

/// One grant attached to each listed unit. Every unit gets its own
/// attachment even though the grant content is shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct GrantAttachment {
    pub units: Vec<String>,
    pub grant: PermissionGrant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MethodDescription {
    pub method: HttpMethod,
    pub unit: String,
}

/// A node of the resource tree and everything below it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResourceDescription {
    pub path_segment: String,
    #[serde(default)]
    pub methods: Vec<MethodDescription>,
    /// Add the fixed CORS preflight to this node.
    #[serde(default)]
    pub cors: bool,
    #[serde(default)]
    #[schema(no_recursion)]
    pub children: Vec<ResourceDescription>,
}

/// A full stack: context, units, grants, and the resources under the API root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StackDescription {
    pub stack: StackContext,
    #[serde(default)]
    pub units: Vec<ComputeUnit>,
    #[serde(default)]
    pub grants: Vec<GrantAttachment>,
    /// Methods bound on the API root itself.
    #[serde(default)]
    pub root_methods: Vec<MethodDescription>,
    #[serde(default)]
    pub root_cors: bool,
    #[serde(default)]
    pub resources: Vec<ResourceDescription>,
}

impl StackDescription {
    pub fn from_json(text: &str) -> Result<Self, SynthError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SynthError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SynthError::InvalidDescription(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Replay the description into a fresh synthesizer.
    ///
    /// Units are registered first, then grants, then the tree depth-first.
    pub fn to_synthesizer(&self) -> Result<Synthesizer, SynthError> {
        let mut synth = Synthesizer::new(self.stack.clone());

        for unit in &self.units {
            synth.register_compute_unit(unit.clone())?;
        }
        for attachment in &self.grants {
            for unit in &attachment.units {
                synth.attach_permission(unit, attachment.grant.clone())?;
            }
        }

        let root = synth.root();
        apply_methods(&mut synth, root, &self.root_methods, self.root_cors)?;
        for resource in &self.resources {
            apply_resource(&mut synth, root, resource)?;
        }

        debug!(
            event = "Load",
            phase = "Description",
            stack = self.stack.stack_name(),
            units = self.units.len(),
            grants = synth.grants().len()
        );
        Ok(synth)
    }

    pub fn synthesize(&self) -> Result<DeploymentTemplate, SynthError> {
        self.to_synthesizer()?.synthesize()
    }
}

fn apply_methods(
    synth: &mut Synthesizer,
    node: NodeId,
    methods: &[MethodDescription],
    cors: bool,
) -> Result<(), SynthError> {
    for binding in methods {
        synth.bind_method(node, binding.method, &binding.unit)?;
    }
    if cors {
        synth.add_cors_preflight(node)?;
    }
    Ok(())
}

fn apply_resource(
    synth: &mut Synthesizer,
    parent: NodeId,
    resource: &ResourceDescription,
) -> Result<(), SynthError> {
    let node = synth.add_resource(parent, &resource.path_segment)?;
    apply_methods(synth, node, &resource.methods, resource.cors)?;
    for child in &resource.children {
        apply_resource(synth, node, child)?;
    }
    Ok(())
}

/// Parse a JSON description and synthesize it in one go.
pub fn synthesize_json(text: &str) -> Result<DeploymentTemplate, SynthError> {
    StackDescription::from_json(text)?.synthesize()
}
