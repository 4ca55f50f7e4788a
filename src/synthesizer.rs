use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::context::{CorsMode, StackContext};
use crate::cors::CorsPolicy;
use crate::error::SynthError;
use crate::logical_id;
use crate::template::{
    DeploymentTemplate, ResourceType, TemplateBuilder, TemplateOutput, TemplateResource,
    TreeOutline, get_att, join, reference,
};
use crate::types::{
    ComputeUnit, HttpMethod, MethodBinding, MethodTarget, NodeId, PermissionGrant, ResourceNode,
};

const LAMBDA_BASIC_EXECUTION: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// A `{param}` or `{proxy+}` path segment.
static PATH_PARAMETER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^}]*\}").expect("path parameter pattern is valid"));

/// Registry of compute units, their grants, and the REST resource tree.
///
/// Mutation goes through `&mut self`; `synthesize` only reads, so calling it
/// twice on an unchanged synthesizer yields identical templates.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    context: StackContext,
    units: Vec<ComputeUnit>,
    unit_index: HashMap<String, usize>,
    grants: Vec<(String, PermissionGrant)>,
    nodes: Vec<ResourceNode>,
}

impl Synthesizer {
    pub fn new(context: StackContext) -> Self {
        Synthesizer {
            context,
            units: Vec::new(),
            unit_index: HashMap::new(),
            grants: Vec::new(),
            nodes: vec![ResourceNode::root()],
        }
    }

    pub fn context(&self) -> &StackContext {
        &self.context
    }

    /// Registered units in registration order.
    pub fn units(&self) -> &[ComputeUnit] {
        &self.units
    }

    pub fn unit(&self, name: &str) -> Option<&ComputeUnit> {
        self.unit_index.get(name).map(|&i| &self.units[i])
    }

    /// `(unit name, grant)` pairs in attachment order.
    pub fn grants(&self) -> &[(String, PermissionGrant)] {
        &self.grants
    }

    pub fn register_compute_unit(&mut self, unit: ComputeUnit) -> Result<&ComputeUnit, SynthError> {
        if self.unit_index.contains_key(unit.name()) {
            return Err(SynthError::DuplicateUnit {
                name: unit.name().to_string(),
            });
        }
        logical_id::require_fragment("compute unit", unit.name())?;

        debug!(
            event = "Register",
            phase = "ComputeUnit",
            unit = unit.name(),
            entry_point = unit.entry_point(),
            runtime = unit.runtime()
        );

        let index = self.units.len();
        self.unit_index.insert(unit.name().to_string(), index);
        self.units.push(unit);
        Ok(&self.units[index])
    }

    /// Append `grant` to the unit's policy. Identical grants are kept as
    /// separate attachments.
    pub fn attach_permission(
        &mut self,
        unit: &str,
        grant: PermissionGrant,
    ) -> Result<(), SynthError> {
        if !self.unit_index.contains_key(unit) {
            return Err(SynthError::UnboundReference {
                unit: unit.to_string(),
                referrer: "permission grant".to_string(),
            });
        }

        debug!(
            event = "Register",
            phase = "Permission",
            unit = unit,
            effect = grant.effect().as_ref(),
            actions = grant.actions().len()
        );

        self.grants.push((unit.to_string(), grant));
        Ok(())
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    pub fn node(&self, id: NodeId) -> Option<&ResourceNode> {
        self.nodes.get(id.0)
    }

    fn node_checked(&self, id: NodeId) -> Result<&ResourceNode, SynthError> {
        self.nodes.get(id.0).ok_or(SynthError::UnknownNode(id.0))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut ResourceNode, SynthError> {
        self.nodes.get_mut(id.0).ok_or(SynthError::UnknownNode(id.0))
    }

    /// Add a child under `parent`. Sibling segments must be unique.
    pub fn add_resource(&mut self, parent: NodeId, segment: &str) -> Result<NodeId, SynthError> {
        validate_segment(segment)?;
        if self.child(parent, segment)?.is_some() {
            return Err(SynthError::DuplicatePathSegment {
                parent: self.path_of(parent)?,
                segment: segment.to_string(),
            });
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(ResourceNode::child_of(parent, segment));
        self.node_mut(parent)?.push_child(id);

        let path = self.path_of(id)?;
        debug!(event = "Register", phase = "Resource", path = path.as_str());
        Ok(id)
    }

    /// The node for `path`, creating any missing segments along the way.
    ///
    /// Empty segments (leading, repeated or trailing `/`) are ignored, so
    /// `/items/{id}/` and `items/{id}` name the same node.
    pub fn resource_for_path(&mut self, path: &str) -> Result<NodeId, SynthError> {
        let mut current = self.root();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = match self.child(current, segment)? {
                Some(existing) => existing,
                None => self.add_resource(current, segment)?,
            };
        }
        Ok(current)
    }

    fn child(&self, parent: NodeId, segment: &str) -> Result<Option<NodeId>, SynthError> {
        Ok(self
            .node_checked(parent)?
            .children()
            .iter()
            .copied()
            .find(|c| self.nodes[c.0].path_segment() == segment))
    }

    /// The externally visible path of a node: segments joined with `/`,
    /// `/` for the root.
    pub fn path_of(&self, id: NodeId) -> Result<String, SynthError> {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node_checked(node_id)?;
            if !node.is_root() {
                segments.push(node.path_segment());
            }
            current = node.parent();
        }
        segments.reverse();
        Ok(format!("/{}", segments.join("/")))
    }

    /// Bind `method` on `node` to the registered unit `unit`.
    pub fn bind_method(
        &mut self,
        node: NodeId,
        method: HttpMethod,
        unit: &str,
    ) -> Result<(), SynthError> {
        let path = self.path_of(node)?;
        if !self.unit_index.contains_key(unit) {
            return Err(SynthError::UnboundReference {
                unit: unit.to_string(),
                referrer: format!("{method} {path}"),
            });
        }
        if self.node_checked(node)?.binding(method).is_some() {
            return Err(SynthError::DuplicateMethod {
                path,
                method: method.to_string(),
            });
        }

        debug!(
            event = "Register",
            phase = "Method",
            path = path.as_str(),
            method = method.as_ref(),
            unit = unit
        );

        self.node_mut(node)?.push_method(MethodBinding {
            method,
            target: MethodTarget::Invoke {
                unit: unit.to_string(),
            },
        });
        Ok(())
    }

    /// Answer `OPTIONS` on `node` with the fixed CORS preflight response.
    ///
    /// A second call on the same node fails in strict mode and is ignored in
    /// lenient mode. An `OPTIONS` already bound to a compute unit is always a
    /// `DuplicateMethod`.
    pub fn add_cors_preflight(&mut self, node: NodeId) -> Result<(), SynthError> {
        let path = self.path_of(node)?;
        let existing = self
            .node_checked(node)?
            .binding(HttpMethod::Options)
            .map(|b| b.target.clone());

        match (existing, self.context.cors_mode()) {
            (None, _) => {}
            (Some(MethodTarget::CorsPreflight), CorsMode::Lenient) => {
                warn!(
                    event = "Register",
                    phase = "CorsPreflight",
                    path = path.as_str(),
                    "preflight already present, ignoring"
                );
                return Ok(());
            }
            (Some(_), _) => {
                return Err(SynthError::DuplicateMethod {
                    path,
                    method: HttpMethod::Options.to_string(),
                });
            }
        }

        debug!(event = "Register", phase = "CorsPreflight", path = path.as_str());

        self.node_mut(node)?.push_method(MethodBinding {
            method: HttpMethod::Options,
            target: MethodTarget::CorsPreflight,
        });
        Ok(())
    }

    /// Build the deployment template.
    ///
    /// The tree is walked depth-first with children in declaration order.
    /// Any error aborts the run; no partial template is returned.
    pub fn synthesize(&self) -> Result<DeploymentTemplate, SynthError> {
        debug!(
            event = "Synthesize",
            phase = "Start",
            stack = self.context.stack_name(),
            units = self.units.len(),
            grants = self.grants.len(),
            nodes = self.nodes.len()
        );

        self.check_references()?;

        let api_fragment = logical_id::require_fragment("api", self.context.api_id())?;
        let api_id = logical_id::rest_api(&api_fragment);
        let unit_fragments = logical_id::unit_fragments(self.units.iter().map(|u| u.name()))?;
        let prefixes = self.node_prefixes(&api_fragment)?;
        let mut builder = TemplateBuilder::new(self.context.description().map(str::to_string));

        self.emit_units(&mut builder, &unit_fragments)?;
        self.emit_grants(&mut builder, &unit_fragments)?;
        self.emit_rest_api(&mut builder, &api_id)?;

        let mut walk = TreeWalk {
            synth: self,
            api_id: &api_id,
            prefixes: &prefixes,
            unit_fragments: &unit_fragments,
            preflight: CorsPolicy::default(),
            builder: &mut builder,
        };
        let resource_tree = walk.visit(NodeId::ROOT)?;

        self.emit_deployment(&mut builder, &api_fragment, &api_id)?;

        let template = builder.finish(resource_tree);

        info!(
            event = "Synthesize",
            phase = "Done",
            stack = self.context.stack_name(),
            resources = template.len()
        );
        Ok(template)
    }

    /// Every invoking binding and every grant must name a registered unit.
    fn check_references(&self) -> Result<(), SynthError> {
        for (unit, _) in &self.grants {
            if !self.unit_index.contains_key(unit) {
                return Err(SynthError::IncompleteGraph {
                    unit: unit.clone(),
                    referrer: "permission grant".to_string(),
                });
            }
        }
        for (index, node) in self.nodes.iter().enumerate() {
            for binding in node.methods() {
                let Some(unit) = binding.target.unit() else {
                    continue;
                };
                if !self.unit_index.contains_key(unit) {
                    return Err(SynthError::IncompleteGraph {
                        unit: unit.to_string(),
                        referrer: format!("{} {}", binding.method, self.path_of(NodeId(index))?),
                    });
                }
            }
        }
        Ok(())
    }

    /// Logical-id prefix of every node, indexed by `NodeId`.
    ///
    /// Parents always precede their children in the arena, so one forward
    /// pass builds every readable prefix.
    fn node_prefixes(&self, api_fragment: &str) -> Result<Vec<String>, SynthError> {
        let mut candidates: Vec<(String, String)> = Vec::with_capacity(self.nodes.len());
        for (index, node) in self.nodes.iter().enumerate() {
            let readable = match node.parent() {
                None => logical_id::root_prefix(api_fragment),
                Some(parent) => {
                    let (parent_prefix, _) = candidates
                        .get(parent.0)
                        .ok_or(SynthError::UnknownNode(parent.0))?;
                    let fragment =
                        logical_id::require_fragment("path segment", node.path_segment())?;
                    logical_id::child_prefix(parent_prefix, &fragment)
                }
            };
            candidates.push((readable, self.path_of(NodeId(index))?));
        }
        Ok(logical_id::disambiguate(&candidates))
    }

    fn emit_units(
        &self,
        builder: &mut TemplateBuilder,
        unit_fragments: &HashMap<String, String>,
    ) -> Result<(), SynthError> {
        for unit in &self.units {
            let fragment = unit_fragment(unit_fragments, unit.name(), "compute unit registry")?;
            let role_id = logical_id::role(fragment);

            builder.insert(
                role_id.clone(),
                TemplateResource::new(
                    ResourceType::Role,
                    json!({
                        "AssumeRolePolicyDocument": {
                            "Version": "2012-10-17",
                            "Statement": [{
                                "Effect": "Allow",
                                "Principal": { "Service": "lambda.amazonaws.com" },
                                "Action": "sts:AssumeRole",
                            }],
                        },
                        "ManagedPolicyArns": [LAMBDA_BASIC_EXECUTION],
                    }),
                ),
            )?;

            let mut properties = Map::new();
            properties.insert(
                "Code".to_string(),
                json!({ "AssetPath": unit.source_location() }),
            );
            properties.insert("Handler".to_string(), json!(unit.entry_point()));
            properties.insert("Runtime".to_string(), json!(unit.runtime()));
            properties.insert("Role".to_string(), get_att(&role_id, "Arn"));
            if let Some(name) = unit.function_name() {
                properties.insert("FunctionName".to_string(), json!(name));
            }
            if let Some(memory) = unit.memory_size() {
                properties.insert("MemorySize".to_string(), json!(memory));
            }
            if let Some(timeout) = unit.timeout_seconds() {
                properties.insert("Timeout".to_string(), json!(timeout));
            }

            builder.insert(
                logical_id::function(fragment),
                TemplateResource::new(ResourceType::Function, Value::Object(properties))
                    .depends_on(vec![role_id]),
            )?;
        }
        Ok(())
    }

    fn emit_grants(
        &self,
        builder: &mut TemplateBuilder,
        unit_fragments: &HashMap<String, String>,
    ) -> Result<(), SynthError> {
        let mut per_unit: HashMap<&str, usize> = HashMap::new();
        for (unit, grant) in &self.grants {
            let fragment = unit_fragment(unit_fragments, unit, "permission grant")?;
            let slot = per_unit.entry(unit.as_str()).or_insert(0);
            let policy_id = logical_id::policy(fragment, *slot);
            *slot += 1;

            builder.insert(
                policy_id.clone(),
                TemplateResource::new(
                    ResourceType::Policy,
                    json!({
                        "PolicyName": policy_id,
                        "PolicyDocument": {
                            "Version": "2012-10-17",
                            "Statement": [grant.statement()],
                        },
                        "Roles": [reference(&logical_id::role(fragment))],
                    }),
                ),
            )?;
        }
        Ok(())
    }

    fn emit_rest_api(&self, builder: &mut TemplateBuilder, api_id: &str) -> Result<(), SynthError> {
        builder.insert(
            api_id.to_string(),
            TemplateResource::new(
                ResourceType::RestApi,
                json!({
                    "Name": self.context.api_name(),
                    "EndpointConfiguration": {
                        "Types": [self.context.endpoint_type().as_ref()],
                    },
                }),
            ),
        )
    }

    fn emit_deployment(
        &self,
        builder: &mut TemplateBuilder,
        api_fragment: &str,
        api_id: &str,
    ) -> Result<(), SynthError> {
        let deployment_id = logical_id::deployment(api_fragment);
        let stage_name = self.context.stage_name();
        let stage_fragment = logical_id::require_fragment("stage", stage_name)?;
        let methods = builder.ids_of(ResourceType::Method);

        builder.insert(
            deployment_id.clone(),
            TemplateResource::new(
                ResourceType::Deployment,
                json!({
                    "RestApiId": reference(api_id),
                    "Description": format!("Deployment of {}", self.context.api_name()),
                }),
            )
            .depends_on(methods),
        )?;

        builder.insert(
            logical_id::stage(api_fragment, &stage_fragment),
            TemplateResource::new(
                ResourceType::Stage,
                json!({
                    "RestApiId": reference(api_id),
                    "DeploymentId": reference(&deployment_id),
                    "StageName": stage_name,
                }),
            ),
        )?;

        builder.output(
            logical_id::endpoint_output(api_fragment),
            TemplateOutput {
                description: Some(format!("Invoke URL of {}", self.context.api_name())),
                value: join(vec![
                    json!("https://"),
                    reference(api_id),
                    json!(".execute-api."),
                    reference("AWS::Region"),
                    json!("."),
                    reference("AWS::URLSuffix"),
                    json!(format!("/{stage_name}/")),
                ]),
            },
        );
        Ok(())
    }
}

/// Depth-first emission of resources, methods and invoke permissions.
struct TreeWalk<'a> {
    synth: &'a Synthesizer,
    api_id: &'a str,
    prefixes: &'a [String],
    unit_fragments: &'a HashMap<String, String>,
    preflight: CorsPolicy,
    builder: &'a mut TemplateBuilder,
}

impl TreeWalk<'_> {
    fn prefix(&self, id: NodeId) -> Result<&str, SynthError> {
        self.prefixes
            .get(id.0)
            .map(String::as_str)
            .ok_or(SynthError::UnknownNode(id.0))
    }

    fn visit(&mut self, id: NodeId) -> Result<TreeOutline, SynthError> {
        let synth = self.synth;
        let node = synth.node_checked(id)?;
        let path = synth.path_of(id)?;
        let prefix = self.prefix(id)?.to_string();

        let resource_ref = match node.parent() {
            None => get_att(self.api_id, "RootResourceId"),
            Some(parent) => {
                let parent_ref = if parent == NodeId::ROOT {
                    get_att(self.api_id, "RootResourceId")
                } else {
                    reference(&logical_id::resource(self.prefix(parent)?))
                };
                let resource_id = logical_id::resource(&prefix);
                self.builder.insert(
                    resource_id.clone(),
                    TemplateResource::new(
                        ResourceType::ApiResource,
                        json!({
                            "ParentId": parent_ref,
                            "PathPart": node.path_segment(),
                            "RestApiId": reference(self.api_id),
                        }),
                    ),
                )?;
                reference(&resource_id)
            }
        };

        for binding in node.methods() {
            self.emit_method(&prefix, &path, &resource_ref, binding)?;
        }

        let mut children = Vec::with_capacity(node.children().len());
        for &child in node.children() {
            children.push(self.visit(child)?);
        }

        Ok(TreeOutline {
            path,
            methods: node.methods().iter().map(|b| b.method).collect(),
            children,
        })
    }

    fn emit_method(
        &mut self,
        prefix: &str,
        path: &str,
        resource_ref: &Value,
        binding: &MethodBinding,
    ) -> Result<(), SynthError> {
        let method_id = logical_id::method(prefix, binding.method);

        let (integration, method_responses) = match &binding.target {
            MethodTarget::Invoke { unit } => {
                let referrer = format!("{} {path}", binding.method);
                let fragment = unit_fragment(self.unit_fragments, unit, &referrer)?;
                let function_id = logical_id::function(fragment);
                self.emit_invoke_permission(prefix, path, binding.method, &function_id)?;
                (proxy_integration(&function_id), None)
            }
            MethodTarget::CorsPreflight => (
                self.preflight.mock_integration(),
                Some(self.preflight.method_responses()),
            ),
        };

        let mut properties = Map::new();
        properties.insert("HttpMethod".to_string(), json!(binding.method.as_ref()));
        properties.insert("ResourceId".to_string(), resource_ref.clone());
        properties.insert("RestApiId".to_string(), reference(self.api_id));
        properties.insert("AuthorizationType".to_string(), json!("NONE"));
        properties.insert("Integration".to_string(), integration);
        if let Some(responses) = method_responses {
            properties.insert("MethodResponses".to_string(), responses);
        }

        debug!(
            event = "Synthesize",
            phase = "Method",
            path = path,
            method = binding.method.as_ref(),
            id = method_id.as_str()
        );

        self.builder.insert(
            method_id,
            TemplateResource::new(ResourceType::Method, Value::Object(properties)),
        )
    }

    fn emit_invoke_permission(
        &mut self,
        prefix: &str,
        path: &str,
        method: HttpMethod,
        function_id: &str,
    ) -> Result<(), SynthError> {
        let method_part = match method {
            HttpMethod::Any => "*".to_string(),
            other => other.to_string(),
        };
        // The gateway matches the concrete request path, so parameters widen to `*`.
        let path_pattern = PATH_PARAMETER.replace_all(path, "*");
        self.builder.insert(
            logical_id::invoke_permission(prefix, method),
            TemplateResource::new(
                ResourceType::InvokePermission,
                json!({
                    "Action": "lambda:InvokeFunction",
                    "FunctionName": get_att(function_id, "Arn"),
                    "Principal": "apigateway.amazonaws.com",
                    "SourceArn": join(vec![
                        json!("arn:"),
                        reference("AWS::Partition"),
                        json!(":execute-api:"),
                        reference("AWS::Region"),
                        json!(":"),
                        reference("AWS::AccountId"),
                        json!(":"),
                        reference(self.api_id),
                        json!(format!("/*/{method_part}{path_pattern}")),
                    ]),
                }),
            ),
        )
    }
}

fn unit_fragment<'f>(
    unit_fragments: &'f HashMap<String, String>,
    unit: &str,
    referrer: &str,
) -> Result<&'f str, SynthError> {
    unit_fragments
        .get(unit)
        .map(String::as_str)
        .ok_or_else(|| SynthError::IncompleteGraph {
            unit: unit.to_string(),
            referrer: referrer.to_string(),
        })
}

fn proxy_integration(function_id: &str) -> Value {
    json!({
        "Type": "AWS_PROXY",
        "IntegrationHttpMethod": "POST",
        "Uri": join(vec![
            json!("arn:"),
            reference("AWS::Partition"),
            json!(":apigateway:"),
            reference("AWS::Region"),
            json!(":lambda:path/2015-03-31/functions/"),
            get_att(function_id, "Arn"),
            json!("/invocations"),
        ]),
    })
}

fn validate_segment(segment: &str) -> Result<(), SynthError> {
    if segment.is_empty() || segment.contains('/') {
        return Err(SynthError::InvalidFormat(format!(
            "path segment '{segment}' must be non-empty and must not contain '/'"
        )));
    }
    if segment.starts_with('{') != segment.ends_with('}') {
        return Err(SynthError::InvalidFormat(format!(
            "path segment '{segment}' has unbalanced braces"
        )));
    }
    logical_id::require_fragment("path segment", segment)?;
    Ok(())
}

#[cfg(test)]
mod tests;
