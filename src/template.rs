//! The synthesized deployment template.
//!
//! Resources and outputs keep emission order; the serialized document is a
//! CloudFormation-shaped JSON object handed to the provisioning engine.

use std::collections::HashSet;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use serde_json::{Value, json};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::SynthError;
use crate::types::HttpMethod;

pub const FORMAT_VERSION: &str = "2010-09-09";

/// Kinds of resource the synthesizer emits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, EnumIter, AsRefStr,
)]
pub enum ResourceType {
    #[serde(rename = "AWS::IAM::Role")]
    #[strum(serialize = "AWS::IAM::Role")]
    Role,
    #[serde(rename = "AWS::Lambda::Function")]
    #[strum(serialize = "AWS::Lambda::Function")]
    Function,
    #[serde(rename = "AWS::IAM::Policy")]
    #[strum(serialize = "AWS::IAM::Policy")]
    Policy,
    #[serde(rename = "AWS::ApiGateway::RestApi")]
    #[strum(serialize = "AWS::ApiGateway::RestApi")]
    RestApi,
    #[serde(rename = "AWS::ApiGateway::Resource")]
    #[strum(serialize = "AWS::ApiGateway::Resource")]
    ApiResource,
    #[serde(rename = "AWS::ApiGateway::Method")]
    #[strum(serialize = "AWS::ApiGateway::Method")]
    Method,
    #[serde(rename = "AWS::Lambda::Permission")]
    #[strum(serialize = "AWS::Lambda::Permission")]
    InvokePermission,
    #[serde(rename = "AWS::ApiGateway::Deployment")]
    #[strum(serialize = "AWS::ApiGateway::Deployment")]
    Deployment,
    #[serde(rename = "AWS::ApiGateway::Stage")]
    #[strum(serialize = "AWS::ApiGateway::Stage")]
    Stage,
}

/// One resource definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: ResourceType,
    #[serde(rename = "Properties")]
    pub properties: Value,
    #[serde(rename = "DependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl TemplateResource {
    pub fn new(resource_type: ResourceType, properties: Value) -> Self {
        TemplateResource {
            resource_type,
            properties,
            depends_on: Vec::new(),
        }
    }

    pub fn depends_on(mut self, ids: Vec<String>) -> Self {
        self.depends_on = ids;
        self
    }

    /// Shortcut into `Properties`; `Value::Null` when absent.
    pub fn property(&self, key: &str) -> &Value {
        &self.properties[key]
    }
}

/// A stack output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateOutput {
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Value")]
    pub value: Value,
}

/// Nested view of the path tree, recorded under `Metadata.ResourceTree`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeOutline {
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<HttpMethod>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeOutline>,
}

impl TreeOutline {
    pub fn child(&self, path: &str) -> Option<&TreeOutline> {
        self.children.iter().find(|c| c.path == path)
    }
}

/// The output of one synthesis run. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentTemplate {
    description: Option<String>,
    resource_tree: TreeOutline,
    resources: Vec<(String, TemplateResource)>,
    outputs: Vec<(String, TemplateOutput)>,
}

impl DeploymentTemplate {
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn resource_tree(&self) -> &TreeOutline {
        &self.resource_tree
    }

    /// All resources in emission order.
    pub fn resources(&self) -> impl Iterator<Item = (&str, &TemplateResource)> {
        self.resources.iter().map(|(id, r)| (id.as_str(), r))
    }

    pub fn resource(&self, logical_id: &str) -> Option<&TemplateResource> {
        self.resources
            .iter()
            .find(|(id, _)| id == logical_id)
            .map(|(_, r)| r)
    }

    pub fn resources_of_type(
        &self,
        resource_type: ResourceType,
    ) -> impl Iterator<Item = (&str, &TemplateResource)> {
        self.resources()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    pub fn count_of(&self, resource_type: ResourceType) -> usize {
        self.resources_of_type(resource_type).count()
    }

    pub fn outputs(&self) -> impl Iterator<Item = (&str, &TemplateOutput)> {
        self.outputs.iter().map(|(id, o)| (id.as_str(), o))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn to_json(&self) -> Result<Value, SynthError> {
        serde_json::to_value(self).map_err(|e| SynthError::Serialization(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, SynthError> {
        serde_json::to_string_pretty(self).map_err(|e| SynthError::Serialization(e.to_string()))
    }
}

struct OrderedEntries<'a, T>(&'a [(String, T)]);

impl<T: Serialize> Serialize for OrderedEntries<'_, T> {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = ser.serialize_map(Some(self.0.len()))?;
        for (id, entry) in self.0 {
            map.serialize_entry(id, entry)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct TemplateMetadata<'a> {
    #[serde(rename = "ResourceTree")]
    resource_tree: &'a TreeOutline,
}

impl Serialize for DeploymentTemplate {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut s = ser.serialize_struct("DeploymentTemplate", 5)?;
        s.serialize_field("AWSTemplateFormatVersion", FORMAT_VERSION)?;
        if let Some(description) = &self.description {
            s.serialize_field("Description", description)?;
        }
        s.serialize_field(
            "Metadata",
            &TemplateMetadata {
                resource_tree: &self.resource_tree,
            },
        )?;
        s.serialize_field("Resources", &OrderedEntries(&self.resources))?;
        if !self.outputs.is_empty() {
            s.serialize_field("Outputs", &OrderedEntries(&self.outputs))?;
        }
        s.end()
    }
}

/// Accumulates resources for a single run, rejecting repeated logical ids.
#[derive(Debug, Default)]
pub(crate) struct TemplateBuilder {
    description: Option<String>,
    seen: HashSet<String>,
    resources: Vec<(String, TemplateResource)>,
    outputs: Vec<(String, TemplateOutput)>,
}

impl TemplateBuilder {
    pub(crate) fn new(description: Option<String>) -> Self {
        TemplateBuilder {
            description,
            ..Default::default()
        }
    }

    pub(crate) fn insert(
        &mut self,
        logical_id: String,
        resource: TemplateResource,
    ) -> Result<(), SynthError> {
        if !self.seen.insert(logical_id.clone()) {
            return Err(SynthError::DuplicateLogicalId(logical_id));
        }
        self.resources.push((logical_id, resource));
        Ok(())
    }

    pub(crate) fn output(&mut self, id: String, output: TemplateOutput) {
        self.outputs.push((id, output));
    }

    pub(crate) fn ids_of(&self, resource_type: ResourceType) -> Vec<String> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub(crate) fn finish(self, resource_tree: TreeOutline) -> DeploymentTemplate {
        DeploymentTemplate {
            description: self.description,
            resource_tree,
            resources: self.resources,
            outputs: self.outputs,
        }
    }
}

/// `{"Ref": id}`
pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Fn::GetAtt": [id, attribute]}`
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// `{"Fn::Join": ["", parts]}`
pub fn join(parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": ["", parts] })
}
