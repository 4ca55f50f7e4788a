//! Stack-level settings threaded through a synthesis run.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Where the API endpoint is exposed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum EndpointType {
    #[default]
    Regional,
    Edge,
    Private,
}

/// How a repeated `add_cors_preflight` on the same node is treated.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CorsMode {
    /// A second preflight on a node is a `DuplicateMethod` error.
    #[default]
    Strict,
    /// A second preflight on a node is ignored.
    Lenient,
}

fn default_stage_name() -> String {
    "prod".to_string()
}

/// The stack a synthesizer builds into.
///
/// `api_id` is the construct id used as the prefix of every API gateway
/// logical id; `api_name` is the display name given to the REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StackContext {
    stack_name: String,
    api_id: String,
    api_name: String,
    #[serde(default)]
    endpoint_type: EndpointType,
    #[serde(default = "default_stage_name")]
    stage_name: String,
    #[serde(default)]
    cors_mode: CorsMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl StackContext {
    pub fn new(
        stack_name: impl Into<String>,
        api_id: impl Into<String>,
        api_name: impl Into<String>,
    ) -> Self {
        StackContext {
            stack_name: stack_name.into(),
            api_id: api_id.into(),
            api_name: api_name.into(),
            endpoint_type: EndpointType::default(),
            stage_name: default_stage_name(),
            cors_mode: CorsMode::default(),
            description: None,
        }
    }

    pub fn with_endpoint_type(mut self, endpoint_type: EndpointType) -> Self {
        self.endpoint_type = endpoint_type;
        self
    }

    pub fn with_stage_name(mut self, stage_name: impl Into<String>) -> Self {
        self.stage_name = stage_name.into();
        self
    }

    pub fn with_cors_mode(mut self, cors_mode: CorsMode) -> Self {
        self.cors_mode = cors_mode;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn api_id(&self) -> &str {
        &self.api_id
    }

    pub fn api_name(&self) -> &str {
        &self.api_name
    }

    pub fn endpoint_type(&self) -> EndpointType {
        self.endpoint_type
    }

    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    pub fn cors_mode(&self) -> CorsMode {
        self.cors_mode
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_context_defaults() {
        let ctx = StackContext::new("SimplonStack", "VPCApi", "VPC Consultation");
        assert_eq!(ctx.stack_name(), "SimplonStack");
        assert_eq!(ctx.api_id(), "VPCApi");
        assert_eq!(ctx.api_name(), "VPC Consultation");
        assert_eq!(ctx.endpoint_type(), EndpointType::Regional);
        assert_eq!(ctx.stage_name(), "prod");
        assert_eq!(ctx.cors_mode(), CorsMode::Strict);
        assert_eq!(ctx.description(), None);
    }

    #[test]
    fn test_context_deserialize_applies_defaults() {
        let ctx: StackContext = serde_json::from_str(
            r#"{"stack_name": "S", "api_id": "Api", "api_name": "Api", "cors_mode": "lenient"}"#,
        )
        .unwrap();
        assert_eq!(ctx.stage_name(), "prod");
        assert_eq!(ctx.cors_mode(), CorsMode::Lenient);
        assert_eq!(ctx.endpoint_type(), EndpointType::Regional);
    }

    #[test]
    fn test_endpoint_type_strings() {
        assert_eq!(EndpointType::Regional.to_string(), "REGIONAL");
        assert_eq!(EndpointType::from_str("edge").unwrap(), EndpointType::Edge);
        assert_eq!(CorsMode::from_str("Lenient").unwrap(), CorsMode::Lenient);
    }
}
