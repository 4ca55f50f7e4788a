//! Backend compute units (serverless functions).

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A named backend function that handles one or more method bindings.
///
/// Units are immutable once registered with a synthesizer. Only the name is
/// used for cross-references; the rest is carried into the function
/// definition verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct ComputeUnit {
    name: String,
    entry_point: String,
    runtime: String,
    source_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    memory_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_seconds: Option<u32>,
}

impl ComputeUnit {
    /// Create a unit from its name, handler entry point (e.g.
    /// `get_vpc.handler`), runtime identifier (e.g. `python3.7`) and source
    /// location.
    pub fn new(
        name: impl Into<String>,
        entry_point: impl Into<String>,
        runtime: impl Into<String>,
        source_location: impl Into<String>,
    ) -> Self {
        ComputeUnit {
            name: name.into(),
            entry_point: entry_point.into(),
            runtime: runtime.into(),
            source_location: source_location.into(),
            function_name: None,
            memory_size: None,
            timeout_seconds: None,
        }
    }

    /// Set the physical function name; otherwise the provisioning engine picks one.
    pub fn with_function_name(mut self, function_name: impl Into<String>) -> Self {
        self.function_name = Some(function_name.into());
        self
    }

    pub fn with_memory_size(mut self, megabytes: u32) -> Self {
        self.memory_size = Some(megabytes);
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: u32) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    pub fn source_location(&self) -> &str {
        &self.source_location
    }

    pub fn function_name(&self) -> Option<&str> {
        self.function_name.as_deref()
    }

    pub fn memory_size(&self) -> Option<u32> {
        self.memory_size
    }

    pub fn timeout_seconds(&self) -> Option<u32> {
        self.timeout_seconds
    }
}
