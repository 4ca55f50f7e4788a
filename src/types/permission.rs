//! IAM permission grants attached to compute units.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Whether a statement allows or denies its actions.
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
#[strum(ascii_case_insensitive)]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

/// One allow/deny rule scoping which actions a compute unit may perform on
/// which resources.
///
/// Actions and resources are kept sorted, so two grants built from the same
/// patterns in a different order render identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct PermissionGrant {
    #[serde(default)]
    effect: Effect,
    actions: BTreeSet<String>,
    resources: BTreeSet<String>,
}

impl PermissionGrant {
    pub fn new<A, R>(effect: Effect, actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        PermissionGrant {
            effect,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self::new(Effect::Allow, actions, resources)
    }

    pub fn deny<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self::new(Effect::Deny, actions, resources)
    }

    /// `Allow {service}:Describe*` on every resource.
    pub fn read_only(service: &str) -> Self {
        Self::allow([format!("{service}:Describe*")], ["*"])
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn actions(&self) -> &BTreeSet<String> {
        &self.actions
    }

    pub fn resources(&self) -> &BTreeSet<String> {
        &self.resources
    }

    /// The IAM policy statement for this grant.
    pub fn statement(&self) -> Value {
        json!({
            "Effect": self.effect.as_ref(),
            "Action": self.actions,
            "Resource": self.resources,
        })
    }
}
