//! HTTP methods that can be bound on a resource node.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// An HTTP method as understood by the API gateway.
///
/// Parsing is case-insensitive; rendering is always uppercase. `Any` is the
/// gateway's catch-all method.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Head,
    Options,
    Any,
}

impl HttpMethod {
    /// PascalCase form used when deriving logical ids, e.g. `Get`, `Options`.
    pub fn pascal(&self) -> String {
        let upper: &str = self.as_ref();
        let (first, rest) = upper.split_at(1);
        format!("{first}{}", rest.to_ascii_lowercase())
    }
}
