//! Logical ids for emitted template resources.
//!
//! Ids are derived only from names and path segments, never from counters
//! shared across runs, so the same input always yields the same ids.
//! Readable ids that would be shared by distinct inputs (`/user/profile` and
//! `/userProfile`, units `getOne` and `GetOne`) carry a short hash of the
//! full source to keep them apart.

use std::collections::HashMap;

use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::error::SynthError;
use crate::types::HttpMethod;

static WORD_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("word separator pattern is valid"));

/// Turn an arbitrary name into a PascalCase alphanumeric fragment.
///
/// `get_vpc` becomes `GetVpc`, `{id}` becomes `Id`, `VPC Consultation`
/// becomes `VPCConsultation`. Returns `None` when nothing alphanumeric is left.
pub fn pascal_fragment(name: &str) -> Option<String> {
    let fragment: String = WORD_SEPARATOR
        .split(name)
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .join("");
    (!fragment.is_empty()).then_some(fragment)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

pub(crate) fn require_fragment(kind: &str, name: &str) -> Result<String, SynthError> {
    pascal_fragment(name).ok_or_else(|| {
        SynthError::InvalidFormat(format!(
            "{kind} name '{name}' has no alphanumeric characters to build a logical id from"
        ))
    })
}

/// Uppercase hex of the first four bytes of `SHA-256(source)`.
fn source_hash(source: &str) -> String {
    Sha256::digest(source.as_bytes())[..4]
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .join("")
}

/// Resolve `(readable, source)` candidates into final fragments.
///
/// A readable fragment claimed by a single candidate is used as is. When
/// several candidates share one, each gets its source hash appended. The
/// result only depends on the set of candidates, not on their order.
pub(crate) fn disambiguate(candidates: &[(String, String)]) -> Vec<String> {
    let claims = candidates.iter().counts_by(|(readable, _)| readable.as_str());
    candidates
        .iter()
        .map(|(readable, source)| {
            if claims[readable.as_str()] > 1 {
                format!("{readable}{}", source_hash(source))
            } else {
                readable.clone()
            }
        })
        .collect()
}

/// Fragments for every unit name, keyed by name.
pub(crate) fn unit_fragments<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> Result<HashMap<String, String>, SynthError> {
    let candidates = names
        .into_iter()
        .map(|name| -> Result<(String, String), SynthError> {
            Ok((require_fragment("compute unit", name)?, name.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let fragments = disambiguate(&candidates);
    Ok(candidates
        .into_iter()
        .map(|(_, name)| name)
        .zip(fragments)
        .collect())
}

pub(crate) fn function(unit_fragment: &str) -> String {
    format!("{unit_fragment}Function")
}

pub(crate) fn role(unit_fragment: &str) -> String {
    format!("{unit_fragment}ServiceRole")
}

pub(crate) fn policy(unit_fragment: &str, index: usize) -> String {
    format!("{unit_fragment}Policy{index}")
}

pub(crate) fn rest_api(api_fragment: &str) -> String {
    api_fragment.to_string()
}

/// Readable prefix of the root node: the bare api id. Every other node
/// appends at least one non-empty segment fragment, so none can reuse it.
pub(crate) fn root_prefix(api_fragment: &str) -> String {
    api_fragment.to_string()
}

/// Readable prefix shared by a node's resource and methods: the parent's
/// readable prefix followed by the node's own segment fragment.
pub(crate) fn child_prefix(parent_prefix: &str, segment_fragment: &str) -> String {
    format!("{parent_prefix}{segment_fragment}")
}

pub(crate) fn resource(prefix: &str) -> String {
    format!("{prefix}Resource")
}

pub(crate) fn method(prefix: &str, method: HttpMethod) -> String {
    format!("{prefix}{}Method", method.pascal())
}

pub(crate) fn invoke_permission(prefix: &str, method: HttpMethod) -> String {
    format!("{prefix}{}Permission", method.pascal())
}

pub(crate) fn deployment(api_fragment: &str) -> String {
    format!("{api_fragment}Deployment")
}

pub(crate) fn stage(api_fragment: &str, stage_fragment: &str) -> String {
    format!("{api_fragment}DeploymentStage{stage_fragment}")
}

pub(crate) fn endpoint_output(api_fragment: &str) -> String {
    format!("{api_fragment}Endpoint")
}
