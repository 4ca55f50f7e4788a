//! Nodes of the REST resource tree.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use super::http_method::HttpMethod;

/// Handle to a node in a synthesizer's resource tree.
///
/// Ids are only meaningful for the synthesizer that handed them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub(crate) const ROOT: NodeId = NodeId(0);

    pub fn index(&self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "#{}", self.0)
    }
}

/// What a bound method does when called.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodTarget {
    /// Proxy the request to the named compute unit.
    Invoke { unit: String },
    /// Answer a CORS preflight with a static response; no unit is invoked.
    CorsPreflight,
}

impl MethodTarget {
    pub fn unit(&self) -> Option<&str> {
        match self {
            MethodTarget::Invoke { unit } => Some(unit),
            MethodTarget::CorsPreflight => None,
        }
    }
}

/// One HTTP method bound on a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodBinding {
    pub method: HttpMethod,
    pub target: MethodTarget,
}

/// One segment of the URL path tree.
///
/// Children and methods keep declaration order; the synthesizer emits them
/// in that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNode {
    path_segment: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    methods: Vec<MethodBinding>,
}

impl ResourceNode {
    pub(crate) fn root() -> Self {
        ResourceNode {
            path_segment: String::new(),
            parent: None,
            children: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub(crate) fn child_of(parent: NodeId, path_segment: impl Into<String>) -> Self {
        ResourceNode {
            path_segment: path_segment.into(),
            parent: Some(parent),
            children: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn path_segment(&self) -> &str {
        &self.path_segment
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn methods(&self) -> &[MethodBinding] {
        &self.methods
    }

    pub fn binding(&self, method: HttpMethod) -> Option<&MethodBinding> {
        self.methods.iter().find(|b| b.method == method)
    }

    pub(crate) fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    pub(crate) fn push_method(&mut self, binding: MethodBinding) {
        self.methods.push(binding);
    }
}
