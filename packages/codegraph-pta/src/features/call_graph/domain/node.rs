//! Call-graph node identity
//!
//! A node is the pair (method, context). Methods are either real procedures
//! or one of the two synthetic methods every call graph carries.

use crate::features::points_to::domain::Context;
use crate::index_type;
use crate::shared::models::ProcedureId;
use serde::{Deserialize, Serialize};
use std::fmt;

index_type!(
    /// Call-graph node identifier (dense, creation order)
    NodeId,
    "n"
);

impl NodeId {
    /// Synthetic root calling every entry point
    pub const FAKE_ROOT: NodeId = NodeId(0);

    /// Synthetic target of unresolvable calls
    pub const UNKNOWN: NodeId = NodeId(1);

    #[inline]
    pub fn is_synthetic(self) -> bool {
        self == Self::FAKE_ROOT || self == Self::UNKNOWN
    }
}

/// The method a node analyzes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKey {
    FakeRoot,
    Unknown,
    Procedure(ProcedureId),
}

impl MethodKey {
    #[inline]
    pub fn procedure(self) -> Option<ProcedureId> {
        match self {
            MethodKey::Procedure(id) => Some(id),
            MethodKey::FakeRoot | MethodKey::Unknown => None,
        }
    }
}

impl fmt::Display for MethodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodKey::FakeRoot => f.write_str("<fake-root>"),
            MethodKey::Unknown => f.write_str("<unknown>"),
            MethodKey::Procedure(id) => write!(f, "{}", id),
        }
    }
}

/// A call site, identified independently of the caller's context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallSiteRef {
    pub method: MethodKey,
    pub site: u32,
}

impl CallSiteRef {
    pub fn new(method: MethodKey, site: u32) -> Self {
        Self { method, site }
    }
}

impl fmt::Display for CallSiteRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.method, self.site)
    }
}

/// Call-graph node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CGNode {
    pub id: NodeId,
    pub method: MethodKey,
    pub context: Context,
}

impl CGNode {
    #[inline]
    pub fn procedure(&self) -> Option<ProcedureId> {
        self.method.procedure()
    }
}

impl fmt::Display for CGNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.method, self.context)
    }
}
