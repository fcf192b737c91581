//! Abstract locations ("pointer keys")
//!
//! A [`PointerKey`] names a set of storage cells analyzed together. Keys are
//! interned into dense [`LocationId`]s by the location table.

use super::instance_key::InstanceId;
use crate::features::call_graph::domain::NodeId;
use crate::index_type;
use crate::shared::models::{FieldRef, ProcedureId, ValueId};
use serde::{Deserialize, Serialize};
use std::fmt;

index_type!(
    /// Interned abstract location
    LocationId,
    "l"
);

/// Abstract location
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerKey {
    /// SSA value in one call-graph node
    Local { node: NodeId, value: ValueId },
    /// Normal return value of a node
    Return { node: NodeId },
    /// Whatever a node may throw
    ExceptionalReturn { node: NodeId },
    StaticField { field: FieldRef },
    /// Field of every object named by `object`
    InstanceField { object: InstanceId, field: FieldRef },
    /// Contents of arrays named by `object`
    ArrayContents { object: InstanceId },
    /// Variable captured from the scope of `definer`, shared by all its contexts
    Lexical { definer: ProcedureId, name: String },
    /// Sink for values passed to unresolvable code
    Unknown,
}

impl PointerKey {
    /// Call-graph node that must exist before this key may be interned
    pub fn owner_node(&self) -> Option<NodeId> {
        match self {
            PointerKey::Local { node, .. }
            | PointerKey::Return { node }
            | PointerKey::ExceptionalReturn { node } => Some(*node),
            _ => None,
        }
    }

    /// Object qualifying a heap location
    pub fn owner_object(&self) -> Option<InstanceId> {
        match self {
            PointerKey::InstanceField { object, .. } | PointerKey::ArrayContents { object } => {
                Some(*object)
            }
            _ => None,
        }
    }

    /// Whether this key is a field or array slot of some object
    #[inline]
    pub fn is_heap(&self) -> bool {
        self.owner_object().is_some()
    }
}

impl fmt::Display for PointerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerKey::Local { node, value } => write!(f, "{}:{}", node, value),
            PointerKey::Return { node } => write!(f, "{}:ret", node),
            PointerKey::ExceptionalReturn { node } => write!(f, "{}:exc", node),
            PointerKey::StaticField { field } => write!(f, "static {}", field),
            PointerKey::InstanceField { object, field } => write!(f, "{}.{}", object, field),
            PointerKey::ArrayContents { object } => write!(f, "{}[*]", object),
            PointerKey::Lexical { definer, name } => write!(f, "{}::{}", definer, name),
            PointerKey::Unknown => f.write_str("<unknown>"),
        }
    }
}
