//! Pointer-flow constraints
//!
//! The constraint generator turns one call-graph node into:
//! - SEED:       x = new T()     → pts(x) ⊇ {o}
//! - FLOW:       x = y           → pts(x) ⊇ pts(y)  (optionally type-filtered)
//! - DEPENDENCY: x = y.f, y.f = x, y.m(..)
//!               → re-evaluated for every object that reaches pts(y)
//! - CALL:       statically bound call, connected once

use super::instance_key::InstanceId;
use super::pointer_key::LocationId;
use crate::features::call_graph::domain::NodeId;
use crate::shared::models::{FieldRef, InvokeKind, MethodRef, ProcedureId, TypeRef};
use serde::{Deserialize, Serialize};

/// Inclusion edge `pts(dst) ⊇ filter(pts(src))`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowEdge {
    pub src: LocationId,
    pub dst: LocationId,
    /// Only objects whose type is a subtype of this flow
    pub filter: Option<TypeRef>,
}

impl FlowEdge {
    #[inline]
    pub fn copy(src: LocationId, dst: LocationId) -> Self {
        Self {
            src,
            dst,
            filter: None,
        }
    }

    #[inline]
    pub fn filtered(src: LocationId, dst: LocationId, filter: TypeRef) -> Self {
        Self {
            src,
            dst,
            filter: Some(filter),
        }
    }
}

/// Points-to fact known without propagation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Seed {
    pub location: LocationId,
    pub instance: InstanceId,
}

/// Everything needed to connect a call once its targets are known
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSiteRecord {
    pub caller: NodeId,
    pub site: u32,
    pub kind: InvokeKind,
    pub target: MethodRef,
    /// Actual arguments; `args[0]` is the receiver / function value when present
    pub args: Vec<LocationId>,
    pub def: Option<LocationId>,
    pub exception: Option<LocationId>,
    /// String constants bound to each argument, if any
    pub constant_args: Vec<Option<String>>,
}

/// Standing dependency registered against a base location; applied to
/// every object that enters the base's points-to set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dependency {
    /// `def = base.field`
    FieldLoad { field: FieldRef, def: LocationId },
    /// `base.field = value`
    FieldStore { field: FieldRef, value: LocationId },
    /// `def = base[_]`
    ArrayLoad { def: LocationId },
    /// `base[_] = value`
    ArrayStore { value: LocationId },
    /// Virtual, special or closure call dispatched on the receiver
    Dispatch(CallSiteRecord),
}

impl Dependency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dependency::FieldLoad { .. } => "LOAD",
            Dependency::FieldStore { .. } => "STORE",
            Dependency::ArrayLoad { .. } => "ALOAD",
            Dependency::ArrayStore { .. } => "ASTORE",
            Dependency::Dispatch(_) => "DISPATCH",
        }
    }
}

/// Resolved target of a statically bound call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallTarget {
    Procedure(ProcedureId),
    /// No static resolution; connected to the unknown node
    Unknown,
}

/// Statically bound call, connected as soon as its node is expanded
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DirectCall {
    pub target: CallTarget,
    pub record: CallSiteRecord,
}

/// Complete constraint set of one node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConstraints {
    pub edges: Vec<FlowEdge>,
    pub seeds: Vec<Seed>,
    pub dependencies: Vec<(LocationId, Dependency)>,
    pub calls: Vec<DirectCall>,
}

impl NodeConstraints {
    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len() + self.seeds.len() + self.dependencies.len() + self.calls.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_edge_constructors() {
        let edge = FlowEdge::copy(LocationId(1), LocationId(2));
        assert!(edge.filter.is_none());
        let cast = FlowEdge::filtered(LocationId(1), LocationId(2), TypeRef::new("A"));
        assert_eq!(cast.filter, Some(TypeRef::new("A")));
        assert_ne!(edge, cast);
    }

    #[test]
    fn test_dependency_labels() {
        let dep = Dependency::ArrayLoad { def: LocationId(0) };
        assert_eq!(dep.as_str(), "ALOAD");
    }
}
