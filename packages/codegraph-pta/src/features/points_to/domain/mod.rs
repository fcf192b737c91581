//! Domain models for points-to analysis
//!
//! - PointerKey: abstract locations
//! - InstanceKey: abstract objects
//! - Context: calling contexts
//! - Constraint: flow edges, seeds, standing dependencies, calls

pub mod constraint;
pub mod context;
pub mod instance_key;
pub mod pointer_key;

pub use constraint::{
    CallSiteRecord, CallTarget, Dependency, DirectCall, FlowEdge, NodeConstraints, Seed,
};
pub use context::{Context, ContextElement};
pub use instance_key::{AllocSite, InstanceId, InstanceKey, SiteKind};
pub use pointer_key::{LocationId, PointerKey};
