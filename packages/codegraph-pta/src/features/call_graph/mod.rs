//! Call graph discovered during points-to analysis
//!
//! Nodes are (procedure, context) pairs created on demand by the solver;
//! edges are (caller, call site, callee) triples.

pub mod domain;
pub mod ports;

pub use domain::{CGNode, CallGraph, CallSiteRef, MethodKey, NodeId};
pub use ports::CallGraphProvider;
