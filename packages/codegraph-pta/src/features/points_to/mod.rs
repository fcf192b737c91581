//! # Context-Sensitive Points-to Analysis
//!
//! Propagation-based pointer analysis that discovers the call graph on the
//! fly (Andersen-style inclusion constraints, demand-driven node expansion):
//! - **Location/object model**: interned pointer keys and instance keys,
//!   zero-one-X object merging, heap cloning
//! - **Context model**: pluggable selectors composed by delegation chains
//! - **Constraint generation**: one IR walk per call-graph node; field,
//!   array and dispatch constraints become standing dependencies
//! - **Solver**: single worklist with difference propagation, budgets and
//!   cooperative cancellation
//!
//! ## References
//! - Andersen, L. O. "Program Analysis and Specialization for C" (PhD 1994)
//! - Milanova et al. "Parameterized Object Sensitivity for Points-to Analysis for Java" (TOSEM 2005)
//! - Smaragdakis et al. "Pick Your Contexts Well" (POPL 2011)

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use application::{CallGraphBuilder, PointerAnalysis};
pub use domain::{Context, ContextElement, InstanceId, InstanceKey, LocationId, PointerKey};
pub use infrastructure::{AnalysisStatus, IncompleteReason, SolverStats};
pub use ports::{CancellationToken, ContextSelector, ObjectMergePolicy};
