//! Application layer for points-to analysis
//!
//! - **CallGraphBuilder**: configure and run the analysis
//! - **PointerAnalysis**: queryable result (call graph + points-to sets)

pub mod builder;
pub mod result;

pub use builder::CallGraphBuilder;
pub use result::PointerAnalysis;
