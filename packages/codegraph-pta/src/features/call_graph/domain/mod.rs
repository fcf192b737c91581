//! Call graph domain: nodes, call sites and the graph itself

pub mod call_graph;
pub mod node;

pub use call_graph::CallGraph;
pub use node::{CGNode, CallSiteRef, MethodKey, NodeId};
