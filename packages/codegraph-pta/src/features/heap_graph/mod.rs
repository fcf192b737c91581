//! Heap graph view over a solved pointer analysis, and its clients
//!
//! - **HeapGraph**: location ↔ object graph (petgraph), DFS reachability
//! - **ThreadEscapeAnalysis**: objects reachable from statics or thread
//!   constructors

pub mod application;
pub mod domain;

pub use application::{EscapeReport, ThreadEscapeAnalysis};
pub use domain::{HeapGraph, HeapNode};
