//! Heap graph clients

pub mod thread_escape;

pub use thread_escape::{EscapeReport, ThreadEscapeAnalysis, DEFAULT_THREAD_TYPE};
