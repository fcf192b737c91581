//! Infrastructure layer for points-to analysis
//!
//! - **SparseBitmap**: sorted points-to sets with deferred insertion
//! - **LocationTable / HeapModel**: interning of locations and objects
//! - **ZeroXMergePolicy**: allocation-site vs per-type objects
//! - **Context selectors**: 0-CFA, k-CFA, k-object, type, container, name key
//! - **ConstraintGenerator**: IR → seeds, flow edges, dependencies, calls
//! - **PropagationSystem / Solver**: difference-propagation fixpoint with
//!   on-the-fly call graph construction

pub mod call_summaries;
pub mod constraint_generator;
pub mod context_selector;
pub mod heap_model;
pub mod location_table;
pub mod merge_policy;
pub mod propagation_system;
pub mod solver;
pub mod sparse_bitmap;

pub use call_summaries::ReflectiveNewInstance;
pub use constraint_generator::{ConstraintGenerator, GeneratorTables};
pub use context_selector::{
    CallStringSelector, ContainerSelector, Insensitive, NameKeySelector, ObjectSensitiveSelector,
    SelectorChain, TypeSensitiveSelector,
};
pub use heap_model::HeapModel;
pub use location_table::LocationTable;
pub use merge_policy::ZeroXMergePolicy;
pub use propagation_system::{passes_filter, PropagationSystem};
pub use solver::{AnalysisStatus, IncompleteReason, Solver, SolverOutput, SolverStats};
pub use sparse_bitmap::SparseBitmap;
