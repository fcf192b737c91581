/*
 * Codegraph PTA - Context-Sensitive Points-to Analysis Engine
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Program IR, builder, validation, class hierarchy port
 * - features/    : call_graph → points_to → heap_graph → dump
 * - config/      : PtaConfig, presets, YAML loading
 *
 * The call graph and the points-to sets are computed together by one
 * worklist fixpoint; see features::points_to::infrastructure::solver.
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Solver wiring takes every strategy explicitly
#![allow(clippy::type_complexity)] // Interning tables keyed by tuples
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::unnecessary_map_or)] // map_or style for compatibility

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and ports
pub mod shared;

/// Vertical slices
pub mod features;

/// Configuration
pub mod config;

/// Error types
pub mod errors;

pub use config::{
    ConfigError, ContextPolicy, EntrySeeding, MergeConfig, Preset, PtaConfig, WorklistOrder,
};
pub use errors::{PtaError, Result};
pub use features::call_graph::{
    CGNode, CallGraph, CallGraphProvider, CallSiteRef, MethodKey, NodeId,
};
pub use features::dump::AnalysisDump;
pub use features::heap_graph::{EscapeReport, HeapGraph, ThreadEscapeAnalysis};
pub use features::points_to::{
    AnalysisStatus, CallGraphBuilder, CancellationToken, Context, ContextElement, ContextSelector,
    IncompleteReason, InstanceId, InstanceKey, LocationId, ObjectMergePolicy, PointerAnalysis,
    PointerKey, SolverStats,
};
pub use shared::models::{Program, ProgramBuilder};
pub use shared::ports::{ClassHierarchy, SimpleClassHierarchy};
