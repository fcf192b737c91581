//! Ports (Interfaces) for Points-to Analysis
//!
//! Strategy seams injected into the solver:
//! - [`ContextSelector`]: (caller, site, callee, receiver) → Context
//! - [`ObjectMergePolicy`]: allocation → per-site or per-type object
//! - [`CallSummary`]: library calls modeled without analyzing their body
//! - [`CancellationToken`]: cooperative cancellation checked per work item

use crate::features::call_graph::domain::{CGNode, CallSiteRef};
use crate::features::points_to::domain::{Context, InstanceKey};
use crate::shared::models::{InvokeKind, MethodRef, Procedure, TypeRef, ValueId};
use crate::shared::ports::ClassHierarchy;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// ============================================================================
// Context selection
// ============================================================================

/// Everything a selector may look at for one (call site, callee) pair
#[derive(Debug, Clone, Copy)]
pub struct ContextRequest<'a> {
    pub caller: &'a CGNode,
    pub site: CallSiteRef,
    pub callee: &'a Procedure,
    /// Receiver object the call is being resolved for (dispatched calls only)
    pub receiver: Option<&'a InstanceKey>,
    /// String constants bound to the actual arguments
    pub constant_args: &'a [Option<String>],
}

/// Context selection strategy
///
/// Selectors compose by folding: each one receives the context built so far
/// by the selectors before it and returns it, possibly augmented. A selector
/// must be a pure function of its inputs.
pub trait ContextSelector: std::fmt::Debug {
    fn select_context(&self, base: Context, request: &ContextRequest<'_>) -> Context;
}

// ============================================================================
// Object merging
// ============================================================================

/// Allocation being keyed
#[derive(Clone, Copy)]
pub struct MergeRequest<'a> {
    pub ty: &'a TypeRef,
    pub hierarchy: &'a dyn ClassHierarchy,
    /// Number of `new` sites of `ty` in the allocating procedure
    pub allocations_of_type: usize,
}

/// How an allocation is abstracted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// One object per (site, heap context)
    PerSite,
    /// One object per type across the whole program
    PerType,
    /// One object per (allocating node, type)
    PerNode,
}

/// Object merging ("smushing") policy
pub trait ObjectMergePolicy: std::fmt::Debug {
    fn decide(&self, request: &MergeRequest<'_>) -> MergeDecision;

    /// Whether constants are keyed by value (otherwise merged per type)
    fn constant_specific(&self) -> bool;
}

// ============================================================================
// Library call summaries
// ============================================================================

/// A call about to be summarized
#[derive(Clone, Copy)]
pub struct SummaryRequest<'a> {
    /// Procedure containing the call
    pub caller: &'a Procedure,
    pub kind: InvokeKind,
    pub target: &'a MethodRef,
    pub args: &'a [ValueId],
    pub hierarchy: &'a dyn ClassHierarchy,
}

/// Effect of a summarized call on its result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryEffect {
    /// The call returns a fresh object of `ty`
    Allocate { ty: TypeRef },
    /// The call returns something unknown
    ReturnUnknown,
}

/// Hand-written model of a library call
pub trait CallSummary: std::fmt::Debug {
    fn applies_to(&self, target: &MethodRef) -> bool;

    /// `None` falls back to ordinary call handling
    fn summarize(&self, request: &SummaryRequest<'_>) -> Option<SummaryEffect>;
}

// ============================================================================
// Cancellation
// ============================================================================

/// Cloneable cooperative cancellation flag
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
