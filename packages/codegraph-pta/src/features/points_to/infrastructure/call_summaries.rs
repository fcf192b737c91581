//! Library call summaries
//!
//! Summaries are consulted before ordinary call handling. A summarized call
//! creates no call-graph edge; it only seeds the call's result.

use crate::features::points_to::ports::{CallSummary, SummaryEffect, SummaryRequest};
use crate::shared::models::{InvokeKind, MethodRef, TypeRef};
use rustc_hash::FxHashSet;

/// Reflective instantiation: `newInstance("A")` behaves like `new A()`
///
/// The class name is the first non-receiver argument. A name that is not a
/// string constant, or that names no declared type, yields the unknown object.
#[derive(Debug, Clone, Default)]
pub struct ReflectiveNewInstance {
    methods: FxHashSet<String>,
}

impl ReflectiveNewInstance {
    /// `methods` are qualified `Type.selector` names
    pub fn new(methods: impl IntoIterator<Item = String>) -> Self {
        Self {
            methods: methods.into_iter().collect(),
        }
    }
}

impl CallSummary for ReflectiveNewInstance {
    fn applies_to(&self, target: &MethodRef) -> bool {
        self.methods.contains(&target.to_string())
    }

    fn summarize(&self, request: &SummaryRequest<'_>) -> Option<SummaryEffect> {
        let index = match request.kind {
            InvokeKind::Static => 0,
            InvokeKind::Special | InvokeKind::Virtual | InvokeKind::Closure => 1,
        };
        let effect = request
            .args
            .get(index)
            .and_then(|value| request.caller.constant_string(*value))
            .map(TypeRef::new)
            .filter(|ty| request.hierarchy.is_declared(ty))
            .map(|ty| SummaryEffect::Allocate { ty })
            .unwrap_or(SummaryEffect::ReturnUnknown);
        Some(effect)
    }
}
