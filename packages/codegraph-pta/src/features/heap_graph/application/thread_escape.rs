//! Thread escape analysis
//!
//! An object escapes its creating thread if it is reachable in the heap
//! graph from a static field, or from the receiver of a constructor of a
//! thread type (the thread object itself and everything it references are
//! visible to the new thread).

use crate::features::heap_graph::domain::HeapGraph;
use crate::features::points_to::application::PointerAnalysis;
use crate::features::points_to::domain::{InstanceId, LocationId, PointerKey};
use crate::shared::models::TypeRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

pub const DEFAULT_THREAD_TYPE: &str = "Thread";
const CONSTRUCTOR_PREFIX: &str = "<init>";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscapeReport {
    /// Escaping objects, sorted
    pub objects: Vec<InstanceId>,
    /// Concrete types of the escaping objects
    pub types: BTreeSet<TypeRef>,
}

impl EscapeReport {
    #[inline]
    pub fn escapes(&self, object: InstanceId) -> bool {
        self.objects.binary_search(&object).is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct ThreadEscapeAnalysis {
    thread_type: TypeRef,
}

impl Default for ThreadEscapeAnalysis {
    fn default() -> Self {
        Self::new(DEFAULT_THREAD_TYPE)
    }
}

impl ThreadEscapeAnalysis {
    pub fn new(thread_type: impl Into<TypeRef>) -> Self {
        Self {
            thread_type: thread_type.into(),
        }
    }

    /// Locations whose contents are shared between threads
    pub fn roots(&self, analysis: &PointerAnalysis) -> Vec<LocationId> {
        let hierarchy = analysis.hierarchy();
        let mut roots: Vec<LocationId> = analysis
            .locations()
            .filter(|(_, key)| matches!(key, PointerKey::StaticField { .. }))
            .map(|(location, _)| location)
            .collect();

        for node in analysis.call_graph().nodes() {
            let procedure = match node.procedure().and_then(|id| analysis.program().procedure(id)) {
                Some(procedure) => procedure,
                None => continue,
            };
            if !procedure.selector.starts_with(CONSTRUCTOR_PREFIX)
                || !procedure.has_receiver()
                || !hierarchy.is_subtype(&procedure.declaring, &self.thread_type)
            {
                continue;
            }
            let receiver = PointerKey::Local {
                node: node.id,
                value: procedure.params[0],
            };
            if let Some(location) = analysis.find_location(&receiver) {
                roots.push(location);
            }
        }
        roots.sort_unstable();
        roots.dedup();
        roots
    }

    pub fn analyze(&self, analysis: &PointerAnalysis) -> EscapeReport {
        let heap = HeapGraph::from_analysis(analysis);
        let roots = self.roots(analysis);
        let objects = heap.reachable_objects(&roots);
        let types = objects
            .iter()
            .filter_map(|&object| analysis.instance(object))
            .filter_map(|key| key.concrete_type().cloned())
            .collect();
        debug!(roots = roots.len(), escaping = objects.len(), "thread escape analysis");
        EscapeReport { objects, types }
    }
}
