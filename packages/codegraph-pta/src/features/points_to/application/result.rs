//! Solved pointer analysis
//!
//! Read-only fact base over the call graph and points-to sets of a finished
//! (or cancelled) run. Ids are only meaningful within one run; the
//! `*_name` helpers give names that are stable across runs and worklist
//! orders.

use crate::features::call_graph::domain::{CallGraph, MethodKey, NodeId};
use crate::features::call_graph::ports::CallGraphProvider;
use crate::features::points_to::domain::{InstanceId, InstanceKey, LocationId, PointerKey};
use crate::features::points_to::infrastructure::{
    AnalysisStatus, HeapModel, LocationTable, SolverOutput, SolverStats, SparseBitmap,
};
use crate::shared::models::{ProcedureId, Program, ValueId};
use crate::shared::ports::ClassHierarchy;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

pub struct PointerAnalysis {
    program: Arc<Program>,
    hierarchy: Box<dyn ClassHierarchy>,
    call_graph: CallGraph,
    locations: LocationTable,
    heap: HeapModel,
    points_to: Vec<SparseBitmap>,
    status: AnalysisStatus,
    stats: SolverStats,
}

impl fmt::Debug for PointerAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointerAnalysis")
            .field("status", &self.status)
            .field("nodes", &self.call_graph.node_count())
            .field("locations", &self.locations.len())
            .field("instances", &self.heap.len())
            .finish()
    }
}

impl PointerAnalysis {
    pub(crate) fn new(
        program: Arc<Program>,
        hierarchy: Box<dyn ClassHierarchy>,
        output: SolverOutput,
        status: AnalysisStatus,
    ) -> Self {
        Self {
            program,
            hierarchy,
            call_graph: output.call_graph,
            locations: output.locations,
            heap: output.heap,
            points_to: output.points_to,
            status,
            stats: output.stats,
        }
    }

    #[inline]
    pub fn program(&self) -> &Program {
        &self.program
    }

    #[inline]
    pub fn hierarchy(&self) -> &dyn ClassHierarchy {
        self.hierarchy.as_ref()
    }

    #[inline]
    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    #[inline]
    pub fn status(&self) -> AnalysisStatus {
        self.status
    }

    /// Whether the run reached its fixpoint
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }

    #[inline]
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Locations and objects
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    #[inline]
    pub fn instance_count(&self) -> usize {
        self.heap.len()
    }

    /// Look a location up without creating it
    #[inline]
    pub fn find_location(&self, key: &PointerKey) -> Option<LocationId> {
        self.locations.find(key)
    }

    #[inline]
    pub fn location(&self, id: LocationId) -> Option<&PointerKey> {
        self.locations.get(id)
    }

    #[inline]
    pub fn instance(&self, id: InstanceId) -> Option<&InstanceKey> {
        self.heap.get(id)
    }

    pub fn find_instance(&self, key: &InstanceKey) -> Option<InstanceId> {
        self.heap.find(key)
    }

    pub fn locations(&self) -> impl Iterator<Item = (LocationId, &PointerKey)> + '_ {
        self.locations.iter()
    }

    pub fn instances(&self) -> impl Iterator<Item = (InstanceId, &InstanceKey)> + '_ {
        self.heap.iter()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Points-to queries
    // ═══════════════════════════════════════════════════════════════════════

    /// Points-to set of `location`, sorted
    pub fn points_to(&self, location: LocationId) -> Vec<InstanceId> {
        self.points_to
            .get(location.index())
            .map(SparseBitmap::to_vec)
            .unwrap_or_default()
    }

    pub fn points_to_key(&self, key: &PointerKey) -> Vec<InstanceId> {
        self.find_location(key)
            .map(|location| self.points_to(location))
            .unwrap_or_default()
    }

    /// Points-to set of SSA `value` in one node
    pub fn local_points_to(&self, node: NodeId, value: ValueId) -> Vec<InstanceId> {
        self.points_to_key(&PointerKey::Local { node, value })
    }

    /// Union over every context of `procedure`
    pub fn points_to_value(&self, procedure: ProcedureId, value: ValueId) -> Vec<InstanceId> {
        let union: BTreeSet<InstanceId> = self
            .call_graph
            .nodes_for(procedure)
            .into_iter()
            .flat_map(|node| self.local_points_to(node, value))
            .collect();
        union.into_iter().collect()
    }

    /// Whether two locations may hold the same object
    pub fn may_alias(&self, a: LocationId, b: LocationId) -> bool {
        match (self.points_to.get(a.index()), self.points_to.get(b.index())) {
            (Some(a), Some(b)) => a.iter().any(|object| b.contains(object)),
            _ => false,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Stable names
    // ═══════════════════════════════════════════════════════════════════════

    pub fn method_name(&self, method: MethodKey) -> String {
        match method.procedure().and_then(|id| self.program.procedure(id)) {
            Some(procedure) => procedure.name(),
            None => method.to_string(),
        }
    }

    /// `Type.selector[context]`
    pub fn node_name(&self, node: NodeId) -> String {
        match self.call_graph.node(node) {
            Some(node) => format!("{}{}", self.method_name(node.method), node.context),
            None => node.to_string(),
        }
    }

    pub fn instance_name(&self, instance: InstanceId) -> String {
        match self.heap.get(instance) {
            Some(key) => key.to_string(),
            None => instance.to_string(),
        }
    }

    pub fn location_name(&self, location: LocationId) -> String {
        let key = match self.locations.get(location) {
            Some(key) => key,
            None => return location.to_string(),
        };
        match key {
            PointerKey::Local { node, value } => format!("{}:{}", self.node_name(*node), value),
            PointerKey::Return { node } => format!("{}:ret", self.node_name(*node)),
            PointerKey::ExceptionalReturn { node } => format!("{}:exc", self.node_name(*node)),
            PointerKey::InstanceField { object, field } => {
                format!("{}.{}", self.instance_name(*object), field)
            }
            PointerKey::ArrayContents { object } => format!("{}[*]", self.instance_name(*object)),
            PointerKey::StaticField { .. } | PointerKey::Lexical { .. } | PointerKey::Unknown => {
                key.to_string()
            }
        }
    }

    /// Qualified name of the procedure behind `node`; None for synthetic nodes
    fn procedure_name(&self, node: NodeId) -> Option<String> {
        self.call_graph
            .node(node)
            .and_then(|node| node.procedure())
            .and_then(|id| self.program.procedure(id))
            .map(|procedure| procedure.name())
    }
}

impl CallGraphProvider for PointerAnalysis {
    fn get_callees(&self, func_name: &str) -> Vec<String> {
        let callees: BTreeSet<String> = self
            .call_graph
            .nodes()
            .filter(|node| self.procedure_name(node.id).as_deref() == Some(func_name))
            .flat_map(|node| self.call_graph.successors(node.id))
            .filter_map(|callee| self.procedure_name(callee))
            .collect();
        callees.into_iter().collect()
    }

    fn get_functions(&self) -> Vec<String> {
        let functions: BTreeSet<String> = self
            .call_graph
            .nodes()
            .filter_map(|node| self.procedure_name(node.id))
            .collect();
        functions.into_iter().collect()
    }

    fn get_callers(&self, func_name: &str) -> Vec<String> {
        let callers: BTreeSet<String> = self
            .call_graph
            .nodes()
            .filter(|node| self.procedure_name(node.id).as_deref() == Some(func_name))
            .flat_map(|node| self.call_graph.predecessors(node.id))
            .filter_map(|caller| self.procedure_name(caller))
            .collect();
        callers.into_iter().collect()
    }
}
