//! On-the-fly call graph and points-to fixpoint
//!
//! Single worklist loop over two kinds of work:
//! 1. **Expand**: a newly created call-graph node gets its constraints
//!    generated and installed (seeds, flow edges, dependencies, direct calls)
//! 2. **Propagate**: a dirty location pushes its delta along flow edges and
//!    applies every standing dependency to the new objects
//!
//! Applying a dispatch dependency may create callee nodes, which are queued
//! for expansion. Nothing recurses; cancellation and budgets are checked
//! once per work item.

use super::constraint_generator::{ConstraintGenerator, GeneratorTables};
use super::heap_model::HeapModel;
use super::location_table::LocationTable;
use super::propagation_system::PropagationSystem;
use super::sparse_bitmap::SparseBitmap;
use crate::config::{EntrySeeding, PtaConfig};
use crate::errors::{PtaError, Result};
use crate::features::call_graph::domain::{CallGraph, CallSiteRef, MethodKey, NodeId};
use crate::features::points_to::domain::{
    CallSiteRecord, CallTarget, Context, Dependency, FlowEdge, InstanceId, InstanceKey,
    LocationId, NodeConstraints, PointerKey, SiteKind,
};
use crate::features::points_to::ports::{
    CallSummary, CancellationToken, ContextRequest, ContextSelector, ObjectMergePolicy,
};
use crate::shared::models::{FieldRef, InvokeKind, ProcedureId, Program, ValueId};
use crate::shared::ports::{is_primitive, ClassHierarchy};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

/// Why a run stopped before the fixpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteReason {
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Fixpoint reached
    Complete,
    /// Stopped early; facts so far are consistent but not closed
    Incomplete(IncompleteReason),
}

impl AnalysisStatus {
    #[inline]
    pub fn is_complete(self) -> bool {
        matches!(self, AnalysisStatus::Complete)
    }
}

/// Solver statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStats {
    /// Work items processed (expansions plus location visits)
    pub iterations: usize,
    /// (location, object) facts added
    pub propagations: usize,
    pub nodes: usize,
    pub edges: usize,
    pub locations: usize,
    pub instances: usize,
    pub flow_edges: usize,
    pub dependencies: usize,
    pub nodes_expanded: usize,
    pub soft_cache_flushes: usize,
    pub duration_ms: u64,
}

/// Everything a finished (or cancelled) run leaves behind
#[derive(Debug)]
pub struct SolverOutput {
    pub call_graph: CallGraph,
    pub locations: LocationTable,
    pub heap: HeapModel,
    pub points_to: Vec<SparseBitmap>,
    pub stats: SolverStats,
}

pub struct Solver<'a> {
    program: &'a Program,
    hierarchy: &'a dyn ClassHierarchy,
    selector: &'a dyn ContextSelector,
    summaries: &'a [Box<dyn CallSummary>],
    config: &'a PtaConfig,
    cancellation: CancellationToken,

    call_graph: CallGraph,
    locations: LocationTable,
    heap: HeapModel,
    system: PropagationSystem,

    expanded: FxHashSet<NodeId>,
    pending: VecDeque<NodeId>,
    unknown_location: LocationId,
    seeded: bool,
    work_items: usize,
    stats: SolverStats,
}

impl<'a> Solver<'a> {
    pub fn new(
        program: &'a Program,
        hierarchy: &'a dyn ClassHierarchy,
        selector: &'a dyn ContextSelector,
        summaries: &'a [Box<dyn CallSummary>],
        merge_policy: Box<dyn ObjectMergePolicy>,
        config: &'a PtaConfig,
        cancellation: CancellationToken,
    ) -> Self {
        let call_graph = CallGraph::new();
        let mut locations = LocationTable::new();
        let (unknown_location, _) = locations.location_for(PointerKey::Unknown, &call_graph);
        let mut system = PropagationSystem::new(config.worklist_order);
        system.add_seed(unknown_location, InstanceId::UNKNOWN);

        Self {
            program,
            hierarchy,
            selector,
            summaries,
            config,
            cancellation,
            call_graph,
            locations,
            heap: HeapModel::new(merge_policy, config.heap_context_depth),
            system,
            expanded: FxHashSet::default(),
            pending: VecDeque::new(),
            unknown_location,
            seeded: false,
            work_items: 0,
            stats: SolverStats::default(),
        }
    }

    /// Run to fixpoint, cancellation or budget exhaustion.
    ///
    /// Calling again after completion is a no-op; calling again after
    /// cancellation resumes where the previous run stopped.
    pub fn solve(&mut self) -> Result<AnalysisStatus> {
        let started = Instant::now();
        if !self.seeded {
            self.seed_entry_points()?;
            self.seeded = true;
        }

        loop {
            if self.cancellation.is_cancelled() {
                self.record_stats(started);
                warn!(
                    iterations = self.stats.iterations,
                    nodes = self.stats.nodes,
                    "points-to solve cancelled"
                );
                return Ok(AnalysisStatus::Incomplete(IncompleteReason::Cancelled));
            }
            self.check_budgets()?;

            if let Some(node) = self.pending.pop_front() {
                self.expand(node);
            } else if let Some(location) = self.system.pop_dirty() {
                self.visit(location);
            } else {
                break;
            }

            self.stats.iterations += 1;
            self.work_items += 1;
            if let Some(interval) = self.config.soft_cache_flush_interval {
                if self.work_items % interval == 0 {
                    self.heap.discard_soft_caches();
                    self.stats.soft_cache_flushes += 1;
                }
            }
        }

        self.check_budgets()?;
        self.record_stats(started);
        info!(
            iterations = self.stats.iterations,
            nodes = self.stats.nodes,
            edges = self.stats.edges,
            locations = self.stats.locations,
            instances = self.stats.instances,
            flow_edges = self.stats.flow_edges,
            duration_ms = self.stats.duration_ms,
            "points-to fixpoint reached"
        );
        Ok(AnalysisStatus::Complete)
    }

    fn check_budgets(&self) -> Result<()> {
        if let Some(limit) = self.config.max_nodes {
            if self.call_graph.node_count() > limit {
                return Err(PtaError::BudgetExceeded {
                    resource: "call graph nodes",
                    limit,
                });
            }
        }
        if let Some(limit) = self.config.max_instances {
            if self.heap.len() > limit {
                return Err(PtaError::BudgetExceeded {
                    resource: "abstract objects",
                    limit,
                });
            }
        }
        Ok(())
    }

    fn record_stats(&mut self, started: Instant) {
        let stats = &mut self.stats;
        stats.propagations = self.system.propagations();
        stats.nodes = self.call_graph.node_count();
        stats.edges = self.call_graph.edge_count();
        stats.locations = self.locations.len();
        stats.instances = self.heap.len();
        stats.flow_edges = self.system.flow_edge_count();
        stats.dependencies = self.system.dependency_count();
        stats.duration_ms += started.elapsed().as_millis() as u64;
    }

    #[inline]
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    #[inline]
    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn into_output(self) -> SolverOutput {
        SolverOutput {
            call_graph: self.call_graph,
            locations: self.locations,
            heap: self.heap,
            points_to: self.system.into_points_to(),
            stats: self.stats,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Seeding
    // ═══════════════════════════════════════════════════════════════════════

    /// The fake root calls every entry point; their parameters receive either
    /// a synthetic object of the declared type or the unknown object
    fn seed_entry_points(&mut self) -> Result<()> {
        let program = self.program;
        let root = self.call_graph.fake_root().clone();

        for (index, &entry) in program.entry_points.iter().enumerate() {
            let procedure = program
                .procedure(entry)
                .ok_or_else(|| PtaError::UnknownEntryPoint(entry.to_string()))?;
            let site = index as u32;
            let context = self.selector.select_context(
                Context::empty(),
                &ContextRequest {
                    caller: &root,
                    site: CallSiteRef::new(MethodKey::FakeRoot, site),
                    callee: procedure,
                    receiver: None,
                    constant_args: &[],
                },
            );
            let node = self.node_for(entry, context);
            self.call_graph.add_edge(NodeId::FAKE_ROOT, site, node);

            for (position, (&param, declared)) in procedure
                .params
                .iter()
                .zip(&procedure.param_types)
                .enumerate()
            {
                let instance = match (self.config.entry_seeding, declared) {
                    (_, Some(ty)) if is_primitive(ty) => continue,
                    (EntrySeeding::DeclaredTypes, Some(ty)) if self.hierarchy.is_declared(ty) => {
                        self.heap.synthetic_allocation(
                            &root,
                            SiteKind::EntryParam {
                                entry: site,
                                param: position as u32,
                            },
                            ty,
                            self.hierarchy,
                        )
                    }
                    _ => InstanceId::UNKNOWN,
                };
                let location = self.local(node, param);
                self.system.add_seed(location, instance);
            }
            debug!(entry = %procedure.name(), node = %node, "seeded entry point");
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Locations
    // ═══════════════════════════════════════════════════════════════════════

    fn location(&mut self, key: PointerKey) -> (LocationId, bool) {
        self.locations.location_for(key, &self.call_graph)
    }

    #[inline]
    fn local(&mut self, node: NodeId, value: ValueId) -> LocationId {
        self.location(PointerKey::Local { node, value }).0
    }

    /// Field or array slot of `object`. Slots of the unknown object start out
    /// holding the unknown object.
    fn heap_location(&mut self, key: PointerKey) -> LocationId {
        let from_unknown = key.owner_object() == Some(InstanceId::UNKNOWN);
        let (location, created) = self.location(key);
        if created && from_unknown {
            self.system.add_seed(location, InstanceId::UNKNOWN);
        }
        location
    }

    fn field_location(&mut self, object: InstanceId, field: &FieldRef) -> LocationId {
        self.heap_location(PointerKey::InstanceField {
            object,
            field: field.clone(),
        })
    }

    /// Array contents, if `object` can be an array
    fn array_location(&mut self, object: InstanceId) -> Option<LocationId> {
        let admits = match self.heap.get(object)? {
            InstanceKey::Unknown => true,
            key => key.concrete_type().map_or(false, |ty| ty.is_array()),
        };
        admits.then(|| self.heap_location(PointerKey::ArrayContents { object }))
    }

    fn flow(&mut self, src: LocationId, dst: LocationId) {
        self.system
            .add_edge(FlowEdge::copy(src, dst), &self.heap, self.hierarchy);
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Work items
    // ═══════════════════════════════════════════════════════════════════════

    fn node_for(&mut self, procedure: ProcedureId, context: Context) -> NodeId {
        let (node, created) = self
            .call_graph
            .get_or_create_node(MethodKey::Procedure(procedure), context);
        if created {
            trace!(node = %node, "new call graph node");
            self.pending.push_back(node);
        }
        node
    }

    fn expand(&mut self, node_id: NodeId) {
        if !self.expanded.insert(node_id) {
            return;
        }
        let node = match self.call_graph.node(node_id) {
            Some(node) => node.clone(),
            None => return,
        };
        let generator = ConstraintGenerator::new(self.program, self.hierarchy, self.summaries);
        let constraints = {
            let mut tables = GeneratorTables {
                locations: &mut self.locations,
                heap: &mut self.heap,
                call_graph: &self.call_graph,
            };
            generator.generate(&node, &mut tables)
        };
        debug!(node = %node, constraints = constraints.len(), "expanded node");
        self.stats.nodes_expanded += 1;
        self.install(constraints);
    }

    fn install(&mut self, constraints: NodeConstraints) {
        for seed in constraints.seeds {
            self.system.add_seed(seed.location, seed.instance);
        }
        for edge in constraints.edges {
            self.system.add_edge(edge, &self.heap, self.hierarchy);
        }
        for (base, dependency) in constraints.dependencies {
            if let Some(current) = self.system.add_dependency(base, dependency.clone()) {
                for object in current {
                    self.apply(&dependency, object);
                }
            }
        }
        for call in constraints.calls {
            match call.target {
                CallTarget::Procedure(procedure) => self.connect(&call.record, procedure, None),
                CallTarget::Unknown => self.connect_unknown(&call.record),
            }
        }
    }

    fn visit(&mut self, location: LocationId) {
        let delta = self.system.take_delta(location);
        if delta.is_empty() {
            return;
        }
        self.system
            .propagate_delta(location, &delta, &self.heap, self.hierarchy);
        let dependencies = self.system.dependencies_of(location).to_vec();
        for dependency in &dependencies {
            for &object in &delta {
                self.apply(dependency, object);
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Dependencies
    // ═══════════════════════════════════════════════════════════════════════

    fn apply(&mut self, dependency: &Dependency, object: InstanceId) {
        match dependency {
            Dependency::FieldLoad { field, def } => {
                let src = self.field_location(object, field);
                self.flow(src, *def);
            }
            Dependency::FieldStore { field, value } => {
                let dst = self.field_location(object, field);
                self.flow(*value, dst);
            }
            Dependency::ArrayLoad { def } => {
                if let Some(src) = self.array_location(object) {
                    self.flow(src, *def);
                }
            }
            Dependency::ArrayStore { value } => {
                if let Some(dst) = self.array_location(object) {
                    self.flow(*value, dst);
                }
            }
            Dependency::Dispatch(record) => self.dispatch(record, object),
        }
    }

    fn dispatch(&mut self, record: &CallSiteRecord, object: InstanceId) {
        let key = match self.heap.get(object) {
            Some(key) => key.clone(),
            None => return,
        };
        if key.is_unknown() {
            self.connect_unknown(record);
            return;
        }

        // Receivers incompatible with the declared target type never reach it
        let declaring = &record.target.declaring;
        if record.kind != InvokeKind::Closure && self.hierarchy.is_declared(declaring) {
            if let Some(ty) = key.concrete_type() {
                if !self.hierarchy.is_subtype(ty, declaring) {
                    return;
                }
            }
        }

        match record.kind {
            InvokeKind::Virtual => {
                let target = key
                    .concrete_type()
                    .and_then(|ty| self.hierarchy.resolve_method(ty, &record.target.selector));
                match target {
                    Some(procedure) => self.connect(record, procedure, Some(object)),
                    None => trace!(receiver = %key, target = %record.target, "no matching method"),
                }
            }
            InvokeKind::Special => match self.hierarchy.resolve_static(&record.target) {
                Some(procedure) => self.connect(record, procedure, Some(object)),
                None => self.connect_unknown(record),
            },
            InvokeKind::Closure => match key {
                InstanceKey::Closure { procedure, .. } => {
                    self.connect(record, procedure, Some(object))
                }
                _ => trace!(callee = %key, "call through a non-function value"),
            },
            InvokeKind::Static => {}
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Calls
    // ═══════════════════════════════════════════════════════════════════════

    /// Connect `record` to `procedure`, binding arguments and results.
    /// `receiver` is the single object the call was dispatched on.
    fn connect(
        &mut self,
        record: &CallSiteRecord,
        procedure: ProcedureId,
        receiver: Option<InstanceId>,
    ) {
        let program = self.program;
        let callee = match program.procedure(procedure) {
            Some(callee) => callee,
            None => {
                self.connect_unknown(record);
                return;
            }
        };
        let caller = match self.call_graph.node(record.caller) {
            Some(caller) => caller.clone(),
            None => return,
        };
        let receiver_key = receiver.and_then(|id| self.heap.get(id)).cloned();
        let context = self.selector.select_context(
            Context::empty(),
            &ContextRequest {
                caller: &caller,
                site: CallSiteRef::new(caller.method, record.site),
                callee,
                receiver: receiver_key.as_ref(),
                constant_args: &record.constant_args,
            },
        );
        let node = self.node_for(procedure, context);
        if self.call_graph.add_edge(record.caller, record.site, node) {
            trace!(caller = %record.caller, site = record.site, callee = %node, "call edge");
        }

        let mut actuals = record.args.iter().copied();
        let mut formals = callee.params.iter().copied();
        match (record.kind, receiver) {
            // the function value itself is not a parameter
            (InvokeKind::Closure, _) => {
                actuals.next();
            }
            (_, Some(object)) if callee.has_receiver() => {
                actuals.next();
                if let Some(this) = formals.next() {
                    let this = self.local(node, this);
                    self.system.add_seed(this, object);
                }
            }
            _ => {}
        }
        for (actual, formal) in actuals.zip(formals) {
            let formal = self.local(node, formal);
            self.flow(actual, formal);
        }

        if let Some(def) = record.def {
            let (ret, _) = self.location(PointerKey::Return { node });
            self.flow(ret, def);
        }
        if let Some(exception) = record.exception {
            let (exc, _) = self.location(PointerKey::ExceptionalReturn { node });
            self.flow(exc, exception);
        }
    }

    /// Route an unresolvable call to the unknown node: arguments escape into
    /// the unknown location and results may be anything
    fn connect_unknown(&mut self, record: &CallSiteRecord) {
        if self.call_graph.add_edge(record.caller, record.site, NodeId::UNKNOWN) {
            debug!(caller = %record.caller, target = %record.target, "call routed to unknown");
        }
        for &arg in &record.args {
            self.flow(arg, self.unknown_location);
        }
        for result in [record.def, record.exception].into_iter().flatten() {
            self.system.add_seed(result, InstanceId::UNKNOWN);
        }
    }
}
