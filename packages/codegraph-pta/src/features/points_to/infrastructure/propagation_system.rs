//! Constraint graph and points-to state
//!
//! Holds, per location: its points-to set, the part of it already pushed
//! along outgoing edges (difference propagation), outgoing flow edges and
//! standing dependencies. Edges and dependencies are deduplicated, so
//! re-adding the constraints of a node changes nothing.

use super::heap_model::HeapModel;
use super::sparse_bitmap::SparseBitmap;
use crate::config::WorklistOrder;
use crate::features::points_to::domain::{
    Dependency, FlowEdge, InstanceId, InstanceKey, LocationId,
};
use crate::shared::models::TypeRef;
use crate::shared::ports::{ClassHierarchy, ROOT_TYPE};
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// Whether objects named by `key` may pass a cast to `filter`
pub fn passes_filter(key: &InstanceKey, filter: &TypeRef, hierarchy: &dyn ClassHierarchy) -> bool {
    match key {
        InstanceKey::Unknown => true,
        InstanceKey::Closure { .. } => *filter == TypeRef::function() || filter.name() == ROOT_TYPE,
        _ => key
            .concrete_type()
            .map_or(true, |ty| hierarchy.is_subtype(ty, filter)),
    }
}

#[derive(Debug)]
pub struct PropagationSystem {
    points_to: Vec<SparseBitmap>,
    propagated: Vec<SparseBitmap>,
    successors: Vec<Vec<(LocationId, Option<TypeRef>)>>,
    edge_set: FxHashSet<FlowEdge>,
    dependencies: Vec<Vec<Dependency>>,
    dependency_set: FxHashSet<(LocationId, Dependency)>,
    worklist: VecDeque<LocationId>,
    queued: Vec<bool>,
    order: WorklistOrder,
    propagations: usize,
}

impl PropagationSystem {
    pub fn new(order: WorklistOrder) -> Self {
        Self {
            points_to: Vec::new(),
            propagated: Vec::new(),
            successors: Vec::new(),
            edge_set: FxHashSet::default(),
            dependencies: Vec::new(),
            dependency_set: FxHashSet::default(),
            worklist: VecDeque::new(),
            queued: Vec::new(),
            order,
            propagations: 0,
        }
    }

    fn ensure(&mut self, location: LocationId) {
        let needed = location.index() + 1;
        if self.points_to.len() < needed {
            self.points_to.resize_with(needed, SparseBitmap::new);
            self.propagated.resize_with(needed, SparseBitmap::new);
            self.successors.resize_with(needed, Vec::new);
            self.dependencies.resize_with(needed, Vec::new);
            self.queued.resize(needed, false);
        }
    }

    fn mark_dirty(&mut self, location: LocationId) {
        if !self.queued[location.index()] {
            self.queued[location.index()] = true;
            self.worklist.push_back(location);
        }
    }

    fn insert(&mut self, location: LocationId, instance: InstanceId) -> bool {
        self.ensure(location);
        let added = self.points_to[location.index()].insert(instance);
        if added {
            self.propagations += 1;
            self.mark_dirty(location);
        }
        added
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Constraint insertion
    // ═══════════════════════════════════════════════════════════════════════

    /// Add `instance` to the points-to set of `location`
    pub fn add_seed(&mut self, location: LocationId, instance: InstanceId) -> bool {
        self.insert(location, instance)
    }

    /// Add a flow edge, replaying the source's current set across it.
    /// Returns false if the edge already existed.
    pub fn add_edge(
        &mut self,
        edge: FlowEdge,
        heap: &HeapModel,
        hierarchy: &dyn ClassHierarchy,
    ) -> bool {
        if edge.src == edge.dst && edge.filter.is_none() {
            return false;
        }
        if !self.edge_set.insert(edge.clone()) {
            return false;
        }
        self.ensure(edge.src);
        self.ensure(edge.dst);
        self.successors[edge.src.index()].push((edge.dst, edge.filter.clone()));
        let current = self.points_to[edge.src.index()].to_vec();
        self.push_objects(&current, edge.dst, edge.filter.as_ref(), heap, hierarchy);
        true
    }

    /// Register a standing dependency on `base`. Returns the objects it must
    /// be applied to right away, or `None` if it was already registered.
    pub fn add_dependency(
        &mut self,
        base: LocationId,
        dependency: Dependency,
    ) -> Option<Vec<InstanceId>> {
        if !self.dependency_set.insert((base, dependency.clone())) {
            return None;
        }
        self.ensure(base);
        self.dependencies[base.index()].push(dependency);
        Some(self.points_to[base.index()].to_vec())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Propagation
    // ═══════════════════════════════════════════════════════════════════════

    pub fn pop_dirty(&mut self) -> Option<LocationId> {
        let next = match self.order {
            WorklistOrder::Fifo => self.worklist.pop_front(),
            WorklistOrder::Lifo => self.worklist.pop_back(),
        }?;
        self.queued[next.index()] = false;
        Some(next)
    }

    #[inline]
    pub fn has_dirty(&self) -> bool {
        !self.worklist.is_empty()
    }

    /// Objects of `location` not yet pushed along its edges; marks them pushed
    pub fn take_delta(&mut self, location: LocationId) -> Vec<InstanceId> {
        self.ensure(location);
        let index = location.index();
        let delta = self.points_to[index].difference(&self.propagated[index]);
        self.propagated[index].union_with(&delta);
        delta.to_vec()
    }

    fn push_objects(
        &mut self,
        objects: &[InstanceId],
        dst: LocationId,
        filter: Option<&TypeRef>,
        heap: &HeapModel,
        hierarchy: &dyn ClassHierarchy,
    ) {
        for &object in objects {
            let admitted = match (filter, heap.get(object)) {
                (None, _) => true,
                (Some(filter), Some(key)) => passes_filter(key, filter, hierarchy),
                (Some(_), None) => false,
            };
            if admitted {
                self.insert(dst, object);
            }
        }
    }

    /// Push `delta` along every flow edge leaving `location`
    pub fn propagate_delta(
        &mut self,
        location: LocationId,
        delta: &[InstanceId],
        heap: &HeapModel,
        hierarchy: &dyn ClassHierarchy,
    ) {
        let successors = self.successors[location.index()].clone();
        for (dst, filter) in successors {
            self.push_objects(delta, dst, filter.as_ref(), heap, hierarchy);
        }
    }

    pub fn dependencies_of(&self, location: LocationId) -> &[Dependency] {
        self.dependencies
            .get(location.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    pub fn points_to(&self, location: LocationId) -> Option<&SparseBitmap> {
        self.points_to.get(location.index())
    }

    #[inline]
    pub fn flow_edge_count(&self) -> usize {
        self.edge_set.len()
    }

    #[inline]
    pub fn dependency_count(&self) -> usize {
        self.dependency_set.len()
    }

    /// Number of (location, object) facts added so far
    #[inline]
    pub fn propagations(&self) -> usize {
        self.propagations
    }

    pub fn into_points_to(self) -> Vec<SparseBitmap> {
        self.points_to
    }
}
