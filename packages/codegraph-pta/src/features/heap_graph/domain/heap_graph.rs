//! Heap graph view
//!
//! Bipartite graph over abstract locations and abstract objects, built from
//! a solved [`PointerAnalysis`]:
//! - location → object iff the object is in the location's points-to set
//! - object → location iff the location is a field or array slot of the object
//!
//! The view is a snapshot; nothing in it feeds back into propagation.

use crate::features::points_to::application::PointerAnalysis;
use crate::features::points_to::domain::{InstanceId, LocationId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HeapNode {
    Location(LocationId),
    Object(InstanceId),
}

#[derive(Debug, Clone, Default)]
pub struct HeapGraph {
    graph: DiGraph<HeapNode, ()>,
    index: FxHashMap<HeapNode, NodeIndex>,
}

impl HeapGraph {
    /// Snapshot the heap of `analysis`
    pub fn from_analysis(analysis: &PointerAnalysis) -> Self {
        let mut heap = Self::default();
        for (object, _) in analysis.instances() {
            heap.node_index(HeapNode::Object(object));
        }
        for (location, key) in analysis.locations() {
            let from = heap.node_index(HeapNode::Location(location));
            if let Some(owner) = key.owner_object() {
                let owner = heap.node_index(HeapNode::Object(owner));
                heap.graph.add_edge(owner, from, ());
            }
            for object in analysis.points_to(location) {
                let to = heap.node_index(HeapNode::Object(object));
                heap.graph.add_edge(from, to, ());
            }
        }
        heap
    }

    fn node_index(&mut self, node: HeapNode) -> NodeIndex {
        if let Some(&index) = self.index.get(&node) {
            return index;
        }
        let index = self.graph.add_node(node);
        self.index.insert(node, index);
        index
    }

    fn neighbors(&self, node: HeapNode) -> impl Iterator<Item = HeapNode> + '_ {
        self.index
            .get(&node)
            .into_iter()
            .flat_map(move |&index| self.graph.neighbors_directed(index, Direction::Outgoing))
            .filter_map(move |neighbor| self.graph.node_weight(neighbor).copied())
    }

    /// Objects `location` may point to, sorted
    pub fn points_to(&self, location: LocationId) -> Vec<InstanceId> {
        let mut objects: Vec<InstanceId> = self
            .neighbors(HeapNode::Location(location))
            .filter_map(|node| match node {
                HeapNode::Object(object) => Some(object),
                HeapNode::Location(_) => None,
            })
            .collect();
        objects.sort_unstable();
        objects
    }

    /// Field and array-contents locations of `object`, sorted
    pub fn fields_of(&self, object: InstanceId) -> Vec<LocationId> {
        let mut fields: Vec<LocationId> = self
            .neighbors(HeapNode::Object(object))
            .filter_map(|node| match node {
                HeapNode::Location(location) => Some(location),
                HeapNode::Object(_) => None,
            })
            .collect();
        fields.sort_unstable();
        fields
    }

    /// Every object reachable from `roots` through points-to and field edges
    pub fn reachable_objects(&self, roots: &[LocationId]) -> Vec<InstanceId> {
        let mut dfs = Dfs::empty(&self.graph);
        let mut reached = Vec::new();
        for root in roots {
            let Some(&start) = self.index.get(&HeapNode::Location(*root)) else {
                continue;
            };
            dfs.move_to(start);
            while let Some(index) = dfs.next(&self.graph) {
                if let Some(HeapNode::Object(object)) = self.graph.node_weight(index) {
                    reached.push(*object);
                }
            }
        }
        reached.sort_unstable();
        reached
    }

    #[inline]
    pub fn contains(&self, node: HeapNode) -> bool {
        self.index.contains_key(&node)
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
