//! Incrementally discovered call graph
//!
//! Nodes are interned by (method, context) and never removed; edges are
//! (caller, site, callee) triples that only accumulate. Two synthetic nodes
//! exist from the start and are the designated entry nodes:
//! [`NodeId::FAKE_ROOT`], which calls every entry point, and
//! [`NodeId::UNKNOWN`], the target of calls that cannot be resolved. Every
//! other node is created as a call target and so is reachable from them.

use super::node::{CGNode, MethodKey, NodeId};
use crate::features::points_to::domain::Context;
use crate::shared::models::ProcedureId;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

/// Mutable call graph owned by the solver during a run
#[derive(Debug, Clone)]
pub struct CallGraph {
    nodes: Vec<CGNode>,
    index: FxHashMap<(MethodKey, Context), NodeId>,
    /// Per caller: site → callees
    out_edges: Vec<BTreeMap<u32, BTreeSet<NodeId>>>,
    in_edges: Vec<BTreeSet<NodeId>>,
    edge_count: usize,
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl CallGraph {
    /// Create a graph holding only the two synthetic nodes
    pub fn new() -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            index: FxHashMap::default(),
            out_edges: Vec::new(),
            in_edges: Vec::new(),
            edge_count: 0,
        };
        let (root, _) = graph.get_or_create_node(MethodKey::FakeRoot, Context::empty());
        let (unknown, _) = graph.get_or_create_node(MethodKey::Unknown, Context::empty());
        debug_assert_eq!(root, NodeId::FAKE_ROOT);
        debug_assert_eq!(unknown, NodeId::UNKNOWN);
        graph
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Mutation
    // ═══════════════════════════════════════════════════════════════════════

    /// Find or register the node for (method, context).
    ///
    /// Returns the node and whether it was just created. A new node has no
    /// constraints yet; the caller is responsible for scheduling it.
    pub fn get_or_create_node(&mut self, method: MethodKey, context: Context) -> (NodeId, bool) {
        if let Some(&id) = self.index.get(&(method, context.clone())) {
            return (id, false);
        }
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(CGNode {
            id,
            method,
            context: context.clone(),
        });
        self.out_edges.push(BTreeMap::new());
        self.in_edges.push(BTreeSet::new());
        self.index.insert((method, context), id);
        (id, true)
    }

    /// Record that `site` in `caller` may invoke `callee`. Idempotent.
    ///
    /// # Panics
    /// If either endpoint was never created with [`get_or_create_node`](Self::get_or_create_node).
    pub fn add_edge(&mut self, caller: NodeId, site: u32, callee: NodeId) -> bool {
        assert!(self.contains(caller), "call edge from unregistered node {}", caller);
        assert!(self.contains(callee), "call edge to unregistered node {}", callee);
        let added = self.out_edges[caller.index()]
            .entry(site)
            .or_default()
            .insert(callee);
        if added {
            self.in_edges[callee.index()].insert(caller);
            self.edge_count += 1;
        }
        added
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// The synthetic root node
    #[inline]
    pub fn fake_root(&self) -> &CGNode {
        &self.nodes[NodeId::FAKE_ROOT.index()]
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&CGNode> {
        self.nodes.get(id.index())
    }

    pub fn find_node(&self, method: MethodKey, context: &Context) -> Option<NodeId> {
        self.index.get(&(method, context.clone())).copied()
    }

    /// All nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &CGNode> + '_ {
        self.nodes.iter()
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Designated entry nodes; the unknown node exists before any call
    /// reaches it
    pub fn entry_nodes(&self) -> Vec<NodeId> {
        vec![NodeId::FAKE_ROOT, NodeId::UNKNOWN]
    }

    /// (site, callee) pairs leaving `node`, ordered by site then callee
    pub fn edges_from(&self, node: NodeId) -> Vec<(u32, NodeId)> {
        self.out_edges
            .get(node.index())
            .map(|sites| {
                sites
                    .iter()
                    .flat_map(|(site, callees)| callees.iter().map(move |callee| (*site, *callee)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Callees recorded at one call site
    pub fn targets_at(&self, node: NodeId, site: u32) -> Vec<NodeId> {
        self.out_edges
            .get(node.index())
            .and_then(|sites| sites.get(&site))
            .map(|callees| callees.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Distinct callees of `node` over all sites
    pub fn successors(&self, node: NodeId) -> Vec<NodeId> {
        let callees: BTreeSet<NodeId> = self
            .edges_from(node)
            .into_iter()
            .map(|(_, callee)| callee)
            .collect();
        callees.into_iter().collect()
    }

    /// Distinct callers of `node`
    pub fn predecessors(&self, node: NodeId) -> Vec<NodeId> {
        self.in_edges
            .get(node.index())
            .map(|callers| callers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every node analyzing `procedure`, one per context
    pub fn nodes_for(&self, procedure: ProcedureId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.procedure() == Some(procedure))
            .map(|node| node.id)
            .collect()
    }

    /// All (caller, site, callee) triples, ordered
    pub fn edges(&self) -> Vec<(NodeId, u32, NodeId)> {
        self.nodes
            .iter()
            .flat_map(|node| {
                self.edges_from(node.id)
                    .into_iter()
                    .map(move |(site, callee)| (node.id, site, callee))
            })
            .collect()
    }
}
