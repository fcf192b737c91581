//! Abstract object factory
//!
//! Interns [`InstanceKey`]s and applies the configured merge policy when an
//! allocation is first seen. Objects are immutable once created; a later
//! change of mind by the policy never splits an existing object.

use crate::features::call_graph::domain::CGNode;
use crate::features::points_to::domain::{AllocSite, InstanceId, InstanceKey, SiteKind};
use crate::features::points_to::ports::{MergeDecision, MergeRequest, ObjectMergePolicy};
use crate::shared::models::{Instruction, Procedure, ProcedureId, TypeRef};
use crate::shared::ports::ClassHierarchy;
use rustc_hash::FxHashMap;

#[derive(Debug)]
pub struct HeapModel {
    keys: Vec<InstanceKey>,
    index: FxHashMap<InstanceKey, InstanceId>,
    policy: Box<dyn ObjectMergePolicy>,
    heap_context_depth: usize,
    /// Soft cache: per procedure, number of `new` sites per type
    alloc_counts: FxHashMap<ProcedureId, FxHashMap<TypeRef, usize>>,
}

impl HeapModel {
    pub fn new(policy: Box<dyn ObjectMergePolicy>, heap_context_depth: usize) -> Self {
        let mut heap = Self {
            keys: Vec::new(),
            index: FxHashMap::default(),
            policy,
            heap_context_depth,
            alloc_counts: FxHashMap::default(),
        };
        let unknown = heap.intern(InstanceKey::Unknown);
        debug_assert_eq!(unknown, InstanceId::UNKNOWN);
        heap
    }

    fn intern(&mut self, key: InstanceKey) -> InstanceId {
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let id = InstanceId::from_index(self.keys.len());
        self.keys.push(key.clone());
        self.index.insert(key, id);
        id
    }

    fn allocations_of_type(&mut self, procedure: &Procedure, ty: &TypeRef) -> usize {
        let counts = self.alloc_counts.entry(procedure.id).or_insert_with(|| {
            let mut counts: FxHashMap<TypeRef, usize> = FxHashMap::default();
            for instruction in &procedure.instructions {
                if let Instruction::New { ty, .. } = instruction {
                    *counts.entry(ty.clone()).or_default() += 1;
                }
            }
            counts
        });
        counts.get(ty).copied().unwrap_or(0)
    }

    fn keyed(
        &mut self,
        node: &CGNode,
        kind: SiteKind,
        ty: &TypeRef,
        allocations_of_type: usize,
        hierarchy: &dyn ClassHierarchy,
    ) -> InstanceId {
        let decision = self.policy.decide(&MergeRequest {
            ty,
            hierarchy,
            allocations_of_type,
        });
        let key = match decision {
            MergeDecision::PerType => InstanceKey::TypeMerged { ty: ty.clone() },
            MergeDecision::PerNode => InstanceKey::Smushed {
                ty: ty.clone(),
                method: node.method,
                heap_context: node.context.truncated(self.heap_context_depth),
            },
            MergeDecision::PerSite => InstanceKey::Allocation {
                ty: ty.clone(),
                site: AllocSite::new(node.method, kind),
                heap_context: node.context.truncated(self.heap_context_depth),
            },
        };
        self.intern(key)
    }

    /// Object for `new ty` at `site` of `node`
    pub fn allocation(
        &mut self,
        node: &CGNode,
        procedure: &Procedure,
        site: u32,
        ty: &TypeRef,
        hierarchy: &dyn ClassHierarchy,
    ) -> InstanceId {
        let count = self.allocations_of_type(procedure, ty);
        self.keyed(node, SiteKind::New(site), ty, count, hierarchy)
    }

    /// Object created outside a `new` instruction (reflection, natives,
    /// entry-point arguments)
    pub fn synthetic_allocation(
        &mut self,
        node: &CGNode,
        kind: SiteKind,
        ty: &TypeRef,
        hierarchy: &dyn ClassHierarchy,
    ) -> InstanceId {
        self.keyed(node, kind, ty, 1, hierarchy)
    }

    pub fn constant(&mut self, ty: &TypeRef, value: &str) -> InstanceId {
        let key = if self.policy.constant_specific() {
            InstanceKey::Constant {
                ty: ty.clone(),
                value: value.to_string(),
            }
        } else {
            InstanceKey::TypeMerged { ty: ty.clone() }
        };
        self.intern(key)
    }

    /// Function value; never merged
    pub fn closure(&mut self, node: &CGNode, procedure: ProcedureId, site: u32) -> InstanceId {
        let key = InstanceKey::Closure {
            procedure,
            site: AllocSite::new(node.method, SiteKind::New(site)),
            heap_context: node.context.truncated(self.heap_context_depth),
        };
        self.intern(key)
    }

    #[inline]
    pub fn get(&self, id: InstanceId) -> Option<&InstanceKey> {
        self.keys.get(id.index())
    }

    #[inline]
    pub fn find(&self, key: &InstanceKey) -> Option<InstanceId> {
        self.index.get(key).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &InstanceKey)> + '_ {
        self.keys
            .iter()
            .enumerate()
            .map(|(i, key)| (InstanceId::from_index(i), key))
    }

    /// Drop reconstructable caches; interned objects are kept
    pub fn discard_soft_caches(&mut self) {
        self.alloc_counts.clear();
    }

    #[inline]
    pub fn soft_cache_len(&self) -> usize {
        self.alloc_counts.len()
    }
}
