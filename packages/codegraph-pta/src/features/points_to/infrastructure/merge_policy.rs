//! Zero-one-X object merging
//!
//! Allocations are abstracted per site unless one of the smushing flags
//! applies. Strings, throwables and primitive holders become one object per
//! type; a type allocated too often in one procedure becomes one object per
//! allocating node.

use crate::config::MergeConfig;
use crate::features::points_to::ports::{MergeDecision, MergeRequest, ObjectMergePolicy};
use crate::shared::models::TypeRef;

#[derive(Debug, Clone)]
pub struct ZeroXMergePolicy {
    config: MergeConfig,
    throwable: TypeRef,
}

impl ZeroXMergePolicy {
    pub fn new(config: MergeConfig) -> Self {
        let throwable = TypeRef::new(config.throwable_type.clone());
        Self { config, throwable }
    }

    fn is_stringish(&self, ty: &TypeRef) -> bool {
        self.config.string_types.iter().any(|s| s == ty.name())
    }
}

impl ObjectMergePolicy for ZeroXMergePolicy {
    fn decide(&self, request: &MergeRequest<'_>) -> MergeDecision {
        let ty = request.ty;
        let config = &self.config;
        let merged = !config.allocations
            || (config.smush_strings && self.is_stringish(ty))
            || (config.smush_throwables
                && !ty.is_array()
                && request.hierarchy.is_subtype(ty, &self.throwable))
            || (config.smush_primitive_holders && request.hierarchy.has_only_primitive_fields(ty));
        if merged {
            MergeDecision::PerType
        } else if config.smush_many && request.allocations_of_type > config.smush_limit {
            MergeDecision::PerNode
        } else {
            MergeDecision::PerSite
        }
    }

    fn constant_specific(&self) -> bool {
        self.config.constant_specific
    }
}
