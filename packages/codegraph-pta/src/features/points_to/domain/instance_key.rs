//! Abstract objects ("instance keys")
//!
//! An [`InstanceKey`] names an equivalence class of runtime objects. The
//! default key is the allocation site plus a heap context; the merge policy
//! may instead collapse all objects of a type into one [`InstanceKey::TypeMerged`],
//! or the objects of a type allocated by one node into one [`InstanceKey::Smushed`].

use super::context::Context;
use crate::features::call_graph::domain::MethodKey;
use crate::index_type;
use crate::shared::models::{ProcedureId, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt;

index_type!(
    /// Interned abstract object
    InstanceId,
    "o"
);

impl InstanceId {
    /// The "may be anything" object, interned first in every heap model
    pub const UNKNOWN: InstanceId = InstanceId(0);
}

/// How an allocation site arises inside its method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteKind {
    /// `new` instruction with this site number
    New(u32),
    /// Reflective instantiation summarized at this call site
    Reflective(u32),
    /// Object returned by a native procedure
    NativeReturn,
    /// Synthetic argument built by the fake root for an entry point
    EntryParam { entry: u32, param: u32 },
}

/// Allocation site, independent of context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AllocSite {
    pub method: MethodKey,
    pub kind: SiteKind,
}

impl AllocSite {
    pub fn new(method: MethodKey, kind: SiteKind) -> Self {
        Self { method, kind }
    }
}

impl fmt::Display for AllocSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SiteKind::New(site) => write!(f, "{}#new{}", self.method, site),
            SiteKind::Reflective(site) => write!(f, "{}#reflect{}", self.method, site),
            SiteKind::NativeReturn => write!(f, "{}#native", self.method),
            SiteKind::EntryParam { entry, param } => {
                write!(f, "{}#entry{}.{}", self.method, entry, param)
            }
        }
    }
}

/// Abstract object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstanceKey {
    /// Objects from one allocation site under one heap context
    Allocation {
        ty: TypeRef,
        site: AllocSite,
        heap_context: Context,
    },
    /// Every object of `ty`, merged
    TypeMerged { ty: TypeRef },
    /// Every object of `ty` allocated by one method under one heap context
    Smushed {
        ty: TypeRef,
        method: MethodKey,
        heap_context: Context,
    },
    /// A constant such as a string literal
    Constant { ty: TypeRef, value: String },
    /// Function value for `procedure`
    Closure {
        procedure: ProcedureId,
        site: AllocSite,
        heap_context: Context,
    },
    /// Anything at all
    Unknown,
}

impl InstanceKey {
    /// Runtime type of the objects this key stands for, when known
    pub fn concrete_type(&self) -> Option<&TypeRef> {
        match self {
            InstanceKey::Allocation { ty, .. }
            | InstanceKey::TypeMerged { ty }
            | InstanceKey::Smushed { ty, .. }
            | InstanceKey::Constant { ty, .. } => Some(ty),
            InstanceKey::Closure { .. } | InstanceKey::Unknown => None,
        }
    }

    pub fn allocation_site(&self) -> Option<&AllocSite> {
        match self {
            InstanceKey::Allocation { site, .. } | InstanceKey::Closure { site, .. } => Some(site),
            _ => None,
        }
    }

    pub fn heap_context(&self) -> Option<&Context> {
        match self {
            InstanceKey::Allocation { heap_context, .. }
            | InstanceKey::Smushed { heap_context, .. }
            | InstanceKey::Closure { heap_context, .. } => Some(heap_context),
            _ => None,
        }
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        matches!(self, InstanceKey::Unknown)
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceKey::Allocation {
                ty,
                site,
                heap_context,
            } => write!(f, "{}@{}{}", ty, site, heap_context),
            InstanceKey::TypeMerged { ty } => write!(f, "{}@*", ty),
            InstanceKey::Smushed {
                ty,
                method,
                heap_context,
            } => write!(f, "{}@{}#*{}", ty, method, heap_context),
            InstanceKey::Constant { ty, value } => write!(f, "{}={:?}", ty, value),
            InstanceKey::Closure {
                procedure,
                site,
                heap_context,
            } => write!(f, "fn {}@{}{}", procedure, site, heap_context),
            InstanceKey::Unknown => f.write_str("<unknown>"),
        }
    }
}
