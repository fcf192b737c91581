//! Calling contexts
//!
//! A [`Context`] is an ordered list of distinguishing elements. Each context
//! selector owns one element category and k-limits only that category, so
//! selectors can be layered: a call-string selector and a name-key selector
//! contribute independent elements to the same context.

use super::instance_key::AllocSite;
use crate::features::call_graph::domain::CallSiteRef;
use crate::shared::models::TypeRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::mem::discriminant;

/// One distinguishing key inside a context
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextElement {
    /// A call site on the call string (k-CFA)
    CallSite(CallSiteRef),
    /// Allocation site of a receiver object (object sensitivity)
    Receiver(AllocSite),
    /// Type of a receiver object (type sensitivity)
    ReceiverType(TypeRef),
    /// Constant name key (e.g. a property name passed at the call)
    Name(String),
}

impl ContextElement {
    #[inline]
    fn same_category(&self, other: &ContextElement) -> bool {
        discriminant(self) == discriminant(other)
    }
}

impl fmt::Display for ContextElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextElement::CallSite(site) => write!(f, "cs:{}", site),
            ContextElement::Receiver(site) => write!(f, "recv:{}", site),
            ContextElement::ReceiverType(ty) => write!(f, "type:{}", ty),
            ContextElement::Name(name) => write!(f, "name:{}", name),
        }
    }
}

/// Value-comparable calling context
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Context {
    elements: Vec<ContextElement>,
}

impl Context {
    /// The shared context (0-CFA)
    #[inline]
    pub fn empty() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    pub fn from_elements(elements: Vec<ContextElement>) -> Self {
        Self { elements }
    }

    #[inline]
    pub fn elements(&self) -> &[ContextElement] {
        &self.elements
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.elements.len()
    }

    /// Append `element`, keeping at most `k` elements of its category
    /// (oldest dropped first). `k == 0` leaves the context unchanged.
    pub fn push(mut self, element: ContextElement, k: usize) -> Self {
        if k == 0 {
            return self;
        }
        self.elements.push(element);
        loop {
            let last = &self.elements[self.elements.len() - 1];
            let count = self
                .elements
                .iter()
                .filter(|e| e.same_category(last))
                .count();
            if count <= k {
                break;
            }
            let oldest = self
                .elements
                .iter()
                .position(|e| e.same_category(last));
            match oldest {
                Some(position) => {
                    self.elements.remove(position);
                }
                None => break,
            }
        }
        self
    }

    /// Augment with an extra key, no limiting
    pub fn with(mut self, element: ContextElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Last `depth` elements (used as the heap context of allocations)
    pub fn truncated(&self, depth: usize) -> Self {
        let skip = self.elements.len().saturating_sub(depth);
        Self {
            elements: self.elements[skip..].to_vec(),
        }
    }

    /// Call-site elements, oldest first
    pub fn call_sites(&self) -> impl Iterator<Item = &CallSiteRef> + '_ {
        self.elements.iter().filter_map(|e| match e {
            ContextElement::CallSite(site) => Some(site),
            _ => None,
        })
    }

    /// Receiver allocation-site elements, oldest first
    pub fn receivers(&self) -> impl Iterator<Item = &AllocSite> + '_ {
        self.elements.iter().filter_map(|e| match e {
            ContextElement::Receiver(site) => Some(site),
            _ => None,
        })
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", element)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::call_graph::domain::MethodKey;
    use crate::shared::models::ProcedureId;

    fn site(n: u32) -> ContextElement {
        ContextElement::CallSite(CallSiteRef::new(MethodKey::Procedure(ProcedureId(0)), n))
    }

    #[test]
    fn test_k_limiting() {
        let ctx = Context::empty().push(site(1), 2).push(site(2), 2).push(site(3), 2);
        assert_eq!(ctx.elements(), &[site(2), site(3)]);
    }

    #[test]
    fn test_k_limit_is_per_category() {
        let name = ContextElement::Name("p".to_string());
        let ctx = Context::empty()
            .with(name.clone())
            .push(site(1), 1)
            .push(site(2), 1);
        assert_eq!(ctx.elements(), &[name, site(2)]);
    }

    #[test]
    fn test_zero_k_is_insensitive() {
        assert!(Context::empty().push(site(1), 0).is_empty());
    }

    #[test]
    fn test_truncated() {
        let ctx = Context::from_elements(vec![site(1), site(2), site(3)]);
        assert_eq!(ctx.truncated(1).elements(), &[site(3)]);
        assert!(ctx.truncated(0).is_empty());
        assert_eq!(ctx.truncated(10), ctx);
    }

    #[test]
    fn test_display() {
        let ctx = Context::from_elements(vec![site(4)]);
        assert_eq!(ctx.to_string(), "[cs:p0@4]");
        assert_eq!(Context::empty().to_string(), "[]");
    }
}
