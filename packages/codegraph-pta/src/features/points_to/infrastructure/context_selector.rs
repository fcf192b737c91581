//! Context selectors
//!
//! - **Insensitive**: one shared context per procedure (0-CFA)
//! - **CallString(k)**: k most recent call sites (k-CFA)
//! - **ObjectSensitive(k)**: receiver allocation site plus the receiver's
//!   own heap context, k-limited (k-object)
//! - **TypeSensitive**: receiver type
//! - **Container**: receiver object only for container-library callees
//! - **NameKey**: constant name argument for selected callees
//!
//! Selectors are folded by [`SelectorChain`]; each layer only adds elements
//! of its own category, so the context universe stays finite whenever every
//! layer is k-limited.

use crate::config::{ContextPolicy, PtaConfig};
use crate::features::points_to::domain::{Context, ContextElement};
use crate::features::points_to::ports::{ContextRequest, ContextSelector};
use rustc_hash::FxHashSet;

/// 0-CFA: returns the base context untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct Insensitive;

impl ContextSelector for Insensitive {
    fn select_context(&self, base: Context, _request: &ContextRequest<'_>) -> Context {
        base
    }
}

/// k-CFA
#[derive(Debug, Clone, Copy)]
pub struct CallStringSelector {
    pub k: usize,
}

impl ContextSelector for CallStringSelector {
    fn select_context(&self, base: Context, request: &ContextRequest<'_>) -> Context {
        let mut context = base;
        for site in request.caller.context.call_sites() {
            context = context.push(ContextElement::CallSite(*site), self.k);
        }
        context.push(ContextElement::CallSite(request.site), self.k)
    }
}

/// k-object sensitivity
///
/// Calls without a receiver inherit the caller's receiver string. Receivers
/// without an allocation site (merged, constant, unknown) add nothing.
#[derive(Debug, Clone, Copy)]
pub struct ObjectSensitiveSelector {
    pub k: usize,
}

impl ContextSelector for ObjectSensitiveSelector {
    fn select_context(&self, base: Context, request: &ContextRequest<'_>) -> Context {
        let mut context = base;
        match request.receiver {
            None => {
                for site in request.caller.context.receivers() {
                    context = context.push(ContextElement::Receiver(*site), self.k);
                }
            }
            Some(receiver) => {
                if let (Some(site), Some(heap_context)) =
                    (receiver.allocation_site(), receiver.heap_context())
                {
                    for outer in heap_context.receivers() {
                        context = context.push(ContextElement::Receiver(*outer), self.k);
                    }
                    context = context.push(ContextElement::Receiver(*site), self.k);
                }
            }
        }
        context
    }
}

/// Receiver-type sensitivity (depth 1)
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeSensitiveSelector;

impl ContextSelector for TypeSensitiveSelector {
    fn select_context(&self, base: Context, request: &ContextRequest<'_>) -> Context {
        match request.receiver {
            Some(receiver) => match receiver.concrete_type() {
                Some(ty) => base.push(ContextElement::ReceiverType(ty.clone()), 1),
                None => base,
            },
            None => {
                let inherited = request
                    .caller
                    .context
                    .elements()
                    .iter()
                    .filter(|e| matches!(e, ContextElement::ReceiverType(_)))
                    .last()
                    .cloned();
                match inherited {
                    Some(element) => base.push(element, 1),
                    None => base,
                }
            }
        }
    }
}

/// Receiver-object context for methods of container types
#[derive(Debug, Clone, Default)]
pub struct ContainerSelector {
    prefixes: Vec<String>,
}

impl ContainerSelector {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    fn is_container(&self, declaring: &str) -> bool {
        self.prefixes.iter().any(|prefix| declaring.starts_with(prefix))
    }
}

impl ContextSelector for ContainerSelector {
    fn select_context(&self, base: Context, request: &ContextRequest<'_>) -> Context {
        if !self.is_container(request.callee.declaring.name()) {
            return base;
        }
        match request.receiver.and_then(|r| r.allocation_site()) {
            Some(site) => base.push(ContextElement::Receiver(*site), 1),
            None => base,
        }
    }
}

/// Adds the first constant string argument as a key for selected callees
#[derive(Debug, Clone, Default)]
pub struct NameKeySelector {
    callees: FxHashSet<String>,
}

impl NameKeySelector {
    pub fn new(callees: impl IntoIterator<Item = String>) -> Self {
        Self {
            callees: callees.into_iter().collect(),
        }
    }
}

impl ContextSelector for NameKeySelector {
    fn select_context(&self, base: Context, request: &ContextRequest<'_>) -> Context {
        if !self.callees.contains(&request.callee.name()) {
            return base;
        }
        match request.constant_args.iter().flatten().next() {
            Some(name) => base.with(ContextElement::Name(name.clone())),
            None => base,
        }
    }
}

/// Ordered delegation chain folded from the empty context
#[derive(Debug, Default)]
pub struct SelectorChain {
    delegates: Vec<Box<dyn ContextSelector>>,
}

impl SelectorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, selector: impl ContextSelector + 'static) -> Self {
        self.delegates.push(Box::new(selector));
        self
    }

    pub fn push_boxed(&mut self, selector: Box<dyn ContextSelector>) {
        self.delegates.push(selector);
    }

    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }

    /// Chain for the configured policy and name keys
    pub fn from_config(config: &PtaConfig) -> Self {
        let chain = match &config.context_policy {
            ContextPolicy::ZeroCfa => SelectorChain::new().then(Insensitive),
            ContextPolicy::CallString { k } => SelectorChain::new().then(CallStringSelector { k: *k }),
            ContextPolicy::ObjectSensitive { k } => {
                SelectorChain::new().then(ObjectSensitiveSelector { k: *k })
            }
            ContextPolicy::TypeSensitive => SelectorChain::new().then(TypeSensitiveSelector),
            ContextPolicy::ZeroOneContainer { prefixes } => SelectorChain::new()
                .then(Insensitive)
                .then(ContainerSelector::new(prefixes.clone())),
        };
        if config.name_keyed_callees.is_empty() {
            chain
        } else {
            chain.then(NameKeySelector::new(config.name_keyed_callees.iter().cloned()))
        }
    }
}

impl ContextSelector for SelectorChain {
    fn select_context(&self, base: Context, request: &ContextRequest<'_>) -> Context {
        self.delegates
            .iter()
            .fold(base, |context, delegate| delegate.select_context(context, request))
    }
}
