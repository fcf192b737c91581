//! Call graph builder
//!
//! Entry point of the crate: validates configuration and program, wires the
//! pluggable strategies (context selector, merge policy, call summaries)
//! and runs the solver.
//!
//! # Usage
//! ```text
//! use codegraph_pta::{CallGraphBuilder, PtaConfig, Preset};
//!
//! let analysis = CallGraphBuilder::new(program, PtaConfig::from_preset(Preset::Fast))
//!     .with_cancellation(token.clone())
//!     .build()?;
//! for (caller, site, callee) in analysis.call_graph().edges() { ... }
//! ```

use super::result::PointerAnalysis;
use crate::config::PtaConfig;
use crate::errors::Result;
use crate::features::points_to::infrastructure::{
    ReflectiveNewInstance, SelectorChain, Solver, ZeroXMergePolicy,
};
use crate::features::points_to::ports::{
    CallSummary, CancellationToken, ContextSelector, ObjectMergePolicy,
};
use crate::shared::models::{validate_program, Program};
use crate::shared::ports::{ClassHierarchy, SimpleClassHierarchy};
use std::sync::Arc;
use tracing::{debug, info};

pub struct CallGraphBuilder {
    program: Arc<Program>,
    config: PtaConfig,
    hierarchy: Option<Box<dyn ClassHierarchy>>,
    selector: Option<Box<dyn ContextSelector>>,
    merge_policy: Option<Box<dyn ObjectMergePolicy>>,
    summaries: Vec<Box<dyn CallSummary>>,
    cancellation: CancellationToken,
}

impl CallGraphBuilder {
    pub fn new(program: impl Into<Arc<Program>>, config: PtaConfig) -> Self {
        Self {
            program: program.into(),
            config,
            hierarchy: None,
            selector: None,
            merge_policy: None,
            summaries: Vec::new(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Replace the hierarchy derived from the program's class declarations
    pub fn with_hierarchy(mut self, hierarchy: impl ClassHierarchy + 'static) -> Self {
        self.hierarchy = Some(Box::new(hierarchy));
        self
    }

    /// Replace the selector chain built from `config.context_policy`
    pub fn with_context_selector(mut self, selector: impl ContextSelector + 'static) -> Self {
        self.selector = Some(Box::new(selector));
        self
    }

    /// Replace the zero-one-X policy built from `config.merge`
    pub fn with_merge_policy(mut self, policy: impl ObjectMergePolicy + 'static) -> Self {
        self.merge_policy = Some(Box::new(policy));
        self
    }

    /// Add a library call summary; consulted in registration order
    pub fn with_summary(mut self, summary: impl CallSummary + 'static) -> Self {
        self.summaries.push(Box::new(summary));
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Solve to fixpoint.
    ///
    /// # Errors
    /// - `Config` if the configuration is out of range
    /// - `MalformedIr` / `UnknownEntryPoint` for inconsistent input
    /// - `BudgetExceeded` if `max_nodes` or `max_instances` is hit
    ///
    /// Cancellation is not an error: the result is marked incomplete.
    pub fn build(self) -> Result<PointerAnalysis> {
        let Self {
            program,
            config,
            hierarchy,
            selector,
            merge_policy,
            mut summaries,
            cancellation,
        } = self;

        config.validate()?;
        let hierarchy =
            hierarchy.unwrap_or_else(|| Box::new(SimpleClassHierarchy::from_program(&program)));
        validate_program(&program, hierarchy.as_ref())?;

        let selector =
            selector.unwrap_or_else(|| Box::new(SelectorChain::from_config(&config)));
        let merge_policy = merge_policy
            .unwrap_or_else(|| Box::new(ZeroXMergePolicy::new(config.merge.clone())));
        if !config.reflective_new_instance.is_empty() {
            summaries.push(Box::new(ReflectiveNewInstance::new(
                config.reflective_new_instance.iter().cloned(),
            )));
        }

        info!(
            procedures = program.procedures.len(),
            entry_points = program.entry_points.len(),
            policy = ?config.context_policy,
            "building call graph"
        );
        debug!(?selector, summaries = summaries.len(), "analysis strategies");

        let (output, status) = {
            let mut solver = Solver::new(
                &program,
                hierarchy.as_ref(),
                selector.as_ref(),
                &summaries,
                merge_policy,
                &config,
                cancellation,
            );
            let status = solver.solve()?;
            (solver.into_output(), status)
        };
        Ok(PointerAnalysis::new(program, hierarchy, output, status))
    }
}
