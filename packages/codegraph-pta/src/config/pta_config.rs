//! Points-to analysis configuration
//!
//! Every knob of a solve: context policy, object merging, entry seeding,
//! worklist order and resource budgets. Loadable from YAML:
//!
//! ```yaml
//! context_policy:
//!   kind: object_sensitive
//!   k: 2
//! heap_context_depth: 1
//! merge:
//!   smush_strings: true
//!   smush_limit: 25
//! max_nodes: 100000
//! ```

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest supported k for k-limited policies
pub const MAX_CONTEXT_DEPTH: usize = 8;

/// Context sensitivity policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContextPolicy {
    /// One shared context per procedure
    ZeroCfa,
    /// Last k call sites
    CallString { k: usize },
    /// Last k receiver allocation sites
    ObjectSensitive { k: usize },
    /// Receiver type
    TypeSensitive,
    /// 0-CFA, except receiver-object contexts for container methods
    ZeroOneContainer { prefixes: Vec<String> },
}

impl Default for ContextPolicy {
    fn default() -> Self {
        ContextPolicy::ObjectSensitive { k: 1 }
    }
}

/// Object merging flags (zero-one-X style instance keys)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Distinguish objects by allocation site at all
    pub allocations: bool,
    /// One object per string-like type
    pub smush_strings: bool,
    /// One object per throwable type
    pub smush_throwables: bool,
    /// One object per type whose instances hold no references
    pub smush_primitive_holders: bool,
    /// One object per (allocating node, type) when a procedure has more than
    /// `smush_limit` sites of that type
    pub smush_many: bool,
    pub smush_limit: usize,
    /// Key constants by value
    pub constant_specific: bool,
    pub string_types: Vec<String>,
    pub throwable_type: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            allocations: true,
            smush_strings: true,
            smush_throwables: true,
            smush_primitive_holders: false,
            smush_many: true,
            smush_limit: 25,
            constant_specific: true,
            string_types: vec![
                "String".to_string(),
                "StringBuilder".to_string(),
                "StringBuffer".to_string(),
            ],
            throwable_type: "Throwable".to_string(),
        }
    }
}

/// What the fake root passes to entry-point parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySeeding {
    /// A synthetic object of each declared reference type; unknown when undeclared
    DeclaredTypes,
    /// The unknown object for every parameter
    Unknown,
}

/// Order in which dirty locations are processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorklistOrder {
    Fifo,
    Lifo,
}

/// Complete analysis configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PtaConfig {
    pub context_policy: ContextPolicy,
    /// Number of trailing context elements cloned into heap contexts
    pub heap_context_depth: usize,
    pub merge: MergeConfig,
    pub entry_seeding: EntrySeeding,
    pub worklist_order: WorklistOrder,
    /// Abort once the call graph holds more nodes (None = unlimited)
    pub max_nodes: Option<usize>,
    /// Abort once more abstract objects exist (None = unlimited)
    pub max_instances: Option<usize>,
    /// Discard soft caches every this many work items (None = never)
    pub soft_cache_flush_interval: Option<usize>,
    /// Qualified methods (`Type.selector`) that instantiate the class named
    /// by their first non-receiver argument
    pub reflective_new_instance: Vec<String>,
    /// Qualified methods whose nodes are further keyed by their first
    /// constant string argument
    pub name_keyed_callees: Vec<String>,
}

impl Default for PtaConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

impl PtaConfig {
    pub fn from_preset(preset: Preset) -> Self {
        let base = Self {
            context_policy: ContextPolicy::ZeroCfa,
            heap_context_depth: 0,
            merge: MergeConfig::default(),
            entry_seeding: EntrySeeding::DeclaredTypes,
            worklist_order: WorklistOrder::Fifo,
            max_nodes: None,
            max_instances: None,
            soft_cache_flush_interval: None,
            reflective_new_instance: Vec::new(),
            name_keyed_callees: Vec::new(),
        };
        match preset {
            Preset::Fast => Self {
                merge: MergeConfig {
                    smush_primitive_holders: true,
                    ..MergeConfig::default()
                },
                max_nodes: Some(50_000),
                max_instances: Some(200_000),
                ..base
            },
            Preset::Balanced => Self {
                context_policy: ContextPolicy::ObjectSensitive { k: 1 },
                max_nodes: Some(200_000),
                max_instances: Some(1_000_000),
                soft_cache_flush_interval: Some(100_000),
                ..base
            },
            Preset::Thorough => Self {
                context_policy: ContextPolicy::ObjectSensitive { k: 2 },
                heap_context_depth: 1,
                merge: MergeConfig {
                    smush_many: false,
                    ..MergeConfig::default()
                },
                max_nodes: Some(1_000_000),
                max_instances: Some(5_000_000),
                soft_cache_flush_interval: Some(100_000),
                ..base
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        match &self.context_policy {
            ContextPolicy::CallString { k } | ContextPolicy::ObjectSensitive { k } => {
                if *k == 0 || *k > MAX_CONTEXT_DEPTH {
                    return Err(ConfigError::range_with_hint(
                        "context_policy.k",
                        k,
                        1,
                        MAX_CONTEXT_DEPTH,
                        "Use zero_cfa for a context-insensitive run",
                    ));
                }
            }
            ContextPolicy::ZeroOneContainer { prefixes } => {
                if prefixes.iter().any(|p| p.is_empty()) {
                    return Err(ConfigError::Validation(
                        "container prefixes must be non-empty".to_string(),
                    ));
                }
            }
            ContextPolicy::ZeroCfa | ContextPolicy::TypeSensitive => {}
        }

        if self.heap_context_depth > MAX_CONTEXT_DEPTH {
            return Err(ConfigError::range_with_hint(
                "heap_context_depth",
                self.heap_context_depth,
                0,
                MAX_CONTEXT_DEPTH,
                "Deep heap contexts rarely pay off",
            ));
        }

        if self.merge.smush_many && self.merge.smush_limit == 0 {
            return Err(ConfigError::range_with_hint(
                "merge.smush_limit",
                0,
                1,
                usize::MAX,
                "Disable smush_many instead of using a zero limit",
            ));
        }

        for (name, value) in [
            ("max_nodes", self.max_nodes),
            ("max_instances", self.max_instances),
            ("soft_cache_flush_interval", self.soft_cache_flush_interval),
        ] {
            if value == Some(0) {
                return Err(ConfigError::Validation(format!(
                    "{} must be positive or omitted",
                    name
                )));
            }
        }

        for method in self
            .reflective_new_instance
            .iter()
            .chain(&self.name_keyed_callees)
        {
            if !method.contains('.') {
                return Err(ConfigError::Validation(format!(
                    "'{}' is not a qualified Type.selector name",
                    method
                )));
            }
        }

        Ok(())
    }

    /// Builder: Set context_policy
    pub fn context_policy(mut self, v: ContextPolicy) -> Self {
        self.context_policy = v;
        self
    }

    /// Builder: Set heap_context_depth
    pub fn heap_context_depth(mut self, v: usize) -> Self {
        self.heap_context_depth = v;
        self
    }

    /// Builder: Set merge flags
    pub fn merge(mut self, v: MergeConfig) -> Self {
        self.merge = v;
        self
    }

    /// Builder: Set entry_seeding
    pub fn entry_seeding(mut self, v: EntrySeeding) -> Self {
        self.entry_seeding = v;
        self
    }

    /// Builder: Set worklist_order
    pub fn worklist_order(mut self, v: WorklistOrder) -> Self {
        self.worklist_order = v;
        self
    }

    /// Builder: Set max_nodes
    pub fn max_nodes(mut self, v: Option<usize>) -> Self {
        self.max_nodes = v;
        self
    }

    /// Builder: Set max_instances
    pub fn max_instances(mut self, v: Option<usize>) -> Self {
        self.max_instances = v;
        self
    }

    /// Builder: Set soft_cache_flush_interval
    pub fn soft_cache_flush_interval(mut self, v: Option<usize>) -> Self {
        self.soft_cache_flush_interval = v;
        self
    }

    /// Builder: Add a reflective instantiation method
    pub fn reflective_new_instance(mut self, method: impl Into<String>) -> Self {
        self.reflective_new_instance.push(method.into());
        self
    }

    /// Builder: Add a name-keyed callee
    pub fn name_keyed_callee(mut self, method: impl Into<String>) -> Self {
        self.name_keyed_callees.push(method.into());
        self
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: PtaConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}
