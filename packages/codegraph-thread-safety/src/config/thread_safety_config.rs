//! Thread-safety checker configuration

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::features::thread_safety::infrastructure::ApiModelEntry;

/// Method identified by class and name (any overload)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub class_name: String,
    pub method_name: String,
}

impl MethodRef {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }
}

/// Checker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThreadSafetyConfig {
    /// Node visits allowed per procedure before the fixpoint is abandoned
    #[serde(default = "default_max_fixpoint_iterations")]
    pub max_fixpoint_iterations: usize,

    #[serde(default = "default_true")]
    pub report_unprotected_writes: bool,

    #[serde(default = "default_true")]
    pub report_read_write_races: bool,

    /// Run the reporting pass on the rayon pool
    #[serde(default = "default_true")]
    pub parallel_reporting: bool,

    /// Methods analyzed like constructors (receiver owned on entry)
    #[serde(default)]
    pub custom_initializers: Vec<MethodRef>,

    /// Library models appended to the built-in catalog
    #[serde(default)]
    pub extra_api_models: Vec<ApiModelEntry>,

    /// Container classes whose mutators are not reported
    #[serde(default)]
    pub extra_thread_safe_containers: Vec<String>,

    /// Classes whose name ends with this suffix are not analyzed
    #[serde(default = "default_builder_class_suffix")]
    pub builder_class_suffix: String,
}

fn default_true() -> bool {
    true
}
fn default_max_fixpoint_iterations() -> usize {
    10_000
}
fn default_builder_class_suffix() -> String {
    "Builder".to_string()
}

impl Default for ThreadSafetyConfig {
    fn default() -> Self {
        Self {
            max_fixpoint_iterations: default_max_fixpoint_iterations(),
            report_unprotected_writes: true,
            report_read_write_races: true,
            parallel_reporting: true,
            custom_initializers: Vec::new(),
            extra_api_models: Vec::new(),
            extra_thread_safe_containers: Vec::new(),
            builder_class_suffix: default_builder_class_suffix(),
        }
    }
}

impl ThreadSafetyConfig {
    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_fixpoint_iterations == 0 || self.max_fixpoint_iterations > 1_000_000 {
            return Err(ConfigError::range_with_hint(
                "max_fixpoint_iterations",
                self.max_fixpoint_iterations,
                1,
                1_000_000,
                "Each CFG node needs at least one visit",
            ));
        }

        if let Some(entry) = self
            .extra_api_models
            .iter()
            .find(|entry| entry.class_name.is_empty() || entry.method_name.is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "extra_api_models entry {:?} needs a class and a method pattern",
                entry
            )));
        }

        if let Some(init) = self
            .custom_initializers
            .iter()
            .find(|init| init.class_name.is_empty() || init.method_name.is_empty())
        {
            return Err(ConfigError::Validation(format!(
                "custom_initializers entry {:?} needs a class and a method name",
                init
            )));
        }

        Ok(())
    }

    /// Builder: Set fixpoint iteration limit
    pub fn max_fixpoint_iterations(mut self, v: usize) -> Self {
        self.max_fixpoint_iterations = v;
        self
    }

    /// Builder: Toggle unprotected-write reports
    pub fn report_unprotected_writes(mut self, v: bool) -> Self {
        self.report_unprotected_writes = v;
        self
    }

    /// Builder: Toggle read/write race reports
    pub fn report_read_write_races(mut self, v: bool) -> Self {
        self.report_read_write_races = v;
        self
    }

    /// Builder: Toggle parallel reporting
    pub fn parallel_reporting(mut self, v: bool) -> Self {
        self.parallel_reporting = v;
        self
    }

    /// Builder: Add a custom initializer
    pub fn custom_initializer(mut self, class_name: &str, method_name: &str) -> Self {
        self.custom_initializers
            .push(MethodRef::new(class_name, method_name));
        self
    }

    /// Builder: Add a library model
    pub fn api_model(mut self, entry: ApiModelEntry) -> Self {
        self.extra_api_models.push(entry);
        self
    }

    /// Builder: Add a thread-safe container class
    pub fn thread_safe_container(mut self, class_name: &str) -> Self {
        self.extra_thread_safe_containers.push(class_name.to_string());
        self
    }
}
