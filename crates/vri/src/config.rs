//! Instrumentation configuration
//!
//! Every fixed name the pipeline matches on or emits lives here. The defaults
//! follow the shapes Verilator generates and the runtime shipped in
//! [`crate::runtime`]; a YAML file can override any of them.

use crate::result::{VriError, VriResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a full instrumentation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstrumentConfig {
    /// Scalar storage types whose fields are watched (8/16/32/64-bit cells)
    pub scalar_types: Vec<String>,
    /// Unpacked array template whose fields are watched
    pub array_template: String,
    /// Return/cold-path prefixes in front of generated function definitions
    pub function_prefixes: Vec<String>,
    /// Line that marks the start of the instrumentable statements
    pub body_marker: String,
    /// Identifier of the current module instance inside generated functions
    pub self_name: String,
    /// Global coverage map object
    pub coverage_map: String,
    /// Method on the coverage map recording a point
    pub coverage_method: String,
    /// Global toggle counter object
    pub toggle_counter: String,
    /// Counter method recording a plain store; compound stores prefix the
    /// operator name (`Sub` + `Assign` for `-=`)
    pub toggle_method: String,
    /// Include lines inserted into every instrumented file, in order
    pub includes: Vec<String>,
    /// Top module whose build list is patched
    pub top: String,
    /// Line in the build list after which new compilation units are added
    pub classes_line: String,
    /// Compilation units added to the build list
    pub classes: Vec<String>,
    /// Seed for coverage point identifiers; entropy when absent
    pub seed: Option<u64>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            scalar_types: ["CData", "SData", "IData", "QData"]
                .map(String::from)
                .to_vec(),
            array_template: "VlUnpacked".to_string(),
            function_prefixes: ["VL_ATTR_COLD void ", "VL_INLINE_OPT void ", "void "]
                .map(String::from)
                .to_vec(),
            body_marker: "// Body".to_string(),
            self_name: "vlSelf".to_string(),
            coverage_map: "__vri_covmap".to_string(),
            coverage_method: "AddPoint".to_string(),
            toggle_counter: "__vri_bfcntr".to_string(),
            toggle_method: "Assign".to_string(),
            includes: vec![
                "#include \"coverage.hpp\"".to_string(),
                "#include \"counting.hpp\"".to_string(),
            ],
            top: "Vtop".to_string(),
            classes_line: "VM_CLASSES_FAST += \\".to_string(),
            classes: vec!["coverage".to_string(), "counting".to_string()],
            seed: None,
        }
    }
}

impl InstrumentConfig {
    /// Create the default Verilator configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a YAML file; absent keys keep their defaults
    pub fn from_yaml_file(path: &Path) -> VriResult<Self> {
        let text = std::fs::read_to_string(path).map_err(VriError::io(path))?;
        Self::from_yaml_str(&text)
    }

    /// Parse a configuration from YAML text
    pub fn from_yaml_str(text: &str) -> VriResult<Self> {
        let config: Self = serde_yaml_ng::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as YAML
    pub fn to_yaml(&self) -> VriResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Set the top module
    #[must_use]
    pub fn with_top(mut self, top: impl Into<String>) -> Self {
        self.top = top.into();
        self
    }

    /// Set the coverage identifier seed
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Line marking a file as already instrumented (the first runtime include)
    #[must_use]
    pub fn marker_include(&self) -> Option<&str> {
        self.includes.first().map(String::as_str)
    }

    /// File name of the build list for the top module
    #[must_use]
    pub fn classes_file(&self) -> String {
        format!("{}_classes.mk", self.top)
    }

    /// Reject configurations the pipeline cannot run with
    pub fn validate(&self) -> VriResult<()> {
        if self.scalar_types.is_empty() {
            return Err(VriError::config("scalar_types must not be empty"));
        }
        if self.includes.is_empty() {
            return Err(VriError::config("includes must name at least the marker include"));
        }
        if self.function_prefixes.is_empty() {
            return Err(VriError::config("function_prefixes must not be empty"));
        }
        for (name, value) in [
            ("self_name", &self.self_name),
            ("coverage_map", &self.coverage_map),
            ("coverage_method", &self.coverage_method),
            ("toggle_counter", &self.toggle_counter),
            ("toggle_method", &self.toggle_method),
            ("top", &self.top),
        ] {
            if !is_identifier(value) {
                return Err(VriError::config(format!(
                    "{name} must be a C identifier, got '{value}'"
                )));
            }
        }
        Ok(())
    }
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
