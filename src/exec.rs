use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Declarative action. Values of `config` and `params` are expression
/// sources evaluated against the dispatch context.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Exec {
    #[serde(rename = "type")]
    pub exec_type: String,
    #[serde(default)]
    pub config: HashMap<String, String>,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl Exec {
    pub fn new(exec_type: &str) -> Self {
        Self {
            exec_type: exec_type.to_string(),
            ..Default::default()
        }
    }

    pub fn with_config(mut self, name: &str, source: &str) -> Self {
        self.config.insert(name.to_string(), source.to_string());
        self
    }

    pub fn with_param(mut self, name: &str, source: &str) -> Self {
        self.params.insert(name.to_string(), source.to_string());
        self
    }
}
