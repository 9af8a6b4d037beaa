use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

use crate::{cache, key, EngineResult, Error};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Resident entries at which the expression cache resets.
    #[serde(default = "default_expr_cache_threshold")]
    pub expr_cache_threshold: usize,

    #[serde(default = "default_key_namespace")]
    pub default_key_namespace: String,

    /// Register the `field` resolver that reads context values by path.
    #[serde(default = "default_true")]
    pub register_context_keys: bool,

    /// Namespaces whose keys resolve by path under the context entry of the
    /// same name (`repeat:item.name`).
    #[serde(default = "default_scoped_key_namespaces")]
    pub scoped_key_namespaces: Vec<String>,
}

fn default_expr_cache_threshold() -> usize {
    cache::DEFAULT_THRESHOLD
}

fn default_key_namespace() -> String {
    key::DEFAULT_NAMESPACE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_scoped_key_namespaces() -> Vec<String> {
    vec!["repeat".to_string()]
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expr_cache_threshold: default_expr_cache_threshold(),
            default_key_namespace: default_key_namespace(),
            register_context_keys: default_true(),
            scoped_key_namespaces: default_scoped_key_namespaces(),
        }
    }
}

impl EngineConfig {
    // JSONファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: EngineConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.expr_cache_threshold == 0 {
            return Err(Error::config("expr_cache_threshold must be greater than 0"));
        }
        if self.default_key_namespace.is_empty() || self.default_key_namespace.contains(':') {
            return Err(Error::config(format!(
                "invalid default_key_namespace: {:?}",
                self.default_key_namespace
            )));
        }
        if let Some(ns) = self
            .scoped_key_namespaces
            .iter()
            .find(|ns| ns.is_empty() || ns.contains(':'))
        {
            return Err(Error::config(format!("invalid scoped key namespace: {:?}", ns)));
        }
        Ok(())
    }
}
