// Environment variable loading

use serde_json::{Map, Value};
use std::env;

/// Prefix shared by every Aqua setting
pub const ENV_PREFIX: &str = "AQUA";

/// Collects `AQUA_*` variables as lower-cased setting names.
pub struct EnvLoader {
    prefix: String,
}

impl EnvLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Settings found in the process environment
    pub fn load(&self) -> Map<String, Value> {
        self.filter_vars(env::vars())
    }

    /// Settings found in `vars`; `AQUA_PORT` becomes `port`.
    pub fn filter_vars<I>(&self, vars: I) -> Map<String, Value>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{}_", self.prefix);
        vars.into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(&marker)
                    .filter(|name| !name.is_empty())
                    .map(|name| (name.to_lowercase(), Value::String(value)))
            })
            .collect()
    }

    /// A single setting, e.g. `load_var("port")` reads `AQUA_PORT`.
    pub fn load_var(&self, key: &str) -> Option<String> {
        env::var(format!("{}_{}", self.prefix, key.to_uppercase())).ok()
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(ENV_PREFIX)
    }
}
