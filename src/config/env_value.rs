// ABOUTME: Config values that may come from the environment.
// ABOUTME: Keeps registry secrets out of pullscope.yml via {env, default} references.

use crate::error::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

/// Resolve an optional value, treating an absent one as empty.
pub fn resolve_or_empty(value: Option<&EnvValue>) -> Result<String> {
    value.map_or_else(|| Ok(String::new()), EnvValue::resolve)
}
