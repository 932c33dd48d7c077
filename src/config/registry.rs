// ABOUTME: Per-registry credentials from pullscope.yml.
// ABOUTME: Resolved into the StaticAuth overrides layered over docker config.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::env_value::{EnvValue, resolve_or_empty};
use crate::auth::{RegistryAuth, StaticAuth};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryCredentials {
    #[serde(default)]
    pub username: Option<EnvValue>,

    #[serde(default)]
    pub password: Option<EnvValue>,

    #[serde(default)]
    pub identity_token: Option<EnvValue>,
}

impl RegistryCredentials {
    pub fn resolve(&self, domain: &str) -> Result<RegistryAuth> {
        if self.password.is_none() && self.identity_token.is_none() {
            return Err(Error::InvalidConfig(format!(
                "registry {} needs a password or identity_token",
                domain
            )));
        }

        Ok(RegistryAuth {
            username: resolve_or_empty(self.username.as_ref())?,
            password: resolve_or_empty(self.password.as_ref())?,
            server: Some(domain.to_string()),
            identity_token: self
                .identity_token
                .as_ref()
                .map(EnvValue::resolve)
                .transpose()?,
        })
    }
}

/// Resolve every configured registry into credential overrides.
pub fn resolve_registries(registries: &BTreeMap<String, RegistryCredentials>) -> Result<StaticAuth> {
    registries
        .iter()
        .try_fold(StaticAuth::new(), |auth, (domain, credentials)| {
            Ok(auth.with(domain, credentials.resolve(domain)?))
        })
}
