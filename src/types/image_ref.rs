// ABOUTME: Container image reference parsing and validation.
// ABOUTME: Handles nginx, nginx:tag, registry/image:tag@digest and the registry domain.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Registry assumed when a reference names none.
pub const DEFAULT_DOMAIN: &str = "docker.io";

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    registry: Option<String>,
    name: String,
    tag: Option<String>,
    digest: Option<String>,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        if let Some(c) = input.chars().find(|c| {
            !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_' | '@')
        }) {
            return Err(ParseImageRefError::InvalidChar(c));
        }

        let (without_digest, digest) = match input.split_once('@') {
            Some((before, after)) if !after.is_empty() => (before, Some(after.to_string())),
            Some(_) => return Err(ParseImageRefError::InvalidFormat(input.to_string())),
            None => (input, None),
        };

        // A colon followed by a slash belongs to a registry port, not a tag
        let (without_tag, tag) = match without_digest.rsplit_once(':') {
            Some((before, after)) if !after.contains('/') => (before, Some(after.to_string())),
            _ => (without_digest, None),
        };

        if without_tag.is_empty() || tag.as_deref() == Some("") {
            return Err(ParseImageRefError::InvalidFormat(input.to_string()));
        }

        let (registry, name) = Self::parse_registry_and_name(without_tag)?;

        let tag = match (&tag, &digest) {
            (None, None) => Some("latest".to_string()),
            _ => tag,
        };

        Ok(Self {
            registry,
            name,
            tag,
            digest,
        })
    }

    fn parse_registry_and_name(
        input: &str,
    ) -> Result<(Option<String>, String), ParseImageRefError> {
        // A registry is present if the first component contains a dot or colon,
        // or is "localhost"
        match input.split_once('/') {
            None => Ok((None, input.to_string())),
            Some((first, rest)) if rest.is_empty() => {
                Err(ParseImageRefError::InvalidFormat(format!("{}/", first)))
            }
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                Ok((Some(first.to_string()), rest.to_string()))
            }
            Some(_) => Ok((None, input.to_string())),
        }
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    /// Registry domain used to look up credentials.
    pub fn domain(&self) -> &str {
        self.registry.as_deref().unwrap_or(DEFAULT_DOMAIN)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// Registry and name without tag or digest, as the daemon's `fromImage` expects.
    pub fn repository(&self) -> String {
        match self.registry {
            Some(ref registry) => format!("{}/{}", registry, self.name),
            None => self.name.clone(),
        }
    }

    /// The `tag` query value for a pull: the digest when pinned, else the tag.
    pub fn pull_tag(&self) -> Option<&str> {
        self.digest().or(self.tag())
    }
}

impl FromStr for ImageRef {
    type Err = ParseImageRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref registry) = self.registry {
            write!(f, "{}/", registry)?;
        }
        write!(f, "{}", self.name)?;
        if let Some(ref tag) = self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(ref digest) = self.digest {
            write!(f, "@{}", digest)?;
        }
        Ok(())
    }
}
