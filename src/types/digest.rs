// ABOUTME: Content digests in `algorithm:encoded` form.
// ABOUTME: Used for daemon "Digest:" lines, manifest layers, and resolved image ids.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseDigestError {
    #[error("digest cannot be empty")]
    Empty,

    #[error("digest is missing an algorithm prefix: {0}")]
    MissingAlgorithm(String),

    #[error("invalid digest algorithm: {0}")]
    InvalidAlgorithm(String),

    #[error("invalid digest encoding: {0}")]
    InvalidEncoded(String),
}

/// A content digest such as `sha256:4f1c...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest {
    algorithm: String,
    encoded: String,
}

impl Digest {
    pub fn parse(input: &str) -> Result<Self, ParseDigestError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseDigestError::Empty);
        }

        let (algorithm, encoded) = input
            .split_once(':')
            .ok_or_else(|| ParseDigestError::MissingAlgorithm(input.to_string()))?;

        if algorithm.is_empty()
            || !algorithm.chars().all(|c| {
                c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '+' | '.' | '_' | '-')
            })
        {
            return Err(ParseDigestError::InvalidAlgorithm(algorithm.to_string()));
        }

        if encoded.is_empty()
            || !encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '=' | '_' | '-'))
        {
            return Err(ParseDigestError::InvalidEncoded(encoded.to_string()));
        }

        Ok(Self {
            algorithm: algorithm.to_string(),
            encoded: encoded.to_string(),
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// The encoded part after the colon (hex for sha256).
    pub fn hex(&self) -> &str {
        &self.encoded
    }

    /// Leading `len` characters of the encoded part, clamped to its length.
    pub fn short(&self, len: usize) -> &str {
        &self.encoded[..len.min(self.encoded.len())]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.encoded)
    }
}

impl FromStr for Digest {
    type Err = ParseDigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
