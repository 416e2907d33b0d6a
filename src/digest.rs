use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for content digest parsing
#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Invalid digest format: {0}")]
    InvalidFormat(String),
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// A pushed image's content digest, rendered as `@sha256:<64 hex chars>`.
///
/// The leading `@` is part of the canonical text because that is how the
/// digest is appended to an image reference and how it is stored in the
/// mapping file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDigest {
    hex: String,
}

impl ContentDigest {
    /// Get the hex part of the digest
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@sha256:{}", self.hex)
    }
}

impl FromStr for ContentDigest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('@').unwrap_or(s);

        let Some((algorithm, hex)) = s.split_once(':') else {
            return Err(DigestError::InvalidFormat(s.to_string()));
        };

        if algorithm != "sha256" {
            return Err(DigestError::UnsupportedAlgorithm(algorithm.to_string()));
        }

        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::InvalidFormat(s.to_string()));
        }

        Ok(ContentDigest {
            hex: hex.to_string(),
        })
    }
}

impl Serialize for ContentDigest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ContentDigest::from_str(&s).map_err(serde::de::Error::custom)
    }
}
