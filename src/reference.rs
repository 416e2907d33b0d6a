use std::fmt;
use std::str::FromStr;

use crate::digest::ContentDigest;
use crate::error::{AppError, Result};

/// A parsed container image reference: repository path, optional tag,
/// optional content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Slash-segmented repository path, e.g. `gcr.io/project/app`
    pub repository: String,
    /// Tag, if the reference carried one. `None` is distinct from an
    /// empty tag string.
    pub tag: Option<String>,
    /// Content digest, if the reference was pinned
    pub digest: Option<ContentDigest>,
}

impl ImageReference {
    pub fn new(repository: String, tag: Option<String>, digest: Option<ContentDigest>) -> Self {
        Self {
            repository,
            tag,
            digest,
        }
    }

    /// Parse a raw reference string.
    ///
    /// The digest, if any, starts at the first `@sha256:` and runs to the
    /// end of the string; the tag, if any, follows the first `:` of what
    /// remains. Parsing is deliberately permissive about repository and tag
    /// content so varied manifest syntax is tolerated; it fails only on an
    /// empty repository or a digest suffix that does not validate.
    pub fn parse(raw: &str) -> Result<Self> {
        let (head, digest) = match raw.find("@sha256:") {
            Some(offset) => {
                let digest = raw[offset..]
                    .parse::<ContentDigest>()
                    .map_err(|_| AppError::MalformedReference(raw.to_string()))?;
                (&raw[..offset], Some(digest))
            }
            None => (raw, None),
        };

        let (repository, tag) = match head.find(':') {
            Some(offset) => (&head[..offset], Some(head[offset + 1..].to_string())),
            None => (head, None),
        };

        if repository.is_empty() {
            return Err(AppError::MalformedReference(raw.to_string()));
        }

        Ok(ImageReference {
            repository: repository.to_string(),
            tag,
            digest,
        })
    }

    /// The full reference string: repository, `:tag` if present, digest if
    /// present. Recomputed from the fields on every call.
    pub fn canonical_form(&self) -> String {
        self.to_string()
    }
}

impl FromStr for ImageReference {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        ImageReference::parse(s)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repository)?;
        if let Some(tag) = &self.tag {
            write!(f, ":{}", tag)?;
        }
        if let Some(digest) = &self.digest {
            write!(f, "{}", digest)?;
        }
        Ok(())
    }
}
