use crate::error::{AppError, Result};

const GITHUB_PREFIX: &str = "https://github.com/";

/// Naming key derived from a manifest's release URL, used to choose where
/// the rewritten output is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    /// `<group>-<component>`, e.g. `knative-serving`
    pub component: String,
    /// Release tag with any prefix before the first `-` stripped
    pub tag: String,
    /// The released file name, e.g. `serving-core.yaml`
    pub release_type: String,
}

impl ReleaseDescriptor {
    /// Parse a GitHub release download URL of the shape
    /// `https://github.com/<group>/<component>/releases/download/<tag>/<file>`
    /// for one of the recognized groups. Anything else is unsupported.
    pub fn parse(url: &str, groups: &[String]) -> Result<Self> {
        let unsupported = || AppError::UnsupportedReleaseSource(url.to_string());

        let rest = url.strip_prefix(GITHUB_PREFIX).ok_or_else(unsupported)?;
        let segments: Vec<&str> = rest.split('/').collect();
        if segments.len() < 6 {
            return Err(unsupported());
        }

        let group = segments[0];
        if !groups.iter().any(|g| g == group) {
            return Err(unsupported());
        }

        // Suffixed pre-release tags like `knative-v1.2.0` contribute only
        // the portion after the first `-`.
        let raw_tag = segments[4];
        let tag = match raw_tag.split_once('-') {
            Some((_, suffix)) => suffix,
            None => raw_tag,
        };

        Ok(ReleaseDescriptor {
            component: format!("{}-{}", group, segments[1]),
            tag: tag.to_string(),
            release_type: segments[5].to_string(),
        })
    }

    /// Deterministic output file name for the rewritten manifest.
    pub fn output_key(&self) -> String {
        format!("{}-{}-{}", self.component, self.tag, self.release_type)
    }
}
