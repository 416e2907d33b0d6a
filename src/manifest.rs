use regex::Regex;
use tracing::debug;

use crate::error::Result;
use crate::mirror::{Mirrorer, RegistryClient, RegistryManagement};

/// Rewrites manifest text line by line, replacing every image reference
/// anchored at one of the configured registry hosts with its mirrored
/// counterpart. Comments and everything else pass through untouched.
pub struct LineRewriter {
    patterns: Vec<Regex>,
}

impl LineRewriter {
    /// Build one scan pattern per registry host. The reference grammar is
    /// `<host>(/<path-segment>)+(:<tag>)?(@sha256:<64 hex>)?` with
    /// version-shaped tags, so a bare `key: value` colon never reads as a
    /// tag.
    pub fn new(hosts: &[String]) -> Result<Self> {
        let patterns = hosts
            .iter()
            .map(|host| {
                Regex::new(&format!(
                    r"{}(?:/[a-z0-9._-]+)+(?::v?[0-9]+(?:\.[0-9]+)*)?(?:@sha256:[a-f0-9]{{64}})?",
                    regex::escape(host)
                ))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// All references found on a line: per-host scans, non-overlapping and
    /// leftmost-first within a host, concatenated in host order.
    pub fn find_references(&self, line: &str) -> Vec<String> {
        self.patterns
            .iter()
            .flat_map(|pattern| pattern.find_iter(line))
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Rewrite one line. Comment lines are returned unchanged even if they
    /// contain reference-shaped strings. Replacement is literal substring
    /// substitution, applied cumulatively, so repeated identical references
    /// on one line are all replaced together.
    pub async fn rewrite_line<C, M>(
        &self,
        mirrorer: &mut Mirrorer<C, M>,
        line: &str,
    ) -> Result<String>
    where
        C: RegistryClient,
        M: RegistryManagement,
    {
        if line.trim().starts_with('#') {
            return Ok(line.to_string());
        }

        let mut rewritten = line.to_string();
        for reference in self.find_references(line) {
            let mirrored = mirrorer.process(&reference).await?;
            rewritten = rewritten.replace(&reference, &mirrored);
        }
        Ok(rewritten)
    }

    /// Rewrite a whole manifest, preserving line order and count exactly.
    pub async fn rewrite_manifest<C, M, I>(
        &self,
        mirrorer: &mut Mirrorer<C, M>,
        lines: I,
    ) -> Result<Vec<String>>
    where
        C: RegistryClient,
        M: RegistryManagement,
        I: IntoIterator<Item = String>,
    {
        let mut rewritten = Vec::new();
        for line in lines {
            rewritten.push(self.rewrite_line(mirrorer, &line).await?);
        }
        debug!("Rewrote {} lines", rewritten.len());
        Ok(rewritten)
    }
}
