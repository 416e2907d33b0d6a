use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::digest::ContentDigest;
use crate::error::{AppError, Result};
use crate::reference::ImageReference;

/// One row of the durable mapping file. The digest always carries its
/// `@sha256:` prefix; an absent tag is stored as `null`.
#[derive(Debug, Serialize, Deserialize)]
struct MappingRecord {
    source: String,
    repository: String,
    tag: Option<String>,
    digest: Option<ContentDigest>,
}

/// Durable table of source reference -> mirrored reference, plus the set of
/// destination repositories known to exist.
///
/// The whole table is loaded at startup and rewritten after every new
/// mapping, so a crash loses at most the in-flight mirroring operation.
#[derive(Debug)]
pub struct MappingStore {
    path: PathBuf,
    mapping: BTreeMap<String, ImageReference>,
    existing_repositories: BTreeSet<String>,
}

impl MappingStore {
    /// Load the store from `path`. A missing file means no prior mappings;
    /// a file that exists but does not parse is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let mut store = MappingStore {
            path: path.to_path_buf(),
            mapping: BTreeMap::new(),
            existing_repositories: BTreeSet::new(),
        };

        if !path.exists() {
            info!("No mapping store at {}, starting empty", path.display());
            return Ok(store);
        }

        let data = std::fs::read(path)?;
        let records: Vec<MappingRecord> =
            serde_json::from_slice(&data).map_err(|e| AppError::CorruptStore {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        for record in records {
            store.existing_repositories.insert(record.repository.clone());
            store.mapping.insert(
                record.source,
                ImageReference::new(record.repository, record.tag, record.digest),
            );
        }

        info!(
            "Loaded {} mappings from {}",
            store.mapping.len(),
            path.display()
        );
        Ok(store)
    }

    pub fn has(&self, source_key: &str) -> bool {
        self.mapping.contains_key(source_key)
    }

    pub fn lookup(&self, source_key: &str) -> Option<&ImageReference> {
        self.mapping.get(source_key)
    }

    pub fn repository_exists(&self, name: &str) -> bool {
        self.existing_repositories.contains(name)
    }

    pub fn mark_repository_exists(&mut self, name: &str) {
        self.existing_repositories.insert(name.to_string());
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Record that `source_key` is mirrored as `image`. Re-inserting the
    /// identical mapping is a no-op; a differing one is a conflict and
    /// leaves the store untouched.
    pub fn insert(&mut self, source_key: &str, image: ImageReference) -> Result<()> {
        if let Some(existing) = self.mapping.get(source_key) {
            if existing.canonical_form() != image.canonical_form() {
                return Err(AppError::MappingConflict {
                    source_key: source_key.to_string(),
                    existing: existing.canonical_form(),
                    incoming: image.canonical_form(),
                });
            }
            return Ok(());
        }

        self.existing_repositories.insert(image.repository.clone());
        self.mapping.insert(source_key.to_string(), image);
        Ok(())
    }

    /// Rewrite the whole table on disk. The file is replaced atomically so a
    /// reader never observes a partial write.
    pub fn persist(&self) -> Result<()> {
        let records: Vec<MappingRecord> = self
            .mapping
            .iter()
            .map(|(source, image)| MappingRecord {
                source: source.clone(),
                repository: image.repository.clone(),
                tag: image.tag.clone(),
                digest: image.digest.clone(),
            })
            .collect();

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&serde_json::to_vec_pretty(&records)?)?;
        tmp.persist(&self.path).map_err(|e| AppError::Io(e.error))?;

        debug!("Saved {} mappings to {}", records.len(), self.path.display());
        Ok(())
    }
}
