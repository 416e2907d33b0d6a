use async_trait::async_trait;
use tracing::{debug, info};

use crate::digest::ContentDigest;
use crate::error::Result;
use crate::mapping::MappingStore;
use crate::reference::ImageReference;

/// Outcome of a repository creation request. `AlreadyExists` is treated as
/// success by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateRepositoryOutcome {
    Created,
    AlreadyExists,
}

/// Transfers image content between registries. Implementations return the
/// content digest of what was actually pushed; any failure aborts the
/// current reference.
#[async_trait]
pub trait RegistryClient {
    async fn pull(&self, reference: &str) -> Result<()>;
    async fn tag(&self, source: &str, destination: &str) -> Result<()>;
    async fn push(&self, destination: &str) -> Result<ContentDigest>;
}

/// Provisions destination repositories, once per newly discovered name.
#[async_trait]
pub trait RegistryManagement {
    async fn create_repository(
        &self,
        name: &str,
        description: &str,
    ) -> Result<CreateRepositoryOutcome>;
}

/// Mirrors one source reference at a time, exactly once, recording each
/// completed transfer in the mapping store before returning.
pub struct Mirrorer<C, M> {
    namespace: String,
    store: MappingStore,
    client: C,
    management: M,
}

impl<C: RegistryClient, M: RegistryManagement> Mirrorer<C, M> {
    pub fn new(namespace: String, store: MappingStore, client: C, management: M) -> Self {
        Self {
            namespace,
            store,
            client,
            management,
        }
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    /// Destination repository for a source repository path: every `/`
    /// becomes `.` and the configured namespace is prefixed. Distinct
    /// sources stay distinct as long as no source path already contains a
    /// `.` where another has a `/`; that case is not disambiguated.
    pub fn destination_repository(&self, source_repository: &str) -> String {
        format!("{}/{}", self.namespace, source_repository.replace('/', "."))
    }

    /// Ensure `source_key` is mirrored and return the mirrored reference
    /// string. A cached mapping short-circuits with no registry calls;
    /// otherwise the image is pulled, retagged, pushed, and the resulting
    /// mapping persisted before this returns.
    pub async fn process(&mut self, source_key: &str) -> Result<String> {
        if let Some(cached) = self.store.lookup(source_key) {
            debug!("{} already mirrored as {}", source_key, cached);
            return Ok(cached.canonical_form());
        }

        info!("Mirroring {}", source_key);
        let source = ImageReference::parse(source_key)?;
        let dest_repository = self.destination_repository(&source.repository);

        if !self.store.repository_exists(&dest_repository) {
            let outcome = self
                .management
                .create_repository(&dest_repository, &format!("Mirror of {}", source_key))
                .await?;
            debug!("Provisioned {}: {:?}", dest_repository, outcome);
            self.store.mark_repository_exists(&dest_repository);
        }

        let dest_tagged = match &source.tag {
            Some(tag) => format!("{}:{}", dest_repository, tag),
            None => dest_repository.clone(),
        };

        self.client.pull(source_key).await?;
        self.client.tag(source_key, &dest_tagged).await?;
        let digest = self.client.push(&dest_tagged).await?;

        let destination = ImageReference::new(dest_repository, source.tag.clone(), Some(digest));
        let mirrored = destination.canonical_form();

        self.store.insert(source_key, destination)?;
        self.store.persist()?;

        info!("Mirrored {} -> {}", source_key, mirrored);
        Ok(mirrored)
    }
}
