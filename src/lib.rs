pub mod config;
pub mod digest;
pub mod docker;
pub mod error;
pub mod hub;
pub mod manifest;
pub mod mapping;
pub mod mirror;
pub mod reference;
pub mod release;

// Re-export the core types for convenience
pub use digest::ContentDigest;
pub use error::{AppError, Result};
pub use manifest::LineRewriter;
pub use mapping::MappingStore;
pub use mirror::{CreateRepositoryOutcome, Mirrorer, RegistryClient, RegistryManagement};
pub use reference::ImageReference;
pub use release::ReleaseDescriptor;
