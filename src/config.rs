use std::env;
use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Durable mapping store file
    pub cache: PathBuf,
    /// Directory for rewritten manifests
    pub output: PathBuf,
    /// File listing manifest URLs, one per line
    pub catalog: PathBuf,
    /// Destination namespace every mirrored repository lands under
    pub namespace: String,
    /// Registry hosts whose references are mirrored
    pub registries: Vec<String>,
    /// GitHub groups whose release URLs are recognized
    pub groups: Vec<String>,
    /// Binary used for pull/tag/push
    pub docker: String,
    pub hub: HubConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    pub api: String,
    pub token: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "dev".into());

        let config = Config::builder()
            // Start with default values
            .set_default("cache", "mapping.json")?
            .set_default("output", "output")?
            .set_default("catalog", "releases.txt")?
            .set_default("namespace", "mirror")?
            .set_default("registries", vec!["gcr.io", "cgr.dev"])?
            .set_default("groups", vec!["knative", "tektoncd"])?
            .set_default("docker", "docker")?
            .set_default("hub.api", "https://hub.docker.com/v2/repositories/")?
            // Add configuration from files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables with prefix IMGMIRROR_
            .add_source(Environment::with_prefix("IMGMIRROR").separator("_"))
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache: PathBuf::from("mapping.json"),
            output: PathBuf::from("output"),
            catalog: PathBuf::from("releases.txt"),
            namespace: "mirror".to_string(),
            registries: vec!["gcr.io".to_string(), "cgr.dev".to_string()],
            groups: vec!["knative".to_string(), "tektoncd".to_string()],
            docker: "docker".to_string(),
            hub: HubConfig {
                api: "https://hub.docker.com/v2/repositories/".to_string(),
                token: None,
            },
        }
    }
}
