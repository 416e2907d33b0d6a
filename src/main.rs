mod config;
mod digest;
mod docker;
mod error;
mod hub;
mod manifest;
mod mapping;
mod mirror;
mod reference;
mod release;

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::docker::DockerCli;
use crate::error::{AppError, Result};
use crate::hub::DockerHub;
use crate::manifest::LineRewriter;
use crate::mapping::MappingStore;
use crate::mirror::{Mirrorer, RegistryClient, RegistryManagement};
use crate::release::ReleaseDescriptor;

#[derive(Debug, Parser)]
#[command(name = "imgmirror", about = "Mirror container images referenced by release manifests")]
struct Args {
    /// Override the catalog file listing manifest URLs
    #[arg(long)]
    catalog: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();

    let args = Args::parse();
    let config = AppConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    let catalog = args.catalog.unwrap_or_else(|| config.catalog.clone());
    let store = MappingStore::load(&config.cache)?;
    let client = DockerCli::new(config.docker.clone())?;
    let management = DockerHub::new(config.hub.api.clone(), config.hub.token.clone());
    let mut mirrorer = Mirrorer::new(config.namespace.clone(), store, client, management);
    let rewriter = LineRewriter::new(&config.registries)?;

    info!(
        "Synchronizing {:?} into {}/",
        config.registries, config.namespace
    );

    for url in read_catalog(&catalog)? {
        info!("Translating {}", url);
        match process_manifest(&config, &rewriter, &mut mirrorer, &url).await {
            Ok(output) => info!("Wrote {}", output.display()),
            Err(AppError::UnsupportedReleaseSource(source)) => {
                warn!("Skipping unrecognized release source {}", source);
            }
            Err(e) => return Err(e.into()),
        }
    }

    info!("Done: {} mappings", mirrorer.store().len());
    Ok(())
}

/// Manifest URLs from the catalog file, one per line, blank lines and
/// comments skipped.
fn read_catalog(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

async fn fetch_manifest_lines(url: &str) -> Result<Vec<String>> {
    let text = reqwest::get(url).await?.error_for_status()?.text().await?;
    Ok(text.lines().map(str::to_string).collect())
}

/// Fetch one manifest, rewrite its references, and write the result under
/// the output directory. Returns the path written.
async fn process_manifest<C, M>(
    config: &AppConfig,
    rewriter: &LineRewriter,
    mirrorer: &mut Mirrorer<C, M>,
    url: &str,
) -> Result<PathBuf>
where
    C: RegistryClient,
    M: RegistryManagement,
{
    let descriptor = ReleaseDescriptor::parse(url, &config.groups)?;
    let lines = fetch_manifest_lines(url).await?;
    let rewritten = rewriter.rewrite_manifest(mirrorer, lines).await?;

    std::fs::create_dir_all(&config.output)?;
    let output = config.output.join(descriptor.output_key());
    std::fs::write(&output, rewritten.join("\n") + "\n")?;
    Ok(output)
}
