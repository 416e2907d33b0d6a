use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode, header};
use tracing::info;

use crate::error::{AppError, Result};
use crate::mirror::{CreateRepositoryOutcome, RegistryManagement};

/// Registry management backed by the Docker Hub repositories API.
pub struct DockerHub {
    api_url: String,
    token: Option<String>,
    client: ReqwestClient,
}

impl DockerHub {
    pub fn new(api_url: String, token: Option<String>) -> Self {
        Self {
            api_url,
            token,
            client: ReqwestClient::new(),
        }
    }
}

#[async_trait]
impl RegistryManagement for DockerHub {
    async fn create_repository(
        &self,
        name: &str,
        description: &str,
    ) -> Result<CreateRepositoryOutcome> {
        let Some((namespace, repository)) = name.split_once('/') else {
            return Err(AppError::Provisioning(format!(
                "destination repository {} has no namespace",
                name
            )));
        };

        let body = serde_json::json!({
            "namespace": namespace,
            "name": repository,
            "is_private": false,
            "description": description,
        });

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(token) = &self.token {
            request = request.header(header::AUTHORIZATION, format!("JWT {}", token));
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::CREATED {
            info!("Created repository {}", name);
            return Ok(CreateRepositoryOutcome::Created);
        }

        // The API answers 400 for a repository that is already there.
        let text = response.text().await?;
        if status == StatusCode::BAD_REQUEST && text.contains("already exists") {
            return Ok(CreateRepositoryOutcome::AlreadyExists);
        }

        Err(AppError::Provisioning(format!(
            "failed to create {}: {} {}",
            name, status, text
        )))
    }
}
