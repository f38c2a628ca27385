pub mod comment;
pub mod forge;
pub mod status;
pub mod token;
pub mod webhook;

use std::sync::Arc;

use anyhow::{Context, Result};
use codenotify_run_core::config::{GitHubAppConfig, GitHubConfig};
use octocrab::{
    Octocrab,
    models::{AppId, InstallationId},
};

use crate::token::InstallationToken;

/// App-authenticated GitHub client, used to mint installation credentials.
#[derive(Clone)]
pub struct GitHub {
    pub app_client: Octocrab,
}

/// Installation-scoped client and the token backing it.
pub struct Installation {
    pub client: Octocrab,
    pub token: InstallationToken,
}

impl GitHub {
    pub async fn new(config: &GitHubConfig) -> Result<Arc<Self>> {
        let app_client = app_client(&config.app)?;
        let app = app_client.current().app().await.context("Failed to fetch app")?;
        tracing::info!("Authenticated as app {} ({})", app.name, config.app.id);
        Ok(Arc::new(Self { app_client }))
    }

    /// Exchange the app identity for a token scoped to `installation_id`.
    ///
    /// Token issuance is not retried.
    pub async fn installation(&self, installation_id: u64) -> Result<Installation> {
        let (client, token) = self
            .app_client
            .installation_and_token(InstallationId(installation_id))
            .await
            .context("create installation access token")?;
        let token = InstallationToken::new(token)?;
        Ok(Installation { client, token })
    }
}

pub fn app_client(config: &GitHubAppConfig) -> Result<Octocrab> {
    let key = jsonwebtoken::EncodingKey::from_rsa_pem(config.private_key.as_bytes())
        .context("Failed to parse GitHub app private key")?;
    Octocrab::builder().app(AppId(config.id), key).build().context("Failed to create GitHub client")
}
