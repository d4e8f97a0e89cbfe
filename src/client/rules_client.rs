use crate::client::status::PrepackagedStatus;
use crate::config::types::ApiConfig;
use crate::poller::{StatusSnapshot, StatusSource};
use async_trait::async_trait;
use serde::Deserialize;
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API returned error status {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("request cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Response of the install endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstallResponse {
    #[serde(default)]
    pub rules_installed: u64,
    #[serde(default)]
    pub rules_updated: u64,
    #[serde(default)]
    pub timelines_installed: u64,
    #[serde(default)]
    pub timelines_updated: u64,
}

/// HTTP client for the pre-packaged rules endpoints
#[derive(Debug, Clone)]
pub struct RulesClient {
    base_url: String,
    install_path: String,
    status_path: String,
    credentials: Option<(String, Option<String>)>,
    client: reqwest::Client,
}

impl RulesClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            install_path: config.install_path.clone(),
            status_path: config.status_path.clone(),
            credentials: config
                .username
                .clone()
                .map(|user| (user, config.password.clone())),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .header("kbn-xsrf", "true");

        match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, password.as_ref()),
            None => builder,
        }
    }

    /// Ask the server to install or update the pre-packaged content
    pub async fn trigger_install(&self, cancel: &CancellationToken) -> Result<InstallResponse> {
        let request = self.request(reqwest::Method::PUT, &self.install_path);
        let response = with_cancel(cancel, request.send()).await??;
        let response = check_status(response).await?;

        let body = with_cancel(cancel, response.text()).await??;
        if body.trim().is_empty() {
            return Ok(InstallResponse::default());
        }
        let installed: InstallResponse = serde_json::from_str(&body)?;

        debug!(
            rules_installed = installed.rules_installed,
            rules_updated = installed.rules_updated,
            timelines_installed = installed.timelines_installed,
            timelines_updated = installed.timelines_updated,
            "Install request accepted"
        );
        Ok(installed)
    }

    /// Read the current install status
    pub async fn get_status(&self, cancel: &CancellationToken) -> Result<PrepackagedStatus> {
        let request = self.request(reqwest::Method::GET, &self.status_path);
        let response = with_cancel(cancel, request.send()).await??;
        let response = check_status(response).await?;

        let status = with_cancel(cancel, response.json::<PrepackagedStatus>()).await??;
        Ok(status)
    }
}

#[async_trait]
impl StatusSource for RulesClient {
    type Error = ClientError;

    async fn trigger(&self, cancel: &CancellationToken) -> Result<()> {
        self.trigger_install(cancel).await.map(|_| ())
    }

    async fn status(&self, cancel: &CancellationToken) -> Result<StatusSnapshot> {
        Ok(self.get_status(cancel).await?.to_snapshot())
    }
}

async fn with_cancel<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        output = fut => Ok(output),
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    Err(ClientError::ApiError {
        status: response.status().as_u16(),
        message: response.text().await.unwrap_or_default(),
    })
}
