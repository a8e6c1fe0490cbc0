use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::Deserialize;
use std::path::Path;
use std::sync::Mutex;

use crate::config::UploadConfig;

/// Result of pushing a local file to the media host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedMedia {
    #[serde(alias = "secure_url")]
    pub url: String,
    /// Seconds, for audio/video.
    #[serde(default)]
    pub duration: Option<f64>,
}

/// External blob/media host: takes a local file, returns its public URL.
///
/// Implementations remove the local file whether or not the upload succeeds.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, path: &Path) -> Result<UploadedMedia, anyhow::Error>;
}

pub struct HttpUploader {
    client: Client,
    url: String,
    api_key: String,
}

impl HttpUploader {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            client: Client::new(),
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        }
    }

    async fn send(&self, path: &Path) -> Result<UploadedMedia, anyhow::Error> {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let form = multipart::Form::new().part("file", multipart::Part::bytes(data).file_name(file_name));

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send upload request to {}: {}", self.url, e);
                anyhow::anyhow!("HTTP request failed: {}", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Media host responded with {}", status);
        }

        Ok(response.json::<UploadedMedia>().await?)
    }
}

#[async_trait]
impl MediaUploader for HttpUploader {
    async fn upload(&self, path: &Path) -> Result<UploadedMedia, anyhow::Error> {
        let result = self.send(path).await;
        remove_local(path).await;
        result
    }
}

async fn remove_local(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), "Failed to remove local upload: {}", e);
    }
}

/// Uploader for tests: returns a deterministic URL per file.
#[derive(Default)]
pub struct MockUploader {
    fail: bool,
    uploads: Mutex<Vec<String>>,
}

impl MockUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// An uploader whose every upload fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.uploads.lock().map(|u| u.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MediaUploader for MockUploader {
    async fn upload(&self, path: &Path) -> Result<UploadedMedia, anyhow::Error> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        remove_local(path).await;

        if self.fail {
            anyhow::bail!("mock upload failure");
        }

        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push(file_name.clone());
        }
        Ok(UploadedMedia {
            url: format!("https://media.test/{}", file_name),
            duration: Some(42.0),
        })
    }
}
