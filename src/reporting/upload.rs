use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::config::BlobStorageConfig;
use super::error::{DeliveryError, DeliveryResult};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

#[async_trait]
pub trait ClipUploader: Send + Sync {
    /// Upload a clip that is already durable on local disk.
    async fn upload(&self, path: &Path, filename: &str) -> DeliveryResult<()>;
}

/// Block-blob `PUT` authorised by a SAS token.
pub struct BlobUploader {
    http: Client,
    container_url: String,
    sas_token: String,
}

impl BlobUploader {
    pub fn new(config: &BlobStorageConfig, timeout: Duration) -> DeliveryResult<Self> {
        if !config.is_configured() {
            return Err(DeliveryError::Config(
                "storage account and container are required".into(),
            ));
        }
        let sas_token = config
            .sas_token
            .clone()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| DeliveryError::Config("AZURE_STORAGE_SAS_TOKEN not set".into()))?;

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            container_url: config.container_url(),
            sas_token,
        })
    }

    fn blob_url(&self, filename: &str) -> String {
        format!(
            "{}/{}?{}",
            self.container_url,
            filename,
            self.sas_token.trim_start_matches('?')
        )
    }
}

#[async_trait]
impl ClipUploader for BlobUploader {
    async fn upload(&self, path: &Path, filename: &str) -> DeliveryResult<()> {
        let body = tokio::fs::read(path).await?;
        log_debug!("uploading {} ({} bytes)", path.display(), body.len());

        let response = self
            .http
            .put(self.blob_url(filename))
            .header("x-ms-blob-type", "BlockBlob")
            .header("content-type", "video/mp4")
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Upload(format!(
                "storage returned {status}: {text}"
            )));
        }

        log_info!("uploaded {filename} to {}", self.container_url);
        Ok(())
    }
}

/// Leaves clips on local disk (dry runs).
pub struct LocalOnlyUploader;

#[async_trait]
impl ClipUploader for LocalOnlyUploader {
    async fn upload(&self, path: &Path, _filename: &str) -> DeliveryResult<()> {
        log::info!("[dry-run] keeping clip local at {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn storage(token: Option<&str>) -> BlobStorageConfig {
        BlobStorageConfig {
            account: "acct".into(),
            container: "clips".into(),
            sas_token: token.map(str::to_string),
        }
    }

    #[test]
    fn requires_sas_token() {
        assert!(matches!(
            BlobUploader::new(&storage(None), Duration::from_secs(1)),
            Err(DeliveryError::Config(_))
        ));
        assert!(matches!(
            BlobUploader::new(&BlobStorageConfig::default(), Duration::from_secs(1)),
            Err(DeliveryError::Config(_))
        ));
    }

    #[test]
    fn blob_url_appends_token() {
        let uploader = BlobUploader::new(&storage(Some("?sv=1&sig=abc")), Duration::from_secs(1))
            .unwrap();
        assert_eq!(
            uploader.blob_url("bob-1-20240307-090542.mp4"),
            "https://acct.blob.core.windows.net/clips/bob-1-20240307-090542.mp4?sv=1&sig=abc"
        );
    }

    #[tokio::test]
    async fn puts_block_blob() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(header("x-ms-blob-type", "BlockBlob"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let clip = dir.path().join("clip.mp4");
        std::fs::write(&clip, b"not really mp4").unwrap();

        let mut uploader =
            BlobUploader::new(&storage(Some("sv=1")), Duration::from_secs(5)).unwrap();
        uploader.container_url = format!("{}/clips", server.uri());

        uploader.upload(&clip, "clip.mp4").await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let uploader = BlobUploader::new(&storage(Some("sv=1")), Duration::from_secs(1)).unwrap();
        let err = uploader
            .upload(Path::new("/definitely/not/here.mp4"), "here.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Io(_)));
    }
}
