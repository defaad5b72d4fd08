use serde::{Deserialize, Serialize};

/// Blob container receiving finished clips.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct BlobStorageConfig {
    pub account: String,
    pub container: String,
    /// Shared access signature query string. Read from the environment only.
    #[serde(skip_serializing)]
    pub sas_token: Option<String>,
}

impl BlobStorageConfig {
    pub fn is_configured(&self) -> bool {
        !self.account.is_empty() && !self.container.is_empty()
    }

    pub fn container_url(&self) -> String {
        format!(
            "https://{}.blob.core.windows.net/{}",
            self.account, self.container
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportingConfig {
    pub alert_url: String,
    /// Overrides the URL prefix placed in alerts; defaults to the container URL.
    pub video_base_url: Option<String>,
    pub storage: BlobStorageConfig,
    pub request_timeout_secs: u64,
    /// Zero disables periodic movement summaries.
    pub movement_report_interval_secs: u64,
    /// Finished clips waiting for delivery before new ones are dropped.
    pub queue_depth: usize,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            alert_url: "http://localhost:8080/api/alerts".into(),
            video_base_url: None,
            storage: BlobStorageConfig::default(),
            request_timeout_secs: 30,
            movement_report_interval_secs: 3600,
            queue_depth: 4,
        }
    }
}

impl ReportingConfig {
    pub fn video_base_url(&self) -> String {
        match &self.video_base_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => self.storage.container_url(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_base_defaults_to_container() {
        let mut config = ReportingConfig::default();
        config.storage.account = "acct".into();
        config.storage.container = "clips".into();
        assert_eq!(
            config.video_base_url(),
            "https://acct.blob.core.windows.net/clips"
        );

        config.video_base_url = Some("https://cdn.example.com/v".into());
        assert_eq!(config.video_base_url(), "https://cdn.example.com/v");
    }

    #[test]
    fn sas_token_never_serialized() {
        let storage = BlobStorageConfig {
            account: "acct".into(),
            container: "clips".into(),
            sas_token: Some("sv=secret".into()),
        };
        let text = serde_json::to_string(&storage).unwrap();
        assert!(!text.contains("secret"));
    }
}
