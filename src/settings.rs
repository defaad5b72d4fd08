use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{detection::DetectionConfig, recording::RecordingConfig, reporting::ReportingConfig};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MonitorSettings {
    pub patient_name: String,
    pub camera_id: u32,
    pub user_id: u32,
    /// Geometry of frames produced by the camera.
    pub frame_width: u32,
    pub frame_height: u32,
    /// Zero disables the periodic diagnostics line.
    pub diagnostics_interval_secs: u64,
    pub detection: DetectionConfig,
    pub recording: RecordingConfig,
    pub reporting: ReportingConfig,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            patient_name: "patient".into(),
            camera_id: 1,
            user_id: 1,
            frame_width: 1920,
            frame_height: 1080,
            diagnostics_interval_secs: 5,
            detection: DetectionConfig::default(),
            recording: RecordingConfig::default(),
            reporting: ReportingConfig::default(),
        }
    }
}

impl MonitorSettings {
    /// Overlay identity, endpoint and storage credentials from the environment.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("FALLWATCH_PATIENT_NAME") {
            self.patient_name = name;
        }
        if let Some(id) = parse_var(&lookup, "FALLWATCH_CAMERA_ID") {
            self.camera_id = id;
        }
        if let Some(id) = parse_var(&lookup, "FALLWATCH_USER_ID") {
            self.user_id = id;
        }
        if let Some(url) = lookup("FALLWATCH_ALERT_URL") {
            self.reporting.alert_url = url;
        }
        if let Some(account) = lookup("AZURE_STORAGE_ACCOUNT") {
            self.reporting.storage.account = account;
        }
        if let Some(container) = lookup("AZURE_STORAGE_CONTAINER") {
            self.reporting.storage.container = container;
        }
        if let Some(token) = lookup("AZURE_STORAGE_SAS_TOKEN") {
            self.reporting.storage.sas_token = Some(token);
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }
}

fn parse_var<F>(lookup: &F, key: &str) -> Option<u32>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("ignoring {key}={raw:?}: not a number");
            None
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<MonitorSettings>,
}

impl SettingsStore {
    /// Load from `path`; a missing or unreadable file yields defaults.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Settings file {} is malformed ({err}); using defaults",
                    path.display()
                );
                MonitorSettings::default()
            })
        } else {
            MonitorSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn settings(&self) -> MonitorSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: MonitorSettings) -> Result<()> {
        let mut guard = self.write();
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &MonitorSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create settings directory {}", parent.display())
                })?;
            }
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, MonitorSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, MonitorSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
