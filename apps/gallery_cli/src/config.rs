use std::{collections::HashMap, fs, path::Path, str::FromStr};

use anyhow::{anyhow, Context};
use gallery_client::{cloud_upload_url, UploadContract};
use shared::domain::DEFAULT_EVENT_TAG;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    Backend,
    MediaHost,
}

impl FromStr for UploadMode {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "backend" => Ok(Self::Backend),
            "media_host" | "media-host" | "direct" => Ok(Self::MediaHost),
            other => Err(anyhow!("unknown upload contract: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_url: String,
    pub upload_mode: UploadMode,
    pub media_host_upload_url: Option<String>,
    pub media_host_cloud_name: Option<String>,
    pub media_host_upload_preset: Option<String>,
    pub default_tag: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5000".into(),
            upload_mode: UploadMode::Backend,
            media_host_upload_url: None,
            media_host_cloud_name: None,
            media_host_upload_preset: None,
            default_tag: DEFAULT_EVENT_TAG.into(),
        }
    }
}

impl Settings {
    pub fn upload_contract(&self) -> anyhow::Result<UploadContract> {
        match self.upload_mode {
            UploadMode::Backend => Ok(UploadContract::backend(self.backend_url.clone())),
            UploadMode::MediaHost => {
                let upload_url = self
                    .media_host_upload_url
                    .clone()
                    .or_else(|| self.media_host_cloud_name.as_deref().map(cloud_upload_url))
                    .context("media host uploads need an upload url or a cloud name")?;
                let upload_preset = self
                    .media_host_upload_preset
                    .clone()
                    .context("media host uploads need an upload preset")?;
                Ok(UploadContract::media_host(upload_url, upload_preset))
            }
        }
    }
}

pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        apply_file_config(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<HashMap<String, String>>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(error = %err, "ignoring unreadable gallery config file");
            return;
        }
    };

    if let Some(v) = file_cfg.get("backend_url") {
        settings.backend_url = v.clone();
    }
    if let Some(v) = file_cfg.get("upload_contract") {
        set_upload_mode(settings, v);
    }
    if let Some(v) = file_cfg.get("media_host_upload_url") {
        settings.media_host_upload_url = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("media_host_cloud_name") {
        settings.media_host_cloud_name = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("media_host_upload_preset") {
        settings.media_host_upload_preset = Some(v.clone());
    }
    if let Some(v) = file_cfg.get("default_tag") {
        settings.default_tag = v.clone();
    }
}

fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("GALLERY_BACKEND_URL") {
        settings.backend_url = v;
    }
    if let Some(v) = var("APP__BACKEND_URL") {
        settings.backend_url = v;
    }

    if let Some(v) = var("APP__UPLOAD_CONTRACT") {
        set_upload_mode(settings, &v);
    }

    if let Some(v) = var("APP__MEDIA_HOST_UPLOAD_URL") {
        settings.media_host_upload_url = Some(v);
    }
    if let Some(v) = var("APP__MEDIA_HOST_CLOUD_NAME") {
        settings.media_host_cloud_name = Some(v);
    }
    if let Some(v) = var("APP__MEDIA_HOST_UPLOAD_PRESET") {
        settings.media_host_upload_preset = Some(v);
    }

    if let Some(v) = var("APP__DEFAULT_TAG") {
        settings.default_tag = v;
    }
}

fn set_upload_mode(settings: &mut Settings, raw: &str) {
    match raw.parse() {
        Ok(mode) => settings.upload_mode = mode,
        Err(err) => warn!(error = %err, "keeping {:?} upload contract", settings.upload_mode),
    }
}
