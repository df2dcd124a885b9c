mod duration;

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    format::format_path,
    ops::upload::{UploadOptions, DEFAULT_CHUNKED_THRESHOLD},
    remote::{Credentials, RetryPolicy},
    retention::RetentionPolicy,
};

pub const ENV_VAR_CONFIG: &str = "BOXUP_CONFIG";

const CONFIG_DIR: &str = ".boxup";
const CONFIG_FILE: &str = "config.yaml";
const MAX_IN_FLIGHT: usize = 1024;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backup_limit: u64,
    pub remote: RemoteConfig,
    pub upload: UploadConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub backup_folder_name: String,
    pub client_id: String,
    pub client_secret: String,
    pub subject_type: String,
    pub subject_id: String,
    pub api_url: String,
    pub upload_url: String,
    pub token_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub chunked_threshold: u64,
    pub max_in_flight: usize,
    #[serde(with = "duration")]
    pub poll_interval: Duration,
    #[serde(with = "duration")]
    pub max_poll_wait: Duration,
    pub retry_attempts: u32,
    #[serde(with = "duration")]
    pub retry_backoff: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backup_limit: 50,
            remote: RemoteConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            backup_folder_name: "backups".to_owned(),
            client_id: String::new(),
            client_secret: String::new(),
            subject_type: "enterprise".to_owned(),
            subject_id: String::new(),
            api_url: "https://api.box.com/2.0".to_owned(),
            upload_url: "https://upload.box.com/api/2.0".to_owned(),
            token_url: "https://api.box.com/oauth2/token".to_owned(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        let options = UploadOptions::default();
        UploadConfig {
            chunked_threshold: DEFAULT_CHUNKED_THRESHOLD,
            max_in_flight: options.max_in_flight,
            poll_interval: options.poll_interval,
            max_poll_wait: options.max_poll_wait,
            retry_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::InvalidConfig("cannot locate home directory".to_owned()))?;
        Ok(home.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Loads the config at `path`, writing the defaults there first if the
    /// file does not exist yet.
    pub fn load_or_init(path: &Path) -> Result<Config> {
        match Config::load(path) {
            Err(Error::Io { source }) if source.kind() == ErrorKind::NotFound => {
                let config = Config::default();
                config.save(path)?;
                info!("wrote default config to {}", format_path(path));
                Ok(config)
            }
            result => result,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let remote = &self.remote;
        let required = [
            ("remote.backup_folder_name", &remote.backup_folder_name),
            ("remote.client_id", &remote.client_id),
            ("remote.client_secret", &remote.client_secret),
            ("remote.subject_type", &remote.subject_type),
            ("remote.subject_id", &remote.subject_id),
            ("remote.api_url", &remote.api_url),
            ("remote.upload_url", &remote.upload_url),
            ("remote.token_url", &remote.token_url),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(Error::MissingConfig(*field));
        }

        RetentionPolicy::new(self.backup_limit)?;

        let upload = &self.upload;
        if !(1..=MAX_IN_FLIGHT).contains(&upload.max_in_flight) {
            return Err(Error::InvalidConfig(format!(
                "upload.max_in_flight must be in range 1-{MAX_IN_FLIGHT}"
            )));
        }
        if upload.poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "upload.poll_interval must be positive".to_owned(),
            ));
        }

        Ok(())
    }

    pub fn retention_policy(&self) -> Result<RetentionPolicy> {
        RetentionPolicy::new(self.backup_limit)
    }

    pub fn credentials(&self) -> Credentials {
        let remote = self.remote.clone();
        Credentials {
            token_url: remote.token_url,
            client_id: remote.client_id,
            client_secret: remote.client_secret,
            subject_type: remote.subject_type,
            subject_id: remote.subject_id,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.upload.retry_attempts,
            backoff: self.upload.retry_backoff,
        }
    }

    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            chunked_threshold: self.upload.chunked_threshold,
            max_in_flight: self.upload.max_in_flight,
            poll_interval: self.upload.poll_interval,
            max_poll_wait: self.upload.max_poll_wait,
        }
    }
}
