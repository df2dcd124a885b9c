mod from;

use std::{fmt::Display, path::PathBuf, time::Duration};

use serde::Deserialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no files found for `{0}`")]
    InputNotFound(String),

    #[error("directory `{0}` contains itself through a symlink")]
    SymlinkCycle(PathBuf),

    #[error("archive is empty")]
    EmptyArchive,

    #[error("part size {0} is invalid")]
    InvalidPartSize(u64),

    #[error("retention limit must be at least 1")]
    InvalidRetentionLimit,

    #[error("missing config value `{0}`")]
    MissingConfig(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("transport error: {message}")]
    Transport { message: String, retryable: bool },

    #[error("{0}")]
    Remote(RemoteError),

    #[error(
        "upload session `{session_id}` not ready after {}",
        humantime::format_duration(*waited)
    )]
    SessionTimeout { session_id: String, waited: Duration },

    #[error("{source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(AnyError),
}

/// Error body returned by the remote API for non-2xx responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub help_url: String,
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = if self.message.is_empty() {
            "remote request failed"
        } else {
            &self.message
        };

        write!(f, "{message} (status {}", self.status)?;
        if !self.code.is_empty() {
            write!(f, ", code `{}`", self.code)?;
        }
        if !self.request_id.is_empty() {
            write!(f, ", request id `{}`", self.request_id)?;
        }
        write!(f, ")")?;
        if !self.help_url.is_empty() {
            write!(f, ", see {}", self.help_url)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub struct AnyError(anyhow::Error);

impl Display for AnyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error {
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Other(AnyError(error.into()))
    }

    /// Whether resending the request cannot repeat work the remote has
    /// already done.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport { retryable: true, .. })
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Error::Other(AnyError(error))
    }
}
