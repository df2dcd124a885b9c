mod local;
mod remote;
#[cfg(test)]
mod tests;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::{error::Result, retention::Entry};

pub use {local::LocalStore, remote::RemoteStore};

/// A place where finished backups are kept.
#[async_trait]
pub trait BackupStore: Debug + Send + Sync {
    fn kind(&self) -> &'static str;

    /// Backups currently held, in no particular order. Names that don't
    /// carry a timestamp are skipped.
    async fn entries(&self) -> Result<Vec<Entry>>;

    async fn delete(&self, entry: &Entry) -> Result<()>;
}
