use std::path::{Path, PathBuf};

use async_trait::async_trait;
use glob::Pattern;
use log::debug;
use tokio::{fs, task::spawn_blocking};

use crate::{
    archive::name::{parse_timestamp, EXTENSION},
    error::Result,
    format::format_path,
    retention::Entry,
};

use super::BackupStore;

#[derive(Clone, Debug)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        LocalStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn pattern(&self) -> String {
        let dir = Pattern::escape(&self.path.to_string_lossy());
        format!("{dir}/*{EXTENSION}")
    }
}

#[async_trait]
impl BackupStore for LocalStore {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn entries(&self) -> Result<Vec<Entry>> {
        let pattern = self.pattern();
        let paths = spawn_blocking(move || -> Result<Vec<PathBuf>> {
            let mut paths = vec![];
            for path in glob::glob(&pattern)? {
                paths.push(path?);
            }
            Ok(paths)
        })
        .await??;

        let mut entries = vec![];
        for path in paths {
            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let Some(created) = parse_timestamp(name) else {
                debug!("ignoring {}", format_path(&path));
                continue;
            };

            entries.push(Entry {
                id: path.to_string_lossy().into_owned(),
                name: name.to_owned(),
                created,
            });
        }

        Ok(entries)
    }

    async fn delete(&self, entry: &Entry) -> Result<()> {
        fs::remove_file(&entry.id).await?;
        Ok(())
    }
}
