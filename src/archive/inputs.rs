use std::{
    collections::HashSet,
    fs, io,
    os::unix::fs::MetadataExt,
    path::{Path, PathBuf},
};

use glob::glob;
use log::warn;

use crate::{
    error::{Error, Result},
    format::format_path,
};

type DirIdentity = (u64, u64);

#[derive(Clone, Debug)]
pub struct ArchiveJob {
    inputs: Vec<String>,
}

impl ArchiveJob {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inputs = inputs.into_iter().map(Into::into).collect();
        ArchiveJob { inputs }
    }

    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        let mut files = vec![];

        for pattern in &self.inputs {
            let matches = glob(pattern)?.collect::<std::result::Result<Vec<_>, _>>()?;
            if matches.is_empty() {
                return Err(Error::InputNotFound(pattern.clone()));
            }

            for path in matches {
                let mut ancestors = HashSet::new();
                expand(&path, &mut ancestors, &mut files)?;
            }
        }

        Ok(files)
    }
}

fn expand(path: &Path, ancestors: &mut HashSet<DirIdentity>, files: &mut Vec<PathBuf>) -> Result<()> {
    let metadata = fs::metadata(path)?;

    if metadata.is_file() {
        files.push(path.to_owned());
        return Ok(());
    }

    if !metadata.is_dir() {
        warn!("skipped special file {}", format_path(path));
        return Ok(());
    }

    let identity = (metadata.dev(), metadata.ino());
    if !ancestors.insert(identity) {
        return Err(Error::SymlinkCycle(path.to_owned()));
    }

    let mut children = fs::read_dir(path)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<io::Result<Vec<_>>>()?;
    children.sort();

    for child in children {
        expand(&child, ancestors, files)?;
    }

    ancestors.remove(&identity);
    Ok(())
}
