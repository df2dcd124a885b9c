
use std::{io::BufReader, path::Path, time::Duration};

use anyhow::anyhow;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use clap::builder::styling::AnsiColor;
use log::{debug, info, warn};
use tokio::{
    fs,
    task::spawn_blocking,
    time::{sleep, Instant},
};

use crate::{
    archive::name::parse_timestamp,
    chunk,
    error::{Error, Result},
    format::{format_path, format_size},
    hash::file_digest,
    remote::{Folder, Item, RemoteClient, UploadPart, UploadSession},
    task::BoundedJoinSet,
};

pub const DEFAULT_CHUNKED_THRESHOLD: u64 = 20 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadOptions {
    pub chunked_threshold: u64,
    pub max_in_flight: usize,
    pub poll_interval: Duration,
    pub max_poll_wait: Duration,
}

impl Default for UploadOptions {
    fn default() -> Self {
        UploadOptions {
            chunked_threshold: DEFAULT_CHUNKED_THRESHOLD,
            max_in_flight: 8,
            poll_interval: Duration::from_secs(2),
            max_poll_wait: Duration::from_secs(600),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadMode {
    SingleShot,
    Chunked,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadReport {
    pub mode: UploadMode,
    pub file_id: Option<String>,
    pub bytes: u64,
    pub parts: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    Created,
    PartsUploading,
    PartsProcessing,
    Committed,
    Failed,
}

/// Sends the archive at `path` into `folder`, in one request when it is
/// smaller than the chunked threshold and through an upload session otherwise.
pub async fn upload(
    client: &RemoteClient,
    folder: &Folder,
    path: &Path,
    options: &UploadOptions,
) -> Result<UploadReport> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} has no file name", format_path(path)))?;
    let size = fs::metadata(path).await?.len();
    if size == 0 {
        return Err(Error::EmptyArchive);
    }

    if size < options.chunked_threshold {
        upload_single_shot(client, folder, path, &name, size).await
    } else {
        upload_chunked(client, folder, path, &name, size, options).await
    }
}

async fn upload_single_shot(
    client: &RemoteClient,
    folder: &Folder,
    path: &Path,
    name: &str,
    size: u64,
) -> Result<UploadReport> {
    debug!("uploading {name} ({}) in one request", format_size(size));
    let data = Bytes::from(fs::read(path).await?);
    let created = parse_timestamp(name)
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or_else(Utc::now);

    let items = client.upload_file(folder, name, created, data).await?;
    let file_id = uploaded_file_id(&items);
    log_uploaded(name, file_id.as_deref());

    Ok(UploadReport {
        mode: UploadMode::SingleShot,
        file_id,
        bytes: size,
        parts: 1,
    })
}

async fn upload_chunked(
    client: &RemoteClient,
    folder: &Folder,
    path: &Path,
    name: &str,
    size: u64,
    options: &UploadOptions,
) -> Result<UploadReport> {
    let session = client.create_upload_session(folder, name, size).await?;
    debug!(
        "created upload session {} ({} parts of {})",
        session.id,
        session.total_parts,
        format_size(session.part_size)
    );
    if let Some(expires_at) = session.session_expires_at {
        debug!("upload session {} expires at {expires_at}", session.id);
    }

    let mut upload = SessionUpload {
        client,
        session,
        state: SessionState::Created,
    };

    match upload.run(path, size, options).await {
        Ok((file_id, parts)) => {
            log_uploaded(name, file_id.as_deref());
            Ok(UploadReport {
                mode: UploadMode::Chunked,
                file_id,
                bytes: size,
                parts,
            })
        }
        Err(err) => {
            upload.abort().await;
            Err(err)
        }
    }
}

struct SessionUpload<'a> {
    client: &'a RemoteClient,
    session: UploadSession,
    state: SessionState,
}

impl SessionUpload<'_> {
    async fn run(
        &mut self,
        path: &Path,
        size: u64,
        options: &UploadOptions,
    ) -> Result<(Option<String>, usize)> {
        self.check_part_count(size);

        self.advance(SessionState::PartsUploading);
        let mut uploaded = self.upload_parts(path, size, options.max_in_flight).await?;
        let part_count = uploaded.len();

        self.advance(SessionState::PartsProcessing);
        self.wait_until_processed(options).await?;

        uploaded.sort_by_key(|part| part.offset);
        let digest_path = path.to_owned();
        let digest = spawn_blocking(move || file_digest(&digest_path)).await??;
        let items = self
            .client
            .commit_session(&self.session.id, &uploaded, &digest)
            .await?;
        self.advance(SessionState::Committed);

        Ok((uploaded_file_id(&items), part_count))
    }

    fn check_part_count(&self, size: u64) {
        let expected = self.session.total_parts;
        let planned = chunk::part_count(size, self.session.part_size);
        if expected != 0 && expected != planned {
            warn!(
                "session {} expects {expected} parts but the archive splits into {planned}",
                self.session.id
            );
        }
    }

    /// Reads parts one at a time on the blocking pool and hands each to an
    /// upload task, so at most `max_in_flight` parts are held in memory.
    async fn upload_parts(
        &self,
        path: &Path,
        total: u64,
        max_in_flight: usize,
    ) -> Result<Vec<UploadPart>> {
        let file = fs::File::open(path).await?.into_std().await;
        let mut parts = chunk::parts(BufReader::new(file), self.session.part_size)?;
        let mut slots: Vec<Option<UploadPart>> = vec![];
        let mut first_error = None;
        let mut tasks = BoundedJoinSet::new(max_in_flight);

        loop {
            while let Some(joined) = tasks.try_join_next() {
                fill_slot(joined, &mut slots, &mut first_error);
            }
            if first_error.is_some() {
                break;
            }

            let (rest, next) = spawn_blocking(move || {
                let next = parts.next();
                (parts, next)
            })
            .await?;
            parts = rest;

            let part = match next {
                Some(Ok(part)) => part,
                Some(Err(err)) => {
                    first_error = Some(err);
                    break;
                }
                None => break,
            };

            debug!(
                "uploading part {}-{} ({})",
                part.begin,
                part.end,
                format_size(part.size())
            );
            let client = self.client.clone();
            let session_id = self.session.id.clone();
            slots.push(None);
            tasks
                .spawn(async move { client.upload_part(&session_id, part, total).await })
                .await?;
        }

        while let Some(joined) = tasks.join_next().await {
            fill_slot(joined, &mut slots, &mut first_error);
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        if slots.is_empty() {
            return Err(Error::EmptyArchive);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| Error::from(anyhow!("part {index} was never uploaded")))
            })
            .collect()
    }

    async fn wait_until_processed(&self, options: &UploadOptions) -> Result<()> {
        let started = Instant::now();

        loop {
            let status = self.client.session_status(&self.session.id).await?;
            let total_parts = if status.total_parts == 0 {
                self.session.total_parts
            } else {
                status.total_parts
            };
            if status.num_parts_processed >= total_parts {
                return Ok(());
            }

            let waited = started.elapsed();
            if waited >= options.max_poll_wait {
                return Err(Error::SessionTimeout {
                    session_id: self.session.id.clone(),
                    waited,
                });
            }

            debug!(
                "session {}: {}/{total_parts} parts processed",
                self.session.id, status.num_parts_processed
            );
            sleep(options.poll_interval.min(options.max_poll_wait - waited)).await;
        }
    }

    async fn abort(&mut self) {
        if self.state == SessionState::Committed {
            return;
        }

        self.advance(SessionState::Failed);
        match self.client.abort_session(&self.session.id).await {
            Ok(()) => debug!("aborted upload session {}", self.session.id),
            Err(err) => warn!("failed to abort upload session {}: {err}", self.session.id),
        }
    }

    fn advance(&mut self, state: SessionState) {
        debug!("session {}: {:?} -> {state:?}", self.session.id, self.state);
        self.state = state;
    }
}

fn fill_slot(
    joined: Result<(usize, Result<UploadPart>)>,
    slots: &mut [Option<UploadPart>],
    first_error: &mut Option<Error>,
) {
    match joined.and_then(|(index, result)| result.map(|part| (index, part))) {
        Ok((index, part)) => {
            let style = AnsiColor::Green.on_default();
            debug!(
                "{style}uploaded part{style:#} {} ({} at {})",
                part.part_id,
                format_size(part.size),
                part.offset
            );
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(part);
            }
        }
        Err(err) => {
            if first_error.is_none() {
                *first_error = Some(err);
            } else {
                debug!("ignoring later part failure: {err}");
            }
        }
    }
}

fn uploaded_file_id(items: &[Item]) -> Option<String> {
    items.first().map(|item| item.id.clone())
}

fn log_uploaded(name: &str, file_id: Option<&str>) {
    let style = AnsiColor::Green.on_default();
    match file_id {
        Some(id) => info!("{style}uploaded{style:#} {name} (file {id})"),
        None => info!("{style}uploaded{style:#} {name}"),
    }
}
