
use std::path::PathBuf;

use clap::builder::styling::AnsiColor;
use log::{info, warn};
use tokio::task::spawn_blocking;

use crate::{
    archive::{
        build_archive,
        name::{file_name, now_millis},
        ArchiveJob, BuiltArchive,
    },
    error::Result,
    format::{format_path, format_size},
    remote::RemoteClient,
    retention::RetentionPolicy,
    stats::BackupStats,
    storage::{LocalStore, RemoteStore},
};

use super::{
    cleanup::{prune, PruneReport},
    upload::{upload, UploadOptions, UploadReport},
};

#[derive(Clone, Debug)]
pub struct BackupPlan {
    pub inputs: Vec<String>,
    pub output_dir: PathBuf,
    pub folder_name: String,
    pub retention: RetentionPolicy,
    pub upload: UploadOptions,
}

#[derive(Debug)]
pub struct BackupOutcome {
    pub archive: BuiltArchive,
    pub upload: UploadReport,
    pub local: PruneReport,
    pub remote: PruneReport,
}

/// Archives the plan's inputs into the output directory, uploads the archive
/// and prunes old backups from both places.
pub async fn run(
    plan: BackupPlan,
    client: &RemoteClient,
    stats: &mut BackupStats,
) -> Result<BackupOutcome> {
    let job = ArchiveJob::new(plan.inputs.iter().cloned());
    let output_dir = plan.output_dir.clone();
    let name = file_name(now_millis());
    let archive = spawn_blocking(move || build_archive(&job, &output_dir, &name)).await??;
    stats.files_archived = archive.summary.files;
    stats.bytes_archived = archive.summary.bytes;
    stats.archive_size = archive.size;

    let style = AnsiColor::Green.on_default();
    info!(
        "{style}created archive{style:#} {} ({} files, {})",
        format_path(&archive.path),
        archive.summary.files,
        format_size(archive.size)
    );

    let folder = client.find_or_create_folder(&plan.folder_name).await?;
    let upload = upload(client, &folder, &archive.path, &plan.upload).await?;
    stats.parts_uploaded = upload.parts as u64;

    let local_store = LocalStore::new(&plan.output_dir);
    let remote_store = RemoteStore::new(client.clone(), folder);
    let local = prune(&local_store, plan.retention).await;
    let remote = prune(&remote_store, plan.retention).await;
    let (local, remote) = match (local, remote) {
        (Ok(local), Ok(remote)) => (local, remote),
        (Err(err), Ok(_)) | (Ok(_), Err(err)) => return Err(err),
        (Err(err), Err(remote_err)) => {
            warn!("pruning remote backups failed: {remote_err}");
            return Err(err);
        }
    };

    Ok(BackupOutcome {
        archive,
        upload,
        local,
        remote,
    })
}
