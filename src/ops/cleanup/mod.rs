
use clap::builder::styling::AnsiColor;
use log::{debug, info, warn};

use crate::{
    error::Result,
    format::format_millis,
    retention::{select_expired, Entry, RetentionPolicy},
    storage::BackupStore,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub kept: usize,
    pub deleted: Vec<Entry>,
}

/// Deletes every backup in `store` beyond the newest `policy.limit()`.
///
/// Each deletion is attempted even when an earlier one fails; the first
/// failure is returned afterwards and already deleted backups stay deleted.
pub async fn prune(store: &dyn BackupStore, policy: RetentionPolicy) -> Result<PruneReport> {
    let entries = store.entries().await?;
    let total = entries.len();
    let expired = select_expired(entries, policy);
    if expired.is_empty() {
        debug!("{} backups: {total} held, nothing to prune", store.kind());
        return Ok(PruneReport {
            kept: total,
            deleted: vec![],
        });
    }

    let mut deleted = vec![];
    let mut first_error = None;
    for entry in expired {
        match store.delete(&entry).await {
            Ok(()) => {
                let style = AnsiColor::Yellow.on_default();
                debug!(
                    "{style}deleted{style:#} {} backup {} ({})",
                    store.kind(),
                    entry.name,
                    format_millis(entry.created)
                );
                deleted.push(entry);
            }
            Err(err) => {
                warn!("failed to delete {} backup {}: {err}", store.kind(), entry.name);
                first_error.get_or_insert(err);
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    info!(
        "pruned {} {} backups, kept {}",
        deleted.len(),
        store.kind(),
        policy.limit()
    );
    Ok(PruneReport {
        kept: total - deleted.len(),
        deleted,
    })
}
