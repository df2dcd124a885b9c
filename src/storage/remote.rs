use async_trait::async_trait;
use log::debug;

use crate::{
    archive::name::parse_timestamp,
    error::Result,
    remote::{Folder, RemoteClient},
    retention::Entry,
};

use super::BackupStore;

#[derive(Clone, Debug)]
pub struct RemoteStore {
    client: RemoteClient,
    folder: Folder,
}

impl RemoteStore {
    pub fn new(client: RemoteClient, folder: Folder) -> Self {
        RemoteStore { client, folder }
    }
}

#[async_trait]
impl BackupStore for RemoteStore {
    fn kind(&self) -> &'static str {
        "remote"
    }

    async fn entries(&self) -> Result<Vec<Entry>> {
        let items = self.client.list_all_items(&self.folder).await?;
        let entries = items
            .into_iter()
            .filter(|item| item.is_file())
            .filter_map(|item| {
                let Some(created) = parse_timestamp(&item.name) else {
                    debug!("ignoring remote item `{}`", item.name);
                    return None;
                };
                Some(Entry {
                    id: item.id,
                    name: item.name,
                    created,
                })
            })
            .collect();
        Ok(entries)
    }

    async fn delete(&self, entry: &Entry) -> Result<()> {
        self.client.delete_file(&entry.id).await
    }
}
