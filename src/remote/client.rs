use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::{chunk::FilePart, error::Result, hash::Digest};

use super::{
    remote_error,
    types::{
        CommitRequest, CreateFolderRequest, CreateSessionRequest, Entries, Page, ParentRef,
        UploadAttributes, UploadPartResponse,
    },
    Execute, Folder, Item, Request, Response, UploadPart, UploadSession,
};

pub const ROOT_FOLDER_ID: &str = "0";
pub const MAX_ITEMS_PER_REQUEST: u64 = 1000;

/// Folder and file operations of the remote store.
#[derive(Clone, Debug)]
pub struct RemoteClient {
    executor: Arc<dyn Execute>,
    api_url: String,
    upload_url: String,
}

impl RemoteClient {
    pub fn new<A: Into<String>, U: Into<String>>(
        executor: Arc<dyn Execute>,
        api_url: A,
        upload_url: U,
    ) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_owned();
        let upload_url = upload_url.into().trim_end_matches('/').to_owned();
        RemoteClient {
            executor,
            api_url,
            upload_url,
        }
    }

    pub async fn search_folders(&self, name: &str) -> Result<Vec<Folder>> {
        let request = Request::new(Method::GET, self.api("/search"))
            .query("query", name)
            .query("type", "folder");
        let page: Page<Folder> = self.send_json(request).await?;
        Ok(page.entries)
    }

    pub async fn create_folder(&self, name: &str, parent_id: &str) -> Result<Folder> {
        let body = CreateFolderRequest {
            name,
            parent: ParentRef { id: parent_id },
        };
        let request = Request::new(Method::POST, self.api("/folders")).json(&body)?;
        self.send_json(request).await
    }

    pub async fn find_or_create_folder(&self, name: &str) -> Result<Folder> {
        debug!("looking for backup folder `{name}`");
        let folders = self.search_folders(name).await?;
        if let Some(folder) = folders.into_iter().find(|folder| folder.name == name) {
            debug!("found backup folder `{name}` ({})", folder.id);
            return Ok(folder);
        }

        info!("creating backup folder `{name}`");
        self.create_folder(name, ROOT_FOLDER_ID).await
    }

    pub async fn list_items(&self, folder: &Folder, limit: u64, offset: u64) -> Result<Page<Item>> {
        let path = format!("/folders/{}/items", folder.id);
        let request = Request::new(Method::GET, self.api(&path))
            .query("limit", limit)
            .query("offset", offset)
            .query("sort", "name")
            .query("direction", "DESC");
        self.send_json(request).await
    }

    pub async fn list_all_items(&self, folder: &Folder) -> Result<Vec<Item>> {
        let mut items = vec![];

        loop {
            let offset = items.len() as u64;
            let page = self.list_items(folder, MAX_ITEMS_PER_REQUEST, offset).await?;
            let count = page.entries.len() as u64;
            items.extend(page.entries);

            if count == 0 || offset + count >= page.total_count {
                break;
            }
        }

        Ok(items)
    }

    pub async fn delete_file(&self, id: &str) -> Result<()> {
        let path = format!("/files/{id}");
        let request = Request::new(Method::DELETE, self.api(&path));
        self.send(request).await?;
        Ok(())
    }

    pub async fn upload_file(
        &self,
        folder: &Folder,
        name: &str,
        created: DateTime<Utc>,
        data: Bytes,
    ) -> Result<Vec<Item>> {
        let timestamp = created.to_rfc3339_opts(SecondsFormat::Secs, true);
        let attributes = UploadAttributes {
            name,
            parent: ParentRef { id: &folder.id },
            content_created_at: timestamp.clone(),
            content_modified_at: timestamp,
        };
        let attributes = serde_json::to_string(&attributes)?;
        let request = Request::new(Method::POST, self.upload("/files/content")).multipart(
            attributes,
            name.to_owned(),
            data,
        );
        let entries: Entries = self.send_json(request).await?;
        Ok(entries.entries)
    }

    pub async fn create_upload_session(
        &self,
        folder: &Folder,
        name: &str,
        size: u64,
    ) -> Result<UploadSession> {
        let body = CreateSessionRequest {
            file_name: name,
            file_size: size,
            folder_id: &folder.id,
        };
        let request =
            Request::new(Method::POST, self.upload("/files/upload_sessions")).json(&body)?;
        self.send_json(request).await
    }

    pub async fn upload_part(&self, session_id: &str, part: FilePart, total: u64) -> Result<UploadPart> {
        let path = format!("/files/upload_sessions/{session_id}");
        let request = Request::new(Method::PUT, self.upload(&path))
            .header("content-type", "application/octet-stream")
            .header("content-range", part.content_range(total))
            .header("digest", part.digest.header_value())
            .bytes(part.data.into());
        let response: UploadPartResponse = self.send_json(request).await?;
        Ok(response.part)
    }

    pub async fn session_status(&self, session_id: &str) -> Result<UploadSession> {
        let path = format!("/files/upload_sessions/{session_id}");
        let request = Request::new(Method::GET, self.upload(&path));
        self.send_json(request).await
    }

    pub async fn commit_session(
        &self,
        session_id: &str,
        parts: &[UploadPart],
        digest: &Digest,
    ) -> Result<Vec<Item>> {
        let path = format!("/files/upload_sessions/{session_id}/commit");
        let request = Request::new(Method::POST, self.upload(&path))
            .header("digest", digest.header_value())
            .json(&CommitRequest { parts })?;
        let response = self.send(request).await?;
        if response.body.is_empty() {
            return Ok(vec![]);
        }

        let entries: Entries = serde_json::from_slice(&response.body)?;
        Ok(entries.entries)
    }

    pub async fn abort_session(&self, session_id: &str) -> Result<()> {
        let path = format!("/files/upload_sessions/{session_id}");
        let request = Request::new(Method::DELETE, self.upload(&path));
        self.send(request).await?;
        Ok(())
    }

    async fn send(&self, request: Request) -> Result<Response> {
        let response = self.executor.execute(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(remote_error(response.status, &response.body))
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: Request) -> Result<T> {
        let response = self.send(request).await?;
        let value = serde_json::from_slice(&response.body)?;
        Ok(value)
    }

    fn api(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    fn upload(&self, path: &str) -> String {
        format!("{}{path}", self.upload_url)
    }
}
