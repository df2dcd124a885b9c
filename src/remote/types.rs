use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

impl Item {
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default = "Vec::new")]
    pub entries: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct Entries {
    #[serde(default)]
    pub entries: Vec<Item>,
}

#[derive(Debug, Serialize)]
pub struct ParentRef<'a> {
    pub id: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateFolderRequest<'a> {
    pub name: &'a str,
    pub parent: ParentRef<'a>,
}

#[derive(Debug, Serialize)]
pub struct UploadAttributes<'a> {
    pub name: &'a str,
    pub parent: ParentRef<'a>,
    pub content_created_at: String,
    pub content_modified_at: String,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub file_name: &'a str,
    pub file_size: u64,
    pub folder_id: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UploadSession {
    pub id: String,
    #[serde(default)]
    pub part_size: u64,
    #[serde(default)]
    pub total_parts: u64,
    #[serde(default)]
    pub num_parts_processed: u64,
    #[serde(default)]
    pub session_expires_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPart {
    pub part_id: String,
    pub offset: u64,
    pub size: u64,
    pub sha1: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadPartResponse {
    pub part: UploadPart,
}

#[derive(Debug, Serialize)]
pub struct CommitRequest<'a> {
    pub parts: &'a [UploadPart],
}
