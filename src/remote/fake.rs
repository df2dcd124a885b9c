use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::{Error, Result},
    hash::Digest,
};

use super::{Body, Execute, Folder, Item, RemoteClient, Request, Response, UploadPart};

pub const API_URL: &str = "https://api.test/2.0";
pub const UPLOAD_URL: &str = "https://upload.test/api/2.0";

#[derive(Debug, Default)]
pub struct FakeSession {
    pub id: String,
    pub name: String,
    pub folder_id: String,
    pub size: u64,
    pub parts: Vec<(UploadPart, Bytes)>,
    pub polls: u64,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub requests: Vec<(Method, String)>,
    pub folders: Vec<Folder>,
    pub files: Vec<(Item, Bytes)>,
    pub sessions: Vec<FakeSession>,
    pub commits: u64,
    pub aborts: u64,
    pub deleted: Vec<String>,
    next_id: u64,
}

impl FakeState {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("{}", 1000 + self.next_id)
    }
}

/// In-memory stand-in for the remote API.
#[derive(Debug)]
pub struct FakeRemote {
    pub part_size: u64,
    /// Part upload at this offset fails with a transport error.
    pub fail_part_at: Option<u64>,
    /// Number of status polls before all parts count as processed, `None` for never.
    pub ready_after_polls: Option<u64>,
    pub fail_delete: Option<String>,
    pub state: Mutex<FakeState>,
}

impl Default for FakeRemote {
    fn default() -> Self {
        FakeRemote {
            part_size: 1024,
            fail_part_at: None,
            ready_after_polls: Some(1),
            fail_delete: None,
            state: Mutex::new(FakeState::default()),
        }
    }
}

#[derive(Deserialize)]
struct Attributes {
    name: String,
    parent: Folder,
}

#[derive(Deserialize)]
struct NewSession {
    file_name: String,
    file_size: u64,
    folder_id: String,
}

#[derive(Deserialize)]
struct NewFolder {
    name: String,
}

#[derive(Deserialize)]
struct Commit {
    parts: Vec<UploadPart>,
}

impl FakeRemote {
    pub fn client(self: &Arc<Self>) -> RemoteClient {
        RemoteClient::new(self.clone(), API_URL, UPLOAD_URL)
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn add_folder(&self, name: &str) -> Folder {
        let mut state = self.state();
        let folder = Folder {
            id: state.next_id(),
            name: name.to_owned(),
        };
        state.folders.push(folder.clone());
        folder
    }

    pub fn add_file(&self, name: &str) -> Item {
        let mut state = self.state();
        let item = Item {
            id: state.next_id(),
            kind: "file".to_owned(),
            name: name.to_owned(),
        };
        state.files.push((item.clone(), Bytes::new()));
        item
    }

    pub fn file_names(&self) -> Vec<String> {
        let mut names = self
            .state()
            .files
            .iter()
            .map(|(item, _)| item.name.clone())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    pub fn file_data(&self, name: &str) -> Option<Bytes> {
        self.state()
            .files
            .iter()
            .find(|(item, _)| item.name == name)
            .map(|(_, data)| data.clone())
    }

    pub fn count_requests(&self, method: &Method, path_suffix: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|(m, path)| m == method && path.ends_with(path_suffix))
            .count()
    }

    fn handle(&self, request: &Request) -> Result<Response> {
        let path = request
            .url
            .strip_prefix(API_URL)
            .map(|path| format!("api:{path}"))
            .or_else(|| {
                request
                    .url
                    .strip_prefix(UPLOAD_URL)
                    .map(|path| format!("upload:{path}"))
            })
            .unwrap_or_else(|| request.url.clone());
        self.state()
            .requests
            .push((request.method.clone(), path.clone()));

        let segments = path.split('/').collect::<Vec<_>>();
        match (&request.method, segments.as_slice()) {
            (&Method::GET, ["api:", "search"]) => Ok(self.search(request)),
            (&Method::POST, ["api:", "folders"]) => self.create_folder(request),
            (&Method::GET, ["api:", "folders", id, "items"]) => Ok(self.list_items(id, request)),
            (&Method::DELETE, ["api:", "files", id]) => Ok(self.delete_file(id)),
            (&Method::POST, ["upload:", "files", "content"]) => self.upload_file(request),
            (&Method::POST, ["upload:", "files", "upload_sessions"]) => self.create_session(request),
            (&Method::PUT, ["upload:", "files", "upload_sessions", id]) => {
                self.upload_part(id, request)
            }
            (&Method::GET, ["upload:", "files", "upload_sessions", id]) => Ok(self.status(id)),
            (&Method::POST, ["upload:", "files", "upload_sessions", id, "commit"]) => {
                self.commit(id, request)
            }
            (&Method::DELETE, ["upload:", "files", "upload_sessions", _]) => {
                self.state().aborts += 1;
                Ok(empty(204))
            }
            _ => Ok(error(404, "not_found", "no such route")),
        }
    }

    fn search(&self, request: &Request) -> Response {
        let query = query_value(request, "query").unwrap_or_default();
        let entries = self
            .state()
            .folders
            .iter()
            .filter(|folder| folder.name.contains(query))
            .map(|folder| json!({ "id": folder.id, "type": "folder", "name": folder.name }))
            .collect::<Vec<_>>();
        ok(&json!({ "total_count": entries.len(), "entries": entries }))
    }

    fn create_folder(&self, request: &Request) -> Result<Response> {
        let new_folder: NewFolder = json_body(request)?;
        let folder = self.add_folder(&new_folder.name);
        Ok(with_status(201, &json!({ "id": folder.id, "type": "folder", "name": folder.name })))
    }

    fn list_items(&self, _folder_id: &str, request: &Request) -> Response {
        let limit = parse_query(request, "limit").unwrap_or(100);
        let offset = parse_query(request, "offset").unwrap_or(0);
        let state = self.state();
        let mut items = state.files.iter().map(|(item, _)| item.clone()).collect::<Vec<_>>();
        items.sort_by(|a, b| b.name.cmp(&a.name));

        let total_count = items.len();
        let entries = items
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|item| json!({ "id": item.id, "type": item.kind, "name": item.name }))
            .collect::<Vec<_>>();
        ok(&json!({ "total_count": total_count, "offset": offset, "limit": limit, "entries": entries }))
    }

    fn delete_file(&self, id: &str) -> Response {
        if self.fail_delete.as_deref() == Some(id) {
            return error(500, "internal_server_error", "delete failed");
        }

        let mut state = self.state();
        let before = state.files.len();
        state.files.retain(|(item, _)| item.id != id);
        if state.files.len() == before {
            return error(404, "not_found", "file not found");
        }

        state.deleted.push(id.to_owned());
        empty(204)
    }

    fn upload_file(&self, request: &Request) -> Result<Response> {
        let Body::Multipart {
            attributes, data, ..
        } = &request.body
        else {
            return Ok(error(400, "bad_request", "expected multipart body"));
        };

        let attributes: Attributes = serde_json::from_str(attributes)?;
        let item = self.store_file(&attributes.name, data.clone());
        assert!(!attributes.parent.id.is_empty());
        Ok(with_status(201, &json!({ "total_count": 1, "entries": [item] })))
    }

    fn create_session(&self, request: &Request) -> Result<Response> {
        let new_session: NewSession = json_body(request)?;
        let mut state = self.state();
        let session = FakeSession {
            id: format!("session-{}", state.next_id()),
            name: new_session.file_name,
            folder_id: new_session.folder_id,
            size: new_session.file_size,
            ..FakeSession::default()
        };
        let total_parts = session.size.div_ceil(self.part_size);
        let body = json!({
            "id": session.id,
            "type": "upload_session",
            "part_size": self.part_size,
            "total_parts": total_parts,
            "num_parts_processed": 0,
            "session_expires_at": "2030-01-01T00:00:00Z",
        });
        state.sessions.push(session);
        Ok(with_status(201, &body))
    }

    fn upload_part(&self, id: &str, request: &Request) -> Result<Response> {
        let Body::Bytes(data) = &request.body else {
            return Ok(error(400, "bad_request", "expected raw body"));
        };

        let range = header_value(request, "content-range").unwrap_or_default();
        let (begin, end, total) = parse_content_range(range)
            .ok_or_else(|| Error::InvalidConfig(format!("bad content-range `{range}`")))?;

        if self.fail_part_at == Some(begin) {
            return Err(Error::Transport {
                message: "connection reset by peer".to_owned(),
                retryable: true,
            });
        }

        let digest = Digest::of(data);
        if header_value(request, "digest") != Some(digest.header_value().as_str()) {
            return Ok(error(412, "precondition_failed", "part digest mismatch"));
        }

        let mut state = self.state();
        let Some(session) = state.sessions.iter_mut().find(|session| session.id == id) else {
            return Ok(error(404, "not_found", "no such session"));
        };
        if total != session.size || end - begin + 1 != data.len() as u64 {
            return Ok(error(416, "range_not_satisfiable", "bad range"));
        }

        let part = UploadPart {
            part_id: format!("{begin:08X}"),
            offset: begin,
            size: data.len() as u64,
            sha1: digest.to_base64(),
        };
        session.parts.push((part.clone(), data.clone()));
        Ok(ok(&json!({ "part": part })))
    }

    fn status(&self, id: &str) -> Response {
        let part_size = self.part_size;
        let mut state = self.state();
        let Some(session) = state.sessions.iter_mut().find(|session| session.id == id) else {
            return error(404, "not_found", "no such session");
        };

        session.polls += 1;
        let total_parts = session.size.div_ceil(part_size);
        let processed = match self.ready_after_polls {
            Some(polls) if session.polls >= polls => session.parts.len() as u64,
            _ => 0,
        };
        ok(&json!({
            "id": session.id,
            "total_parts": total_parts,
            "num_parts_processed": processed,
        }))
    }

    fn commit(&self, id: &str, request: &Request) -> Result<Response> {
        let commit: Commit = json_body(request)?;
        let (name, data) = {
            let state = self.state();
            let Some(session) = state.sessions.iter().find(|session| session.id == id) else {
                return Ok(error(404, "not_found", "no such session"));
            };

            let mut expected_offset = 0;
            let mut data = Vec::new();
            for part in &commit.parts {
                if part.offset != expected_offset {
                    return Ok(error(400, "invalid_parts", "parts out of order"));
                }

                let Some((_, bytes)) = session.parts.iter().find(|(p, _)| p == part) else {
                    return Ok(error(400, "invalid_parts", "unknown part"));
                };
                data.extend_from_slice(bytes);
                expected_offset += part.size;
            }

            if expected_offset != session.size {
                return Ok(error(400, "invalid_parts", "parts do not cover file"));
            }

            (session.name.clone(), data)
        };

        let digest = Digest::of(&data);
        if header_value(request, "digest") != Some(digest.header_value().as_str()) {
            return Ok(error(422, "checksum_mismatch", "file digest mismatch"));
        }

        self.state().commits += 1;
        let item = self.store_file(&name, data.into());
        Ok(with_status(201, &json!({ "total_count": 1, "entries": [item] })))
    }

    fn store_file(&self, name: &str, data: Bytes) -> Item {
        let mut state = self.state();
        let item = Item {
            id: state.next_id(),
            kind: "file".to_owned(),
            name: name.to_owned(),
        };
        state.files.push((item.clone(), data));
        item
    }
}

#[async_trait]
impl Execute for FakeRemote {
    async fn execute(&self, request: Request) -> Result<Response> {
        self.handle(&request)
    }
}

fn json_body<T: for<'de> Deserialize<'de>>(request: &Request) -> Result<T> {
    match &request.body {
        Body::Json(bytes) => Ok(serde_json::from_slice(bytes)?),
        _ => Err(Error::InvalidConfig("expected json body".to_owned())),
    }
}

fn header_value<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request
        .headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

fn query_value<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request
        .query
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.as_str())
}

fn parse_query(request: &Request, name: &str) -> Option<usize> {
    query_value(request, name)?.parse().ok()
}

fn parse_content_range(value: &str) -> Option<(u64, u64, u64)> {
    let (range, total) = value.strip_prefix("bytes ")?.split_once('/')?;
    let (begin, end) = range.split_once('-')?;
    Some((begin.parse().ok()?, end.parse().ok()?, total.parse().ok()?))
}

fn with_status(status: u16, value: &Value) -> Response {
    Response {
        status,
        body: serde_json::to_vec(value).unwrap().into(),
    }
}

fn ok(value: &Value) -> Response {
    with_status(200, value)
}

fn empty(status: u16) -> Response {
    Response {
        status,
        body: Bytes::new(),
    }
}

fn error(status: u16, code: &str, message: &str) -> Response {
    with_status(
        status,
        &json!({
            "type": "error",
            "status": status,
            "code": code,
            "message": message,
            "request_id": "req-1",
        }),
    )
}
