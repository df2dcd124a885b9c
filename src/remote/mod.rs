mod client;
#[cfg(test)]
pub mod fake;
mod http;
mod types;

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;

use crate::error::{Error, RemoteError, Result};

pub use self::{
    client::RemoteClient,
    http::{Credentials, HttpExecutor, RetryPolicy},
    types::{Folder, Item, Page, UploadPart, UploadSession},
};

#[derive(Clone, Debug)]
pub enum Body {
    Empty,
    Json(Bytes),
    Bytes(Bytes),
    Multipart {
        attributes: String,
        file_name: String,
        data: Bytes,
    },
}

#[derive(Clone, Debug)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub query: Vec<(&'static str, String)>,
    pub headers: Vec<(&'static str, String)>,
    pub body: Body,
}

impl Request {
    pub fn new<S: Into<String>>(method: Method, url: S) -> Self {
        Request {
            method,
            url: url.into(),
            query: vec![],
            headers: vec![],
            body: Body::Empty,
        }
    }

    pub fn query<V: ToString>(mut self, name: &'static str, value: V) -> Self {
        self.query.push((name, value.to_string()));
        self
    }

    pub fn header<V: Into<String>>(mut self, name: &'static str, value: V) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn json<T: Serialize>(mut self, value: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(value)?;
        self.body = Body::Json(bytes.into());
        Ok(self)
    }

    pub fn bytes(mut self, data: Bytes) -> Self {
        self.body = Body::Bytes(data);
        self
    }

    pub fn multipart(mut self, attributes: String, file_name: String, data: Bytes) -> Self {
        self.body = Body::Multipart {
            attributes,
            file_name,
            data,
        };
        self
    }
}

#[derive(Clone, Debug)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends authenticated requests to the remote API.
#[async_trait]
pub trait Execute: Debug + Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response>;
}

pub fn remote_error(status: u16, body: &[u8]) -> Error {
    let mut error = serde_json::from_slice::<RemoteError>(body).unwrap_or_default();
    if error.status == 0 {
        error.status = status;
    }
    if error.message.is_empty() {
        error.message = String::from_utf8_lossy(body).trim().to_owned();
    }

    Error::Remote(error)
}
