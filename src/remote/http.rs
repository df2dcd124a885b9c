
use std::{fmt, time::Duration};

use async_trait::async_trait;
use humantime::format_duration;
use log::{debug, warn};
use reqwest::{
    header::CONTENT_TYPE,
    multipart::{Form, Part},
    Client, Method,
};
use serde::Deserialize;
use tokio::{
    sync::Mutex,
    time::{sleep, Instant},
};

use crate::error::{Error, Result};

use super::{remote_error, Body, Execute, Request, Response};

const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct Credentials {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub subject_type: String,
    pub subject_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("subject_type", &self.subject_type)
            .field("subject_id", &self.subject_id)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2_u32.saturating_pow(attempt))
    }
}

#[derive(Debug)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// `Execute` over HTTPS, authenticated with the client-credentials grant.
#[derive(Debug)]
pub struct HttpExecutor {
    client: Client,
    credentials: Credentials,
    retry: RetryPolicy,
    token: Mutex<Option<AccessToken>>,
}

impl HttpExecutor {
    pub fn new(credentials: Credentials, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpExecutor {
            client,
            credentials,
            retry,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if let Some(token) = token.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        let Credentials {
            token_url,
            client_id,
            client_secret,
            subject_type,
            subject_id,
        } = &self.credentials;
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("box_subject_type", subject_type.as_str()),
            ("box_subject_id", subject_id.as_str()),
        ];

        let response = self.client.post(token_url).form(&params).send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(remote_error(status.as_u16(), &body));
        }

        let token: TokenResponse = serde_json::from_slice(&body)?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        debug!("acquired access token valid for {}", format_duration(lifetime));

        Ok(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }

    async fn try_execute(&self, request: &Request) -> Result<Response> {
        let token = self.access_token().await?;
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .bearer_auth(token)
            .query(&request.query);

        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(bytes) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(bytes.clone()),
            Body::Bytes(bytes) => builder.body(bytes.clone()),
            Body::Multipart {
                attributes,
                file_name,
                data,
            } => {
                let part = Part::stream_with_length(data.clone(), data.len() as u64)
                    .file_name(file_name.clone());
                let form = Form::new().text("attributes", attributes.clone()).part("file", part);
                builder.multipart(form)
            }
        };

        let method = &request.method;
        let response = builder
            .send()
            .await
            .map_err(|err| transport_error(method, &err))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| transport_error(method, &err))?;
        Ok(Response { status, body })
    }
}

#[async_trait]
impl Execute for HttpExecutor {
    async fn execute(&self, request: Request) -> Result<Response> {
        let mut attempt = 0;

        loop {
            match self.try_execute(&request).await {
                Err(err) if err.is_retryable() && attempt < self.retry.attempts => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        "{} {} failed ({err}), retrying in {}",
                        request.method,
                        request.url,
                        format_duration(delay)
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

// A request that may have reached the remote is only resent when repeating it
// is harmless.
fn transport_error(method: &Method, error: &reqwest::Error) -> Error {
    Error::Transport {
        retryable: error.is_connect() || method.is_idempotent(),
        message: error.to_string(),
    }
}
