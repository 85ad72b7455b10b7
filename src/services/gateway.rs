//! src/services/gateway.rs
//!
//! Remote storage gateway, the only component that talks to the storage
//! service. Uploads go out as multipart bodies, deletes as JSON, both with the
//! credential in an `Api-key` header and a capped retry loop. The JSON
//! envelope `{status, messages, data}` is interpreted here so callers only
//! ever see typed results.

use crate::config::StorageUpConfig;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const API_KEY_HEADER: &str = "Api-key";
const UPLOAD_FIELD: &str = "attachment";
const DEFAULT_UPLOAD_REJECTION: &str = "Failed to upload file.";
const DEFAULT_DELETE_REJECTION: &str = "Failed to delete file.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Network failure or non-success HTTP status after every attempt.
    #[error("storage service request failed after {attempts} attempt(s): {message}")]
    Transport {
        attempts: u32,
        status: Option<u16>,
        message: String,
    },
    /// The service answered but declared the operation failed.
    #[error("{0}")]
    Rejected(String),
    #[error("unexpected storage service response: {0}")]
    MalformedResponse(String),
    #[error("could not build storage service client: {0}")]
    Client(String),
}

/// Fields returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub stored_name: String,
    pub remote_id: Option<String>,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[async_trait]
pub trait StorageGateway: Send + Sync {
    async fn upload(
        &self,
        file_name: &str,
        bytes: bytes::Bytes,
        credential: &str,
        base_url: &str,
    ) -> Result<UploadedObject, GatewayError>;

    async fn delete(
        &self,
        remote_id: &str,
        file_name: &str,
        credential: &str,
        base_url: &str,
    ) -> Result<(), GatewayError>;
}

/// `StorageGateway` over HTTP using a shared `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    upload_endpoint: String,
    delete_endpoint: String,
    upload_attempts: u32,
    delete_attempts: u32,
    retry_delay: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest<'a> {
    file_id: &'a str,
    file_name: &'a str,
    safe_delete: u8,
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    status: String,
    #[serde(default)]
    messages: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadData {
    file_name: Option<String>,
    file_id: Option<Value>,
    link: Option<String>,
    thumbnail: Option<String>,
}

impl HttpGateway {
    pub fn new(cfg: &StorageUpConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .map_err(|err| GatewayError::Client(err.to_string()))?;
        Ok(Self::with_client(client, cfg))
    }

    pub fn with_client(client: reqwest::Client, cfg: &StorageUpConfig) -> Self {
        Self {
            client,
            upload_endpoint: cfg.upload_endpoint.clone(),
            delete_endpoint: cfg.delete_endpoint.clone(),
            upload_attempts: cfg.upload_attempts,
            delete_attempts: cfg.delete_attempts,
            retry_delay: cfg.retry_delay(),
        }
    }

    /// Send the request built by `build` until it succeeds or `attempts` runs out.
    ///
    /// A request counts as failed on any transport error or non-2xx status.
    /// Requests that cannot be built (bad header value, bad URL) fail at once.
    async fn send_with_retry<F>(
        &self,
        attempts: u32,
        build: F,
    ) -> Result<reqwest::Response, GatewayError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            let err = match build().send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(response) => return Ok(response),
                    Err(err) => err,
                },
                Err(err) if err.is_builder() => {
                    return Err(GatewayError::Client(err.to_string()));
                }
                Err(err) => err,
            };

            if attempt >= attempts {
                return Err(GatewayError::Transport {
                    attempts,
                    status: err.status().map(|s| s.as_u16()),
                    message: err.to_string(),
                });
            }

            warn!("storage request attempt {}/{} failed: {}", attempt, attempts, err);
            if !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
            attempt += 1;
        }
    }
}

#[async_trait]
impl StorageGateway for HttpGateway {
    async fn upload(
        &self,
        file_name: &str,
        bytes: bytes::Bytes,
        credential: &str,
        base_url: &str,
    ) -> Result<UploadedObject, GatewayError> {
        let url = endpoint_url(base_url, &self.upload_endpoint);
        debug!("uploading {} ({} bytes) to {}", file_name, bytes.len(), url);

        let response = self
            .send_with_retry(self.upload_attempts, || {
                // multipart forms are single-use, rebuild per attempt
                let part = Part::stream_with_length(bytes.clone(), bytes.len() as u64)
                    .file_name(file_name.to_string());
                self.client
                    .post(&url)
                    .header(API_KEY_HEADER, credential)
                    .multipart(Form::new().part(UPLOAD_FIELD, part))
            })
            .await?;

        let body = read_envelope(response).await?;
        parse_upload_response(body)
    }

    async fn delete(
        &self,
        remote_id: &str,
        file_name: &str,
        credential: &str,
        base_url: &str,
    ) -> Result<(), GatewayError> {
        let url = endpoint_url(base_url, &self.delete_endpoint);
        debug!("deleting remote file {} via {}", remote_id, url);

        let request = DeleteRequest {
            file_id: remote_id,
            file_name,
            safe_delete: 0,
        };
        let response = self
            .send_with_retry(self.delete_attempts, || {
                self.client
                    .post(&url)
                    .header(API_KEY_HEADER, credential)
                    .json(&request)
            })
            .await?;

        let body = read_envelope(response).await?;
        accept(body, DEFAULT_DELETE_REJECTION).map(|_| ())
    }
}

fn endpoint_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

async fn read_envelope(response: reqwest::Response) -> Result<ServiceResponse, GatewayError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|err| GatewayError::MalformedResponse(format!("reading body: {}", err)))?;
    serde_json::from_slice(&bytes).map_err(|err| GatewayError::MalformedResponse(err.to_string()))
}

/// Check the envelope status and hand back its `data` payload.
fn accept(body: ServiceResponse, default_rejection: &str) -> Result<Option<Value>, GatewayError> {
    match body.status.as_str() {
        "success" => Ok(body.data),
        "failed" => Err(GatewayError::Rejected(
            body.messages
                .as_ref()
                .and_then(message_text)
                .unwrap_or_else(|| default_rejection.to_string()),
        )),
        other => Err(GatewayError::MalformedResponse(format!(
            "unknown status `{}`",
            other
        ))),
    }
}

fn parse_upload_response(body: ServiceResponse) -> Result<UploadedObject, GatewayError> {
    let data = match accept(body, DEFAULT_UPLOAD_REJECTION)? {
        Some(value @ Value::Object(_)) => serde_json::from_value::<UploadData>(value)
            .map_err(|err| GatewayError::MalformedResponse(err.to_string()))?,
        _ => UploadData::default(),
    };

    let stored_name = data
        .file_name
        .ok_or_else(|| GatewayError::MalformedResponse("missing data.fileName".into()))?;

    Ok(UploadedObject {
        stored_name,
        remote_id: data.file_id.as_ref().and_then(scalar_text),
        url: data.link,
        thumbnail_url: data.thumbnail,
    })
}

/// Service messages come as a string, or occasionally a list of strings.
fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(message_text)
                .collect::<Vec<_>>()
                .join("; ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
