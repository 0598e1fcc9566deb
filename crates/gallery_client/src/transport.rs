//! reqwest-backed list and upload collaborators.

use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use shared::{
    domain::{Cursor, EventTag, PhotoRef},
    error::GalleryError,
    protocol::{
        error_message, parse_backend_upload, parse_list_response, parse_media_host_upload,
        PhotoPage, DEFAULT_UPLOAD_FAILURE, NEXT_CURSOR_PARAM,
    },
};
use tracing::debug;

use crate::{PhotoListSource, PhotoUploader, UploadFile};

const CLOUD_UPLOAD_HOST: &str = "https://api.cloudinary.com/v1_1";

pub fn cloud_upload_url(cloud_name: &str) -> String {
    format!("{CLOUD_UPLOAD_HOST}/{cloud_name}/image/upload")
}

fn trim_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

fn network(err: reqwest::Error) -> GalleryError {
    GalleryError::NetworkFailure(err.to_string())
}

async fn read_success_body(response: Response, fallback: &str) -> Result<Vec<u8>, GalleryError> {
    let status = response.status();
    let body = response.bytes().await.map_err(network)?;
    if !status.is_success() {
        let message = error_message(&body).unwrap_or_else(|| fallback.to_string());
        return Err(GalleryError::server(status.as_u16(), message));
    }
    Ok(body.to_vec())
}

pub struct HttpPhotoList {
    http: Client,
    base_url: String,
}

impl HttpPhotoList {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: trim_base_url(base_url),
        }
    }
}

#[async_trait]
impl PhotoListSource for HttpPhotoList {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<PhotoPage, GalleryError> {
        let mut request = self.http.get(format!("{}/photos", self.base_url));
        if let Some(cursor) = cursor {
            request = request.query(&[(NEXT_CURSOR_PARAM, cursor.as_str())]);
        }
        debug!(cursor = ?cursor, "gallery: requesting photo page");

        let response = request.send().await.map_err(network)?;
        let status = response.status();
        let body = read_success_body(response, &format!("photo listing returned {status}")).await?;
        parse_list_response(&body)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFields {
    pub image: String,
    pub tag: String,
}

impl Default for BackendFields {
    fn default() -> Self {
        Self {
            image: "image".into(),
            tag: "event".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHostFields {
    pub file: String,
    pub upload_preset: String,
    pub tags: String,
}

impl Default for MediaHostFields {
    fn default() -> Self {
        Self {
            file: "file".into(),
            upload_preset: "upload_preset".into(),
            tags: "tags".into(),
        }
    }
}

/// Which upload endpoint a deployment talks to. Exactly one is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadContract {
    Backend {
        base_url: String,
        fields: BackendFields,
    },
    MediaHost {
        upload_url: String,
        upload_preset: String,
        fields: MediaHostFields,
    },
}

impl UploadContract {
    pub fn backend(base_url: impl Into<String>) -> Self {
        Self::Backend {
            base_url: trim_base_url(base_url),
            fields: BackendFields::default(),
        }
    }

    pub fn media_host(upload_url: impl Into<String>, upload_preset: impl Into<String>) -> Self {
        Self::MediaHost {
            upload_url: upload_url.into(),
            upload_preset: upload_preset.into(),
            fields: MediaHostFields::default(),
        }
    }

    pub fn endpoint(&self) -> String {
        match self {
            Self::Backend { base_url, .. } => format!("{base_url}/upload"),
            Self::MediaHost { upload_url, .. } => upload_url.clone(),
        }
    }

    fn form(&self, file: UploadFile, tag: &EventTag) -> Result<Form, GalleryError> {
        let part = file_part(file)?;
        let form = match self {
            Self::Backend { fields, .. } => Form::new()
                .part(fields.image.clone(), part)
                .text(fields.tag.clone(), tag.to_string()),
            Self::MediaHost {
                upload_preset,
                fields,
                ..
            } => Form::new()
                .part(fields.file.clone(), part)
                .text(fields.upload_preset.clone(), upload_preset.clone())
                .text(fields.tags.clone(), tag.to_string()),
        };
        Ok(form)
    }

    fn parse_success(&self, body: &[u8]) -> Result<PhotoRef, GalleryError> {
        match self {
            Self::Backend { .. } => parse_backend_upload(body),
            Self::MediaHost { .. } => parse_media_host_upload(body),
        }
    }
}

fn file_part(file: UploadFile) -> Result<Part, GalleryError> {
    let part = Part::bytes(file.bytes).file_name(file.filename);
    match file.mime_type {
        Some(mime_type) => part.mime_str(&mime_type).map_err(|err| {
            GalleryError::InvalidInput(format!("invalid mime type {mime_type}: {err}"))
        }),
        None => Ok(part),
    }
}

pub struct HttpUploader {
    http: Client,
    contract: UploadContract,
}

impl HttpUploader {
    pub fn new(contract: UploadContract) -> Self {
        Self::with_client(Client::new(), contract)
    }

    pub fn with_client(http: Client, contract: UploadContract) -> Self {
        Self { http, contract }
    }
}

#[async_trait]
impl PhotoUploader for HttpUploader {
    async fn upload(&self, file: UploadFile, tag: &EventTag) -> Result<PhotoRef, GalleryError> {
        let endpoint = self.contract.endpoint();
        let form = self.contract.form(file, tag)?;
        debug!(endpoint = %endpoint, "gallery: posting upload form");

        let response = self
            .http
            .post(endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(network)?;
        let body = read_success_body(response, DEFAULT_UPLOAD_FAILURE).await?;
        self.contract.parse_success(&body)
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
