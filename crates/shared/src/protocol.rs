use serde::Deserialize;

use crate::{
    domain::{Cursor, PhotoRef},
    error::GalleryError,
};

pub const NEXT_CURSOR_PARAM: &str = "next_cursor";
pub const DEFAULT_UPLOAD_FAILURE: &str = "Upload failed";

/// Body of `GET /photos`. Older deployments answered with a bare array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ListPhotosResponse {
    Legacy(Vec<String>),
    Paged {
        photos: Vec<String>,
        #[serde(default)]
        next_cursor: Option<String>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoPage {
    pub photos: Vec<PhotoRef>,
    pub next_cursor: Option<Cursor>,
}

impl PhotoPage {
    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

impl From<ListPhotosResponse> for PhotoPage {
    fn from(value: ListPhotosResponse) -> Self {
        match value {
            ListPhotosResponse::Legacy(photos) => Self {
                photos: photos.into_iter().map(PhotoRef).collect(),
                next_cursor: None,
            },
            ListPhotosResponse::Paged {
                photos,
                next_cursor,
            } => Self {
                photos: photos.into_iter().map(PhotoRef).collect(),
                next_cursor: Cursor::from_wire(next_cursor),
            },
        }
    }
}

/// The backend answers `{"url": ...}`; backends that forward the media
/// host's result also carry `secure_url`.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendUploadResponse {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub secure_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl BackendUploadResponse {
    pub fn photo_url(self) -> Option<String> {
        self.url
            .filter(|url| !url.trim().is_empty())
            .or(self.secure_url)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaHostUploadResponse {
    pub secure_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

/// Failure bodies: the backend sends `{"error": "..."}`, the media host
/// nests the text under `error.message`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ErrorResponse {
    Nested { error: ErrorDetail },
    Flat { error: String },
}

impl ErrorResponse {
    pub fn into_message(self) -> String {
        match self {
            Self::Nested { error } => error.message,
            Self::Flat { error } => error,
        }
    }
}

pub fn parse_list_response(body: &[u8]) -> Result<PhotoPage, GalleryError> {
    serde_json::from_slice::<ListPhotosResponse>(body)
        .map(PhotoPage::from)
        .map_err(|err| GalleryError::malformed(format!("photo list body: {err}")))
}

pub fn parse_backend_upload(body: &[u8]) -> Result<PhotoRef, GalleryError> {
    let response: BackendUploadResponse = serde_json::from_slice(body)
        .map_err(|err| GalleryError::malformed(format!("upload body: {err}")))?;
    let url = response
        .photo_url()
        .ok_or_else(|| GalleryError::malformed("upload response carried no url"))?;
    non_empty_photo_ref(url)
}

pub fn parse_media_host_upload(body: &[u8]) -> Result<PhotoRef, GalleryError> {
    let response: MediaHostUploadResponse = serde_json::from_slice(body)
        .map_err(|err| GalleryError::malformed(format!("media host body: {err}")))?;
    non_empty_photo_ref(response.secure_url)
}

/// Best-effort extraction of a server-provided failure message.
pub fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorResponse>(body)
        .ok()
        .map(ErrorResponse::into_message)
        .filter(|message| !message.trim().is_empty())
}

fn non_empty_photo_ref(url: String) -> Result<PhotoRef, GalleryError> {
    if url.trim().is_empty() {
        return Err(GalleryError::malformed("upload response carried an empty url"));
    }
    Ok(PhotoRef(url))
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
