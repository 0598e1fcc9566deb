use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::{
    domain::{Cursor, EventTag, PhotoRef},
    error::{ErrorKind, GalleryError},
    protocol::PhotoPage,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub mod events;
pub mod transport;

pub use events::{GalleryEvent, GallerySink, LoadMoreState, StatusMessage, StatusTone};
pub use transport::{
    cloud_upload_url, BackendFields, HttpPhotoList, HttpUploader, MediaHostFields,
    UploadContract,
};

const NO_FILE_SELECTED: &str = "Please select an image to upload.";
const NOT_AN_IMAGE: &str = "Only image files can be uploaded.";
const UPLOADING: &str = "Uploading...";
const UPLOADED: &str = "Uploaded successfully!";
const SERVER_WAKING_UP: &str = "The gallery server is waking up; retry loading in a moment.";

#[async_trait]
pub trait PhotoListSource: Send + Sync {
    async fn fetch_page(&self, cursor: Option<&Cursor>) -> Result<PhotoPage, GalleryError>;
}

#[async_trait]
pub trait PhotoUploader: Send + Sync {
    async fn upload(&self, file: UploadFile, tag: &EventTag) -> Result<PhotoRef, GalleryError>;
}

/// Stand-in for deployments, or commands, that never upload.
pub struct MissingUploader;

#[async_trait]
impl PhotoUploader for MissingUploader {
    async fn upload(&self, _file: UploadFile, _tag: &EventTag) -> Result<PhotoRef, GalleryError> {
        Err(GalleryError::InvalidInput(
            "no upload endpoint is configured".to_string(),
        ))
    }
}

#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    fn validate(&self) -> Result<(), &'static str> {
        if self.bytes.is_empty() {
            return Err(NO_FILE_SELECTED);
        }
        match &self.mime_type {
            Some(mime_type) if !mime_type.starts_with("image/") => Err(NOT_AN_IMAGE),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Another fetch was in flight, or the initial load already ran.
    Skipped,
    Loaded { appended: usize, has_more: bool },
}

#[derive(Default)]
struct GalleryState {
    photos: Vec<PhotoRef>,
    cursor: Option<Cursor>,
    exhausted: bool,
}

/// Clears the in-flight flag on drop, so an abandoned fetch does not wedge
/// the controller.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct GalleryController {
    list_source: Arc<dyn PhotoListSource>,
    uploader: Arc<dyn PhotoUploader>,
    sink: Arc<dyn GallerySink>,
    inner: Mutex<GalleryState>,
    loading: AtomicBool,
    activated: AtomicBool,
}

impl GalleryController {
    pub fn new(
        list_source: Arc<dyn PhotoListSource>,
        uploader: Arc<dyn PhotoUploader>,
        sink: Arc<dyn GallerySink>,
    ) -> Arc<Self> {
        Arc::new(Self {
            list_source,
            uploader,
            sink,
            inner: Mutex::new(GalleryState::default()),
            loading: AtomicBool::new(false),
            activated: AtomicBool::new(false),
        })
    }

    /// Runs the first page load once per controller. Skipped when any page
    /// has already loaded, so calling it after `fetch_next_page` never pulls
    /// a later page.
    pub async fn activate(&self) -> Result<PageOutcome, GalleryError> {
        if self.activated.swap(true, Ordering::AcqRel) {
            return Ok(PageOutcome::Skipped);
        }
        let Some(_guard) = LoadingGuard::acquire(&self.loading) else {
            return Ok(PageOutcome::Skipped);
        };
        self.load_page(true).await
    }

    pub async fn fetch_next_page(&self) -> Result<PageOutcome, GalleryError> {
        let Some(_guard) = LoadingGuard::acquire(&self.loading) else {
            debug!("gallery: page fetch already in flight; ignoring request");
            return Ok(PageOutcome::Skipped);
        };
        self.load_page(false).await
    }

    async fn load_page(&self, initial: bool) -> Result<PageOutcome, GalleryError> {
        let cursor = self.inner.lock().await.cursor.clone();
        self.sink.emit(GalleryEvent::LoadMore(LoadMoreState::Loading));

        let page = match self.list_source.fetch_page(cursor.as_ref()).await {
            Ok(page) => page,
            Err(err) => {
                warn!(error = %err, initial, "gallery: page fetch failed");
                let status = if initial && err.kind() == ErrorKind::MalformedResponse {
                    StatusMessage::info(SERVER_WAKING_UP)
                } else {
                    StatusMessage::error(format!("Could not load photos: {}", err.detail()))
                };
                self.sink.emit(GalleryEvent::Status(status));
                self.sink.emit(GalleryEvent::LoadMore(LoadMoreState::Retry));
                return Err(err);
            }
        };

        let has_more = page.has_more();
        let appended = page.photos.len();
        {
            let mut state = self.inner.lock().await;
            state.photos.extend(page.photos.iter().cloned());
            state.cursor = page.next_cursor;
            state.exhausted = !has_more;
        }
        self.activated.store(true, Ordering::Release);

        for photo in page.photos {
            self.sink.emit(GalleryEvent::PhotoAppended(photo));
        }
        let affordance = if has_more {
            LoadMoreState::Ready
        } else {
            LoadMoreState::Hidden
        };
        self.sink.emit(GalleryEvent::LoadMore(affordance));

        info!(appended, has_more, "gallery: page loaded");
        Ok(PageOutcome::Loaded { appended, has_more })
    }

    pub async fn submit_upload(
        &self,
        file: UploadFile,
        tag: EventTag,
    ) -> Result<PhotoRef, GalleryError> {
        if let Err(reason) = file.validate() {
            self.sink
                .emit(GalleryEvent::Status(StatusMessage::error(reason)));
            return Err(GalleryError::InvalidInput(reason.to_string()));
        }

        self.sink
            .emit(GalleryEvent::Status(StatusMessage::info(UPLOADING)));
        info!(
            filename = %file.filename,
            size_bytes = file.bytes.len(),
            tag = %tag,
            "gallery: uploading photo"
        );

        match self.uploader.upload(file, &tag).await {
            Ok(photo) => {
                self.inner.lock().await.photos.insert(0, photo.clone());
                self.sink.emit(GalleryEvent::PhotoPrepended(photo.clone()));
                self.sink
                    .emit(GalleryEvent::Status(StatusMessage::success(UPLOADED)));
                info!(photo = %photo, "gallery: upload stored");
                Ok(photo)
            }
            Err(err) => {
                warn!(error = %err, "gallery: upload failed");
                self.sink.emit(GalleryEvent::Status(StatusMessage::error(format!(
                    "Error: {}",
                    err.detail()
                ))));
                Err(err)
            }
        }
    }

    pub async fn photos(&self) -> Vec<PhotoRef> {
        self.inner.lock().await.photos.clone()
    }

    pub async fn cursor(&self) -> Option<Cursor> {
        self.inner.lock().await.cursor.clone()
    }

    /// True until a page arrives without a continuation cursor.
    pub async fn has_more(&self) -> bool {
        !self.inner.lock().await.exhausted
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
