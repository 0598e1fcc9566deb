//! Render events emitted by the gallery controller and the sink seam that
//! receives them.

use shared::domain::PhotoRef;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub tone: StatusTone,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            tone: StatusTone::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            tone: StatusTone::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            tone: StatusTone::Error,
            text: text.into(),
        }
    }
}

/// State of the "load more" affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMoreState {
    Hidden,
    Loading,
    Ready,
    Retry,
}

impl LoadMoreState {
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Hidden => None,
            Self::Loading => Some("Loading..."),
            Self::Ready => Some("Load More Photos..."),
            Self::Retry => Some("Retry Loading"),
        }
    }

    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Ready | Self::Retry)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryEvent {
    /// Insert at the front of the view.
    PhotoPrepended(PhotoRef),
    /// Insert at the end of the view.
    PhotoAppended(PhotoRef),
    Status(StatusMessage),
    LoadMore(LoadMoreState),
}

pub trait GallerySink: Send + Sync {
    fn emit(&self, event: GalleryEvent);
}

impl GallerySink for broadcast::Sender<GalleryEvent> {
    fn emit(&self, event: GalleryEvent) {
        // No subscribers is not an error; the view may not be attached yet.
        let _ = self.send(event);
    }
}
