use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_EVENT_TAG: &str = "other";

macro_rules! string_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_newtype!(PhotoRef);
string_newtype!(Cursor);
string_newtype!(EventTag);

impl PhotoRef {
    /// Absolute references are returned as-is; relative ones are joined onto
    /// `base`, which is always treated as a directory.
    pub fn resolve(&self, base: &Url) -> Result<Url, url::ParseError> {
        if let Ok(absolute) = Url::parse(&self.0) {
            return Ok(absolute);
        }

        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(self.0.trim_start_matches('/'))
    }
}

impl Cursor {
    /// The list endpoint reports "no more pages" as null, absent, or empty.
    pub fn from_wire(raw: Option<String>) -> Option<Self> {
        raw.filter(|token| !token.is_empty()).map(Self)
    }
}

impl EventTag {
    pub fn or_default(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::from(DEFAULT_EVENT_TAG)
        } else {
            Self::from(trimmed)
        }
    }
}

impl Default for EventTag {
    fn default() -> Self {
        Self::from(DEFAULT_EVENT_TAG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_reference_joins_backend_base() {
        let base = Url::parse("https://gallery.example.com").expect("base");
        let resolved = PhotoRef::from("uploads/a.jpg")
            .resolve(&base)
            .expect("resolve");
        assert_eq!(resolved.as_str(), "https://gallery.example.com/uploads/a.jpg");
    }

    #[test]
    fn relative_reference_keeps_base_path_segment() {
        let base = Url::parse("https://gallery.example.com/api").expect("base");
        let resolved = PhotoRef::from("/a.jpg").resolve(&base).expect("resolve");
        assert_eq!(resolved.as_str(), "https://gallery.example.com/api/a.jpg");
    }

    #[test]
    fn absolute_reference_is_untouched() {
        let base = Url::parse("https://gallery.example.com").expect("base");
        let resolved = PhotoRef::from("https://cdn.example.net/x/y.jpg")
            .resolve(&base)
            .expect("resolve");
        assert_eq!(resolved.as_str(), "https://cdn.example.net/x/y.jpg");
    }

    #[test]
    fn empty_cursor_means_no_more_pages() {
        assert_eq!(Cursor::from_wire(Some(String::new())), None);
        assert_eq!(Cursor::from_wire(None), None);
        assert_eq!(
            Cursor::from_wire(Some("abc".into())),
            Some(Cursor::from("abc"))
        );
    }

    #[test]
    fn blank_tag_falls_back_to_other() {
        assert_eq!(EventTag::or_default("   ").as_str(), "other");
        assert_eq!(EventTag::or_default(" haldi ").as_str(), "haldi");
    }
}
