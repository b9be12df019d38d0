//! # Pin Kind Module
//!
//! Defines [`PinKind`], the `type` field of a [`PinRecord`](crate::pin::PinRecord).

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// What sort of content a pin carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    /// A regular image pin.
    #[default]
    Pin,
    /// A pin whose main media is a video.
    Video,
    /// An idea/story pin made of several pages.
    Story,
}

impl PinKind {
    /// Guesses the kind from the raw `type` string and whether the entry carries video data.
    ///
    /// Unknown or missing type strings fall back to [`PinKind::Pin`] unless video data is present.
    pub fn guess(raw_type: Option<&str>, has_video: bool) -> Self {
        match raw_type.map(str::to_lowercase).as_deref() {
            Some("story") => Self::Story,
            Some("video") => Self::Video,
            _ if has_video => Self::Video,
            _ => Self::Pin,
        }
    }

    pub const fn is_video(&self) -> bool {
        matches!(self, Self::Video)
    }
}

impl Display for PinKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pin => write!(f, "pin"),
            Self::Video => write!(f, "video"),
            Self::Story => write!(f, "story"),
        }
    }
}
