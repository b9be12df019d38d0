//! Main representation of a Pinterest search result
//!
//! # PinRecord
//! A [`PinRecord`] is the normalized unit produced by the extractor. Its serde
//! representation is the output schema consumed by the exporters, so field names
//! (`fullName`, `avatarURL`, `imageURL`, `type`) are fixed here and nowhere else.
use serde::{Deserialize, Serialize};

use std::{cmp::Ordering, fmt::Debug};

use self::{date::PinDate, kind::PinKind};

pub mod date;
pub mod error;
pub mod kind;

/// Profile of the account that saved the pin. Every field may be missing upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pinner {
    pub id: Option<String>,
    pub username: Option<String>,
    #[serde(rename = "fullName")]
    pub full_name: Option<String>,
    #[serde(rename = "avatarURL")]
    pub avatar_url: Option<String>,
    pub followers: Option<u64>,
}

/// Normalized pin, independent of the payload shape it was extracted from.
#[derive(Clone, Serialize, Deserialize, Eq)]
pub struct PinRecord {
    /// Pin ID as given by Pinterest. Never empty.
    pub id: String,
    pub title: Option<String>,
    pub pinner: Pinner,
    pub date: PinDate,
    #[serde(rename = "type")]
    pub kind: PinKind,
    /// Absolute URL of the largest image variant found.
    #[serde(rename = "imageURL")]
    pub image_url: String,
}

impl Debug for PinRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinRecord")
            .field("Pin ID", &self.id)
            .field("Title", &self.title)
            .field("Pinner", &self.pinner.username)
            .field("Date", &self.date.formatted)
            .field("Type", &self.kind)
            .field("Image URL", &self.image_url)
            .finish()
    }
}

impl Ord for PinRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl PartialOrd for PinRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PinRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl PinRecord {
    /// Link to the pin's page on Pinterest.
    #[inline]
    pub fn pin_url(&self) -> String {
        format!("https://www.pinterest.com/pin/{}/", self.id)
    }
}
