//! # Record extraction
//!
//! Turns one raw page into normalized [`PinRecord`]s. Extraction is best effort
//! per entry: an entry without a usable `id` or image URL is skipped, anything
//! else that is missing is left empty on the record. A page never fails as a
//! whole; at worst it yields nothing.
use pinscrape_common::{
    log::debug,
    pin::{
        date::PinDate,
        error::PinError,
        kind::PinKind,
        Pinner, PinRecord,
    },
    reqwest::Url,
    serde_json::{self, Value},
};
use scraper::Html;
use std::time::Instant;

use crate::client::RawPage;

use self::fields::{first_count, first_object, first_text, Object};

pub mod fields;
pub mod html;
pub mod payload;

/// Preferred image variants, largest first.
const IMAGE_SIZES: [&str; 6] = ["orig", "736x", "564x", "474x", "236x", "170x"];

/// Result of parsing one page.
#[derive(Debug, Clone, Default)]
pub struct ExtractedPage {
    /// Candidate records in page order. Not yet deduplicated.
    pub records: Vec<PinRecord>,
    /// Continuation token found in the payload.
    pub bookmark: Option<String>,
    /// Entries dropped for a missing or malformed mandatory field.
    pub skipped: usize,
}

impl ExtractedPage {
    /// Number of parseable entries on the page.
    #[inline]
    pub fn entries(&self) -> usize {
        self.records.len()
    }
}

/// Stateless page parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordExtractor;

impl RecordExtractor {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    pub fn parse(&self, page: &RawPage) -> ExtractedPage {
        debug!("Parsing page {}", page.cursor.sequence);
        self.parse_body(&page.body)
    }

    /// Parses a response body that was obtained through other means.
    pub fn parse_body(&self, body: &str) -> ExtractedPage {
        let start_point = Instant::now();

        let (trees, tiles) = match serde_json::from_str::<Value>(body) {
            Ok(tree) => (vec![tree], Vec::new()),
            Err(_) => {
                let document = Html::parse_document(body);
                let trees = html::script_blobs(&document);
                let tiles = if payload::pin_entries(&trees).is_empty() {
                    html::pin_tiles(&document)
                } else {
                    Vec::new()
                };
                (trees, tiles)
            }
        };

        let mut entries = payload::pin_entries(&trees);
        entries.extend(tiles.iter());

        let mut page = ExtractedPage {
            records: Vec::with_capacity(entries.len()),
            bookmark: payload::bookmark(&trees),
            skipped: 0,
        };

        for entry in entries {
            match self.map_entry(entry) {
                Ok(record) => page.records.push(record),
                Err(err) => {
                    debug!("Skipping entry: {err}");
                    page.skipped += 1;
                }
            }
        }

        debug!("List size: {}", page.records.len());
        debug!("Pin mapping took {:?}", start_point.elapsed());
        page
    }

    /// Maps one raw entry into a record.
    pub fn map_entry(&self, entry: &Value) -> Result<PinRecord, PinError> {
        let Some(entry) = entry.as_object() else {
            return Err(PinError::MalformedField {
                field: "entry",
                value: entry.to_string(),
            });
        };

        let id = first_text(entry, &["id"]).ok_or(PinError::MissingField { field: "id" })?;
        let image_url = image_url(entry)?;

        let pinner = first_object(entry, &["pinner", "owner", "native_creator"])
            .map(map_pinner)
            .unwrap_or_default();

        let date = PinDate::from_initial(first_text(
            entry,
            &["created_at", "created_at_timestamp", "createdAt"],
        ));

        let has_video = entry.get("videos").is_some_and(Value::is_object);
        let kind = PinKind::guess(entry.get("type").and_then(Value::as_str), has_video);

        Ok(PinRecord {
            id,
            title: first_text(entry, &["grid_title", "title", "description"]),
            pinner,
            date,
            kind,
            image_url,
        })
    }
}

fn map_pinner(pinner: &Object) -> Pinner {
    Pinner {
        id: first_text(pinner, &["id", "user_id"]),
        username: first_text(pinner, &["username", "urlname"]),
        full_name: first_text(pinner, &["full_name", "fullName"]),
        avatar_url: first_text(
            pinner,
            &["image_small_url", "image_medium_url", "image_xlarge_url"],
        ),
        followers: first_count(pinner, &["follower_count", "followers"]),
    }
}

fn image_url(entry: &Object) -> Result<String, PinError> {
    let candidate = entry
        .get("images")
        .and_then(Value::as_object)
        .and_then(|images| {
            IMAGE_SIZES
                .iter()
                .find_map(|size| images.get(*size).and_then(Value::as_object))
                .and_then(|variant| first_text(variant, &["url"]))
                .or_else(|| {
                    images
                        .values()
                        .filter_map(Value::as_object)
                        .find_map(|variant| first_text(variant, &["url"]))
                })
        })
        .or_else(|| first_text(entry, &["image_large_url", "image_url"]))
        .ok_or(PinError::MissingField { field: "imageURL" })?;

    absolute_url(&candidate).ok_or(PinError::MalformedField {
        field: "imageURL",
        value: candidate,
    })
}

/// Promotes protocol-relative URLs and rejects anything that isn't absolute http(s).
fn absolute_url(raw: &str) -> Option<String> {
    let url = if raw.starts_with("//") {
        format!("https:{raw}")
    } else {
        raw.to_string()
    };

    let parsed = Url::parse(&url).ok()?;
    (matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()).then_some(url)
}
