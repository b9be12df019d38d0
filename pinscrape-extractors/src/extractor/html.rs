//! HTML search pages.
//!
//! When the search surface answers with a rendered page instead of JSON, the pin
//! data is usually still there as page state inside a `<script>` element. If it
//! isn't, minimal entries are rebuilt from the pin tiles themselves.
use once_cell::sync::Lazy;
use pinscrape_common::{
    log::debug,
    serde_json::{self, json, Value},
};
use scraper::{ElementRef, Html, Selector};

static SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("static selector is valid"));

static PIN_TILE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div[data-test-id]").expect("static selector is valid"));

static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("static selector is valid"));

const STATE_MARKERS: [&str; 2] = ["__PWS_DATA__", "initialReduxState"];

/// JSON documents embedded in the page's scripts.
pub fn script_blobs(document: &Html) -> Vec<Value> {
    let mut blobs = Vec::new();

    for script in document.select(&SCRIPT_SELECTOR) {
        let text: String = script.text().collect();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        let labelled = script.value().id() == Some("__PWS_DATA__")
            || STATE_MARKERS.iter().any(|marker| trimmed.contains(marker));

        if trimmed.starts_with('{') && trimmed.ends_with('}') {
            if let Ok(value) = serde_json::from_str(trimmed) {
                blobs.push(value);
                continue;
            }
        }

        if labelled {
            if let Some(value) = outermost_object(trimmed) {
                blobs.push(value);
            }
        }
    }

    debug!("Extracted {} JSON blobs from HTML", blobs.len());
    blobs
}

/// Raw entries rebuilt from `div[data-test-id*=pin]` tiles, shaped like API entries.
pub fn pin_tiles(document: &Html) -> Vec<Value> {
    let mut entries = Vec::new();

    for tile in document.select(&PIN_TILE_SELECTOR) {
        let is_pin = tile
            .value()
            .attr("data-test-id")
            .is_some_and(|id| id.to_lowercase().contains("pin"));
        if !is_pin {
            continue;
        }

        if let Some(entry) = tile_entry(tile) {
            entries.push(entry);
        }
    }

    debug!("Fallback HTML parser found {} pins", entries.len());
    entries
}

fn tile_entry(tile: ElementRef<'_>) -> Option<Value> {
    let img = tile.select(&IMG_SELECTOR).next()?;
    let image_url = img
        .value()
        .attr("src")
        .or_else(|| img.value().attr("data-src"))
        .filter(|src| !src.is_empty())?;

    let id = tile
        .value()
        .attr("data-pin-id")
        .filter(|id| !id.is_empty())
        .map_or_else(|| synthetic_id(image_url), String::from);

    Some(json!({
        "id": id,
        "title": img.value().attr("alt").unwrap_or_default(),
        "images": {"orig": {"url": image_url}},
        "type": "pin",
    }))
}

/// First all-digit path segment of the image URL, else its last 32 characters.
fn synthetic_id(image_url: &str) -> String {
    image_url
        .split('/')
        .find(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
        .map_or_else(
            || {
                let chars: Vec<char> = image_url.chars().collect();
                chars[chars.len().saturating_sub(32)..].iter().collect()
            },
            String::from,
        )
}

fn outermost_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}
