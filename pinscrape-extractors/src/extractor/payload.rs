//! Locates pin entries and the continuation token inside a decoded payload.
//!
//! The search resource answers with `resource_response.data.results`, while the
//! HTML search page embeds a redux state whose shape drifts between releases.
//! The first shape is read directly; anything else is found by walking the tree.
use pinscrape_common::serde_json::Value;

/// Keys that, next to an `id`, mark an object as a pin.
const PIN_MARKERS: [&str; 3] = ["images", "grid_title", "title"];

const BOOKMARK_KEYS: [&str; 2] = ["bookmark", "nextBookmark"];

/// Pin-like objects found in `trees`, in document order.
pub fn pin_entries(trees: &[Value]) -> Vec<&Value> {
    let mut entries = Vec::new();

    for tree in trees {
        if let Some(results) = direct_results(tree) {
            entries.extend(results.iter().filter(|entry| entry.is_object()));
        } else {
            collect_pins(tree, &mut entries);
        }
    }

    entries
}

/// Continuation token of the page, if any.
pub fn bookmark(trees: &[Value]) -> Option<String> {
    trees.iter().find_map(|tree| {
        tree.pointer("/resource_response/bookmark")
            .and_then(Value::as_str)
            .or_else(|| {
                tree.pointer("/resource/options/bookmarks/0")
                    .and_then(Value::as_str)
            })
            .map(String::from)
            .or_else(|| find_bookmark(tree))
    })
}

fn direct_results(tree: &Value) -> Option<&Vec<Value>> {
    tree.pointer("/resource_response/data/results")
        .and_then(Value::as_array)
        .or_else(|| {
            tree.pointer("/resource_response/data")
                .and_then(Value::as_array)
        })
}

fn is_pin_like(value: &Value) -> bool {
    value.as_object().is_some_and(|object| {
        object.contains_key("id") && PIN_MARKERS.iter().any(|key| object.contains_key(*key))
    })
}

fn collect_pins<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    if is_pin_like(value) {
        out.push(value);
        return;
    }

    match value {
        Value::Object(object) => object.values().for_each(|v| collect_pins(v, out)),
        Value::Array(items) => items.iter().for_each(|v| collect_pins(v, out)),
        _ => {}
    }
}

fn find_bookmark(value: &Value) -> Option<String> {
    match value {
        Value::Object(object) => BOOKMARK_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_str).map(String::from))
            .or_else(|| object.values().find_map(find_bookmark)),
        Value::Array(items) => items.iter().find_map(find_bookmark),
        _ => None,
    }
}
