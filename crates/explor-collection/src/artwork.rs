//! Mapping from raw `/objects/{id}` payloads to [`Artwork`] records.
//!
//! The payload is read as a loose [`serde_json::Value`] rather than a strict
//! struct: the API omits, nulls, or empties fields freely, and a single
//! odd field must not make the whole object unusable.

use explor_types::{Artwork, ArtworkId};
use serde_json::Value;

/// Artist shown when no attribution field is populated.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Title shown when the object has none.
pub const UNTITLED: &str = "Untitled";

/// Maximum number of secondary images kept per artwork.
pub const MAX_GALLERY_IMAGES: usize = 10;

/// Maximum number of tags kept per artwork.
pub const MAX_TAGS: usize = 8;

/// Maximum number of parts joined into the description.
const MAX_DESCRIPTION_PARTS: usize = 3;

/// Separator between description parts.
const DESCRIPTION_SEPARATOR: &str = " \u{2022} ";

/// Convert a raw object payload into an [`Artwork`].
///
/// Returns `None` when the payload has no usable `objectID` or no primary
/// image (`primaryImageSmall` preferred, then `primaryImage`).
pub fn map_object(payload: &Value) -> Option<Artwork> {
    let id = payload
        .get("objectID")
        .and_then(Value::as_u64)
        .filter(|id| *id != 0)
        .map(ArtworkId)?;

    let image = non_empty_str(payload, "primaryImageSmall")
        .or_else(|| non_empty_str(payload, "primaryImage"))?
        .to_owned();

    let gallery_images = payload
        .get("additionalImages")
        .and_then(Value::as_array)
        .map(|images| {
            images
                .iter()
                .filter_map(Value::as_str)
                .take(MAX_GALLERY_IMAGES)
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Some(Artwork {
        id,
        title: owned_or(payload, "title", UNTITLED),
        artist: format_artist(payload),
        date: owned_or(payload, "objectDate", ""),
        department: owned_or(payload, "department", ""),
        medium: owned_or(payload, "medium", ""),
        dimensions: owned_or(payload, "dimensions", ""),
        gallery: owned_or(payload, "GalleryNumber", ""),
        image,
        gallery_images,
        description: format_description(payload),
        tags: collect_tags(payload),
        source_url: owned_or(payload, "objectURL", ""),
    })
}

/// Resolve the display artist.
///
/// Order: `artistDisplayName`, then the comma-joined names of
/// `constituents`, then `culture`, then [`UNKNOWN_ARTIST`].
fn format_artist(payload: &Value) -> String {
    if let Some(name) = non_empty_str(payload, "artistDisplayName") {
        return name.to_owned();
    }

    let constituents = payload
        .get("constituents")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|c| c.get("name").and_then(Value::as_str))
                .filter(|name| !name.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    if !constituents.is_empty() {
        return constituents.join(", ");
    }

    non_empty_str(payload, "culture").unwrap_or(UNKNOWN_ARTIST).to_owned()
}

fn format_description(payload: &Value) -> String {
    ["objectName", "classification", "creditLine"]
        .iter()
        .filter_map(|key| non_empty_str(payload, key))
        .take(MAX_DESCRIPTION_PARTS)
        .collect::<Vec<_>>()
        .join(DESCRIPTION_SEPARATOR)
}

/// Unique tag terms with the classification in front, capped at [`MAX_TAGS`].
fn collect_tags(payload: &Value) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    if let Some(list) = payload.get("tags").and_then(Value::as_array) {
        for term in list
            .iter()
            .filter_map(|tag| tag.get("term").and_then(Value::as_str))
            .filter(|term| !term.is_empty())
        {
            if !tags.iter().any(|existing| existing == term) {
                tags.push(term.to_owned());
            }
        }
    }

    if let Some(classification) = non_empty_str(payload, "classification")
        && !tags.iter().any(|tag| tag == classification)
    {
        tags.insert(0, classification.to_owned());
    }

    tags.truncate(MAX_TAGS);
    tags
}

fn non_empty_str<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn owned_or(payload: &Value, key: &str, fallback: &str) -> String {
    non_empty_str(payload, key).unwrap_or(fallback).to_owned()
}
