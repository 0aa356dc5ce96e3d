//! Share strings for rings.
//!
//! A share string is `SPOKE1:` followed by standard base64 of the
//! zlib-compressed JSON document `{"version": 1, "rings": [...]}`. Items whose
//! type tag this build does not know are dropped one by one; anything else
//! that fails to decode rejects the whole string.

use crate::item::ItemTag;
use crate::ring::Ring;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{Read, Write};
use std::str::FromStr;
use thiserror::Error;

pub const FORMAT_PREFIX: &str = "SPOKE1:";
pub const FORMAT_VERSION: u32 = 1;
/// Upper bound on the inflated document.
const MAX_DECODED_LEN: u64 = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Not a ring share string (expected the SPOKE1: prefix)")]
    MissingPrefix,
    #[error("Unsupported share string version {0}")]
    UnsupportedVersion(u32),
    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Failed to compress rings: {0}")]
    Compress(#[source] std::io::Error),
    #[error("Failed to decompress rings: {0}")]
    Decompress(#[source] std::io::Error),
    #[error("Invalid ring data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Item {index} of ring {ring} has no type tag")]
    MalformedItem { ring: usize, index: usize },
}

/// One item dropped from an import because its type is unknown.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Skipped item {index} of ring '{ring_name}': unknown type '{tag}'")]
pub struct UnknownVariantSkipped {
    pub ring_name: String,
    pub index: usize,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub rings: Vec<Ring>,
    pub skipped: Vec<UnknownVariantSkipped>,
}

#[derive(Serialize)]
struct Document<'a> {
    version: u32,
    rings: &'a [Ring],
}

#[derive(Deserialize)]
struct RawDocument {
    version: u32,
    rings: Vec<Value>,
}

pub fn export_ring(ring: &Ring) -> Result<String, CodecError> {
    export_rings(std::slice::from_ref(ring))
}

pub fn export_rings(rings: &[Ring]) -> Result<String, CodecError> {
    let json = serde_json::to_vec(&Document {
        version: FORMAT_VERSION,
        rings,
    })?;
    encode(&json)
}

fn encode(json: &[u8]) -> Result<String, CodecError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(json).map_err(CodecError::Compress)?;
    let compressed = encoder.finish().map_err(CodecError::Compress)?;
    Ok(format!("{FORMAT_PREFIX}{}", STANDARD.encode(compressed)))
}

fn decode(blob: &str) -> Result<Vec<u8>, CodecError> {
    let payload = blob
        .trim()
        .strip_prefix(FORMAT_PREFIX)
        .ok_or(CodecError::MissingPrefix)?;
    let compressed = STANDARD.decode(payload)?;

    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .take(MAX_DECODED_LEN)
        .read_to_end(&mut json)
        .map_err(CodecError::Decompress)?;
    Ok(json)
}

/// Decodes a share string. The caller decides where the rings go, usually
/// [`RingList::append_imported`](crate::ring::RingList::append_imported).
pub fn import_rings(blob: &str) -> Result<Import, CodecError> {
    let document: RawDocument = serde_json::from_slice(&decode(blob)?)?;
    if document.version != FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(document.version));
    }

    let mut rings = Vec::with_capacity(document.rings.len());
    let mut skipped = Vec::new();
    for (index, mut value) in document.rings.into_iter().enumerate() {
        skipped.extend(strip_unknown_items(&mut value, index)?);
        let mut ring: Ring = serde_json::from_value(value)?;
        ring.sanitize();
        rings.push(ring);
    }

    for entry in &skipped {
        log::warn!("{}", entry);
    }
    Ok(Import { rings, skipped })
}

/// Removes items with unknown type tags and shifts the quick action index
/// so it keeps pointing at the same item.
fn strip_unknown_items(
    ring: &mut Value,
    ring_index: usize,
) -> Result<Vec<UnknownVariantSkipped>, CodecError> {
    let ring_name = ring
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let Some(items) = ring.get_mut("items").and_then(Value::as_array_mut) else {
        return Ok(Vec::new());
    };

    let mut kept = Vec::with_capacity(items.len());
    let mut removed = Vec::new();
    for (index, item) in std::mem::take(items).into_iter().enumerate() {
        let tag = item
            .get("type")
            .and_then(Value::as_str)
            .ok_or(CodecError::MalformedItem {
                ring: ring_index,
                index,
            })?;
        if ItemTag::from_str(tag).is_ok() {
            kept.push(item);
        } else {
            removed.push(UnknownVariantSkipped {
                ring_name: ring_name.clone(),
                index,
                tag: tag.to_string(),
            });
        }
    }
    *items = kept;

    if !removed.is_empty()
        && let Some(quick) = ring.get("quick_action_index").and_then(Value::as_u64)
    {
        let quick = quick as usize;
        let adjusted = if removed.iter().any(|s| s.index == quick) {
            None
        } else {
            Some(quick - removed.iter().filter(|s| s.index < quick).count())
        };
        ring["quick_action_index"] = serde_json::json!(adjusted);
    }
    Ok(removed)
}
