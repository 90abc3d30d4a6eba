//! Offline merge of an incoming JSON document into the persisted store.
//!
//! Works on raw `serde_json` values rather than the typed [`crate::store`]
//! shapes: admin imports may carry top-level keys the serving path does not
//! know about, and those must survive a merge untouched.

use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Errors that can occur during an admin merge.
#[derive(Debug)]
pub enum MergeError {
    /// Failed to read the incoming document.
    ReadSource { path: PathBuf, source: std::io::Error },
    /// The incoming document is not valid JSON.
    ParseSource { path: PathBuf, source: serde_json::Error },
    /// The document is valid JSON but not an object.
    NotAnObject { path: PathBuf },
    /// Failed to read the existing store file.
    ReadStore { path: PathBuf, source: std::io::Error },
    /// The existing store file is not valid JSON.
    ParseStore { path: PathBuf, source: serde_json::Error },
    /// Failed to write the merged store.
    WriteStore { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadSource { path, source } => {
                write!(f, "failed to read source JSON '{}': {}", path.display(), source)
            }
            Self::ParseSource { path, source } => {
                write!(f, "failed to parse source JSON '{}': {}", path.display(), source)
            }
            Self::NotAnObject { path } => {
                write!(f, "'{}' must contain a JSON object at the top level", path.display())
            }
            Self::ReadStore { path, source } => {
                write!(f, "failed to read data file '{}': {}", path.display(), source)
            }
            Self::ParseStore { path, source } => {
                write!(f, "failed to parse data file '{}': {}", path.display(), source)
            }
            Self::WriteStore { path, source } => {
                write!(f, "failed to write data file '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadSource { source, .. }
            | Self::ReadStore { source, .. }
            | Self::WriteStore { source, .. } => Some(source),
            Self::ParseSource { source, .. } | Self::ParseStore { source, .. } => Some(source),
            Self::NotAnObject { .. } => None,
        }
    }
}

/// Merge `incoming` into `base`, key by key:
///
/// - arrays: items carrying an `id` that matches an existing base item
///   replace it in place (position preserved); everything else appends
/// - objects: shallow merge, incoming wins on collision
/// - anything else: outright replacement
pub fn merge_documents(base: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match value {
            Value::Array(items) => {
                let slot = base
                    .entry(key)
                    .or_insert_with(|| Value::Array(Vec::new()));
                match slot {
                    Value::Array(existing) => merge_list(existing, items),
                    // Base value is not a list: the incoming list wins.
                    other => *other = Value::Array(items),
                }
            }
            Value::Object(fields) => {
                let slot = base
                    .entry(key)
                    .or_insert_with(|| Value::Object(Map::new()));
                match slot {
                    Value::Object(existing) => {
                        for (k, v) in fields {
                            existing.insert(k, v);
                        }
                    }
                    other => *other = Value::Object(fields),
                }
            }
            scalar => {
                base.insert(key, scalar);
            }
        }
    }
}

/// The `id` set is snapshotted from the base list up front: two incoming
/// items sharing a *new* id both append rather than the second replacing
/// the first.
fn merge_list(existing: &mut Vec<Value>, items: Vec<Value>) {
    let base_ids: Vec<Value> = existing.iter().filter_map(item_id).collect();

    for item in items {
        match item_id(&item) {
            Some(id) if base_ids.contains(&id) => {
                for slot in existing.iter_mut() {
                    if item_id(slot).as_ref() == Some(&id) {
                        *slot = item.clone();
                    }
                }
            }
            _ => existing.push(item),
        }
    }
}

fn item_id(item: &Value) -> Option<Value> {
    item.as_object().and_then(|o| o.get("id")).cloned()
}

/// Read a JSON document that must exist and must be an object.
pub fn read_document(path: &Path) -> Result<Map<String, Value>, MergeError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| MergeError::ReadSource { path: path.to_path_buf(), source: e })?;
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| MergeError::ParseSource { path: path.to_path_buf(), source: e })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(MergeError::NotAnObject { path: path.to_path_buf() }),
    }
}

/// Read the store file as a raw object; a missing file is an empty object.
pub fn read_store_or_empty(path: &Path) -> Result<Map<String, Value>, MergeError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => {
            return Err(MergeError::ReadStore { path: path.to_path_buf(), source: e });
        }
    };
    let value: Value = serde_json::from_str(&content)
        .map_err(|e| MergeError::ParseStore { path: path.to_path_buf(), source: e })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(MergeError::NotAnObject { path: path.to_path_buf() }),
    }
}

/// Rewrite the store file atomically: write a sibling temp file first, then
/// rename over the original so an interrupted write never leaves a torn file.
pub fn write_store_atomic(path: &Path, document: &Map<String, Value>) -> Result<(), MergeError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .map_err(|e| MergeError::WriteStore { path: path.to_path_buf(), source: e })?;
    }

    let json = serde_json::to_string_pretty(document)
        .map_err(|e| MergeError::WriteStore { path: path.to_path_buf(), source: std::io::Error::other(e) })?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .map_err(|e| MergeError::WriteStore { path: path.to_path_buf(), source: e })?;
    std::fs::rename(&tmp, path)
        .map_err(|e| MergeError::WriteStore { path: path.to_path_buf(), source: e })
}

/// Full admin update: read the incoming document and the current store,
/// merge in memory, then rewrite the store. The on-disk file is untouched
/// unless every step before the final rename succeeded.
pub fn apply_update(store_path: &Path, source_path: &Path) -> Result<(), MergeError> {
    let incoming = read_document(source_path)?;
    let mut base = read_store_or_empty(store_path)?;
    merge_documents(&mut base, incoming);
    write_store_atomic(store_path, &base)
}

/// Compare the operator-supplied token against the configured secret without
/// short-circuiting on the first mismatched byte.
pub fn token_matches(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
