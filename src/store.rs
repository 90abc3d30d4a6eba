//! Info store types and the on-disk loader.
//!
//! The store is a single JSON document with four known top-level fields.
//! It is re-read on every request so that offline updates from the admin
//! tool are picked up without a restart.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A published notice. `id` is only used by the admin merge for dedup/replace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub date: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// An upcoming event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub date: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// The full data document. All fields default to empty containers so the
/// resolver never sees a missing field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfoStore {
    #[serde(default)]
    pub notices: Vec<Notice>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub contacts: BTreeMap<String, String>,
    #[serde(default)]
    pub timetable: BTreeMap<String, String>,
}

/// Errors that can occur when loading the info store.
#[derive(Debug)]
pub enum StoreError {
    /// Failed to read the store file (other than it not existing).
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read store file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse store file '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
        }
    }
}

/// Load the store from disk.
///
/// A missing file yields the empty default (fresh deployments have no data
/// yet); unreadable or malformed content is an error for the caller to handle.
pub fn load_store<P: AsRef<Path>>(path: P) -> Result<InfoStore, StoreError> {
    let path = path.as_ref();
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(InfoStore::default()),
        Err(e) => {
            return Err(StoreError::ReadFile { path: path.to_path_buf(), source: e });
        }
    };
    serde_json::from_str(&content)
        .map_err(|e| StoreError::ParseJson { path: path.to_path_buf(), source: e })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_store(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_yields_empty_default() {
        let store = load_store("/nonexistent/path/college_info.json").unwrap();
        assert!(store.notices.is_empty());
        assert!(store.events.is_empty());
        assert!(store.contacts.is_empty());
        assert!(store.timetable.is_empty());
    }

    #[test]
    fn test_full_document() {
        let file = write_store(
            r#"{
                "notices": [{"id": "n1", "date": "2024-01-10", "title": "Exam Schedule", "content": "Midterm exam dates released"}],
                "events": [{"date": "2024-02-01", "title": "Tech Fest"}],
                "contacts": {"registrar": "555-0199"},
                "timetable": {"CS": "Mon 9am"}
            }"#,
        );
        let store = load_store(file.path()).unwrap();
        assert_eq!(store.notices.len(), 1);
        assert_eq!(store.notices[0].id.as_deref(), Some("n1"));
        assert_eq!(store.events[0].location, None);
        assert_eq!(store.contacts["registrar"], "555-0199");
        assert_eq!(store.timetable["CS"], "Mon 9am");
    }

    #[test]
    fn test_partial_document_defaults_missing_fields() {
        let file = write_store(r#"{"notices": []}"#);
        let store = load_store(file.path()).unwrap();
        assert!(store.contacts.is_empty());
        assert!(store.timetable.is_empty());
    }

    #[test]
    fn test_unknown_top_level_keys_ignored() {
        let file = write_store(r#"{"notices": [], "hostel_rules": ["no noise"]}"#);
        assert!(load_store(file.path()).is_ok());
    }

    #[test]
    fn test_malformed_json_is_error() {
        let file = write_store("{ not json }");
        let err = load_store(file.path()).unwrap_err();
        assert!(matches!(err, StoreError::ParseJson { .. }));
    }
}
