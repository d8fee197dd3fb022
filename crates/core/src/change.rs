//! Change and ChangeSet: the unit of replication between source and target

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// A single replicated operation on a relative path
///
/// `content == None` deletes the path (file or whole subtree).
/// `content == Some(bytes)` creates or overwrites the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// `/`-separated path relative to the tree root
    pub path: String,
    /// New content, or `None` for a delete
    #[serde(with = "content_base64")]
    pub content: Option<Vec<u8>>,
}

impl Change {
    /// Create-or-overwrite change
    pub fn upsert(path: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            content: Some(content),
        }
    }

    /// Delete change
    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
        }
    }

    pub fn is_delete(&self) -> bool {
        self.content.is_none()
    }
}

/// Ordered set of changes where each path appears at most once
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change
    ///
    /// Callers uphold the one-entry-per-path invariant; the tracker never
    /// pushes a path twice.
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.changes.iter()
    }

    /// Look up the change for a path
    pub fn get(&self, path: &str) -> Option<&Change> {
        self.changes.iter().find(|c| c.path == path)
    }

    /// Paths in application order
    pub fn paths(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.path.as_str()).collect()
    }

    /// Serialize for transport across a process boundary
    ///
    /// Format: `[{"path": "a.txt", "content": "<base64>"}, {"path": "sub", "content": null}]`
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize change set")
    }

    /// Parse the transport form produced by [`ChangeSet::to_json`]
    pub fn from_json(json: &str) -> Result<Self> {
        let set: ChangeSet =
            serde_json::from_str(json).context("Failed to deserialize change set")?;

        let mut seen = std::collections::HashSet::new();
        for change in &set.changes {
            if !seen.insert(change.path.as_str()) {
                anyhow::bail!("Duplicate path in change set: {}", change.path);
            }
        }
        Ok(set)
    }
}

impl From<Vec<Change>> for ChangeSet {
    fn from(changes: Vec<Change>) -> Self {
        Self { changes }
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}

/// Content travels as base64 text; `null` is the delete marker
mod content_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(content: &Option<Vec<u8>>, s: S) -> Result<S::Ok, S::Error> {
        match content {
            Some(bytes) => s.serialize_some(&STANDARD.encode(bytes)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(d)?;
        encoded
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_preserves_delete_marker() {
        let set = ChangeSet::from(vec![
            Change::upsert("a.txt", b"hello".to_vec()),
            Change::delete("sub"),
            Change::upsert("empty.txt", Vec::new()),
        ]);

        let json = set.to_json().unwrap();
        assert!(json.contains(r#""content":null"#));
        assert!(json.contains(r#""content":"aGVsbG8=""#));

        let parsed = ChangeSet::from_json(&json).unwrap();
        assert_eq!(parsed, set);
        assert!(parsed.get("sub").unwrap().is_delete());
        // Empty content is an upsert, not a delete
        assert!(!parsed.get("empty.txt").unwrap().is_delete());
    }

    #[test]
    fn test_from_json_rejects_duplicates() {
        let json = r#"[{"path":"a","content":null},{"path":"a","content":null}]"#;
        assert!(ChangeSet::from_json(json).is_err());
    }

    #[test]
    fn test_from_json_rejects_bad_base64() {
        let json = r#"[{"path":"a","content":"not base64!"}]"#;
        assert!(ChangeSet::from_json(json).is_err());
    }

    #[test]
    fn test_paths_keep_insertion_order() {
        let mut set = ChangeSet::new();
        set.push(Change::delete("z"));
        set.push(Change::upsert("a", vec![1]));
        assert_eq!(set.paths(), vec!["z", "a"]);
    }
}
