// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Version Store - Persistence Boundary
//!
//! The repository writes every new version, active-pointer move and tag
//! change through a [`VersionStore`] before updating its in-memory graph,
//! and hydrates a prompt's graph from the store on first access.

use super::objects::{PromptId, Version, VersionId};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Version {version_id} not found for prompt {prompt_id}")]
    NotFound {
        prompt_id: PromptId,
        version_id: VersionId,
    },

    #[error("Version already stored: {0}")]
    Duplicate(VersionId),

    /// The backend saw a concurrent write for the prompt
    #[error("Conflicting write for prompt {prompt_id}")]
    Conflict {
        prompt_id: PromptId,
        expected: Option<VersionId>,
        actual: Option<VersionId>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Persistence collaborator for version graphs
pub trait VersionStore: Send + Sync {
    /// Every stored version of a prompt, in any order
    fn load_all_versions(&self, prompt_id: &PromptId) -> Result<Vec<Version>, StoreError>;

    fn load_version(
        &self,
        prompt_id: &PromptId,
        version_id: &VersionId,
    ) -> Result<Option<Version>, StoreError>;

    /// Store a new version; versions are never rewritten
    ///
    /// With `activate` set, the active pointer moves to the new version in
    /// the same write. Either both land or neither does.
    fn persist(&self, version: &Version, activate: bool) -> Result<(), StoreError>;

    fn set_active_pointer(&self, prompt_id: &PromptId, version_id: VersionId)
        -> Result<(), StoreError>;

    fn load_active_pointer(&self, prompt_id: &PromptId) -> Result<Option<VersionId>, StoreError>;

    /// Replace the prompt's whole tag table
    fn save_tags(
        &self,
        prompt_id: &PromptId,
        tags: &BTreeMap<String, VersionId>,
    ) -> Result<(), StoreError>;

    fn load_tags(&self, prompt_id: &PromptId) -> Result<BTreeMap<String, VersionId>, StoreError>;
}

/// Everything stored for one prompt
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptRecord {
    versions: Vec<Version>,
    active: Option<VersionId>,
    tags: BTreeMap<String, VersionId>,
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub prompt_count: u64,
    pub version_count: u64,
    pub pointer_updates: u64,
    pub tag_updates: u64,
}

/// In-memory version store (for testing and lightweight use)
#[derive(Debug, Default)]
pub struct InMemoryVersionStore {
    prompts: DashMap<PromptId, PromptRecord>,
    version_count: AtomicU64,
    pointer_updates: AtomicU64,
    tag_updates: AtomicU64,
}

impl InMemoryVersionStore {
    /// Create a new in-memory version store
    pub fn new() -> Self {
        Self::default()
    }

    /// Known prompt ids, sorted
    pub fn prompts(&self) -> Vec<PromptId> {
        let mut ids: Vec<PromptId> = self.prompts.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Get store statistics
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            prompt_count: self.prompts.len() as u64,
            version_count: self.version_count.load(Ordering::Relaxed),
            pointer_updates: self.pointer_updates.load(Ordering::Relaxed),
            tag_updates: self.tag_updates.load(Ordering::Relaxed),
        }
    }

    // === Persistence ===

    /// Save store to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), StoreError> {
        let snapshot: BTreeMap<PromptId, PromptRecord> = self
            .prompts
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();

        let data = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        std::fs::write(path, data)?;
        Ok(())
    }

    /// Load store from a JSON file written by [`save_to_file`](Self::save_to_file)
    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let data = std::fs::read(path)?;
        let snapshot: BTreeMap<PromptId, PromptRecord> = serde_json::from_slice(&data)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        let store = Self::new();
        for (prompt_id, record) in snapshot {
            store
                .version_count
                .fetch_add(record.versions.len() as u64, Ordering::Relaxed);
            store.prompts.insert(prompt_id, record);
        }

        Ok(store)
    }
}

impl VersionStore for InMemoryVersionStore {
    fn load_all_versions(&self, prompt_id: &PromptId) -> Result<Vec<Version>, StoreError> {
        Ok(self
            .prompts
            .get(prompt_id)
            .map(|r| r.versions.clone())
            .unwrap_or_default())
    }

    fn load_version(
        &self,
        prompt_id: &PromptId,
        version_id: &VersionId,
    ) -> Result<Option<Version>, StoreError> {
        Ok(self.prompts.get(prompt_id).and_then(|r| {
            r.versions
                .iter()
                .find(|v| v.id == *version_id)
                .cloned()
        }))
    }

    fn persist(&self, version: &Version, activate: bool) -> Result<(), StoreError> {
        let mut record = self.prompts.entry(version.prompt_id.clone()).or_default();

        if record.versions.iter().any(|v| v.id == version.id) {
            return Err(StoreError::Duplicate(version.id));
        }

        record.versions.push(version.clone());
        self.version_count.fetch_add(1, Ordering::Relaxed);
        if activate {
            record.active = Some(version.id);
            self.pointer_updates.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn set_active_pointer(
        &self,
        prompt_id: &PromptId,
        version_id: VersionId,
    ) -> Result<(), StoreError> {
        let mut record = self
            .prompts
            .get_mut(prompt_id)
            .ok_or_else(|| StoreError::NotFound {
                prompt_id: prompt_id.clone(),
                version_id,
            })?;

        if !record.versions.iter().any(|v| v.id == version_id) {
            return Err(StoreError::NotFound {
                prompt_id: prompt_id.clone(),
                version_id,
            });
        }

        record.active = Some(version_id);
        self.pointer_updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn load_active_pointer(&self, prompt_id: &PromptId) -> Result<Option<VersionId>, StoreError> {
        Ok(self.prompts.get(prompt_id).and_then(|r| r.active))
    }

    fn save_tags(
        &self,
        prompt_id: &PromptId,
        tags: &BTreeMap<String, VersionId>,
    ) -> Result<(), StoreError> {
        let mut record = self.prompts.entry(prompt_id.clone()).or_default();
        record.tags = tags.clone();
        self.tag_updates.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn load_tags(&self, prompt_id: &PromptId) -> Result<BTreeMap<String, VersionId>, StoreError> {
        Ok(self
            .prompts
            .get(prompt_id)
            .map(|r| r.tags.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptgraph_core::{ContentModel, Message};

    fn version(prompt: &str) -> Version {
        Version::initial(
            PromptId::from(prompt),
            "1.0.0",
            ContentModel::new().with_message(Message::user("hi")),
            "alice",
            "init",
        )
    }

    #[test]
    fn test_persist_and_load() {
        let store = InMemoryVersionStore::new();
        let v1 = version("p1");
        let prompt = v1.prompt_id.clone();

        store.persist(&v1, false).unwrap();
        assert!(matches!(store.persist(&v1, true), Err(StoreError::Duplicate(id)) if id == v1.id));
        assert_eq!(store.load_active_pointer(&prompt).unwrap(), None);

        assert_eq!(store.load_all_versions(&prompt).unwrap(), vec![v1.clone()]);
        assert_eq!(store.load_version(&prompt, &v1.id).unwrap(), Some(v1.clone()));
        assert_eq!(store.load_version(&prompt, &VersionId::new()).unwrap(), None);
        assert!(store
            .load_all_versions(&PromptId::from("unknown"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_pointers_and_tags() {
        let store = InMemoryVersionStore::new();
        let v1 = version("p1");
        let prompt = v1.prompt_id.clone();

        // Pointer must reference a stored version
        assert!(store.set_active_pointer(&prompt, v1.id).is_err());

        store.persist(&v1, false).unwrap();
        store.set_active_pointer(&prompt, v1.id).unwrap();
        assert_eq!(store.load_active_pointer(&prompt).unwrap(), Some(v1.id));

        let mut tags = BTreeMap::new();
        tags.insert("stable".to_string(), v1.id);
        store.save_tags(&prompt, &tags).unwrap();
        assert_eq!(store.load_tags(&prompt).unwrap(), tags);

        let stats = store.stats();
        assert_eq!(stats.prompt_count, 1);
        assert_eq!(stats.version_count, 1);
        assert_eq!(stats.pointer_updates, 1);
        assert_eq!(stats.tag_updates, 1);
    }

    #[test]
    fn test_persist_activates_in_one_write() {
        let store = InMemoryVersionStore::new();
        let v1 = version("p1");
        let prompt = v1.prompt_id.clone();

        store.persist(&v1, true).unwrap();
        assert_eq!(store.load_active_pointer(&prompt).unwrap(), Some(v1.id));
        assert_eq!(store.stats().pointer_updates, 1);

        // A rejected write moves nothing
        assert!(store.persist(&v1, true).is_err());
        assert_eq!(store.load_all_versions(&prompt).unwrap().len(), 1);
        assert_eq!(store.stats().pointer_updates, 1);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("versions.json");

        let store = InMemoryVersionStore::new();
        let v1 = version("p1");
        let v2 = version("p2");
        store.persist(&v1, true).unwrap();
        store.persist(&v2, false).unwrap();
        store.save_to_file(&path).unwrap();

        let loaded = InMemoryVersionStore::load_from_file(&path).unwrap();
        assert_eq!(loaded.prompts(), vec![PromptId::from("p1"), PromptId::from("p2")]);
        assert_eq!(loaded.stats().version_count, 2);
        assert_eq!(loaded.load_active_pointer(&v1.prompt_id).unwrap(), Some(v1.id));
        assert_eq!(
            loaded.load_version(&v2.prompt_id, &v2.id).unwrap(),
            Some(v2)
        );
    }
}
