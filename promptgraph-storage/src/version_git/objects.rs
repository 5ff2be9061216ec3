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

//! Version Objects
//!
//! Identifiers and the immutable [`Version`] node.
//! A version is created once and never modified; `tags` and `is_active` are
//! annotations filled in from the graph's reference table whenever a version
//! is read.

use chrono::{DateTime, Utc};
use promptgraph_core::ContentModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Version ID - random UUID, unique within a prompt's graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(Uuid);

impl VersionId {
    /// Fresh random ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parse from the hyphenated or simple UUID form
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First 8 hex chars, for logs
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }
}

impl Default for VersionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owning prompt identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromptId(String);

impl PromptId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PromptId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PromptId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Version node - immutable snapshot with parent chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: VersionId,
    pub prompt_id: PromptId,
    /// Human-readable label, conventionally a semantic version
    pub label: String,
    /// Empty for the root, one for a normal commit, two for a merge (`[target, source]`)
    pub parent_ids: Vec<VersionId>,
    pub branch_name: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub content: ContentModel,
    pub is_merge: bool,
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub commit_message: String,
    #[serde(default)]
    pub is_active: bool,
}

impl Version {
    fn build(
        prompt_id: PromptId,
        parent_ids: Vec<VersionId>,
        label: String,
        content: ContentModel,
        author: String,
        message: String,
    ) -> Self {
        let is_merge = parent_ids.len() == 2;
        Self {
            id: VersionId::new(),
            prompt_id,
            label,
            parent_ids,
            branch_name: None,
            tags: BTreeSet::new(),
            content,
            is_merge,
            created_at: Utc::now(),
            author,
            commit_message: message,
            is_active: false,
        }
    }

    /// Create root version (no parents)
    pub fn initial(
        prompt_id: PromptId,
        label: impl Into<String>,
        content: ContentModel,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::build(
            prompt_id,
            vec![],
            label.into(),
            content,
            author.into(),
            message.into(),
        )
    }

    /// Create child version (single parent)
    pub fn child(
        parent: VersionId,
        prompt_id: PromptId,
        label: impl Into<String>,
        content: ContentModel,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::build(
            prompt_id,
            vec![parent],
            label.into(),
            content,
            author.into(),
            message.into(),
        )
    }

    /// Create merge version; the target is the first parent
    pub fn merge(
        target: VersionId,
        source: VersionId,
        prompt_id: PromptId,
        label: impl Into<String>,
        content: ContentModel,
        author: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::build(
            prompt_id,
            vec![target, source],
            label.into(),
            content,
            author.into(),
            message.into(),
        )
    }

    pub fn on_branch(mut self, branch_name: Option<String>) -> Self {
        self.branch_name = branch_name;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_initial(&self) -> bool {
        self.parent_ids.is_empty()
    }

    pub fn first_parent(&self) -> Option<VersionId> {
        self.parent_ids.first().copied()
    }

    /// Source parent of a merge version
    pub fn merge_source(&self) -> Option<VersionId> {
        if self.is_merge {
            self.parent_ids.get(1).copied()
        } else {
            None
        }
    }
}
