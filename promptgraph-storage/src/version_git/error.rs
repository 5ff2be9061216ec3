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

//! Error taxonomy for the versioning engine
//!
//! Each component reports its own `thiserror` enum; [`VersioningError`]
//! aggregates them for the repository facade and exposes a stable
//! [`ErrorKind`] so callers can branch on the category.

use super::branch::BranchError;
use super::merge::MergeError;
use super::objects::{PromptId, VersionId};
use super::refs::RefNameError;
use super::store::StoreError;
use promptgraph_core::ContentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A referenced prompt, version, tag or branch does not exist
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("Prompt not found: {0}")]
    Prompt(PromptId),

    #[error("Version {version_id} not found in prompt {prompt_id}")]
    Version {
        prompt_id: PromptId,
        version_id: VersionId,
    },

    #[error("Tag '{tag}' not found in prompt {prompt_id}")]
    Tag { prompt_id: PromptId, tag: String },

    #[error("Prompt {0} has no active version")]
    NoActiveVersion(PromptId),
}

/// Appending a node would break a structural invariant of the graph
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphIntegrityError {
    #[error("Version already exists: {0}")]
    DuplicateVersion(VersionId),

    #[error("Version {version_id} belongs to prompt {found}, not {expected}")]
    ForeignPrompt {
        version_id: VersionId,
        expected: PromptId,
        found: PromptId,
    },

    #[error("Version {version_id} has {count} parents (at most 2 allowed)")]
    TooManyParents { version_id: VersionId, count: usize },

    #[error("Parent {parent_id} of version {version_id} does not exist")]
    MissingParent {
        version_id: VersionId,
        parent_id: VersionId,
    },

    #[error("Appending version {0} would create a cycle")]
    Cycle(VersionId),

    #[error("Version {0} has an is_merge flag that does not match its parent count")]
    MergeFlagMismatch(VersionId),

    #[error("Prompt {0} already has versions")]
    AlreadyInitialized(PromptId),
}

/// Optimistic check failed: the active version moved underneath the caller
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Concurrent modification of prompt {prompt_id}: expected active {}, found {}", display_opt(.expected), display_opt(.actual))]
pub struct ConcurrentModificationError {
    pub prompt_id: PromptId,
    pub expected: Option<VersionId>,
    pub actual: Option<VersionId>,
}

fn display_opt(id: &Option<VersionId>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => "none".to_string(),
    }
}

/// Stable error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    GraphIntegrity,
    MalformedContent,
    Merge,
    Branch,
    ConcurrentModification,
    Store,
    InvalidName,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::GraphIntegrity => "graph_integrity",
            ErrorKind::MalformedContent => "malformed_content",
            ErrorKind::Merge => "merge",
            ErrorKind::Branch => "branch",
            ErrorKind::ConcurrentModification => "concurrent_modification",
            ErrorKind::Store => "store",
            ErrorKind::InvalidName => "invalid_name",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repository errors
#[derive(Debug, Error)]
pub enum VersioningError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    GraphIntegrity(#[from] GraphIntegrityError),

    #[error("Malformed content: {0}")]
    MalformedContent(#[from] ContentError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Branch(#[from] BranchError),

    #[error(transparent)]
    ConcurrentModification(#[from] ConcurrentModificationError),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error(transparent)]
    InvalidName(#[from] RefNameError),
}

impl VersioningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VersioningError::NotFound(_) => ErrorKind::NotFound,
            VersioningError::GraphIntegrity(_) => ErrorKind::GraphIntegrity,
            VersioningError::MalformedContent(_) => ErrorKind::MalformedContent,
            VersioningError::Merge(_) => ErrorKind::Merge,
            VersioningError::Branch(_) => ErrorKind::Branch,
            VersioningError::ConcurrentModification(_) => ErrorKind::ConcurrentModification,
            VersioningError::Store(_) => ErrorKind::Store,
            VersioningError::InvalidName(_) => ErrorKind::InvalidName,
        }
    }
}

impl From<StoreError> for VersioningError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict {
                prompt_id,
                expected,
                actual,
            } => VersioningError::ConcurrentModification(ConcurrentModificationError {
                prompt_id,
                expected,
                actual,
            }),
            other => VersioningError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, VersioningError>;
