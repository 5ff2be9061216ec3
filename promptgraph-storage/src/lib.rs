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

//! Promptgraph Storage Layer
//!
//! Git-like version control for prompts: an immutable version graph per
//! prompt with branches, merges, restores and tags, plus a structural diff
//! engine over prompt content.
//!
//! ## Usage
//!
//! ```rust
//! use promptgraph_core::{ContentModel, Message};
//! use promptgraph_storage::{CommitOptions, PromptId, PromptRepository};
//!
//! let repo = PromptRepository::in_memory();
//! let prompt = PromptId::from("greeting");
//!
//! let v1 = repo
//!     .create_prompt(&prompt, ContentModel::new().with_message(Message::user("Hello")), CommitOptions::new())
//!     .unwrap();
//! let v2 = repo
//!     .commit(&prompt, ContentModel::new().with_message(Message::user("Hi there")), CommitOptions::new())
//!     .unwrap();
//!
//! let diff = repo.compare_versions(&prompt, v1.id, v2.id).unwrap();
//! assert_eq!(diff.summary.messages.modified, 1);
//! ```

pub mod version_git;

pub use version_git::{
    BranchError, BranchRef, ChangeType, CommitOptions, DiffConfig, DiffEngine, DiffResult,
    ErrorKind, FieldChange, InMemoryVersionStore, LabelBump, MergeEngine, MergeError, PromptId,
    PromptRepository, TagRef, Version, VersionGraph, VersionId, VersionStore, VersioningError,
};
