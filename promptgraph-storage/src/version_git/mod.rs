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

//! Git-Like Prompt Versioning System
//!
//! Each prompt's edit history is a DAG of immutable snapshots.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       PromptRepository                          │
//! │   create / commit / branch / merge / restore / tag / compare    │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────┐        │
//! │  │ DiffEngine  │◄────│ MergeEngine │     │  RefTable   │        │
//! │  │ (per field) │     │  (two-way)  │     │ active/tags │        │
//! │  └─────────────┘     └─────────────┘     │  branches   │        │
//! │                                          └─────────────┘        │
//! │  ┌─────────────────────────────────────────────────────┐        │
//! │  │   VersionGraph per prompt (RwLock, DashMap table)   │        │
//! │  └─────────────────────────────────────────────────────┘        │
//! │                            │ write-through                      │
//! │                            ▼                                    │
//! │  ┌─────────────────────────────────────────────────────┐        │
//! │  │                VersionStore (trait)                 │        │
//! │  └─────────────────────────────────────────────────────┘        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Features
//!
//! - **Immutable Versions**: a version is created once and never modified
//! - **Mutable References**: active pointer, tags and branch tips move
//! - **Full History**: parent chains, with two parents for merges
//! - **Branching**: forks on named branches, closed when merged
//! - **Diffing**: positional messages, keyed maps, scalar fields, optional patience line diff

pub mod branch;
pub mod diff;
pub mod error;
pub mod graph;
pub mod merge;
pub mod objects;
pub mod refs;
pub mod repository;
pub mod restore;
pub mod store;
pub mod tags;

pub use branch::BranchError;
pub use diff::{
    ChangeCounts, ChangeType, ContentDiff, DiffConfig, DiffEngine, DiffHunk, DiffLine, DiffResult,
    DiffSummary, FieldChange, KeyedDiff, LineChange, MessageDiff,
};
pub use error::{
    ConcurrentModificationError, ErrorKind, GraphIntegrityError, NotFoundError, VersioningError,
};
pub use graph::{LabelBump, VersionGraph};
pub use merge::{MergeEngine, MergeError, MergeOutcome};
pub use objects::{PromptId, Version, VersionId};
pub use refs::{validate_ref_name, BranchRef, RefNameError, RefTable, TagRef};
pub use repository::{CommitOptions, PromptRepository};
pub use store::{InMemoryVersionStore, StoreError, StoreStats, VersionStore};
