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

//! Prompt Repository - High-Level Versioning Interface
//!
//! Owns one [`VersionGraph`] per prompt, each behind its own `RwLock`, so
//! mutations are serialized per prompt while different prompts never
//! contend. Reads materialize versions under the read lock. Writes go
//! through to the [`VersionStore`] first and only then touch the in-memory
//! graph, so a failed write leaves the graph unchanged.
//!
//! Branch, merge, restore and tag operations live next to their engines in
//! `branch`, `merge`, `restore` and `tags`.

use super::diff::{DiffConfig, DiffEngine, DiffResult};
use super::error::{ConcurrentModificationError, GraphIntegrityError, NotFoundError, Result};
use super::graph::{LabelBump, VersionGraph};
use super::merge::MergeEngine;
use super::objects::{PromptId, Version, VersionId};
use super::store::{InMemoryVersionStore, VersionStore};
use dashmap::DashMap;
use parking_lot::RwLock;
use promptgraph_core::{ContentModel, EngineConfig, RepositoryConfig};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Caller-supplied metadata for any operation that creates a version
#[derive(Debug, Clone, Default)]
pub struct CommitOptions {
    /// Defaults to the configured author
    pub author: Option<String>,
    /// Defaults to a message describing the operation
    pub message: Option<String>,
    /// Explicit label; otherwise the next label per `bump`
    pub label: Option<String>,
    pub bump: LabelBump,
    /// Parent for `commit`; defaults to the active version
    pub parent: Option<VersionId>,
    /// Fail with a concurrent-modification error unless this is still active
    pub expected_active: Option<VersionId>,
}

impl CommitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_bump(mut self, bump: LabelBump) -> Self {
        self.bump = bump;
        self
    }

    pub fn with_parent(mut self, parent: VersionId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn expecting_active(mut self, version_id: VersionId) -> Self {
        self.expected_active = Some(version_id);
        self
    }
}

/// Prompt version control repository
pub struct PromptRepository {
    store: Arc<dyn VersionStore>,
    /// Lazily hydrated graphs, one lock per prompt
    graphs: DashMap<PromptId, Arc<RwLock<VersionGraph>>>,
    diff_engine: DiffEngine,
    merge_engine: MergeEngine,
    config: RepositoryConfig,
}

impl PromptRepository {
    /// Create a repository over `store` with default configuration
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self::with_config(store, &EngineConfig::default())
    }

    /// Create a repository backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryVersionStore::new()))
    }

    pub fn with_config(store: Arc<dyn VersionStore>, config: &EngineConfig) -> Self {
        Self {
            store,
            graphs: DashMap::new(),
            diff_engine: DiffEngine::with_config(DiffConfig::from(&config.diff)),
            merge_engine: MergeEngine::with_policy(config.merge.policy),
            config: config.repository.clone(),
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn VersionStore {
        self.store.as_ref()
    }

    pub fn diff_engine(&self) -> &DiffEngine {
        &self.diff_engine
    }

    pub fn merge_engine(&self) -> &MergeEngine {
        &self.merge_engine
    }

    // === Core Operations ===

    /// Create a prompt's root version and make it active
    pub fn create_prompt(
        &self,
        prompt_id: &PromptId,
        content: ContentModel,
        options: CommitOptions,
    ) -> Result<Version> {
        let handle = self.handle(prompt_id, true)?;
        let mut graph = handle.write();

        if !graph.is_empty() {
            warn!(prompt_id = %prompt_id, "Prompt already initialized");
            return Err(GraphIntegrityError::AlreadyInitialized(prompt_id.clone()).into());
        }

        let label = options
            .label
            .clone()
            .unwrap_or_else(|| self.config.initial_label.clone());
        let message = options
            .message
            .clone()
            .unwrap_or_else(|| "Initial version".to_string());
        let version = Version::initial(
            prompt_id.clone(),
            label,
            content,
            self.resolve_author(&options),
            message,
        );

        let created = self.write_version(&mut graph, version, true)?;
        info!(
            prompt_id = %prompt_id,
            version_id = %created.id.short(),
            label = %created.label,
            "Created prompt"
        );
        Ok(created)
    }

    /// Commit new content as a child of `options.parent` (default: active)
    ///
    /// The new version inherits its parent's branch while that branch is open
    /// and becomes active only when its parent was active.
    pub fn commit(
        &self,
        prompt_id: &PromptId,
        content: ContentModel,
        options: CommitOptions,
    ) -> Result<Version> {
        self.write(prompt_id, |graph| {
            check_expected_active(graph, options.expected_active)?;

            let parent_id = match options.parent {
                Some(parent) => parent,
                None => graph
                    .active()
                    .ok_or_else(|| NotFoundError::NoActiveVersion(prompt_id.clone()))?,
            };
            let parent = graph.get(&parent_id)?;

            let label = self.resolve_label(graph, &options);
            let message = options
                .message
                .clone()
                .unwrap_or_else(|| format!("Version {}", label));
            let version = Version::child(
                parent_id,
                prompt_id.clone(),
                label,
                content,
                self.resolve_author(&options),
                message,
            )
            .on_branch(graph.inherited_branch(&parent));

            let committed = self.write_version(graph, version, parent.is_active)?;
            info!(
                prompt_id = %prompt_id,
                version_id = %committed.id.short(),
                label = %committed.label,
                branch = committed.branch_name.as_deref().unwrap_or("-"),
                active = committed.is_active,
                "Committed version"
            );
            Ok(committed)
        })
    }

    /// Move the active pointer to an existing version
    pub fn set_active(&self, prompt_id: &PromptId, version_id: VersionId) -> Result<Version> {
        self.write(prompt_id, |graph| {
            if !graph.contains(&version_id) {
                return Err(NotFoundError::Version {
                    prompt_id: prompt_id.clone(),
                    version_id,
                }
                .into());
            }

            self.store.set_active_pointer(prompt_id, version_id)?;
            let previous = graph.set_active(version_id)?;
            info!(
                prompt_id = %prompt_id,
                version_id = %version_id.short(),
                previous = %previous.map(|p| p.short()).unwrap_or_default(),
                "Activated version"
            );
            Ok(graph.get(&version_id)?)
        })
    }

    // === Reads ===

    pub fn get_version(&self, prompt_id: &PromptId, version_id: VersionId) -> Result<Version> {
        self.read(prompt_id, |graph| Ok(graph.get(&version_id)?))
    }

    pub fn get_active_version(&self, prompt_id: &PromptId) -> Result<Version> {
        self.read(prompt_id, |graph| {
            graph
                .active_version()
                .ok_or_else(|| NotFoundError::NoActiveVersion(prompt_id.clone()).into())
        })
    }

    /// Versions newest first; `limit` defaults to the configured cap
    ///
    /// Without branches only the active version's first-parent chain is
    /// returned.
    pub fn list_versions(
        &self,
        prompt_id: &PromptId,
        include_branches: bool,
        limit: Option<usize>,
    ) -> Result<Vec<Version>> {
        let limit = limit.unwrap_or(self.config.default_list_limit);
        self.read(prompt_id, |graph| Ok(graph.list(include_branches, limit)))
    }

    /// Diff two versions of a prompt; `version1` is the "before" side
    pub fn compare_versions(
        &self,
        prompt_id: &PromptId,
        version1: VersionId,
        version2: VersionId,
    ) -> Result<DiffResult> {
        let (a, b) = self.read(prompt_id, |graph| {
            let a = graph.get(&version1)?;
            let b = graph.get(&version2)?;
            Ok((a.content, b.content))
        })?;

        debug!(
            prompt_id = %prompt_id,
            version1 = %version1.short(),
            version2 = %version2.short(),
            "Comparing versions"
        );
        Ok(self.diff_engine.compare(&a, &b))
    }

    /// Diff two content snapshots that need not be stored
    pub fn compare_contents(&self, a: &ContentModel, b: &ContentModel) -> DiffResult {
        self.diff_engine.compare(a, b)
    }

    /// Ancestor ids of a version, nearest first
    pub fn history(&self, prompt_id: &PromptId, version_id: VersionId) -> Result<Vec<VersionId>> {
        self.read(prompt_id, |graph| Ok(graph.ancestors(&version_id)?))
    }

    // === Graph access ===

    /// Handle for a prompt's graph, hydrating it from the store on first use
    ///
    /// Unknown prompts are only registered when `create` is set.
    fn handle(&self, prompt_id: &PromptId, create: bool) -> Result<Arc<RwLock<VersionGraph>>> {
        if let Some(graph) = self.graphs.get(prompt_id) {
            return Ok(Arc::clone(graph.value()));
        }

        let versions = self.store.load_all_versions(prompt_id)?;
        if versions.is_empty() && !create {
            return Err(NotFoundError::Prompt(prompt_id.clone()).into());
        }

        let count = versions.len();
        let active = self.store.load_active_pointer(prompt_id)?;
        let tags = self.store.load_tags(prompt_id)?;
        let graph = VersionGraph::hydrate(prompt_id.clone(), versions, active, tags)?;
        if count > 0 {
            info!(prompt_id = %prompt_id, versions = count, "Hydrated prompt graph");
        }

        // A concurrent hydration may have won; keep whichever landed first
        let entry = self
            .graphs
            .entry(prompt_id.clone())
            .or_insert_with(|| Arc::new(RwLock::new(graph)));
        Ok(Arc::clone(entry.value()))
    }

    /// Run `f` under the prompt's read lock
    pub(super) fn read<T>(
        &self,
        prompt_id: &PromptId,
        f: impl FnOnce(&VersionGraph) -> Result<T>,
    ) -> Result<T> {
        let handle = self.handle(prompt_id, false)?;
        let graph = handle.read();
        if graph.is_empty() {
            return Err(NotFoundError::Prompt(prompt_id.clone()).into());
        }
        f(&graph)
    }

    /// Run `f` under the prompt's write lock
    pub(super) fn write<T>(
        &self,
        prompt_id: &PromptId,
        f: impl FnOnce(&mut VersionGraph) -> Result<T>,
    ) -> Result<T> {
        let handle = self.handle(prompt_id, false)?;
        let mut graph = handle.write();
        if graph.is_empty() {
            return Err(NotFoundError::Prompt(prompt_id.clone()).into());
        }
        f(&mut graph)
    }

    /// Validate, persist, then append; optionally activate the new version
    ///
    /// The version and its pointer move reach the store in one write, so a
    /// failure leaves both the store and the graph as they were.
    pub(super) fn write_version(
        &self,
        graph: &mut VersionGraph,
        version: Version,
        activate: bool,
    ) -> Result<Version> {
        graph.check_append(&version)?;

        self.store.persist(&version, activate)?;

        let id = version.id;
        graph.append(version)?;
        if activate {
            graph.set_active(id)?;
        }
        Ok(graph.get(&id)?)
    }

    pub(super) fn resolve_author(&self, options: &CommitOptions) -> String {
        options
            .author
            .clone()
            .unwrap_or_else(|| self.config.default_author.clone())
    }

    pub(super) fn resolve_label(&self, graph: &VersionGraph, options: &CommitOptions) -> String {
        options
            .label
            .clone()
            .unwrap_or_else(|| graph.next_label(options.bump))
    }
}

impl Default for PromptRepository {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Fail unless `expected` (when given) is still the active version
pub(super) fn check_expected_active(
    graph: &VersionGraph,
    expected: Option<VersionId>,
) -> Result<()> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let actual = graph.active();
    if actual != Some(expected) {
        warn!(
            prompt_id = %graph.prompt_id(),
            expected = %expected.short(),
            actual = %actual.map(|a| a.short()).unwrap_or_default(),
            "Active version moved"
        );
        return Err(ConcurrentModificationError {
            prompt_id: graph.prompt_id().clone(),
            expected: Some(expected),
            actual,
        }
        .into());
    }
    Ok(())
}
