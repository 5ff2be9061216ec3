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

//! Version Graph
//!
//! Arena of immutable [`Version`] nodes for one prompt, keyed by id, with
//! parent-id edges and the prompt's [`RefTable`].
//!
//! A node's parents must already be in the arena when it is appended, so the
//! graph stays acyclic by construction order. Stored nodes are normalized
//! (no tags, not active); reads return copies annotated from the ref table.

use super::error::{GraphIntegrityError, NotFoundError, Result};
use super::objects::{PromptId, Version, VersionId};
use super::refs::{BranchRef, RefTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::debug;

/// Which semver component a new label increments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelBump {
    /// Breaking change
    Major,
    #[default]
    Minor,
    Patch,
}

/// Label used when no version carries a parseable semantic version
pub const DEFAULT_LABEL: &str = "1.0.0";

/// DAG of versions for a single prompt
#[derive(Debug, Clone)]
pub struct VersionGraph {
    prompt_id: PromptId,
    nodes: HashMap<VersionId, Version>,
    /// Insertion order
    order: Vec<VersionId>,
    children: HashMap<VersionId, Vec<VersionId>>,
    refs: RefTable,
}

impl VersionGraph {
    pub fn new(prompt_id: PromptId) -> Self {
        Self {
            prompt_id,
            nodes: HashMap::new(),
            order: Vec::new(),
            children: HashMap::new(),
            refs: RefTable::new(),
        }
    }

    /// Rebuild a graph from stored versions and pointers
    ///
    /// Versions are inserted oldest first, each once all of its parents are
    /// present, and every node is re-validated on the way in.
    pub fn hydrate(
        prompt_id: PromptId,
        mut versions: Vec<Version>,
        active: Option<VersionId>,
        tags: BTreeMap<String, VersionId>,
    ) -> Result<Self> {
        let mut graph = Self::new(prompt_id);
        versions.sort_by_key(|v| v.created_at);

        let mut pending: VecDeque<Version> = versions.into();
        let mut stalled = 0;
        while let Some(version) = pending.pop_front() {
            if version.parent_ids.iter().all(|p| graph.contains(p)) {
                graph.append(version)?;
                stalled = 0;
            } else {
                pending.push_back(version);
                stalled += 1;
                if stalled > pending.len() {
                    // No remaining node has all of its parents
                    if let Some(version) = pending.pop_front() {
                        graph.check_append(&version)?;
                    }
                    break;
                }
            }
        }

        if let Some(active) = active {
            graph.set_active(active)?;
        }

        for (name, target) in &tags {
            if !graph.contains(target) {
                return Err(NotFoundError::Version {
                    prompt_id: graph.prompt_id.clone(),
                    version_id: *target,
                }
                .into());
            }
            graph.refs.set_tag(name, *target)?;
        }

        Ok(graph)
    }

    pub fn prompt_id(&self) -> &PromptId {
        &self.prompt_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &VersionId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn refs(&self) -> &RefTable {
        &self.refs
    }

    pub(crate) fn refs_mut(&mut self) -> &mut RefTable {
        &mut self.refs
    }

    // === Reads ===

    pub fn get(&self, id: &VersionId) -> std::result::Result<Version, NotFoundError> {
        self.nodes
            .get(id)
            .map(|v| self.materialize(v))
            .ok_or_else(|| self.not_found(*id))
    }

    pub fn active(&self) -> Option<VersionId> {
        self.refs.active()
    }

    pub fn active_version(&self) -> Option<Version> {
        self.active().and_then(|id| self.nodes.get(&id)).map(|v| self.materialize(v))
    }

    /// Versions newest first
    ///
    /// Without branches this is the trunk: the active version followed by its
    /// first-parent chain. With branches every node is returned, ordered by
    /// creation time with later insertions first on ties.
    pub fn list(&self, include_branches: bool, limit: usize) -> Vec<Version> {
        let listed: Vec<Version> = if include_branches {
            let mut all: Vec<&Version> = self
                .order
                .iter()
                .rev()
                .filter_map(|id| self.nodes.get(id))
                .collect();
            // Stable sort keeps the reversed insertion order for equal timestamps
            all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            all.into_iter()
                .take(limit)
                .map(|v| self.materialize(v))
                .collect()
        } else {
            let mut trunk = Vec::new();
            let mut cursor = self.active();
            while let Some(id) = cursor {
                if trunk.len() >= limit {
                    break;
                }
                match self.nodes.get(&id) {
                    Some(version) => {
                        trunk.push(self.materialize(version));
                        cursor = version.first_parent();
                    }
                    None => break,
                }
            }
            trunk
        };

        debug!(
            prompt_id = %self.prompt_id,
            include_branches,
            count = listed.len(),
            "Listed versions"
        );
        listed
    }

    /// All ancestors of `id` (excluding itself), nearest first
    pub fn ancestors(&self, id: &VersionId) -> std::result::Result<Vec<VersionId>, NotFoundError> {
        let start = self.nodes.get(id).ok_or_else(|| self.not_found(*id))?;

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut queue: VecDeque<VersionId> = start.parent_ids.iter().copied().collect();
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            out.push(current);
            if let Some(node) = self.nodes.get(&current) {
                queue.extend(node.parent_ids.iter().copied());
            }
        }
        Ok(out)
    }

    /// True when `ancestor` is reachable from `descendant` through parent edges
    pub fn is_ancestor(&self, ancestor: &VersionId, descendant: &VersionId) -> bool {
        self.reaches(*descendant, ancestor)
    }

    /// Direct children in insertion order
    pub fn children(&self, id: &VersionId) -> Vec<VersionId> {
        self.children.get(id).cloned().unwrap_or_default()
    }

    /// Next label after the highest semantic-version label in the graph
    pub fn next_label(&self, bump: LabelBump) -> String {
        let highest = self
            .nodes
            .values()
            .filter_map(|v| parse_label(&v.label))
            .max();

        match highest {
            Some(current) => bump_label(&current, bump).to_string(),
            None => DEFAULT_LABEL.to_string(),
        }
    }

    // === Mutations ===

    /// Validate a node against the graph without inserting it
    pub fn check_append(&self, version: &Version) -> std::result::Result<(), GraphIntegrityError> {
        if self.nodes.contains_key(&version.id) {
            return Err(GraphIntegrityError::DuplicateVersion(version.id));
        }

        if version.prompt_id != self.prompt_id {
            return Err(GraphIntegrityError::ForeignPrompt {
                version_id: version.id,
                expected: self.prompt_id.clone(),
                found: version.prompt_id.clone(),
            });
        }

        if version.parent_ids.len() > 2 {
            return Err(GraphIntegrityError::TooManyParents {
                version_id: version.id,
                count: version.parent_ids.len(),
            });
        }

        if version.is_merge != (version.parent_ids.len() == 2) {
            return Err(GraphIntegrityError::MergeFlagMismatch(version.id));
        }

        if version.parent_ids.contains(&version.id) {
            return Err(GraphIntegrityError::Cycle(version.id));
        }

        for parent in &version.parent_ids {
            if !self.nodes.contains_key(parent) {
                return Err(GraphIntegrityError::MissingParent {
                    version_id: version.id,
                    parent_id: *parent,
                });
            }
        }

        if version
            .parent_ids
            .iter()
            .any(|parent| self.reaches(*parent, &version.id))
        {
            return Err(GraphIntegrityError::Cycle(version.id));
        }

        Ok(())
    }

    /// Insert a validated node and update branch references
    pub fn append(&mut self, mut version: Version) -> std::result::Result<(), GraphIntegrityError> {
        self.check_append(&version)?;

        version.tags.clear();
        version.is_active = false;

        let id = version.id;
        for parent in &version.parent_ids {
            self.children.entry(*parent).or_default().push(id);
        }
        self.track_branches(&version);

        debug!(
            prompt_id = %self.prompt_id,
            version_id = %id.short(),
            label = %version.label,
            parents = version.parent_ids.len(),
            "Appended version"
        );

        self.order.push(id);
        self.nodes.insert(id, version);
        Ok(())
    }

    /// Point the prompt's active marker at `id`, returning the previous one
    pub fn set_active(&mut self, id: VersionId) -> std::result::Result<Option<VersionId>, NotFoundError> {
        if !self.nodes.contains_key(&id) {
            return Err(self.not_found(id));
        }
        Ok(self.refs.set_active(id))
    }

    // === Internals ===

    fn materialize(&self, version: &Version) -> Version {
        let mut out = version.clone();
        out.tags = self.refs.tags_for(&version.id);
        out.is_active = self.refs.is_active(&version.id);
        out
    }

    fn not_found(&self, id: VersionId) -> NotFoundError {
        NotFoundError::Version {
            prompt_id: self.prompt_id.clone(),
            version_id: id,
        }
    }

    /// Breadth-first walk over parent edges from `from`, inclusive
    fn reaches(&self, from: VersionId, target: &VersionId) -> bool {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([from]);
        while let Some(current) = queue.pop_front() {
            if current == *target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(&current) {
                queue.extend(node.parent_ids.iter().copied());
            }
        }
        false
    }

    /// Branch name a new child of `parent` carries
    ///
    /// Only a branch that is still open carries over; children of nodes on a
    /// merged branch land on no branch, so they never reopen it.
    pub fn inherited_branch(&self, parent: &Version) -> Option<String> {
        parent
            .branch_name
            .as_deref()
            .filter(|name| self.refs.open_branch(name).is_some())
            .map(str::to_string)
    }

    /// Branch bookkeeping for a freshly appended node
    ///
    /// A branch-named node advances the open branch of that name when its
    /// first parent is the tip; otherwise it starts a new branch unless one of
    /// that name is already open. A merge closes the open branch whose tip is
    /// its source.
    fn track_branches(&mut self, version: &Version) {
        let Some(first_parent) = version.first_parent() else {
            return;
        };

        if let Some(name) = &version.branch_name {
            let advanced =
                self.refs
                    .advance_branch(name, first_parent, version.id, version.created_at);
            if !advanced && self.refs.open_branch(name).is_none() {
                self.refs.create_branch(BranchRef::new(
                    name.clone(),
                    first_parent,
                    version.id,
                    version.created_at,
                ));
            }
        }

        if let Some(source) = version.merge_source() {
            if let Some(closed) = self.refs.close_branch_at(source, version.id, version.created_at)
            {
                debug!(
                    prompt_id = %self.prompt_id,
                    branch = %closed.name,
                    "Branch merged"
                );
            }
        }
    }
}

fn parse_label(label: &str) -> Option<semver::Version> {
    semver::Version::parse(label.trim().trim_start_matches('v')).ok()
}

fn bump_label(current: &semver::Version, bump: LabelBump) -> semver::Version {
    match bump {
        LabelBump::Major => semver::Version::new(current.major + 1, 0, 0),
        LabelBump::Minor => semver::Version::new(current.major, current.minor + 1, 0),
        LabelBump::Patch => semver::Version::new(current.major, current.minor, current.patch + 1),
    }
}
