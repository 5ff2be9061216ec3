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

//! Reference Table (Active Pointer, Branches & Tags)
//!
//! Mutable references to immutable versions. One table per prompt, guarded by
//! the same lock as the prompt's graph.

use super::objects::VersionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Reference name rejected by [`validate_ref_name`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid reference name '{name}': {reason}")]
pub struct RefNameError {
    pub name: String,
    pub reason: String,
}

impl RefNameError {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Branch - mutable reference to the newest version forked off `base`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchRef {
    pub name: String,
    /// Newest version on the branch
    pub tip: VersionId,
    /// Version the branch was forked from
    pub base: VersionId,
    /// False once the tip has been merged as a merge source
    pub open: bool,
    /// Merge version that closed the branch
    pub merged_into: Option<VersionId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BranchRef {
    pub fn new(
        name: impl Into<String>,
        base: VersionId,
        tip: VersionId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            tip,
            base,
            open: true,
            merged_into: None,
            created_at,
            updated_at: created_at,
        }
    }

    fn advance(&mut self, tip: VersionId, at: DateTime<Utc>) {
        self.tip = tip;
        self.updated_at = at;
    }

    fn close(&mut self, merge: VersionId, at: DateTime<Utc>) {
        self.open = false;
        self.merged_into = Some(merge);
        self.updated_at = at;
    }
}

/// Tag - movable label on a single version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRef {
    pub name: String,
    pub target: VersionId,
    pub created_at: DateTime<Utc>,
}

/// Per-prompt reference table
#[derive(Debug, Clone, Default)]
pub struct RefTable {
    active: Option<VersionId>,
    /// Tag name -> tag; a name maps to exactly one version
    tags: BTreeMap<String, TagRef>,
    /// Branches in creation order; closed names may be reused
    branches: Vec<BranchRef>,
}

impl RefTable {
    pub fn new() -> Self {
        Self::default()
    }

    // === Active pointer ===

    pub fn active(&self) -> Option<VersionId> {
        self.active
    }

    /// Swap the active pointer, returning the previous value
    pub fn set_active(&mut self, id: VersionId) -> Option<VersionId> {
        self.active.replace(id)
    }

    pub fn is_active(&self, id: &VersionId) -> bool {
        self.active.as_ref() == Some(id)
    }

    // === Tags ===

    /// Point `name` at `target`, returning the version it was moved from
    pub fn set_tag(&mut self, name: &str, target: VersionId) -> Result<Option<VersionId>, RefNameError> {
        validate_ref_name(name)?;

        let previous = self.tags.insert(
            name.to_string(),
            TagRef {
                name: name.to_string(),
                target,
                created_at: Utc::now(),
            },
        );
        Ok(previous.map(|t| t.target).filter(|prev| *prev != target))
    }

    pub fn remove_tag(&mut self, name: &str) -> Option<TagRef> {
        self.tags.remove(name)
    }

    pub fn tag(&self, name: &str) -> Option<&TagRef> {
        self.tags.get(name)
    }

    /// Tags sorted by name
    pub fn tags(&self) -> impl Iterator<Item = &TagRef> {
        self.tags.values()
    }

    pub fn tags_for(&self, id: &VersionId) -> BTreeSet<String> {
        self.tags
            .values()
            .filter(|t| t.target == *id)
            .map(|t| t.name.clone())
            .collect()
    }

    /// Tag name -> target, the form handed to the store
    pub fn tag_targets(&self) -> BTreeMap<String, VersionId> {
        self.tags
            .iter()
            .map(|(name, tag)| (name.clone(), tag.target))
            .collect()
    }

    // === Branches ===

    pub fn branches(&self) -> &[BranchRef] {
        &self.branches
    }

    pub fn open_branch(&self, name: &str) -> Option<&BranchRef> {
        self.branches.iter().find(|b| b.open && b.name == name)
    }

    pub fn create_branch(&mut self, branch: BranchRef) {
        self.branches.push(branch);
    }

    /// Move an open branch's tip from `from` to `to`; false when no open branch
    /// `name` currently ends at `from`
    pub fn advance_branch(
        &mut self,
        name: &str,
        from: VersionId,
        to: VersionId,
        at: DateTime<Utc>,
    ) -> bool {
        match self
            .branches
            .iter_mut()
            .find(|b| b.open && b.name == name && b.tip == from)
        {
            Some(branch) => {
                branch.advance(to, at);
                true
            }
            None => false,
        }
    }

    /// Close the open branch whose tip is `source`, if any
    pub fn close_branch_at(
        &mut self,
        source: VersionId,
        merge: VersionId,
        at: DateTime<Utc>,
    ) -> Option<&BranchRef> {
        let branch = self
            .branches
            .iter_mut()
            .find(|b| b.open && b.tip == source)?;
        branch.close(merge, at);
        Some(branch)
    }
}

/// Validate reference name (similar to Git's rules)
pub fn validate_ref_name(name: &str) -> Result<(), RefNameError> {
    if name.is_empty() {
        return Err(RefNameError::new(name, "empty name"));
    }

    if name.starts_with('.') || name.ends_with('.') {
        return Err(RefNameError::new(name, "cannot start or end with '.'"));
    }

    if name.starts_with('/') || name.ends_with('/') {
        return Err(RefNameError::new(name, "cannot start or end with '/'"));
    }

    if name.contains("..") {
        return Err(RefNameError::new(name, "cannot contain '..'"));
    }

    if name.contains("//") {
        return Err(RefNameError::new(name, "cannot contain '//'"));
    }

    if name.ends_with(".lock") {
        return Err(RefNameError::new(name, "cannot end with '.lock'"));
    }

    let invalid_chars = ['~', '^', ':', '\\', '?', '*', '[', ' ', '\t', '\n'];
    for c in invalid_chars {
        if name.contains(c) {
            return Err(RefNameError::new(
                name,
                format!("cannot contain '{}'", c.escape_default()),
            ));
        }
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(RefNameError::new(name, "cannot contain control characters"));
    }

    Ok(())
}
