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

//! Branch Operations
//!
//! A branch is opened by forking a version and stays open until its tip is
//! merged as a merge source. Names are unique among a prompt's open
//! branches.

use super::error::Result;
use super::objects::{PromptId, Version, VersionId};
use super::refs::{validate_ref_name, BranchRef, RefNameError};
use super::repository::{check_expected_active, CommitOptions, PromptRepository};
use thiserror::Error;
use tracing::{info, warn};

/// Branch errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BranchError {
    #[error("Branch '{name}' is already open in prompt {prompt_id}")]
    DuplicateName { prompt_id: PromptId, name: String },

    #[error(transparent)]
    InvalidName(#[from] RefNameError),
}

impl PromptRepository {
    /// Fork `source_id` onto a new branch
    ///
    /// The fork copies the source's content unchanged and leaves the active
    /// pointer where it was.
    pub fn create_branch(
        &self,
        prompt_id: &PromptId,
        branch_name: &str,
        source_id: VersionId,
        options: CommitOptions,
    ) -> Result<Version> {
        validate_ref_name(branch_name).map_err(|e| {
            warn!(prompt_id = %prompt_id, branch = branch_name, "Invalid branch name");
            BranchError::from(e)
        })?;

        self.write(prompt_id, |graph| {
            check_expected_active(graph, options.expected_active)?;

            if graph.refs().open_branch(branch_name).is_some() {
                warn!(prompt_id = %prompt_id, branch = branch_name, "Branch already open");
                return Err(BranchError::DuplicateName {
                    prompt_id: prompt_id.clone(),
                    name: branch_name.to_string(),
                }
                .into());
            }

            let source = graph.get(&source_id)?;
            let label = self.resolve_label(graph, &options);
            let message = options
                .message
                .clone()
                .unwrap_or_else(|| format!("Branch {} from {}", branch_name, source.label));
            let version = Version::child(
                source_id,
                prompt_id.clone(),
                label,
                source.content.clone(),
                self.resolve_author(&options),
                message,
            )
            .on_branch(Some(branch_name.to_string()));

            let forked = self.write_version(graph, version, false)?;
            info!(
                prompt_id = %prompt_id,
                branch = branch_name,
                version_id = %forked.id.short(),
                base = %source_id.short(),
                "Created branch"
            );
            Ok(forked)
        })
    }

    /// Every branch of the prompt in creation order, open and merged
    pub fn list_branches(&self, prompt_id: &PromptId) -> Result<Vec<BranchRef>> {
        self.read(prompt_id, |graph| Ok(graph.refs().branches().to_vec()))
    }
}
