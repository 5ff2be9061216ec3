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

//! Restore - roll content back without rewriting history

use super::error::{NotFoundError, Result};
use super::objects::{PromptId, Version, VersionId};
use super::repository::{check_expected_active, CommitOptions, PromptRepository};
use tracing::info;

impl PromptRepository {
    /// Commit a copy of `version_id`'s content on top of the active version
    ///
    /// The restored version has the current active version as its only
    /// parent, keeps that version's branch if it is open and becomes active.
    pub fn restore_version(
        &self,
        prompt_id: &PromptId,
        version_id: VersionId,
        options: CommitOptions,
    ) -> Result<Version> {
        self.write(prompt_id, |graph| {
            check_expected_active(graph, options.expected_active)?;

            let target = graph.get(&version_id)?;
            let current = graph
                .active_version()
                .ok_or_else(|| NotFoundError::NoActiveVersion(prompt_id.clone()))?;

            let label = self.resolve_label(graph, &options);
            let message = options
                .message
                .clone()
                .unwrap_or_else(|| format!("Restore of {}", target.label));
            let version = Version::child(
                current.id,
                prompt_id.clone(),
                label,
                target.content.clone(),
                self.resolve_author(&options),
                message,
            )
            .on_branch(graph.inherited_branch(&current));

            let restored = self.write_version(graph, version, true)?;
            info!(
                prompt_id = %prompt_id,
                version_id = %restored.id.short(),
                restored_from = %version_id.short(),
                "Restored version"
            );
            Ok(restored)
        })
    }
}
