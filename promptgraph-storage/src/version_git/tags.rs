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

//! Tag Operations
//!
//! Tags are movable labels: a name points at one version of a prompt at a
//! time, and re-tagging moves it. The whole tag table is written through to
//! the store before the in-memory table changes.

use super::error::{NotFoundError, Result};
use super::objects::{PromptId, Version, VersionId};
use super::refs::{validate_ref_name, TagRef};
use super::repository::PromptRepository;
use tracing::{info, warn};

impl PromptRepository {
    /// Point `tag` at `version_id`, moving it off any other version
    pub fn tag_version(
        &self,
        prompt_id: &PromptId,
        version_id: VersionId,
        tag: &str,
    ) -> Result<Version> {
        validate_ref_name(tag).map_err(|e| {
            warn!(prompt_id = %prompt_id, tag, "Invalid tag name");
            e
        })?;

        self.write(prompt_id, |graph| {
            if !graph.contains(&version_id) {
                return Err(NotFoundError::Version {
                    prompt_id: prompt_id.clone(),
                    version_id,
                }
                .into());
            }

            let mut targets = graph.refs().tag_targets();
            targets.insert(tag.to_string(), version_id);
            self.store().save_tags(prompt_id, &targets)?;

            let moved_from = graph.refs_mut().set_tag(tag, version_id)?;
            match moved_from {
                Some(previous) => info!(
                    prompt_id = %prompt_id,
                    tag,
                    from = %previous.short(),
                    to = %version_id.short(),
                    "Moved tag"
                ),
                None => info!(
                    prompt_id = %prompt_id,
                    tag,
                    version_id = %version_id.short(),
                    "Tagged version"
                ),
            }

            Ok(graph.get(&version_id)?)
        })
    }

    /// Remove `tag` from the prompt
    pub fn untag_version(&self, prompt_id: &PromptId, tag: &str) -> Result<()> {
        self.write(prompt_id, |graph| {
            if graph.refs().tag(tag).is_none() {
                return Err(NotFoundError::Tag {
                    prompt_id: prompt_id.clone(),
                    tag: tag.to_string(),
                }
                .into());
            }

            let mut targets = graph.refs().tag_targets();
            targets.remove(tag);
            self.store().save_tags(prompt_id, &targets)?;

            if let Some(removed) = graph.refs_mut().remove_tag(tag) {
                info!(
                    prompt_id = %prompt_id,
                    tag,
                    version_id = %removed.target.short(),
                    "Removed tag"
                );
            }
            Ok(())
        })
    }

    /// Tags sorted by name
    pub fn list_tags(&self, prompt_id: &PromptId) -> Result<Vec<TagRef>> {
        self.read(prompt_id, |graph| Ok(graph.refs().tags().cloned().collect()))
    }

    /// Version a tag currently points at
    pub fn resolve_tag(&self, prompt_id: &PromptId, tag: &str) -> Result<Version> {
        self.read(prompt_id, |graph| {
            let target = graph
                .refs()
                .tag(tag)
                .map(|t| t.target)
                .ok_or_else(|| NotFoundError::Tag {
                    prompt_id: prompt_id.clone(),
                    tag: tag.to_string(),
                })?;
            Ok(graph.get(&target)?)
        })
    }
}
