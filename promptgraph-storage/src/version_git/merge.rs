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

//! Merge Engine - Two-Way Content Merge
//!
//! Computes `diff(target, source)` and replays the source side onto the
//! target: additions and modifications are applied, removals are not, so the
//! target keeps fields the source lacks. Untouched fields come from the
//! target. Fields both sides hold with different values are resolved by
//! [`MergePolicy`].

use super::diff::{ChangeType, DiffEngine, DiffResult, FieldChange};
use super::error::Result;
use super::objects::{PromptId, Version, VersionId};
use super::repository::{check_expected_active, CommitOptions, PromptRepository};
use promptgraph_core::{ContentModel, MergePolicy};
use thiserror::Error;
use tracing::{info, warn};

/// Merge errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("Cannot merge version {0} into itself")]
    SameVersion(VersionId),

    #[error("Merge conflicts on: {}", .fields.join(", "))]
    Conflicts { fields: Vec<String> },
}

/// Merged content plus what happened to each differing field
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub content: ContentModel,
    /// Present only in the source, copied over
    pub added: Vec<String>,
    /// Present on both sides with different values, source value taken
    pub overridden: Vec<String>,
    /// Present only in the target, kept
    pub kept_from_target: Vec<String>,
}

/// Two-way merge over content snapshots
#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    diff_engine: DiffEngine,
    policy: MergePolicy,
}

impl MergeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MergePolicy) -> Self {
        Self {
            diff_engine: DiffEngine::new(),
            policy,
        }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Merge `source` onto `target`
    pub fn merge_content(
        &self,
        target: &ContentModel,
        source: &ContentModel,
    ) -> std::result::Result<MergeOutcome, MergeError> {
        let diff = self.diff_engine.compare(target, source);
        let (added, overridden, kept_from_target) = classify(&diff);

        if self.policy == MergePolicy::RejectConflicts && !overridden.is_empty() {
            return Err(MergeError::Conflicts { fields: overridden });
        }

        let mut merged = target.clone();
        for change in &diff.changes {
            merged = match change {
                FieldChange::Messages { diff, .. } => {
                    let mut messages = merged.messages().to_vec();
                    for entry in diff {
                        match (entry.change, &entry.version2) {
                            (ChangeType::Modified, Some(message)) => {
                                if let Some(slot) = messages.get_mut(entry.index) {
                                    *slot = message.clone();
                                }
                            }
                            (ChangeType::Added, Some(message)) => messages.push(message.clone()),
                            _ => {}
                        }
                    }
                    merged.with_messages(messages)
                }
                FieldChange::Parameters { diff, .. } => {
                    diff.iter().fold(merged, |acc, entry| match &entry.version2 {
                        Some(value) if entry.change != ChangeType::Removed => {
                            acc.with_parameter(entry.key.clone(), value.clone())
                        }
                        _ => acc,
                    })
                }
                FieldChange::InputVariables { diff, .. } => {
                    diff.iter().fold(merged, |acc, entry| match &entry.version2 {
                        Some(descriptor) if entry.change != ChangeType::Removed => {
                            acc.with_variable(entry.key.clone(), descriptor.clone())
                        }
                        _ => acc,
                    })
                }
                FieldChange::Scalar {
                    field,
                    change,
                    version2,
                    ..
                } => match version2 {
                    Some(value) if *change != ChangeType::Removed => {
                        merged.with_field(field.clone(), value.clone())
                    }
                    _ => merged,
                },
            };
        }

        Ok(MergeOutcome {
            content: merged,
            added,
            overridden,
            kept_from_target,
        })
    }
}

/// Split diff entries into (added, modified, removed) field paths
fn classify(diff: &DiffResult) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut added = Vec::new();
    let mut modified = Vec::new();
    let mut removed = Vec::new();

    let mut push = |change: ChangeType, path: String| match change {
        ChangeType::Added => added.push(path),
        ChangeType::Modified => modified.push(path),
        ChangeType::Removed => removed.push(path),
    };

    for change in &diff.changes {
        match change {
            FieldChange::Messages { diff, .. } => {
                for entry in diff {
                    push(entry.change, format!("{}[{}]", change.field(), entry.index));
                }
            }
            FieldChange::Parameters { diff, .. } => {
                for entry in diff {
                    push(entry.change, format!("{}.{}", change.field(), entry.key));
                }
            }
            FieldChange::InputVariables { diff, .. } => {
                for entry in diff {
                    push(entry.change, format!("{}.{}", change.field(), entry.key));
                }
            }
            FieldChange::Scalar { field, change, .. } => push(*change, field.clone()),
        }
    }

    (added, modified, removed)
}

impl PromptRepository {
    /// Merge `source_id` into `target_id`
    ///
    /// The merge version has parents `[target, source]`, stays on the
    /// target's branch if it is open and becomes active. Merging the tip of an open branch
    /// closes that branch.
    pub fn merge_versions(
        &self,
        prompt_id: &PromptId,
        source_id: VersionId,
        target_id: VersionId,
        options: CommitOptions,
    ) -> Result<Version> {
        if source_id == target_id {
            warn!(prompt_id = %prompt_id, version_id = %source_id.short(), "Rejected merge of a version into itself");
            return Err(MergeError::SameVersion(source_id).into());
        }

        self.write(prompt_id, |graph| {
            check_expected_active(graph, options.expected_active)?;

            let source = graph.get(&source_id)?;
            let target = graph.get(&target_id)?;

            let outcome = self
                .merge_engine()
                .merge_content(&target.content, &source.content)
                .map_err(|e| {
                    warn!(prompt_id = %prompt_id, error = %e, "Merge rejected");
                    e
                })?;

            let label = self.resolve_label(graph, &options);
            let message = options
                .message
                .clone()
                .unwrap_or_else(|| format!("Merge {} into {}", source.label, target.label));
            let version = Version::merge(
                target_id,
                source_id,
                prompt_id.clone(),
                label,
                outcome.content,
                self.resolve_author(&options),
                message,
            )
            .on_branch(graph.inherited_branch(&target));

            let merged = self.write_version(graph, version, true)?;
            info!(
                prompt_id = %prompt_id,
                version_id = %merged.id.short(),
                source = %source_id.short(),
                target = %target_id.short(),
                added = outcome.added.len(),
                overridden = outcome.overridden.len(),
                kept = outcome.kept_from_target.len(),
                "Merged versions"
            );
            Ok(merged)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptgraph_core::{Message, VariableDescriptor, VariableType};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> ContentModel {
        ContentModel::from_document(&value).unwrap()
    }

    #[test]
    fn test_source_wins_merge() {
        let engine = MergeEngine::new();
        let target = doc(json!({"parameters": {"temperature": 0.7, "top_p": 0.9}}));
        let source = doc(json!({"parameters": {"temperature": 0.8}}));

        let outcome = engine.merge_content(&target, &source).unwrap();
        assert_eq!(
            outcome.content,
            doc(json!({"parameters": {"temperature": 0.8, "top_p": 0.9}}))
        );
        assert_eq!(outcome.overridden, vec!["parameters.temperature"]);
        assert_eq!(outcome.kept_from_target, vec!["parameters.top_p"]);
        assert!(outcome.added.is_empty());
    }

    #[test]
    fn test_merge_messages_and_fields() {
        let engine = MergeEngine::new();
        let target = ContentModel::new()
            .with_message(Message::system("old system"))
            .with_message(Message::user("keep me"))
            .with_field("description", "target only");
        let source = ContentModel::new()
            .with_message(Message::system("new system"))
            .with_field("name", "from source")
            .with_variable("tone", VariableDescriptor::new(VariableType::String, "style"));

        let outcome = engine.merge_content(&target, &source).unwrap();
        let merged = outcome.content;

        assert_eq!(merged.messages().len(), 2);
        assert_eq!(merged.messages()[0].content, "new system");
        assert_eq!(merged.messages()[1].content, "keep me");
        assert_eq!(merged.field("description").and_then(|v| v.as_str()), Some("target only"));
        assert_eq!(merged.field("name").and_then(|v| v.as_str()), Some("from source"));
        assert!(merged.variable("tone").is_some());

        assert_eq!(outcome.overridden, vec!["messages[0]"]);
        assert_eq!(outcome.added, vec!["inputVariables.tone", "name"]);
        assert_eq!(outcome.kept_from_target, vec!["messages[1]", "description"]);
    }

    #[test]
    fn test_source_messages_appended() {
        let engine = MergeEngine::new();
        let target = ContentModel::new().with_message(Message::user("Hello"));
        let source = ContentModel::new()
            .with_message(Message::user("Hello"))
            .with_message(Message::assistant("Fine!"));

        let merged = engine.merge_content(&target, &source).unwrap().content;
        assert_eq!(merged, source);
    }

    #[test]
    fn test_reject_conflicts_policy() {
        let engine = MergeEngine::with_policy(MergePolicy::RejectConflicts);
        let target = doc(json!({"name": "a", "parameters": {"temperature": 0.7}}));
        let source = doc(json!({"name": "b", "parameters": {"temperature": 0.8, "top_k": 3}}));

        let err = engine.merge_content(&target, &source).unwrap_err();
        assert_eq!(
            err,
            MergeError::Conflicts {
                fields: vec!["parameters.temperature".to_string(), "name".to_string()]
            }
        );
        assert_eq!(err.to_string(), "Merge conflicts on: parameters.temperature, name");

        // Additions alone are not conflicts
        let source = doc(json!({"name": "a", "parameters": {"temperature": 0.7, "top_k": 3}}));
        let merged = engine.merge_content(&target, &source).unwrap().content;
        assert_eq!(merged, source);
    }

    #[test]
    fn test_equal_numbers_are_not_conflicts() {
        let engine = MergeEngine::with_policy(MergePolicy::RejectConflicts);
        let target = doc(json!({"parameters": {"max_tokens": 100, "temperature": 1}}));
        let source = doc(json!({"parameters": {"max_tokens": 100.0, "temperature": 1.0}}));

        let outcome = engine.merge_content(&target, &source).unwrap();
        assert_eq!(outcome.content, target);
        assert!(outcome.overridden.is_empty());
    }

    #[test]
    fn test_merge_identical_content() {
        let engine = MergeEngine::new();
        let content = ContentModel::new().with_parameter("temperature", 1);
        let outcome = engine.merge_content(&content, &content).unwrap();
        assert_eq!(outcome.content, content);
        assert!(outcome.overridden.is_empty());
    }
}
