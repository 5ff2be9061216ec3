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

//! Integration tests for the prompt version graph

use promptgraph_core::{ContentModel, Message};
use promptgraph_storage::version_git::{
    ChangeType, CommitOptions, ErrorKind, MergeError, PromptId, PromptRepository,
    VersioningError,
};
use promptgraph_storage::VersionId;
use serde_json::json;

fn doc(value: serde_json::Value) -> ContentModel {
    ContentModel::from_document(&value).unwrap()
}

fn prompt() -> PromptId {
    PromptId::from("customer-support")
}

/// Parameter diff reports modified and added keys, skipping equal ones
#[test]
fn test_parameter_diff_between_versions() {
    let repo = PromptRepository::in_memory();
    let a = repo
        .create_prompt(
            &prompt(),
            doc(json!({"parameters": {"temperature": 0.7, "max_tokens": 100}})),
            CommitOptions::new(),
        )
        .unwrap();
    let b = repo
        .commit(
            &prompt(),
            doc(json!({"parameters": {"temperature": 0.8, "max_tokens": 100, "top_p": 0.9}})),
            CommitOptions::new(),
        )
        .unwrap();

    let diff = repo.compare_versions(&prompt(), a.id, b.id).unwrap();
    let json = serde_json::to_value(diff.parameters()).unwrap();
    assert_eq!(
        json,
        json!([
            {"key": "temperature", "type": "modified", "version1": 0.7, "version2": 0.8},
            {"key": "top_p", "type": "added", "version1": null, "version2": 0.9}
        ])
    );
}

/// Messages are aligned by position
#[test]
fn test_message_diff_between_versions() {
    let a = doc(json!({"messages": [{"role": "user", "content": "Hello"}]}));
    let b = doc(json!({"messages": [
        {"role": "user", "content": "Hello, how are you?"},
        {"role": "assistant", "content": "Fine!"}
    ]}));

    let repo = PromptRepository::in_memory();
    let diff = repo.compare_contents(&a, &b);
    let changes: Vec<(usize, ChangeType)> =
        diff.messages().iter().map(|m| (m.index, m.change)).collect();
    assert_eq!(changes, vec![(0, ChangeType::Modified), (1, ChangeType::Added)]);
}

/// Source-wins merge keeps target-only keys
#[test]
fn test_merge_source_wins() {
    let repo = PromptRepository::in_memory();
    let target = repo
        .create_prompt(
            &prompt(),
            doc(json!({"parameters": {"temperature": 0.7, "top_p": 0.9}})),
            CommitOptions::new(),
        )
        .unwrap();
    let source = repo
        .create_branch(&prompt(), "cooler", target.id, CommitOptions::new())
        .unwrap();
    let source = repo
        .commit(
            &prompt(),
            doc(json!({"parameters": {"temperature": 0.8}})),
            CommitOptions::new().with_parent(source.id),
        )
        .unwrap();

    let merged = repo
        .merge_versions(&prompt(), source.id, target.id, CommitOptions::new())
        .unwrap();

    assert_eq!(
        merged.content,
        doc(json!({"parameters": {"temperature": 0.8, "top_p": 0.9}}))
    );
    assert!(merged.is_merge);
    assert!(merged.is_active);
    assert_eq!(merged.parent_ids, vec![target.id, source.id]);
    assert_eq!(merged.branch_name, None);
    assert_eq!(
        merged.commit_message,
        format!("Merge {} into {}", source.label, target.label)
    );

    let branches = repo.list_branches(&prompt()).unwrap();
    assert!(!branches[0].open);
    assert_eq!(branches[0].merged_into, Some(merged.id));
}

/// Trunk listing follows first parents from the active version
#[test]
fn test_trunk_listing_excludes_branches() {
    let repo = PromptRepository::in_memory();
    let v1 = repo
        .create_prompt(&prompt(), doc(json!({"name": "one"})), CommitOptions::new())
        .unwrap();
    let v2 = repo
        .commit(&prompt(), doc(json!({"name": "two"})), CommitOptions::new())
        .unwrap();
    let fork = repo
        .create_branch(&prompt(), "experiment", v1.id, CommitOptions::new())
        .unwrap();
    repo.commit(
        &prompt(),
        doc(json!({"name": "side"})),
        CommitOptions::new().with_parent(fork.id),
    )
    .unwrap();
    let v3 = repo
        .commit(&prompt(), doc(json!({"name": "three"})), CommitOptions::new())
        .unwrap();

    let trunk: Vec<VersionId> = repo
        .list_versions(&prompt(), false, None)
        .unwrap()
        .iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(trunk, vec![v3.id, v2.id, v1.id]);

    let all = repo.list_versions(&prompt(), true, None).unwrap();
    assert_eq!(all.len(), 5);
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    assert_eq!(all.iter().filter(|v| v.is_active).count(), 1);
}

/// Restoring twice yields the original content
#[test]
fn test_restore_twice_reproduces_content() {
    let repo = PromptRepository::in_memory();
    let v1 = repo
        .create_prompt(
            &prompt(),
            ContentModel::new().with_message(Message::system("Be concise")),
            CommitOptions::new(),
        )
        .unwrap();
    repo.commit(
        &prompt(),
        ContentModel::new().with_message(Message::system("Be verbose")),
        CommitOptions::new(),
    )
    .unwrap();

    let first = repo
        .restore_version(&prompt(), v1.id, CommitOptions::new())
        .unwrap();
    let second = repo
        .restore_version(&prompt(), v1.id, CommitOptions::new())
        .unwrap();

    assert_eq!(first.content, v1.content);
    assert_eq!(second.content, v1.content);
    assert_eq!(second.parent_ids, vec![first.id]);
    assert!(repo.compare_versions(&prompt(), v1.id, second.id).unwrap().is_empty());
}

#[test]
fn test_merge_same_version_rejected() {
    let repo = PromptRepository::in_memory();
    let v1 = repo
        .create_prompt(&prompt(), doc(json!({"name": "one"})), CommitOptions::new())
        .unwrap();

    let err = repo
        .merge_versions(&prompt(), v1.id, v1.id, CommitOptions::new())
        .unwrap_err();
    assert!(matches!(err, VersioningError::Merge(MergeError::SameVersion(id)) if id == v1.id));

    // Checked before lookup
    let ghost = VersionId::new();
    let err = repo
        .merge_versions(&prompt(), ghost, ghost, CommitOptions::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Merge);

    let err = repo
        .merge_versions(&prompt(), ghost, v1.id, CommitOptions::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_tag_moves() {
    let repo = PromptRepository::in_memory();
    let v1 = repo
        .create_prompt(&prompt(), doc(json!({"name": "one"})), CommitOptions::new())
        .unwrap();
    let v2 = repo
        .commit(&prompt(), doc(json!({"name": "two"})), CommitOptions::new())
        .unwrap();

    repo.tag_version(&prompt(), v1.id, "stable").unwrap();
    repo.tag_version(&prompt(), v2.id, "stable").unwrap();

    let tagged: Vec<VersionId> = repo
        .list_versions(&prompt(), true, None)
        .unwrap()
        .into_iter()
        .filter(|v| v.tags.contains("stable"))
        .map(|v| v.id)
        .collect();
    assert_eq!(tagged, vec![v2.id]);
}

#[test]
fn test_fork_leaves_source_untouched() {
    let repo = PromptRepository::in_memory();
    let v1 = repo
        .create_prompt(
            &prompt(),
            doc(json!({"name": "one", "parameters": {"temperature": 0.2}})),
            CommitOptions::new(),
        )
        .unwrap();
    repo.tag_version(&prompt(), v1.id, "baseline").unwrap();
    let before = repo.get_version(&prompt(), v1.id).unwrap();

    repo.create_branch(&prompt(), "warmer", v1.id, CommitOptions::new())
        .unwrap();

    let after = repo.get_version(&prompt(), v1.id).unwrap();
    assert_eq!(after, before);
}

/// Merge of a branch back into the trunk under the reject-conflicts policy
#[test]
fn test_reject_conflicts_policy() {
    use promptgraph_core::{EngineConfig, MergePolicy};
    use promptgraph_storage::InMemoryVersionStore;
    use std::sync::Arc;

    let mut config = EngineConfig::default();
    config.merge.policy = MergePolicy::RejectConflicts;
    let repo = PromptRepository::with_config(Arc::new(InMemoryVersionStore::new()), &config);

    let v1 = repo
        .create_prompt(&prompt(), doc(json!({"name": "one"})), CommitOptions::new())
        .unwrap();
    let fork = repo
        .create_branch(&prompt(), "rename", v1.id, CommitOptions::new())
        .unwrap();
    let renamed = repo
        .commit(
            &prompt(),
            doc(json!({"name": "uno"})),
            CommitOptions::new().with_parent(fork.id),
        )
        .unwrap();

    let err = repo
        .merge_versions(&prompt(), renamed.id, v1.id, CommitOptions::new())
        .unwrap_err();
    assert!(matches!(
        err,
        VersioningError::Merge(MergeError::Conflicts { ref fields }) if fields == &vec!["name".to_string()]
    ));
    assert_eq!(repo.list_versions(&prompt(), true, None).unwrap().len(), 3);
    assert!(repo.list_branches(&prompt()).unwrap()[0].open);
}

#[test]
fn test_versions_serialize_camel_case() {
    let repo = PromptRepository::in_memory();
    let v1 = repo
        .create_prompt(&prompt(), doc(json!({"name": "one"})), CommitOptions::new())
        .unwrap();
    repo.tag_version(&prompt(), v1.id, "stable").unwrap();

    let json = serde_json::to_value(repo.get_version(&prompt(), v1.id).unwrap()).unwrap();
    assert_eq!(json["promptId"], "customer-support");
    assert_eq!(json["isActive"], true);
    assert_eq!(json["tags"], json!(["stable"]));
    assert_eq!(json["content"]["name"], "one");
    assert_eq!(json["commitMessage"], "Initial version");
}
