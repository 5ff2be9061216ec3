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

//! Diff Engine - Structural Content Diff
//!
//! Computes per-field differences between two [`ContentModel`]s:
//! - messages are aligned by position (no LCS)
//! - `parameters` and `inputVariables` are compared key by key
//! - remaining scalar fields are compared by name
//!
//! Entries come out in a fixed order (messages, parameters, inputVariables,
//! then scalar fields by name) so `compare(b, a)` is exactly
//! `compare(a, b).mirrored()`.
//!
//! Modified messages can optionally carry a line-level patience diff of
//! their text.

use promptgraph_core::{ContentModel, DiffSettings, Message, ScalarValue, VariableDescriptor};
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Context lines kept around each line-diff hunk
pub const CONTEXT_LINES: usize = 3;

/// Kind of change for a diff entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

impl ChangeType {
    /// Change seen from the other side
    pub fn inverse(self) -> Self {
        match self {
            ChangeType::Added => ChangeType::Removed,
            ChangeType::Removed => ChangeType::Added,
            ChangeType::Modified => ChangeType::Modified,
        }
    }
}

/// Per-key entry of a keyed-map diff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyedDiff<T> {
    pub key: String,
    #[serde(rename = "type")]
    pub change: ChangeType,
    pub version1: Option<T>,
    pub version2: Option<T>,
}

impl<T: Clone> KeyedDiff<T> {
    fn mirrored(&self) -> Self {
        Self {
            key: self.key.clone(),
            change: self.change.inverse(),
            version1: self.version2.clone(),
            version2: self.version1.clone(),
        }
    }
}

/// Positional entry of the message diff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDiff {
    pub index: usize,
    #[serde(rename = "type")]
    pub change: ChangeType,
    pub version1: Option<Message>,
    pub version2: Option<Message>,
    /// Line diff of the message text (modified entries only, when enabled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_diff: Option<ContentDiff>,
}

impl MessageDiff {
    fn mirrored(&self) -> Self {
        let content_diff = match (&self.content_diff, &self.version1, &self.version2) {
            (Some(_), Some(old), Some(new)) => Some(ContentDiff::between(&new.content, &old.content)),
            _ => None,
        };
        Self {
            index: self.index,
            change: self.change.inverse(),
            version1: self.version2.clone(),
            version2: self.version1.clone(),
            content_diff,
        }
    }
}

/// Field-level diff entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum FieldChange {
    Messages {
        #[serde(rename = "type")]
        change: ChangeType,
        diff: Vec<MessageDiff>,
    },
    Parameters {
        #[serde(rename = "type")]
        change: ChangeType,
        diff: Vec<KeyedDiff<ScalarValue>>,
    },
    InputVariables {
        #[serde(rename = "type")]
        change: ChangeType,
        diff: Vec<KeyedDiff<VariableDescriptor>>,
    },
    Scalar {
        field: String,
        #[serde(rename = "type")]
        change: ChangeType,
        version1: Option<ScalarValue>,
        version2: Option<ScalarValue>,
    },
}

impl FieldChange {
    /// Document key this entry describes
    pub fn field(&self) -> &str {
        match self {
            FieldChange::Messages { .. } => promptgraph_core::content::MESSAGES_KEY,
            FieldChange::Parameters { .. } => promptgraph_core::content::PARAMETERS_KEY,
            FieldChange::InputVariables { .. } => promptgraph_core::content::INPUT_VARIABLES_KEY,
            FieldChange::Scalar { field, .. } => field,
        }
    }

    pub fn change(&self) -> ChangeType {
        match self {
            FieldChange::Messages { change, .. }
            | FieldChange::Parameters { change, .. }
            | FieldChange::InputVariables { change, .. }
            | FieldChange::Scalar { change, .. } => *change,
        }
    }

    fn mirrored(&self) -> Self {
        match self {
            FieldChange::Messages { change, diff } => FieldChange::Messages {
                change: change.inverse(),
                diff: diff.iter().map(MessageDiff::mirrored).collect(),
            },
            FieldChange::Parameters { change, diff } => FieldChange::Parameters {
                change: change.inverse(),
                diff: diff.iter().map(KeyedDiff::mirrored).collect(),
            },
            FieldChange::InputVariables { change, diff } => FieldChange::InputVariables {
                change: change.inverse(),
                diff: diff.iter().map(KeyedDiff::mirrored).collect(),
            },
            FieldChange::Scalar {
                field,
                change,
                version1,
                version2,
            } => FieldChange::Scalar {
                field: field.clone(),
                change: change.inverse(),
                version1: version2.clone(),
                version2: version1.clone(),
            },
        }
    }
}

/// Added / modified / removed counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub added: usize,
    pub modified: usize,
    pub removed: usize,
}

impl ChangeCounts {
    fn record(&mut self, change: ChangeType) {
        match change {
            ChangeType::Added => self.added += 1,
            ChangeType::Modified => self.modified += 1,
            ChangeType::Removed => self.removed += 1,
        }
    }

    fn add(&mut self, other: &ChangeCounts) {
        self.added += other.added;
        self.modified += other.modified;
        self.removed += other.removed;
    }

    fn mirrored(&self) -> Self {
        Self {
            added: self.removed,
            modified: self.modified,
            removed: self.added,
        }
    }

    pub fn total(&self) -> usize {
        self.added + self.modified + self.removed
    }
}

/// Summary statistics per category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub messages: ChangeCounts,
    pub parameters: ChangeCounts,
    pub input_variables: ChangeCounts,
    pub other_fields: ChangeCounts,
    pub total: ChangeCounts,
}

impl DiffSummary {
    fn mirrored(&self) -> Self {
        Self {
            messages: self.messages.mirrored(),
            parameters: self.parameters.mirrored(),
            input_variables: self.input_variables.mirrored(),
            other_fields: self.other_fields.mirrored(),
            total: self.total.mirrored(),
        }
    }
}

/// Result of comparing two content snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    pub changes: Vec<FieldChange>,
    pub summary: DiffSummary,
}

impl DiffResult {
    /// Check if there are any changes
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The same diff seen from the other side: added and removed swap, as do
    /// `version1` and `version2`
    pub fn mirrored(&self) -> Self {
        Self {
            changes: self.changes.iter().map(FieldChange::mirrored).collect(),
            summary: self.summary.mirrored(),
        }
    }

    pub fn messages(&self) -> &[MessageDiff] {
        self.changes
            .iter()
            .find_map(|c| match c {
                FieldChange::Messages { diff, .. } => Some(diff.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn parameters(&self) -> &[KeyedDiff<ScalarValue>] {
        self.changes
            .iter()
            .find_map(|c| match c {
                FieldChange::Parameters { diff, .. } => Some(diff.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn input_variables(&self) -> &[KeyedDiff<VariableDescriptor>] {
        self.changes
            .iter()
            .find_map(|c| match c {
                FieldChange::InputVariables { diff, .. } => Some(diff.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Entry for a top-level scalar field
    pub fn scalar(&self, field: &str) -> Option<&FieldChange> {
        self.changes
            .iter()
            .find(|c| matches!(c, FieldChange::Scalar { field: f, .. } if f == field))
    }
}

/// Line-level diff of a message's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDiff {
    /// Hunks of changes
    pub hunks: Vec<DiffHunk>,
    /// Similarity ratio (0.0 - 1.0)
    pub similarity: f64,
}

/// A contiguous group of changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffHunk {
    /// Starting line in old content (1-indexed)
    pub old_start: usize,
    /// Number of lines in old content
    pub old_count: usize,
    /// Starting line in new content (1-indexed)
    pub new_start: usize,
    /// Number of lines in new content
    pub new_count: usize,
    /// Lines in this hunk
    pub lines: Vec<DiffLine>,
    pub header: String,
}

/// A single line in a diff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffLine {
    pub change: LineChange,
    /// Line content (without newline)
    pub content: String,
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
}

/// Type of change for a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineChange {
    /// Line exists in both
    Context,
    Added,
    Removed,
}

impl ContentDiff {
    /// Patience line diff of two texts
    pub fn between(old_text: &str, new_text: &str) -> Self {
        let diff = TextDiff::configure()
            .algorithm(similar::Algorithm::Patience)
            .diff_lines(old_text, new_text);

        let mut hunks = Vec::new();
        for group in diff.grouped_ops(CONTEXT_LINES) {
            let (Some(first), Some(last)) = (group.first(), group.last()) else {
                continue;
            };

            let mut lines = Vec::new();
            for op in &group {
                for change in diff.iter_changes(op) {
                    let line_change = match change.tag() {
                        ChangeTag::Equal => LineChange::Context,
                        ChangeTag::Insert => LineChange::Added,
                        ChangeTag::Delete => LineChange::Removed,
                    };
                    lines.push(DiffLine {
                        change: line_change,
                        content: change.value().trim_end_matches('\n').to_string(),
                        old_line: change.old_index().map(|i| i + 1),
                        new_line: change.new_index().map(|i| i + 1),
                    });
                }
            }

            let old_start = first.old_range().start + 1;
            let new_start = first.new_range().start + 1;
            let old_count = last.old_range().end - first.old_range().start;
            let new_count = last.new_range().end - first.new_range().start;
            hunks.push(DiffHunk {
                old_start,
                old_count,
                new_start,
                new_count,
                lines,
                header: format!(
                    "@@ -{},{} +{},{} @@",
                    old_start, old_count, new_start, new_count
                ),
            });
        }

        Self {
            hunks,
            similarity: diff.ratio() as f64,
        }
    }

    /// Check if there are any changes
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Format as unified diff string
    pub fn to_unified(&self, old_path: &str, new_path: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("--- {}\n", old_path));
        output.push_str(&format!("+++ {}\n", new_path));

        for hunk in &self.hunks {
            output.push_str(&hunk.header);
            output.push('\n');

            for line in &hunk.lines {
                let prefix = match line.change {
                    LineChange::Context => ' ',
                    LineChange::Added => '+',
                    LineChange::Removed => '-',
                };
                output.push(prefix);
                output.push_str(&line.content);
                output.push('\n');
            }
        }

        output
    }

    /// (added, removed) line counts
    pub fn line_counts(&self) -> (usize, usize) {
        let mut added = 0;
        let mut removed = 0;
        for line in self.hunks.iter().flat_map(|h| &h.lines) {
            match line.change {
                LineChange::Added => added += 1,
                LineChange::Removed => removed += 1,
                LineChange::Context => {}
            }
        }
        (added, removed)
    }
}

/// Configuration for diff engine
#[derive(Debug, Clone, Default)]
pub struct DiffConfig {
    /// Attach a line diff to modified messages
    pub line_diff: bool,
}

impl From<&DiffSettings> for DiffConfig {
    fn from(settings: &DiffSettings) -> Self {
        Self {
            line_diff: settings.line_diff,
        }
    }
}

/// Structural diff engine; stateless apart from its config
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    config: DiffConfig,
}

impl DiffEngine {
    /// Create a new diff engine with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: DiffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Compare two snapshots; `a` is `version1`, `b` is `version2`
    pub fn compare(&self, a: &ContentModel, b: &ContentModel) -> DiffResult {
        let mut summary = DiffSummary::default();
        let mut changes = Vec::new();

        let messages = self.diff_messages(a.messages(), b.messages());
        if !messages.is_empty() {
            for entry in &messages {
                summary.messages.record(entry.change);
            }
            changes.push(FieldChange::Messages {
                change: ChangeType::Modified,
                diff: messages,
            });
        }

        let parameters = diff_keyed(a.parameters(), b.parameters());
        if !parameters.is_empty() {
            for entry in &parameters {
                summary.parameters.record(entry.change);
            }
            changes.push(FieldChange::Parameters {
                change: ChangeType::Modified,
                diff: parameters,
            });
        }

        let variables = diff_keyed(a.input_variables(), b.input_variables());
        if !variables.is_empty() {
            for entry in &variables {
                summary.input_variables.record(entry.change);
            }
            changes.push(FieldChange::InputVariables {
                change: ChangeType::Modified,
                diff: variables,
            });
        }

        for entry in diff_keyed(a.scalar_fields(), b.scalar_fields()) {
            summary.other_fields.record(entry.change);
            changes.push(FieldChange::Scalar {
                field: entry.key,
                change: entry.change,
                version1: entry.version1,
                version2: entry.version2,
            });
        }

        let mut total = ChangeCounts::default();
        for counts in [
            &summary.messages,
            &summary.parameters,
            &summary.input_variables,
            &summary.other_fields,
        ] {
            total.add(counts);
        }
        summary.total = total;

        debug!(
            fields = changes.len(),
            added = total.added,
            modified = total.modified,
            removed = total.removed,
            "Computed content diff"
        );

        DiffResult { changes, summary }
    }

    fn diff_messages(&self, a: &[Message], b: &[Message]) -> Vec<MessageDiff> {
        let len = a.len().max(b.len());
        let mut out = Vec::new();

        for index in 0..len {
            let entry = match (a.get(index), b.get(index)) {
                (Some(old), Some(new)) if old == new => continue,
                (Some(old), Some(new)) => MessageDiff {
                    index,
                    change: ChangeType::Modified,
                    version1: Some(old.clone()),
                    version2: Some(new.clone()),
                    content_diff: self
                        .config
                        .line_diff
                        .then(|| ContentDiff::between(&old.content, &new.content)),
                },
                (Some(old), None) => MessageDiff {
                    index,
                    change: ChangeType::Removed,
                    version1: Some(old.clone()),
                    version2: None,
                    content_diff: None,
                },
                (None, Some(new)) => MessageDiff {
                    index,
                    change: ChangeType::Added,
                    version1: None,
                    version2: Some(new.clone()),
                    content_diff: None,
                },
                (None, None) => continue,
            };
            out.push(entry);
        }

        out
    }
}

/// Per-key diff over two sorted maps, ascending key order, equal keys omitted
fn diff_keyed<T: Clone + PartialEq>(
    a: &BTreeMap<String, T>,
    b: &BTreeMap<String, T>,
) -> Vec<KeyedDiff<T>> {
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();

    keys.into_iter()
        .filter_map(|key| {
            let change = match (a.get(key), b.get(key)) {
                (Some(old), Some(new)) if old == new => return None,
                (Some(_), Some(_)) => ChangeType::Modified,
                (Some(_), None) => ChangeType::Removed,
                (None, Some(_)) => ChangeType::Added,
                (None, None) => return None,
            };
            Some(KeyedDiff {
                key: key.clone(),
                change,
                version1: a.get(key).cloned(),
                version2: b.get(key).cloned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptgraph_core::VariableType;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> ContentModel {
        ContentModel::from_document(&value).unwrap()
    }

    #[test]
    fn test_identical_content_is_empty() {
        let engine = DiffEngine::new();
        let a = doc(json!({
            "name": "greeter",
            "messages": [{"role": "system", "content": "Be kind"}],
            "parameters": {"temperature": 0.7},
            "inputVariables": {"user": {"type": "string", "description": "name"}}
        }));

        let diff = engine.compare(&a, &a);
        assert!(diff.is_empty());
        assert_eq!(diff.summary, DiffSummary::default());
        assert_eq!(diff.summary.total.total(), 0);
    }

    #[test]
    fn test_parameter_diff() {
        let engine = DiffEngine::new();
        let a = doc(json!({"parameters": {"temperature": 0.7, "max_tokens": 100}}));
        let b = doc(json!({"parameters": {"temperature": 0.8, "max_tokens": 100, "top_p": 0.9}}));

        let diff = engine.compare(&a, &b);
        let params = diff.parameters();
        assert_eq!(params.len(), 2);

        assert_eq!(params[0].key, "temperature");
        assert_eq!(params[0].change, ChangeType::Modified);
        assert_eq!(params[0].version1, ScalarValue::float(0.7));
        assert_eq!(params[0].version2, ScalarValue::float(0.8));

        assert_eq!(params[1].key, "top_p");
        assert_eq!(params[1].change, ChangeType::Added);
        assert_eq!(params[1].version1, None);
        assert_eq!(params[1].version2, ScalarValue::float(0.9));

        assert_eq!(diff.summary.parameters.modified, 1);
        assert_eq!(diff.summary.parameters.added, 1);
        assert_eq!(diff.summary.total.total(), 2);

        // Wire form
        let json = serde_json::to_value(&diff).unwrap();
        assert_eq!(json["changes"][0]["category"], "parameters");
        assert_eq!(json["changes"][0]["type"], "modified");
        assert_eq!(json["changes"][0]["diff"][1]["type"], "added");
        assert!(json["changes"][0]["diff"][1]["version1"].is_null());
    }

    #[test]
    fn test_message_positional_diff() {
        let engine = DiffEngine::new();
        let a = ContentModel::new().with_message(Message::user("Hello"));
        let b = ContentModel::new()
            .with_message(Message::user("Hello, how are you?"))
            .with_message(Message::assistant("Fine!"));

        let diff = engine.compare(&a, &b);
        let messages = diff.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].index, 0);
        assert_eq!(messages[0].change, ChangeType::Modified);
        assert!(messages[0].content_diff.is_none());
        assert_eq!(messages[1].index, 1);
        assert_eq!(messages[1].change, ChangeType::Added);
        assert_eq!(diff.summary.messages.added, 1);
        assert_eq!(diff.summary.messages.modified, 1);

        // Shrinking removes trailing positions
        let back = engine.compare(&b, &a);
        assert_eq!(back.messages()[1].change, ChangeType::Removed);
    }

    #[test]
    fn test_equal_numbers_are_not_changes() {
        let engine = DiffEngine::new();
        let a = doc(json!({"temperature": 1, "parameters": {"max_tokens": 100}}));
        let b = doc(json!({"temperature": 1.0, "parameters": {"max_tokens": 100.0}}));

        let diff = engine.compare(&a, &b);
        assert!(diff.is_empty(), "unexpected changes: {:?}", diff.changes);

        // Built directly, bypassing document parsing
        let c = ContentModel::new()
            .with_field("temperature", 1)
            .with_parameter(
                "max_tokens",
                ScalarValue::Number(serde_json::Number::from_f64(100.0).unwrap()),
            );
        assert!(engine.compare(&a, &c).is_empty());

        let d = doc(json!({"parameters": {"max_tokens": 100.5}}));
        assert_eq!(engine.compare(&a, &d).summary.parameters.modified, 1);
    }

    #[test]
    fn test_role_or_priority_change_is_modification() {
        let engine = DiffEngine::new();
        let a = ContentModel::new().with_message(Message::user("same"));
        let b = ContentModel::new().with_message(Message::user("same").with_priority(1));

        let diff = engine.compare(&a, &b);
        assert_eq!(diff.messages().len(), 1);
        assert_eq!(diff.messages()[0].change, ChangeType::Modified);
    }

    #[test]
    fn test_scalar_and_variable_diff() {
        let engine = DiffEngine::new();
        let a = ContentModel::new()
            .with_field("name", "greeter")
            .with_field("description", "old")
            .with_variable("user", VariableDescriptor::new(VariableType::String, "who"));
        let b = ContentModel::new()
            .with_field("name", "greeter")
            .with_field("taskType", "chat")
            .with_variable("user", VariableDescriptor::new(VariableType::String, "who"))
            .with_variable("tone", VariableDescriptor::new(VariableType::Enum, "style"));

        let diff = engine.compare(&a, &b);
        let fields: Vec<&str> = diff.changes.iter().map(|c| c.field()).collect();
        assert_eq!(fields, vec!["inputVariables", "description", "taskType"]);

        assert_eq!(diff.input_variables().len(), 1);
        assert_eq!(diff.input_variables()[0].key, "tone");
        assert_eq!(
            diff.scalar("description").map(|c| c.change()),
            Some(ChangeType::Removed)
        );
        assert_eq!(
            diff.scalar("taskType").map(|c| c.change()),
            Some(ChangeType::Added)
        );
        assert!(diff.scalar("name").is_none());
        assert_eq!(diff.summary.other_fields.added, 1);
        assert_eq!(diff.summary.other_fields.removed, 1);
    }

    #[test]
    fn test_mirror_symmetry() {
        let engine = DiffEngine::with_config(DiffConfig { line_diff: true });
        let a = ContentModel::new()
            .with_message(Message::system("line one\nline two\n"))
            .with_parameter("temperature", 1)
            .with_field("name", "a");
        let b = ContentModel::new()
            .with_message(Message::system("line one\nline 2\n"))
            .with_message(Message::user("extra"))
            .with_parameter("top_k", 5);

        let forward = engine.compare(&a, &b);
        let backward = engine.compare(&b, &a);
        assert_eq!(backward, forward.mirrored());
        assert_eq!(forward.mirrored().mirrored(), forward);
    }

    #[test]
    fn test_line_diff_enabled() {
        let engine = DiffEngine::with_config(DiffConfig { line_diff: true });
        let a = ContentModel::new().with_message(Message::system("line1\nline2\nline3\n"));
        let b = ContentModel::new().with_message(Message::system("line1\nmodified\nline3\n"));

        let diff = engine.compare(&a, &b);
        let content_diff = diff.messages()[0].content_diff.as_ref().unwrap();
        assert!(!content_diff.is_empty());
        assert!(content_diff.similarity > 0.0);
        assert!(content_diff.similarity < 1.0);
        assert_eq!(content_diff.line_counts(), (1, 1));
    }

    #[test]
    fn test_content_diff_identical() {
        let diff = ContentDiff::between("a\nb\n", "a\nb\n");
        assert!(diff.is_empty());
        assert_eq!(diff.similarity, 1.0);
    }

    #[test]
    fn test_content_diff_hunk_header() {
        let diff = ContentDiff::between("line1\nline2\n", "line1\nline2\nline3\n");
        assert_eq!(diff.hunks.len(), 1);
        assert_eq!(diff.hunks[0].header, "@@ -1,2 +1,3 @@");
        assert_eq!(diff.line_counts(), (1, 0));
    }

    #[test]
    fn test_unified_format() {
        let diff = ContentDiff::between("line1\nline2\n", "line1\nmodified\n");
        let unified = diff.to_unified("v1", "v2");

        assert!(unified.contains("--- v1"));
        assert!(unified.contains("+++ v2"));
        assert!(unified.contains("-line2"));
        assert!(unified.contains("+modified"));
    }
}
