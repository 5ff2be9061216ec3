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

//! Prompt content model
//!
//! Strongly-typed snapshot of everything an editor can change on a prompt:
//! the chat messages, model parameters, declared input variables and the
//! remaining top-level scalar fields (`name`, `description`, `taskType`, ...).
//!
//! The only way to obtain a [`ContentModel`] from untrusted input is
//! [`ContentModel::from_document`] (serde `Deserialize` routes through it).
//! Keyed groups are stored in `BTreeMap`s, so iteration order is the key order
//! regardless of how the source document was written.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Top-level document keys that are not scalar fields
pub const MESSAGES_KEY: &str = "messages";
pub const PARAMETERS_KEY: &str = "parameters";
pub const INPUT_VARIABLES_KEY: &str = "inputVariables";

/// Errors raised while building a [`ContentModel`] from a raw document
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContentError {
    #[error("Content document must be a JSON object")]
    NotAnObject,

    #[error("Field '{field}' must be {expected}")]
    InvalidField {
        field: String,
        expected: &'static str,
    },

    #[error("Message {index}: unknown role '{role}'")]
    InvalidRole { index: usize, role: String },

    #[error("Message {index}: priority must be an integer")]
    InvalidPriority { index: usize },

    #[error("Message {index}: missing string content")]
    MissingContent { index: usize },

    #[error("Input variable '{name}': unknown type '{var_type}'")]
    InvalidVariableType { name: String, var_type: String },
}

/// Message role (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(MessageRole::System),
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single chat message of a prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            priority: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    fn from_value(index: usize, value: &Value) -> Result<Self, ContentError> {
        let obj = value.as_object().ok_or_else(|| ContentError::InvalidField {
            field: format!("{}[{}]", MESSAGES_KEY, index),
            expected: "an object",
        })?;

        let role = match obj.get("role") {
            Some(Value::String(s)) => MessageRole::parse(s).ok_or_else(|| {
                ContentError::InvalidRole {
                    index,
                    role: s.clone(),
                }
            })?,
            Some(other) => {
                return Err(ContentError::InvalidRole {
                    index,
                    role: other.to_string(),
                })
            }
            None => {
                return Err(ContentError::InvalidRole {
                    index,
                    role: String::new(),
                })
            }
        };

        let content = obj
            .get("content")
            .and_then(Value::as_str)
            .ok_or(ContentError::MissingContent { index })?
            .to_string();

        let priority = match obj.get("priority") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(integral(n).ok_or(ContentError::InvalidPriority { index })?),
            Some(_) => return Err(ContentError::InvalidPriority { index }),
        };

        Ok(Self {
            role,
            content,
            priority,
        })
    }
}

/// Accepts integers and integral floats (`2.0`)
fn integral(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| f as i64)
}

/// Integral floats collapse to integers so `100` and `100.0` are one value
fn canonical_number(n: &Number) -> Number {
    match integral(n) {
        Some(i) => Number::from(i),
        None => n.clone(),
    }
}

/// `canonical_number` applied through arrays and objects
fn canonical_value(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(canonical_number(n)),
        Value::Array(items) => Value::Array(items.iter().map(canonical_value).collect()),
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), canonical_value(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Scalar value of a parameter or top-level field
///
/// Numbers compare by value: `Number(100)` equals `Number(100.0)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Number(Number),
    String(String),
}

impl ScalarValue {
    /// Convert a JSON value; `None` for null, arrays and objects
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(ScalarValue::Bool(*b)),
            Value::Number(n) => Some(ScalarValue::Number(canonical_number(n))),
            Value::String(s) => Some(ScalarValue::String(s.clone())),
            _ => None,
        }
    }

    /// Finite floats only
    pub fn float(value: f64) -> Option<Self> {
        Number::from_f64(value).map(|n| ScalarValue::Number(canonical_number(&n)))
    }

    pub fn to_json(&self) -> Value {
        match self {
            ScalarValue::Bool(b) => Value::Bool(*b),
            ScalarValue::Number(n) => Value::Number(n.clone()),
            ScalarValue::String(s) => Value::String(s.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarValue::Bool(a), ScalarValue::Bool(b)) => a == b,
            (ScalarValue::Number(a), ScalarValue::Number(b)) => {
                canonical_number(a) == canonical_number(b)
            }
            (ScalarValue::String(a), ScalarValue::String(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Number(n) => write!(f, "{}", n),
            ScalarValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Number(value.into())
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Number(value.into())
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::String(value)
    }
}

/// Declared type of an input variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    String,
    Number,
    Boolean,
    Enum,
    Object,
    Array,
}

impl VariableType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(VariableType::String),
            "number" => Some(VariableType::Number),
            "boolean" => Some(VariableType::Boolean),
            "enum" => Some(VariableType::Enum),
            "object" => Some(VariableType::Object),
            "array" => Some(VariableType::Array),
            _ => None,
        }
    }
}

/// Input variable descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDescriptor {
    #[serde(rename = "type")]
    pub var_type: VariableType,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl VariableDescriptor {
    pub fn new(var_type: VariableType, description: impl Into<String>) -> Self {
        Self {
            var_type,
            description: description.into(),
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(canonical_value(&default));
        self
    }

    fn from_value(name: &str, value: &Value) -> Result<Self, ContentError> {
        let obj = value.as_object().ok_or_else(|| ContentError::InvalidField {
            field: format!("{}.{}", INPUT_VARIABLES_KEY, name),
            expected: "an object",
        })?;

        let type_str = obj.get("type").and_then(Value::as_str).unwrap_or_default();
        let var_type =
            VariableType::parse(type_str).ok_or_else(|| ContentError::InvalidVariableType {
                name: name.to_string(),
                var_type: type_str.to_string(),
            })?;

        let description = match obj.get("description") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(ContentError::InvalidField {
                    field: format!("{}.{}.description", INPUT_VARIABLES_KEY, name),
                    expected: "a string",
                })
            }
        };

        let default = match obj.get("default") {
            None | Some(Value::Null) => None,
            Some(v) => Some(canonical_value(v)),
        };

        Ok(Self {
            var_type,
            description,
            default,
        })
    }
}

impl PartialEq for VariableDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.var_type == other.var_type
            && self.description == other.description
            && self.default.as_ref().map(canonical_value)
                == other.default.as_ref().map(canonical_value)
    }
}

/// Immutable snapshot of a prompt's content
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct ContentModel {
    messages: Vec<Message>,
    parameters: BTreeMap<String, ScalarValue>,
    input_variables: BTreeMap<String, VariableDescriptor>,
    scalar_fields: BTreeMap<String, ScalarValue>,
}

impl ContentModel {
    /// Empty content (no messages, parameters, variables or fields)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a raw prompt document
    ///
    /// Every top-level key other than `messages`, `parameters` and
    /// `inputVariables` becomes a scalar field. Null values are treated as absent.
    pub fn from_document(document: &Value) -> Result<Self, ContentError> {
        let obj = document.as_object().ok_or(ContentError::NotAnObject)?;
        let mut content = Self::default();

        for (key, value) in obj {
            match key.as_str() {
                MESSAGES_KEY => content.messages = parse_messages(value)?,
                PARAMETERS_KEY => content.parameters = parse_parameters(value)?,
                INPUT_VARIABLES_KEY => content.input_variables = parse_variables(value)?,
                _ => {
                    if value.is_null() {
                        continue;
                    }
                    let scalar =
                        ScalarValue::from_json(value).ok_or_else(|| ContentError::InvalidField {
                            field: key.clone(),
                            expected: "a string, number or boolean",
                        })?;
                    content.scalar_fields.insert(key.clone(), scalar);
                }
            }
        }

        Ok(content)
    }

    /// Render back to the raw document form accepted by [`Self::from_document`]
    pub fn to_document(&self) -> Value {
        let mut obj = Map::new();

        for (key, value) in &self.scalar_fields {
            obj.insert(key.clone(), value.to_json());
        }

        let messages = self
            .messages
            .iter()
            .map(|m| serde_json::to_value(m).unwrap_or(Value::Null))
            .collect();
        obj.insert(MESSAGES_KEY.to_string(), Value::Array(messages));

        let parameters = self
            .parameters
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        obj.insert(PARAMETERS_KEY.to_string(), Value::Object(parameters));

        let variables = self
            .input_variables
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::to_value(v).unwrap_or(Value::Null)))
            .collect();
        obj.insert(INPUT_VARIABLES_KEY.to_string(), Value::Object(variables));

        Value::Object(obj)
    }

    /// BLAKE3 digest of the canonical document (hex)
    ///
    /// Equal content always yields the same digest.
    pub fn digest(&self) -> String {
        let canonical = self.to_document().to_string();
        hex::encode(blake3::hash(canonical.as_bytes()).as_bytes())
    }

    /// First 12 hex chars of [`Self::digest`]
    pub fn short_digest(&self) -> String {
        let mut digest = self.digest();
        digest.truncate(12);
        digest
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn parameters(&self) -> &BTreeMap<String, ScalarValue> {
        &self.parameters
    }

    pub fn input_variables(&self) -> &BTreeMap<String, VariableDescriptor> {
        &self.input_variables
    }

    pub fn scalar_fields(&self) -> &BTreeMap<String, ScalarValue> {
        &self.scalar_fields
    }

    pub fn parameter(&self, key: &str) -> Option<&ScalarValue> {
        self.parameters.get(key)
    }

    pub fn variable(&self, key: &str) -> Option<&VariableDescriptor> {
        self.input_variables.get(key)
    }

    pub fn field(&self, key: &str) -> Option<&ScalarValue> {
        self.scalar_fields.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.parameters.is_empty()
            && self.input_variables.is_empty()
            && self.scalar_fields.is_empty()
    }

    // === Value builders (consume and return a new snapshot) ===

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, descriptor: VariableDescriptor) -> Self {
        self.input_variables.insert(key.into(), descriptor);
        self
    }

    /// Set a scalar field; the reserved group keys are ignored
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        let key = key.into();
        if !matches!(
            key.as_str(),
            MESSAGES_KEY | PARAMETERS_KEY | INPUT_VARIABLES_KEY
        ) {
            self.scalar_fields.insert(key, value.into());
        }
        self
    }
}

fn parse_messages(value: &Value) -> Result<Vec<Message>, ContentError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| Message::from_value(i, item))
            .collect(),
        _ => Err(ContentError::InvalidField {
            field: MESSAGES_KEY.to_string(),
            expected: "an array",
        }),
    }
}

fn parse_parameters(value: &Value) -> Result<BTreeMap<String, ScalarValue>, ContentError> {
    let obj = match value {
        Value::Null => return Ok(BTreeMap::new()),
        Value::Object(obj) => obj,
        _ => {
            return Err(ContentError::InvalidField {
                field: PARAMETERS_KEY.to_string(),
                expected: "an object",
            })
        }
    };

    let mut parameters = BTreeMap::new();
    for (key, v) in obj {
        if v.is_null() {
            continue;
        }
        let scalar = ScalarValue::from_json(v).ok_or_else(|| ContentError::InvalidField {
            field: format!("{}.{}", PARAMETERS_KEY, key),
            expected: "a string, number or boolean",
        })?;
        parameters.insert(key.clone(), scalar);
    }
    Ok(parameters)
}

fn parse_variables(value: &Value) -> Result<BTreeMap<String, VariableDescriptor>, ContentError> {
    let obj = match value {
        Value::Null => return Ok(BTreeMap::new()),
        Value::Object(obj) => obj,
        _ => {
            return Err(ContentError::InvalidField {
                field: INPUT_VARIABLES_KEY.to_string(),
                expected: "an object",
            })
        }
    };

    obj.iter()
        .map(|(name, v)| Ok((name.clone(), VariableDescriptor::from_value(name, v)?)))
        .collect()
}

impl TryFrom<Value> for ContentModel {
    type Error = ContentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_document(&value)
    }
}

impl From<ContentModel> for Value {
    fn from(content: ContentModel) -> Self {
        content.to_document()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document() -> Value {
        json!({
            "name": "support-triage",
            "description": "Routes tickets",
            "taskType": "classification",
            "messages": [
                {"role": "system", "content": "You are a triage bot.", "priority": 1},
                {"role": "user", "content": "{{ticket}}"}
            ],
            "parameters": {"temperature": 0.2, "max_tokens": 256, "stream": false},
            "inputVariables": {
                "ticket": {"type": "string", "description": "Ticket body"},
                "locale": {"type": "enum", "description": "Locale", "default": "en"}
            }
        })
    }

    #[test]
    fn test_from_document() {
        let content = ContentModel::from_document(&sample_document()).unwrap();

        assert_eq!(content.messages().len(), 2);
        assert_eq!(content.messages()[0].role, MessageRole::System);
        assert_eq!(content.messages()[0].priority, Some(1));
        assert_eq!(content.messages()[1].priority, None);

        assert_eq!(content.parameter("max_tokens"), Some(&ScalarValue::from(256)));
        assert_eq!(content.parameter("stream"), Some(&ScalarValue::Bool(false)));

        let locale = content.variable("locale").unwrap();
        assert_eq!(locale.var_type, VariableType::Enum);
        assert_eq!(locale.default, Some(json!("en")));

        assert_eq!(content.field("taskType"), Some(&ScalarValue::from("classification")));
        assert_eq!(content.scalar_fields().len(), 3);
    }

    #[test]
    fn test_invalid_role_rejected() {
        let doc = json!({"messages": [{"role": "tool", "content": "x"}]});
        assert_eq!(
            ContentModel::from_document(&doc),
            Err(ContentError::InvalidRole {
                index: 0,
                role: "tool".to_string()
            })
        );

        let doc = json!({"messages": [{"content": "no role"}]});
        assert!(matches!(
            ContentModel::from_document(&doc),
            Err(ContentError::InvalidRole { index: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_priority_rejected() {
        let doc = json!({"messages": [
            {"role": "user", "content": "a"},
            {"role": "user", "content": "b", "priority": "high"}
        ]});
        assert_eq!(
            ContentModel::from_document(&doc),
            Err(ContentError::InvalidPriority { index: 1 })
        );

        let doc = json!({"messages": [{"role": "user", "content": "a", "priority": 1.5}]});
        assert_eq!(
            ContentModel::from_document(&doc),
            Err(ContentError::InvalidPriority { index: 0 })
        );
    }

    #[test]
    fn test_lenient_priority_forms() {
        let doc = json!({"messages": [
            {"role": "user", "content": "a", "priority": null},
            {"role": "user", "content": "b", "priority": 2.0}
        ]});
        let content = ContentModel::from_document(&doc).unwrap();
        assert_eq!(content.messages()[0].priority, None);
        assert_eq!(content.messages()[1].priority, Some(2));
    }

    #[test]
    fn test_shape_errors() {
        assert_eq!(
            ContentModel::from_document(&json!([1, 2])),
            Err(ContentError::NotAnObject)
        );
        assert!(matches!(
            ContentModel::from_document(&json!({"parameters": {"stop": ["\n"]}})),
            Err(ContentError::InvalidField { .. })
        ));
        assert!(matches!(
            ContentModel::from_document(&json!({"inputVariables": {"x": {"type": "blob"}}})),
            Err(ContentError::InvalidVariableType { .. })
        ));
        assert!(matches!(
            ContentModel::from_document(&json!({"tags": ["a"]})),
            Err(ContentError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_structural_equality_ignores_key_order() {
        let a = ContentModel::from_document(&json!({
            "parameters": {"a": 1, "b": 2}, "name": "x"
        }))
        .unwrap();
        let b = ContentModel::from_document(&json!({
            "name": "x", "parameters": {"b": 2, "a": 1}
        }))
        .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_document_roundtrip_and_serde() {
        let content = ContentModel::from_document(&sample_document()).unwrap();
        let reparsed = ContentModel::from_document(&content.to_document()).unwrap();
        assert_eq!(content, reparsed);

        let text = serde_json::to_string(&content).unwrap();
        let decoded: ContentModel = serde_json::from_str(&text).unwrap();
        assert_eq!(content, decoded);

        let bad: Result<ContentModel, _> =
            serde_json::from_str(r#"{"messages":[{"role":"robot","content":"x"}]}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_builders_produce_new_values() {
        let base = ContentModel::new().with_parameter("temperature", 1);
        let changed = base.clone().with_parameter("temperature", 2);

        assert_eq!(base.parameter("temperature"), Some(&ScalarValue::from(1)));
        assert_eq!(changed.parameter("temperature"), Some(&ScalarValue::from(2)));
        assert_ne!(base.digest(), changed.digest());

        let ignored = ContentModel::new().with_field("messages", "nope");
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let a = ContentModel::from_document(&json!({
            "parameters": {"max_tokens": 100},
            "inputVariables": {"count": {"type": "number", "default": [1, {"n": 2}]}}
        }))
        .unwrap();
        let b = ContentModel::from_document(&json!({
            "parameters": {"max_tokens": 100.0},
            "inputVariables": {"count": {"type": "number", "default": [1.0, {"n": 2.0}]}}
        }))
        .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
        assert_eq!(b.to_document()["parameters"]["max_tokens"], json!(100));

        let raw = ScalarValue::Number(Number::from_f64(3.0).unwrap());
        assert_eq!(raw, ScalarValue::from(3));
        assert_ne!(ScalarValue::float(3.5).unwrap(), ScalarValue::from(3));
        assert_ne!(ScalarValue::from(1), ScalarValue::from(true));
    }
}
