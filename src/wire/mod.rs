use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// ========================================
/// Chat protocol
/// ========================================

/// Deserializes leniently: any unrecognised role becomes `user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        Role::coerce(&raw)
    }
}

impl Role {
    /// Unknown roles are sent as `user`.
    pub fn coerce(raw: &str) -> Role {
        match raw {
            "system" => Role::System,
            "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionOptions {
    /// Explicit model id; when absent the client picks its plain or search model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Search-augmented ("online") completion.
    pub search: bool,
    /// Pipeline stage issuing the call (`analysis`, `plan`, `act`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}

impl CompletionOptions {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn search() -> Self {
        Self { search: true, ..Self::default() }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_stage(mut self, stage: &str) -> Self {
        self.stage = Some(stage.to_string());
        self
    }
}

/// ========================================
/// Plan / Act data model
/// ========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
}

/// Question id → answer, in question order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet {
    entries: Vec<(String, String)>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the answer if the id is already present.
    pub fn insert(&mut self, id: impl Into<String>, answer: impl Into<String>) {
        let id = id.into();
        let answer = answer.into();
        match self.entries.iter_mut().find(|(k, _)| *k == id) {
            Some(slot) => slot.1 = answer,
            None => self.entries.push((id, answer)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.iter().find(|(k, _)| k == id).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AnswerSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AnswerSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AnswerVisitor;

        impl<'de> Visitor<'de> for AnswerVisitor {
            type Value = AnswerSet;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of question ids to answers")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<AnswerSet, A::Error> {
                let mut set = AnswerSet::new();
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    set.insert(k, v);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(AnswerVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub description: String,
    pub initial_analysis: String,
    pub answers: AnswerSet,
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFile {
    /// Relative to the output directory; may contain subdirectories.
    pub path: String,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self { path: path.into(), content: content.into() }
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.rsplit_once('.').map(|(_, ext)| ext)
    }
}

/// ========================================
/// Outbound progress events (UI contract)
/// ========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ProgressEvent {
    Data { text: String },
    Status { text: String },
    PlanComplete { analysis: String, answers: AnswerSet, plan: String },
    GenerationComplete { files: Vec<GeneratedFile> },
    Error { message: String },
}

impl ProgressEvent {
    pub fn status(text: impl Into<String>) -> Self {
        ProgressEvent::Status { text: text.into() }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressEvent::GenerationComplete { .. } | ProgressEvent::Error { .. })
    }
}
