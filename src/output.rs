//! Result types produced by the distillation pipeline.
//!
//! Model output is loosely shaped JSON. Everything here converts it into
//! fixed records whose absent fields are omitted on serialisation instead of
//! being written as `null`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ── Fields ───────────────────────────────────────────────────────────────

/// The value of one key in a structured result: a sentence or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    Text(String),
    List(Vec<String>),
}

impl Field {
    /// Lenient conversion from whatever the model produced.
    ///
    /// Blank strings, empty lists and `null` yield `None`. Numbers and
    /// booleans become text; nested objects are kept as compact JSON text.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => {
                let list: Vec<String> = items.iter().filter_map(scalar_text).collect();
                (!list.is_empty()).then_some(Field::List(list))
            }
            other => scalar_text(other).map(Field::Text),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

fn list_of(value: Option<&Value>) -> Vec<String> {
    match value.and_then(Field::from_value) {
        Some(Field::List(items)) => items,
        Some(Field::Text(s)) => vec![s],
        None => Vec::new(),
    }
}

// ── Distilled ────────────────────────────────────────────────────────────

/// Outcome of one structured transform.
///
/// `Unavailable` is the recoverable sentinel: it serialises as
/// `{"error": "<message>"}` and is what clients see when a chunk or answer
/// could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Distilled<T> {
    Complete(T),
    Unavailable { error: String },
}

impl<T> Distilled<T> {
    pub fn unavailable(error: impl Into<String>) -> Self {
        Distilled::Unavailable {
            error: error.into(),
        }
    }

    /// Build from a parsed object. An object consisting of a lone string
    /// `error` key is already a sentinel and is carried through as such.
    pub fn from_object(object: &Map<String, Value>, build: impl FnOnce(&Map<String, Value>) -> T) -> Self {
        if object.len() == 1 {
            if let Some(Value::String(error)) = object.get("error") {
                return Distilled::unavailable(error.clone());
            }
        }
        Distilled::Complete(build(object))
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Distilled::Complete(_))
    }

    pub fn complete(&self) -> Option<&T> {
        match self {
            Distilled::Complete(value) => Some(value),
            Distilled::Unavailable { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Distilled::Complete(_) => None,
            Distilled::Unavailable { error } => Some(error),
        }
    }
}

// ── Summary ──────────────────────────────────────────────────────────────

/// Document or section summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_points: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub important_terms: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benefits: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risks_or_limitations: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Field>,
}

impl Summary {
    /// Keys the model is asked for, in output order.
    pub const KEYS: [&'static str; 8] = [
        "title",
        "overview",
        "main_points",
        "important_terms",
        "benefits",
        "risks_or_limitations",
        "recommendations",
        "conclusion",
    ];

    /// Pick the known keys out of a model object; unknown keys are ignored.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let field = |key: &str| object.get(key).and_then(Field::from_value);
        Self {
            title: field("title"),
            overview: field("overview"),
            main_points: field("main_points"),
            important_terms: field("important_terms"),
            benefits: field("benefits"),
            risks_or_limitations: field("risks_or_limitations"),
            recommendations: field("recommendations"),
            conclusion: field("conclusion"),
        }
    }
}

// ── Questions ────────────────────────────────────────────────────────────

/// One generated exam question with its model answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
}

impl QuestionRecord {
    /// Lenient conversion; entries without question text are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let question = object.get("question").and_then(scalar_text)?;
        Some(Self {
            question,
            answer: object.get("answer").and_then(scalar_text).unwrap_or_default(),
            key_points: list_of(object.get("key_points")),
            tips: list_of(object.get("tips")),
        })
    }

    /// Identity used for de-duplication across chunks.
    pub fn dedup_key(&self) -> String {
        self.question.trim().to_lowercase()
    }
}

// ── Answers ──────────────────────────────────────────────────────────────

/// Structured model answer to one question-paper question.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Answer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub introduction: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_concepts: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_content: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tips_for_maximum_marks: Option<Field>,
}

impl Answer {
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let field = |key: &str| object.get(key).and_then(Field::from_value);
        Self {
            question: field("question"),
            introduction: field("introduction"),
            key_concepts: field("key_concepts"),
            main_content: field("main_content"),
            examples: field("examples"),
            conclusion: field("conclusion"),
            tips_for_maximum_marks: field("tips_for_maximum_marks"),
        }
    }
}

/// An answer together with the question-paper metadata it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRecord {
    #[serde(flatten)]
    pub answer: Distilled<Answer>,
    pub question_number: String,
    pub marks: Option<u32>,
}

// ── Extraction ───────────────────────────────────────────────────────────

/// Text pulled out of an uploaded document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedDocument {
    /// 1-based page number → page text. Image uploads have a single page.
    pub pages: BTreeMap<usize, String>,
    /// All pages concatenated, each followed by a newline.
    pub text: String,
}

impl ExtractedDocument {
    pub fn from_pages(pages: impl IntoIterator<Item = (usize, String)>) -> Self {
        let pages: BTreeMap<usize, String> = pages.into_iter().collect();
        let mut text = String::new();
        for page in pages.values() {
            text.push_str(page);
            text.push('\n');
        }
        Self { pages, text }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
