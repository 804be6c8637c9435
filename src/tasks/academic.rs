//! Academic assistant: answer every question on an exam paper.
//!
//! Question papers follow a loose convention:
//!
//! ```text
//! <instructions / shared context>
//! Q.1 <question text> [5 Marks]
//! Q.2 <question text> [10 Marks]
//! ```
//!
//! [`QuestionPaper::parse`] splits the text on the `Q.<n>` markers; the
//! [`AcademicAssistant`] then asks the model for a structured answer to each
//! question, with the paper's preamble as shared context.

use crate::config::GenerationParams;
use crate::error::{DistillError, TransformError};
use crate::output::{Answer, AnswerRecord, Distilled, Field};
use crate::pipeline::llm::ModelInvoker;
use crate::pipeline::structured::extract_object;
use crate::prompts;
use crate::tasks::settle;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

static RE_FIRST_QUESTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"Q\.?1").unwrap());

static RE_QUESTION_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"Q\.?\d+").unwrap());

static RE_MARKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\[(\d+)\s*marks?\]").unwrap());

/// One question cut out of a paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSpan {
    /// The marker as printed, e.g. `Q.1` or `Q3`.
    pub question_number: String,
    /// Question body with marks annotations removed.
    pub question_text: String,
    pub marks: Option<u32>,
}

impl QuestionSpan {
    fn from_block(marker: &str, block: &str) -> Self {
        let marks = RE_MARKS
            .captures(block)
            .and_then(|caps| caps[1].parse().ok());
        let text = RE_MARKS.replace_all(block, "");
        Self {
            question_number: marker.to_string(),
            question_text: text.trim().to_string(),
            marks,
        }
    }
}

/// A question paper split into its preamble and questions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuestionPaper {
    /// Text before the first question, trimmed. Empty when there is none.
    pub context: String,
    pub questions: Vec<QuestionSpan>,
}

impl QuestionPaper {
    pub fn parse(text: &str) -> Self {
        let (context, section) = match RE_FIRST_QUESTION.find(text) {
            Some(first) => (text[..first.start()].trim(), &text[first.start()..]),
            None => ("", text),
        };

        let markers: Vec<_> = RE_QUESTION_MARKER.find_iter(section).collect();
        let questions = markers
            .iter()
            .enumerate()
            .map(|(idx, marker)| {
                let end = markers.get(idx + 1).map_or(section.len(), |next| next.start());
                QuestionSpan::from_block(marker.as_str(), &section[marker.end()..end])
            })
            .collect();

        Self {
            context: context.to_string(),
            questions,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AcademicAssistant {
    invoker: ModelInvoker,
    params: GenerationParams,
    concurrency: usize,
}

impl AcademicAssistant {
    pub fn new(invoker: ModelInvoker, params: GenerationParams, concurrency: usize) -> Self {
        Self {
            invoker,
            params,
            concurrency: concurrency.max(1),
        }
    }

    /// Answer every question of `paper`, in paper order.
    pub async fn answer_all(&self, paper: &QuestionPaper) -> Result<Vec<AnswerRecord>, DistillError> {
        info!("Answering {} questions", paper.questions.len());

        let results: Vec<Result<Distilled<Answer>, TransformError>> = stream::iter(&paper.questions)
            .map(|span| self.answer(span, &paper.context).boxed())
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .boxed()
            .await;
        let answers = settle(results, |e| Distilled::unavailable(e.to_string()))?;

        Ok(paper
            .questions
            .iter()
            .zip(answers)
            .map(|(span, answer)| AnswerRecord {
                answer,
                question_number: span.question_number.clone(),
                marks: span.marks,
            })
            .collect())
    }

    async fn answer(&self, span: &QuestionSpan, context: &str) -> Result<Distilled<Answer>, TransformError> {
        let prompt = prompts::academic_answer(&span.question_text, context);
        let raw = self.invoker.invoke(&prompt, &self.params).await?;
        let mut object = extract_object(&raw)?;
        // Some models nest the answer under the "solution" label.
        if let Some(Value::Object(inner)) = object.remove("solution") {
            object = inner;
        }

        Ok(Distilled::from_object(&object, |o| {
            let mut answer = Answer::from_object(o);
            if answer.question.is_none() && !span.question_text.is_empty() {
                answer.question = Some(Field::Text(span.question_text.clone()));
            }
            answer
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::llm::testing::{fast_config, ScriptedGenerator};

    #[test]
    fn splits_preamble_questions_and_marks() {
        let paper = QuestionPaper::parse("Intro text. Q.1 What is X? [5 Marks] Q.2 Explain Y. [10 Marks]");
        assert_eq!(paper.context, "Intro text.");
        assert_eq!(
            paper.questions,
            vec![
                QuestionSpan {
                    question_number: "Q.1".into(),
                    question_text: "What is X?".into(),
                    marks: Some(5),
                },
                QuestionSpan {
                    question_number: "Q.2".into(),
                    question_text: "Explain Y.".into(),
                    marks: Some(10),
                },
            ]
        );
    }

    #[test]
    fn marks_are_optional_and_case_insensitive() {
        let paper = QuestionPaper::parse("Q1 Define entropy.\nQ2 State the second law. [2 mark]");
        assert_eq!(paper.context, "");
        assert_eq!(paper.questions[0].marks, None);
        assert_eq!(paper.questions[0].question_text, "Define entropy.");
        assert_eq!(paper.questions[1].marks, Some(2));
        assert_eq!(paper.questions[1].question_text, "State the second law.");
    }

    #[test]
    fn text_without_markers_has_no_questions() {
        let paper = QuestionPaper::parse("Just some lecture notes without numbering.");
        assert!(paper.questions.is_empty());
        assert_eq!(paper.context, "");
    }

    #[test]
    fn paper_serialises_for_clients() {
        let paper = QuestionPaper::parse("Answer all. Q.1 Why? [3 Marks]");
        assert_eq!(
            serde_json::to_value(&paper).unwrap(),
            serde_json::json!({
                "context": "Answer all.",
                "questions": [{"question_number": "Q.1", "question_text": "Why?", "marks": 3}]
            })
        );
    }

    #[tokio::test]
    async fn answers_keep_order_and_metadata() {
        let generator = ScriptedGenerator::new(|prompt| {
            if prompt.contains("Question: What is X?") {
                Ok(r#"{"solution": {"introduction": "X is a letter.", "key_concepts": ["letters"]}}"#.into())
            } else {
                Ok("no idea".into())
            }
        });
        let invoker = ModelInvoker::new(generator.clone(), &fast_config());
        let assistant = AcademicAssistant::new(invoker, GenerationParams::ANSWERS, 4);
        let paper = QuestionPaper::parse("Intro text. Q.1 What is X? [5 Marks] Q.2 Explain Y. [10 Marks]");

        let answers = assistant.answer_all(&paper).await.unwrap();
        assert_eq!(answers.len(), 2);

        let first = serde_json::to_value(&answers[0]).unwrap();
        assert_eq!(first["question"], "What is X?");
        assert_eq!(first["introduction"], "X is a letter.");
        assert_eq!(first["question_number"], "Q.1");
        assert_eq!(first["marks"], 5);

        let second = serde_json::to_value(&answers[1]).unwrap();
        assert_eq!(second["error"], "Could not extract valid JSON from response");
        assert_eq!(second["question_number"], "Q.2");

        assert!(generator.prompts().iter().all(|p| p.contains("Context: Intro text.")));
    }
}
