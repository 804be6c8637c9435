//! Prompts for every model call the pipeline makes.
//!
//! All prompt text lives here so wording can change without touching the
//! reduction, retry or parsing logic, and so tests can inspect prompts
//! without a model.

/// System prompt for transcribing a scanned page or photographed document.
pub const TRANSCRIPTION_SYSTEM_PROMPT: &str = r#"You are a precise OCR engine. Transcribe ALL text visible in the image exactly as written.

Rules:
- Preserve the reading order a human would follow
- Keep question numbers (e.g. "Q.1", "Q2") and marks annotations (e.g. "[5 Marks]") exactly as printed
- Keep paragraph breaks as blank lines
- Do NOT summarise, translate, correct or explain anything
- Do NOT wrap the output in code fences
- Output only the transcribed text"#;

use crate::output::Summary;

fn summary_keys() -> String {
    Summary::KEYS.join(", ")
}

const JSON_ONLY: &str = "Leave out keys that are not relevant or have no content; never use \
empty or placeholder values. Reply with a single valid JSON object and nothing else: no prose, \
no markdown, no code fences.";

/// Marker that opens every final-synthesis prompt.
pub const SYNTHESIS_HEADER: &str = "Here are the section summaries:";

/// Section-level summary of one chunk, optionally grounded by the global
/// context of the pass.
pub fn summary_section(text: &str, context: Option<&str>) -> String {
    let mut prompt = String::from(
        "You are an expert academic summarisation assistant. The text below is one section \
of a longer document.\n",
    );
    if let Some(context) = context {
        prompt.push_str(&format!("Document context: {context}\n"));
    }
    let keys = summary_keys();
    prompt.push_str(&format!(
        "Summarise the section as a JSON object using any of these keys: {keys}. \
main_points and important_terms are lists of strings; the other keys are strings. {JSON_ONLY}\n\
Here is the section:\n```\n{text}\n```"
    ));
    prompt
}

/// Final synthesis over the joined section summaries of the last pass.
pub fn summary_document(section_summaries: &str) -> String {
    let keys = summary_keys();
    format!(
        "You are an expert academic summarisation assistant. Combine the section summaries \
below into one summary of the whole document, as a JSON object using any of these keys: \
{keys}. main_points and important_terms are lists of strings; the other keys are \
strings. Merge duplicates and keep the most important points. {JSON_ONLY}\n\n\
{SYNTHESIS_HEADER}\n```\n{section_summaries}\n```"
    )
}

/// Exam questions with model answers for one chunk.
pub fn exam_questions(text: &str, context: Option<&str>, max_questions: usize) -> String {
    let mut prompt = format!(
        "You are an expert exam question setter for academic material. From the content \
below, write up to {max_questions} distinct exam questions. For each question give:\n\
- \"question\": the question, clear and concise\n\
- \"answer\": the answer an examiner expects\n\
- \"key_points\": list of points required for full marks\n\
- \"tips\": list of tips to maximise marks\n\n\
Only ask about significant content. Reply with a JSON array of objects with exactly those keys \
and nothing else.\n"
    );
    if let Some(context) = context {
        prompt.push_str(&format!("Document context: {context}\n"));
    }
    prompt.push_str(&format!("Here is the content:\n```\n{text}\n```"));
    prompt
}

/// Structured exam answer to one question-paper question.
pub fn academic_answer(question: &str, context: &str) -> String {
    let mut prompt = String::from(
        "You are an expert academic assistant. Write a complete, well-organised exam answer \
to the question below. Reply with a single JSON object with these keys:\n\
{\n\
  \"question\": \"the question text\",\n\
  \"introduction\": \"short introduction to the topic\",\n\
  \"key_concepts\": [\"key concepts and terms, each with a brief explanation\"],\n\
  \"main_content\": \"the full answer, properly organised\",\n\
  \"examples\": [\"relevant examples or analogies\"],\n\
  \"conclusion\": \"concise conclusion\",\n\
  \"tips_for_maximum_marks\": [\"how to impress the examiner\", \"mistakes to avoid\"]\n\
}\n\
No markdown, no code fences, no text outside the JSON object.\n\n",
    );
    prompt.push_str(&format!("Question: {question}\n"));
    if !context.trim().is_empty() {
        prompt.push_str(&format!("Context: {context}\n"));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_prompt_includes_context_only_when_given() {
        let with = summary_section("body", Some("{\"title\":\"T\"}"));
        assert!(with.contains("Document context: {\"title\":\"T\"}"));
        assert!(with.contains("```\nbody\n```"));
        let without = summary_section("body", None);
        assert!(!without.contains("Document context"));
    }

    #[test]
    fn synthesis_prompt_is_recognisable() {
        let prompt = summary_document("{\"title\":\"A\"}\n\n{\"title\":\"B\"}");
        assert!(prompt.contains(SYNTHESIS_HEADER));
        assert!(!summary_section("x", None).contains(SYNTHESIS_HEADER));
    }

    #[test]
    fn summary_prompts_list_every_summary_key() {
        let section = summary_section("body", None);
        let document = summary_document("{}");
        for key in Summary::KEYS {
            assert!(section.contains(key), "section prompt lacks {key}");
            assert!(document.contains(key), "synthesis prompt lacks {key}");
        }
    }

    #[test]
    fn question_prompt_carries_limit() {
        let prompt = exam_questions("text", None, 7);
        assert!(prompt.contains("up to 7 distinct"));
        assert!(prompt.contains("\"key_points\""));
    }

    #[test]
    fn answer_prompt_skips_blank_context() {
        let prompt = academic_answer("Define osmosis.", "  ");
        assert!(prompt.contains("Question: Define osmosis."));
        assert!(!prompt.contains("Context:"));
    }
}
