//! Offline integration tests: the full reduction pipeline driven by a
//! scripted text generator, no network and no pdfium required.

use async_trait::async_trait;
use docdistill::prompts::SYNTHESIS_HEADER;
use docdistill::{
    Chunker, DistillConfig, Distiller, GenerationParams, ModelError, QuestionPaper, TextGenerator,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Short section summaries for chunk prompts, a full summary for the
/// synthesis prompt.
struct FakeSummariser {
    calls: AtomicUsize,
    final_calls: AtomicUsize,
}

impl FakeSummariser {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            final_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TextGenerator for FakeSummariser {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.contains(SYNTHESIS_HEADER) {
            self.final_calls.fetch_add(1, Ordering::SeqCst);
            return Ok(r#"```json
{
  "title": "Cell Biology",
  "overview": "How cells turn nutrients into energy.",
  "main_points": ["Mitochondria produce ATP", "Enzymes lower activation energy"],
  "important_terms": ["ATP", "enzyme"],
  "benefits": "",
  "risks_or_limitations": null,
  "recommendations": [],
  "conclusion": "Energy flow underpins every cellular process."
}
```"#
            .to_string());
        }
        Ok(r#"{"title": "Section", "overview": "Energy."}"#.to_string())
    }
}

/// Roughly `words` words of prose in ten-word sentences.
fn lecture_notes(words: usize) -> String {
    const SUBJECTS: [&str; 5] = ["The cell", "Each enzyme", "This membrane", "A ribosome", "The nucleus"];
    (0..words / 10)
        .map(|i| {
            format!(
                "{} performs step {} of the metabolic cycle in tissue.",
                SUBJECTS[i % SUBJECTS.len()],
                i
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn fast_config() -> DistillConfig {
    DistillConfig::builder()
        .max_words(400)
        .retry_backoff_ms(0)
        .build()
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_thousand_words_reduce_in_one_pass() {
    let text = lecture_notes(3000);
    let chunks = Chunker::default().chunk(&text, 400);
    assert!(chunks.len() >= 7, "expected at least 7 chunks, got {}", chunks.len());
    assert!(chunks.iter().all(|c| c.words <= 400));

    let generator = FakeSummariser::new();
    let distiller = Distiller::new(generator.clone(), fast_config());
    let summary = distiller.summarize(&text).await.unwrap();

    // One context call, one call per chunk, one synthesis.
    assert_eq!(generator.calls.load(Ordering::SeqCst), chunks.len() + 2);
    assert_eq!(generator.final_calls.load(Ordering::SeqCst), 1);

    let json = serde_json::to_value(&summary).unwrap();
    let object = json.as_object().unwrap();
    assert!(!object.contains_key("error"));
    assert_eq!(object.len(), 5, "got: {json}");
    for (key, value) in object {
        match value {
            serde_json::Value::String(s) => assert!(!s.is_empty(), "{key} is empty"),
            serde_json::Value::Array(items) => assert!(!items.is_empty(), "{key} is empty"),
            other => panic!("{key} has unexpected value {other}"),
        }
    }
    assert_eq!(json["title"], "Cell Biology");
}

#[tokio::test]
async fn question_paper_is_answered_per_question() {
    let generator = FakeSummariser::new();
    let distiller = Distiller::new(generator.clone(), fast_config());
    let paper = QuestionPaper::parse("Intro text. Q.1 What is X? [5 Marks] Q.2 Explain Y. [10 Marks]");

    let answers = distiller.answer_paper(&paper).await.unwrap();
    assert_eq!(answers.len(), 2);
    assert_eq!(answers[0].question_number, "Q.1");
    assert_eq!(answers[1].marks, Some(10));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
}
