//! Model interaction: text generation, vision transcription, retries.
//!
//! Two dyn-safe traits form the backend seam:
//!
//! * [`TextGenerator`]: prompt in, text out. Used by every task.
//! * [`ImageTranscriber`]: page image in, text out. Used for scanned pages
//!   and image uploads.
//!
//! [`ProviderGenerator`] implements both over any `edgequake_llm` provider.
//! [`ModelInvoker`] wraps them with the call policy: a per-call timeout and
//! retries when the model answers with nothing.
//!
//! ## Retry Strategy
//!
//! Only empty output is retried. A transport failure surfaces immediately as
//! [`ModelError::Unavailable`]; the provider client already retries its own
//! transient HTTP errors. Backoff is exponential (`retry_backoff_ms *
//! 2^(attempt-1)`, at most 30 s): 500 ms → 1 s with the default of 3 attempts.

use crate::config::{DistillConfig, GenerationParams};
use crate::error::ModelError;
use crate::prompts::TRANSCRIPTION_SYSTEM_PROMPT;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Text-completion backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Label used in logs and error messages, e.g. `openai/gpt-4.1-mini`.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, ModelError>;
}

/// Vision backend that reads the text off an image.
#[async_trait]
pub trait ImageTranscriber: Send + Sync {
    fn name(&self) -> &str;

    async fn transcribe(&self, image: ImageData, params: &GenerationParams) -> Result<String, ModelError>;
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// Adapts an `edgequake_llm` provider to both backend traits.
#[derive(Clone)]
pub struct ProviderGenerator {
    provider: Arc<dyn LLMProvider>,
    label: String,
}

impl ProviderGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>) -> Self {
        Self {
            provider,
            label: label.into(),
        }
    }

    async fn chat(&self, messages: &[ChatMessage], params: &GenerationParams) -> Result<String, ModelError> {
        let options = build_options(params);
        let response = self
            .provider
            .chat(messages, Some(&options))
            .await
            .map_err(|e| ModelError::Unavailable {
                backend: self.label.clone(),
                detail: e.to_string(),
            })?;
        debug!(
            "{}: {} input tokens, {} output tokens",
            self.label, response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

impl std::fmt::Debug for ProviderGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderGenerator")
            .field("label", &self.label)
            .finish()
    }
}

#[async_trait]
impl TextGenerator for ProviderGenerator {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, ModelError> {
        self.chat(&[ChatMessage::user(prompt)], params).await
    }
}

#[async_trait]
impl ImageTranscriber for ProviderGenerator {
    fn name(&self) -> &str {
        &self.label
    }

    /// The empty user text is intentional: the image carries all the content.
    async fn transcribe(&self, image: ImageData, params: &GenerationParams) -> Result<String, ModelError> {
        let messages = [
            ChatMessage::system(TRANSCRIPTION_SYSTEM_PROMPT),
            ChatMessage::user_with_images("", vec![image]),
        ];
        self.chat(&messages, params).await
    }
}

/// Build `CompletionOptions` from generation parameters.
fn build_options(params: &GenerationParams) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(params.temperature),
        max_tokens: Some(params.max_tokens),
        top_p: Some(params.top_p),
        ..Default::default()
    }
}

// ── Invoker ──────────────────────────────────────────────────────────────

/// Call policy around the backends. Cheap to clone.
#[derive(Clone)]
pub struct ModelInvoker {
    generator: Arc<dyn TextGenerator>,
    transcriber: Option<Arc<dyn ImageTranscriber>>,
    max_attempts: u32,
    retry_backoff_ms: u64,
    timeout: Duration,
}

impl std::fmt::Debug for ModelInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelInvoker")
            .field("generator", &self.generator.name())
            .field("transcriber", &self.transcriber.as_ref().map(|t| t.name()))
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ModelInvoker {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &DistillConfig) -> Self {
        Self {
            generator,
            transcriber: None,
            max_attempts: config.max_attempts.max(1),
            retry_backoff_ms: config.retry_backoff_ms,
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn ImageTranscriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    /// Override the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn can_transcribe(&self) -> bool {
        self.transcriber.is_some()
    }

    /// Generate text for `prompt`. The result is trimmed and never empty.
    pub async fn invoke(&self, prompt: &str, params: &GenerationParams) -> Result<String, ModelError> {
        self.with_retries(self.generator.name(), || self.generator.generate(prompt, params))
            .await
    }

    /// Read the text off an image with the vision backend.
    pub async fn transcribe(&self, image: &ImageData, params: &GenerationParams) -> Result<String, ModelError> {
        let transcriber = self.transcriber.clone().ok_or_else(|| ModelError::Unavailable {
            backend: "vision".to_string(),
            detail: "no vision-capable provider configured".to_string(),
        })?;
        self.with_retries(transcriber.name(), || transcriber.transcribe(image.clone(), params))
            .await
    }

    async fn with_retries<F, Fut>(&self, backend: &str, mut call: F) -> Result<String, ModelError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<String, ModelError>>,
    {
        let start = Instant::now();

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "{}: empty response, retry {}/{} after {}ms",
                    backend,
                    attempt,
                    self.max_attempts - 1,
                    backoff
                );
                if backoff > 0 {
                    sleep(Duration::from_millis(backoff)).await;
                }
            }

            let output = match timeout(self.timeout, call()).await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    warn!("{}: call failed: {}", backend, e);
                    return Err(e);
                }
                Err(_) => {
                    warn!("{}: no response within {:?}", backend, self.timeout);
                    return Err(ModelError::Timeout {
                        secs: self.timeout.as_secs(),
                    });
                }
            };

            let trimmed = output.trim();
            if !trimmed.is_empty() {
                debug!(
                    "{}: {} chars in {:?} (attempt {})",
                    backend,
                    trimmed.len(),
                    start.elapsed(),
                    attempt + 1
                );
                return Ok(trimmed.to_string());
            }
        }

        Err(ModelError::EmptyGeneration {
            attempts: self.max_attempts,
        })
    }
}

/// Longest single wait between attempts.
const MAX_BACKOFF_MS: u64 = 30_000;

/// Delay before retry number `attempt` (1-based): `base × 2^(attempt-1)`,
/// capped at [`MAX_BACKOFF_MS`].
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    base.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted backends for unit tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Reply = Box<dyn Fn(&str) -> Result<String, ModelError> + Send + Sync>;

    /// Answers every prompt with a closure and counts calls.
    pub struct ScriptedGenerator {
        reply: Reply,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn new(reply: impl Fn(&str) -> Result<String, ModelError> + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                reply: Box::new(reply),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn constant(text: &str) -> Arc<Self> {
            let text = text.to_string();
            Self::new(move |_| Ok(text.clone()))
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            (self.reply)(prompt)
        }
    }

    /// Replays queued answers in order, then repeats the last one.
    pub struct SequenceGenerator {
        replies: Mutex<VecDeque<Result<String, ModelError>>>,
        calls: AtomicUsize,
    }

    impl SequenceGenerator {
        pub fn new(replies: Vec<Result<String, ModelError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for SequenceGenerator {
        fn name(&self) -> &str {
            "sequence"
        }

        async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.pop_front().unwrap()
            } else {
                replies.front().cloned().unwrap_or_else(|| Ok(String::new()))
            }
        }
    }

    /// Vision backend that always reads the same text.
    pub struct FixedTranscriber(pub String);

    #[async_trait]
    impl ImageTranscriber for FixedTranscriber {
        fn name(&self) -> &str {
            "fixed-vision"
        }

        async fn transcribe(&self, _image: ImageData, _params: &GenerationParams) -> Result<String, ModelError> {
            Ok(self.0.clone())
        }
    }

    pub fn fast_config() -> DistillConfig {
        DistillConfig::builder().retry_backoff_ms(0).build().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn build_options_carries_params() {
        let opts = build_options(&GenerationParams::SUMMARY);
        assert_eq!(opts.temperature, Some(0.3));
        assert_eq!(opts.max_tokens, Some(1024));
        assert_eq!(opts.top_p, Some(0.9));
    }

    #[tokio::test]
    async fn output_is_trimmed() {
        let generator = ScriptedGenerator::constant("  {\"title\": \"x\"}\n");
        let invoker = ModelInvoker::new(generator, &fast_config());
        let out = invoker.invoke("p", &GenerationParams::SUMMARY).await.unwrap();
        assert_eq!(out, "{\"title\": \"x\"}");
    }

    #[tokio::test]
    async fn empty_output_retried_then_reported() {
        let generator = ScriptedGenerator::constant("   \n");
        let invoker = ModelInvoker::new(generator.clone(), &fast_config());
        let err = invoker.invoke("p", &GenerationParams::SUMMARY).await.unwrap_err();
        assert_eq!(err, ModelError::EmptyGeneration { attempts: 3 });
        assert_eq!(generator.calls(), 3);
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_ms(500, 1), 500);
        assert_eq!(backoff_ms(500, 2), 1000);
        assert_eq!(backoff_ms(500, 3), 2000);
        assert_eq!(backoff_ms(500, 20), MAX_BACKOFF_MS);
        assert_eq!(backoff_ms(500, 70), MAX_BACKOFF_MS);
        assert_eq!(backoff_ms(u64::MAX, 2), MAX_BACKOFF_MS);
        assert_eq!(backoff_ms(0, 100), 0);
    }

    #[tokio::test]
    async fn many_attempts_do_not_overflow() {
        let config = DistillConfig {
            max_attempts: 70,
            ..fast_config()
        };
        let generator = ScriptedGenerator::constant("");
        let invoker = ModelInvoker::new(generator.clone(), &config);
        let err = invoker.invoke("p", &GenerationParams::SUMMARY).await.unwrap_err();
        assert_eq!(err, ModelError::EmptyGeneration { attempts: 70 });
        assert_eq!(generator.calls(), 70);
    }

    #[tokio::test]
    async fn recovers_after_one_empty_answer() {
        let generator = SequenceGenerator::new(vec![Ok(String::new()), Ok("answer".into())]);
        let invoker = ModelInvoker::new(generator.clone(), &fast_config());
        assert_eq!(invoker.invoke("p", &GenerationParams::ANSWERS).await.unwrap(), "answer");
        assert_eq!(generator.calls(), 2);
    }

    #[tokio::test]
    async fn unavailable_is_not_retried() {
        let generator = ScriptedGenerator::new(|_| {
            Err(ModelError::Unavailable {
                backend: "scripted".into(),
                detail: "503".into(),
            })
        });
        let invoker = ModelInvoker::new(generator.clone(), &fast_config());
        let err = invoker.invoke("p", &GenerationParams::SUMMARY).await.unwrap_err();
        assert!(matches!(err, ModelError::Unavailable { .. }));
        assert_eq!(generator.calls(), 1);
    }

    struct SlowGenerator;

    #[async_trait]
    impl TextGenerator for SlowGenerator {
        fn name(&self) -> &str {
            "slow"
        }

        async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> Result<String, ModelError> {
            sleep(Duration::from_secs(30)).await;
            Ok("late".into())
        }
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let invoker = ModelInvoker::new(Arc::new(SlowGenerator), &fast_config())
            .with_timeout(Duration::from_millis(20));
        let err = invoker.invoke("p", &GenerationParams::SUMMARY).await.unwrap_err();
        assert!(matches!(err, ModelError::Timeout { .. }));
    }

    #[tokio::test]
    async fn transcribe_without_vision_backend_is_unavailable() {
        let invoker = ModelInvoker::new(ScriptedGenerator::constant("x"), &fast_config());
        assert!(!invoker.can_transcribe());
        let image = ImageData::new("aGVsbG8=".to_string(), "image/png");
        let err = invoker
            .transcribe(&image, &GenerationParams::TRANSCRIPTION)
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn transcribe_uses_vision_backend() {
        let invoker = ModelInvoker::new(ScriptedGenerator::constant("x"), &fast_config())
            .with_transcriber(Arc::new(FixedTranscriber(" Q.1 Define osmosis. ".into())));
        let image = ImageData::new("aGVsbG8=".to_string(), "image/png");
        let text = invoker
            .transcribe(&image, &GenerationParams::TRANSCRIPTION)
            .await
            .unwrap();
        assert_eq!(text, "Q.1 Define osmosis.");
    }
}
