//! Configuration types for document distillation.
//!
//! Every pipeline knob lives in [`DistillConfig`], built via its
//! [`DistillConfigBuilder`]. The config is created once at startup and shared
//! read-only by all requests.

use crate::error::DistillError;
use serde::{Deserialize, Serialize};

/// Sampling parameters for one kind of model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
}

impl GenerationParams {
    /// Section and document summaries.
    pub const SUMMARY: Self = Self {
        max_tokens: 1024,
        temperature: 0.3,
        top_p: 0.9,
    };

    /// Exam question sets.
    pub const QUESTIONS: Self = Self {
        max_tokens: 2048,
        temperature: 0.4,
        top_p: 0.9,
    };

    /// Model answers for the academic assistant.
    pub const ANSWERS: Self = Self {
        max_tokens: 2048,
        temperature: 0.4,
        top_p: 0.9,
    };

    /// Vision transcription of scanned pages and image uploads.
    ///
    /// Low temperature keeps the model faithful to what is on the page.
    pub const TRANSCRIPTION: Self = Self {
        max_tokens: 4096,
        temperature: 0.1,
        top_p: 1.0,
    };
}

/// Upper bound accepted for [`DistillConfig::max_attempts`].
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

/// Configuration for the distillation pipeline.
///
/// Built via [`DistillConfig::builder()`] or using [`DistillConfig::default()`].
///
/// # Example
/// ```rust
/// use docdistill::DistillConfig;
///
/// let config = DistillConfig::builder()
///     .max_words(300)
///     .concurrency(8)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_words, 300);
/// ```
#[derive(Debug, Clone)]
pub struct DistillConfig {
    /// Target chunk size in words. Default: 400.
    ///
    /// Also the reduction target: a pass whose combined output is at most
    /// `2 × max_words` words goes to the final transform.
    pub max_words: usize,

    /// Characters of the pass text used to build the global context. Default: 4000.
    pub context_chars: usize,

    /// Upper bound on reduction passes before giving up. Default: 10.
    pub max_passes: usize,

    /// Number of concurrent model calls within one pass. Default: 4.
    pub concurrency: usize,

    /// Questions requested per chunk by the question generator. Default: 5.
    pub max_questions: usize,

    /// Total attempts per model call when the output is empty. Default: 3.
    pub max_attempts: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Per-model-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Transcribe PDF pages without a text layer with the vision model. Default: true.
    pub ocr_fallback: bool,

    /// Maximum rendered image dimension for OCR pages, in pixels. Default: 2000.
    pub max_rendered_pixels: u32,

    pub summary_params: GenerationParams,
    pub question_params: GenerationParams,
    pub answer_params: GenerationParams,
    pub transcription_params: GenerationParams,
}

impl Default for DistillConfig {
    fn default() -> Self {
        Self {
            max_words: 400,
            context_chars: 4000,
            max_passes: 10,
            concurrency: 4,
            max_questions: 5,
            max_attempts: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            ocr_fallback: true,
            max_rendered_pixels: 2000,
            summary_params: GenerationParams::SUMMARY,
            question_params: GenerationParams::QUESTIONS,
            answer_params: GenerationParams::ANSWERS,
            transcription_params: GenerationParams::TRANSCRIPTION,
        }
    }
}

impl DistillConfig {
    /// Create a new builder for `DistillConfig`.
    pub fn builder() -> DistillConfigBuilder {
        DistillConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`DistillConfig`].
#[derive(Debug)]
pub struct DistillConfigBuilder {
    config: DistillConfig,
}

impl DistillConfigBuilder {
    pub fn max_words(mut self, n: usize) -> Self {
        self.config.max_words = n;
        self
    }

    pub fn context_chars(mut self, n: usize) -> Self {
        self.config.context_chars = n;
        self
    }

    pub fn max_passes(mut self, n: usize) -> Self {
        self.config.max_passes = n;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_questions(mut self, n: usize) -> Self {
        self.config.max_questions = n;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn ocr_fallback(mut self, v: bool) -> Self {
        self.config.ocr_fallback = v;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn summary_params(mut self, params: GenerationParams) -> Self {
        self.config.summary_params = params;
        self
    }

    pub fn question_params(mut self, params: GenerationParams) -> Self {
        self.config.question_params = params;
        self
    }

    pub fn answer_params(mut self, params: GenerationParams) -> Self {
        self.config.answer_params = params;
        self
    }

    pub fn transcription_params(mut self, params: GenerationParams) -> Self {
        self.config.transcription_params = params;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DistillConfig, DistillError> {
        let c = &self.config;
        if c.max_words == 0 {
            return Err(DistillError::InvalidConfig("max_words must be ≥ 1".into()));
        }
        if c.max_passes == 0 {
            return Err(DistillError::InvalidConfig("max_passes must be ≥ 1".into()));
        }
        if c.max_attempts == 0 || c.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(DistillError::InvalidConfig(format!(
                "max_attempts must be between 1 and {MAX_ATTEMPTS_LIMIT}, got {}",
                c.max_attempts
            )));
        }
        if c.max_questions == 0 {
            return Err(DistillError::InvalidConfig(
                "max_questions must be ≥ 1".into(),
            ));
        }
        for (name, p) in [
            ("summary", &c.summary_params),
            ("question", &c.question_params),
            ("answer", &c.answer_params),
            ("transcription", &c.transcription_params),
        ] {
            if !(0.0..=2.0).contains(&p.temperature) || !(0.0..=1.0).contains(&p.top_p) {
                return Err(DistillError::InvalidConfig(format!(
                    "{name} params out of range: temperature {} top_p {}",
                    p.temperature, p.top_p
                )));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_values() {
        let c = DistillConfig::default();
        assert_eq!(c.max_words, 400);
        assert_eq!(c.context_chars, 4000);
        assert_eq!(c.max_passes, 10);
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.summary_params.max_tokens, 1024);
        assert_eq!(c.question_params.max_tokens, 2048);
        assert!((c.answer_params.temperature - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn builder_clamps_concurrency() {
        let c = DistillConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn zero_max_words_rejected() {
        let err = DistillConfig::builder().max_words(0).build().unwrap_err();
        assert!(err.to_string().contains("max_words"));
    }

    #[test]
    fn attempts_outside_limit_rejected() {
        assert!(DistillConfig::builder().max_attempts(0).build().is_err());
        let err = DistillConfig::builder().max_attempts(70).build().unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
        assert!(DistillConfig::builder()
            .max_attempts(MAX_ATTEMPTS_LIMIT)
            .build()
            .is_ok());
    }

    #[test]
    fn out_of_range_params_rejected() {
        let bad = GenerationParams {
            temperature: 3.0,
            ..GenerationParams::SUMMARY
        };
        let err = DistillConfig::builder().summary_params(bad).build().unwrap_err();
        assert!(err.to_string().contains("summary"));
    }
}
