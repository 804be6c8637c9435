//! Document summarisation.

use crate::config::GenerationParams;
use crate::error::TransformError;
use crate::output::{Distilled, Summary};
use crate::pipeline::llm::ModelInvoker;
use crate::pipeline::reduce::Transform;
use crate::pipeline::structured::extract_object;
use crate::prompts;
use async_trait::async_trait;

/// Section summaries in partial mode, whole-document synthesis in final mode.
#[derive(Debug, Clone)]
pub struct SummaryTransform {
    invoker: ModelInvoker,
    params: GenerationParams,
}

impl SummaryTransform {
    pub fn new(invoker: ModelInvoker, params: GenerationParams) -> Self {
        Self { invoker, params }
    }

    async fn summarise(&self, prompt: &str) -> Result<Distilled<Summary>, TransformError> {
        let raw = self.invoker.invoke(prompt, &self.params).await?;
        let object = extract_object(&raw)?;
        Ok(Distilled::from_object(&object, Summary::from_object))
    }
}

#[async_trait]
impl Transform for SummaryTransform {
    type Output = Distilled<Summary>;

    async fn partial(&self, text: &str, context: Option<&str>) -> Result<Self::Output, TransformError> {
        self.summarise(&prompts::summary_section(text, context)).await
    }

    async fn finalize(&self, combined: &str) -> Result<Self::Output, TransformError> {
        self.summarise(&prompts::summary_document(combined)).await
    }

    fn degraded(&self, error: &TransformError) -> Self::Output {
        Distilled::unavailable(error.to_string())
    }
}
