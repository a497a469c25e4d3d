use std::sync::Arc;

use async_openai::types::{
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;

use common::error::AppError;
use common::utils::embedding::{EmbeddingProvider, OpenAIClient};
use common::vector::{VectorIndexOps, VectorMatch};

/// The three remote capabilities the query engine consumes. Kept behind one
/// trait so tests can count and fail individual stages.
#[async_trait]
pub trait QueryServices: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError>;

    async fn search(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<VectorMatch>, AppError>;

    async fn complete(&self, system: &str, user: &str) -> Result<String, AppError>;
}

pub struct DefaultQueryServices {
    embedding: Arc<EmbeddingProvider>,
    index: Arc<dyn VectorIndexOps>,
    openai_client: Arc<OpenAIClient>,
    model: String,
}

impl DefaultQueryServices {
    pub fn new(
        embedding: Arc<EmbeddingProvider>,
        index: Arc<dyn VectorIndexOps>,
        openai_client: Arc<OpenAIClient>,
        model: String,
    ) -> Self {
        Self {
            embedding,
            index,
            openai_client,
            model,
        }
    }
}

#[async_trait]
impl QueryServices for DefaultQueryServices {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, AppError> {
        self.embedding.embed(text).await
    }

    async fn search(&self, vector: Vec<f32>, top_k: usize) -> Result<Vec<VectorMatch>, AppError> {
        // Metadata carries the chunk text; raw vector values are never needed back.
        self.index.query(vector, top_k, true).await
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, AppError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessage::from(system).into(),
                ChatCompletionRequestUserMessage::from(user).into(),
            ])
            .build()?;

        let response = self.openai_client.chat().create(request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(AppError::LLMParsing(
                "No content found in LLM response".into(),
            ))?;

        Ok(content.trim().to_string())
    }
}
