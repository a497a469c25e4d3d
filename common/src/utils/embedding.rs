use std::sync::Arc;

use async_openai::{types::CreateEmbeddingRequestArgs, Client};

use crate::error::AppError;

pub type OpenAIClient = Client<async_openai::config::OpenAIConfig>;

/// Embedding provider over the OpenAI-compatible embeddings endpoint, pinned
/// to one model and dimension so every vector in an index agrees with the
/// index's configured dimension.
#[derive(Clone)]
pub struct EmbeddingProvider {
    client: Arc<OpenAIClient>,
    model: String,
    dimensions: u32,
}

impl EmbeddingProvider {
    pub fn new(client: Arc<OpenAIClient>, model: String, dimensions: u32) -> Self {
        Self {
            client,
            model,
            dimensions,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimensions as usize
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embed one text into a fixed-length vector.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .dimensions(self.dimensions)
            .input([input])
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| AppError::LLMParsing("No embedding data received".into()))?
            .embedding;

        Ok(embedding)
    }

    /// Embed a batch of texts in one request, preserving input order.
    pub async fn embed_batch(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .dimensions(self.dimensions)
            .input(inputs)
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        Ok(response
            .data
            .into_iter()
            .map(|item| item.embedding)
            .collect())
    }
}
