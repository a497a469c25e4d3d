use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use text_splitter::TextSplitter;
use tracing::{debug, info};
use uuid::Uuid;

use common::error::AppError;
use common::utils::embedding::EmbeddingProvider;
use common::vector::{VectorIndexOps, VectorRecord, VectorServiceClient};

const DEFAULT_CHUNK_CAPACITY: Range<usize> = 500..2000;
const UPSERT_BATCH_SIZE: usize = 100;

/// Loads one snapshot into one target index as a whole: parse, chunk, embed,
/// upsert. Any failure fails the whole load; the orchestrator treats this as
/// an opaque capability and never inspects partial progress.
#[async_trait]
pub trait SnapshotLoader: Send + Sync {
    async fn load_and_index(
        &self,
        file_name: &str,
        payload: &[u8],
        index_name: &str,
    ) -> Result<usize, AppError>;
}

pub struct DefaultSnapshotLoader {
    embedding: Arc<EmbeddingProvider>,
    client: VectorServiceClient,
    chunk_capacity: Range<usize>,
}

impl DefaultSnapshotLoader {
    pub fn new(embedding: Arc<EmbeddingProvider>, client: VectorServiceClient) -> Self {
        Self {
            embedding,
            client,
            chunk_capacity: DEFAULT_CHUNK_CAPACITY,
        }
    }
}

#[async_trait]
impl SnapshotLoader for DefaultSnapshotLoader {
    async fn load_and_index(
        &self,
        file_name: &str,
        payload: &[u8],
        index_name: &str,
    ) -> Result<usize, AppError> {
        let documents = snapshot_documents(payload)?;
        let chunks = chunk_documents(&documents, self.chunk_capacity.clone());
        debug!(
            file_name,
            documents = documents.len(),
            chunks = chunks.len(),
            "Prepared snapshot chunks"
        );

        if chunks.is_empty() {
            info!(file_name, "Snapshot contained no indexable content");
            return Ok(0);
        }

        let embeddings = self.embedding.embed_batch(chunks.clone()).await?;
        if embeddings.len() != chunks.len() {
            return Err(AppError::InternalError(format!(
                "embedding service returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(content, values)| VectorRecord {
                id: Uuid::new_v4().to_string(),
                values,
                metadata: json!({ "content": content, "source_file": file_name }),
            })
            .collect();

        let handle = self.client.index(index_name).await?;
        let total = records.len();
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            handle.upsert(batch.to_vec()).await?;
        }

        info!(file_name, index_name, vectors = total, "Snapshot indexed");
        Ok(total)
    }
}

/// Split a snapshot into per-resource documents. The expected shape is
/// `{"assets": [...]}`; a bare array or any other JSON document degrades to
/// one document per element or one document total.
fn snapshot_documents(payload: &[u8]) -> Result<Vec<String>, AppError> {
    let value: Value = serde_json::from_slice(payload)?;

    let records = match value {
        Value::Object(mut map) => match map.remove("assets") {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => vec![Value::Object(map)],
        },
        Value::Array(items) => items,
        other => vec![other],
    };

    Ok(records
        .into_iter()
        .filter(|record| !record.is_null())
        .map(|record| record.to_string())
        .collect())
}

fn chunk_documents(documents: &[String], capacity: Range<usize>) -> Vec<String> {
    let splitter = TextSplitter::new(capacity);
    documents
        .iter()
        .flat_map(|document| splitter.chunks(document).map(str::to_owned))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_documents_unwraps_the_assets_array() {
        let payload = br#"{"assets": [{"assetType": "a"}, {"assetType": "b"}]}"#;
        let documents = snapshot_documents(payload).expect("parse");
        assert_eq!(documents.len(), 2);
        assert!(documents[0].contains("assetType"));
    }

    #[test]
    fn snapshot_documents_accepts_a_bare_array() {
        let payload = br#"[{"assetType": "a"}]"#;
        let documents = snapshot_documents(payload).expect("parse");
        assert_eq!(documents.len(), 1);
    }

    #[test]
    fn snapshot_documents_treats_unknown_objects_as_one_document() {
        let payload = br#"{"something": "else"}"#;
        let documents = snapshot_documents(payload).expect("parse");
        assert_eq!(documents.len(), 1);
        assert!(documents[0].contains("something"));
    }

    #[test]
    fn snapshot_documents_rejects_invalid_json() {
        let result = snapshot_documents(b"not json");
        assert!(matches!(result, Err(AppError::Json(_))));
    }

    #[test]
    fn chunking_splits_oversized_documents() {
        let small = r#"{"assetType": "small"}"#.to_string();
        let large = format!(r#"{{"assetType": "large", "blob": "{}"}}"#, "x".repeat(5000));

        let chunks = chunk_documents(&[small.clone(), large], 500..2000);
        assert!(chunks.len() >= 3, "large document should split");
        assert!(chunks.iter().any(|chunk| chunk.contains("small")));
        assert!(chunks.iter().all(|chunk| chunk.len() <= 2000));
    }

    #[test]
    fn chunking_empty_input_yields_no_chunks() {
        let chunks = chunk_documents(&[], 500..2000);
        assert!(chunks.is_empty());
    }
}
