pub mod prompt;
pub mod services;

use serde_json::Value;
use tracing::{info, instrument, warn};

use common::error::AppError;
use common::utils::config::AppConfig;
use common::vector::VectorMatch;

pub use prompt::{build_prompt, extract_references, SYSTEM_PROMPT};
pub use services::{DefaultQueryServices, QueryServices};

/// Tuning for the retrieval stages.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Result cap for the nearest-neighbour search.
    pub top_k: usize,
    /// How many of the returned hits are handed to the summarizer.
    pub max_documents: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: 6,
            max_documents: 3,
        }
    }
}

impl QueryConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            top_k: config.search_top_k,
            max_documents: config.max_documents,
        }
    }
}

/// A generated answer plus the `Reference:` lines extracted from it.
#[derive(Debug, Clone)]
pub struct Answer {
    pub content: String,
    pub references: Vec<String>,
}

/// Result of one query. An empty retrieval is an explicit outcome, distinct
/// from an error, and never reaches the completion service.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Answered(Answer),
    NoMatches,
}

/// The retrieval-augmented query engine: embed, search, extract, summarize,
/// strictly in that order with no branching back.
pub struct QueryEngine<S> {
    services: S,
    config: QueryConfig,
}

impl<S: QueryServices> QueryEngine<S> {
    pub fn new(services: S, config: QueryConfig) -> Self {
        Self { services, config }
    }

    #[instrument(skip_all)]
    pub async fn answer(&self, question: &str) -> Result<QueryOutcome, AppError> {
        let vector = self.services.embed(question).await?;

        let matches = self.services.search(vector, self.config.top_k).await?;

        let documents = extract_documents(&matches, self.config.max_documents);
        if documents.is_empty() {
            info!("No relevant documents retrieved for question");
            return Ok(QueryOutcome::NoMatches);
        }

        let user_prompt = build_prompt(question, &documents);
        let report = self.services.complete(SYSTEM_PROMPT, &user_prompt).await?;

        let references = extract_references(&report);
        Ok(QueryOutcome::Answered(Answer {
            content: report,
            references,
        }))
    }
}

/// Pull the `content` metadata field from the first `max_documents` hits, in
/// the order the index returned them. A hit without that field is skipped
/// with a warning rather than failing the query; skipped hits are not
/// backfilled from beyond the cap.
pub fn extract_documents(matches: &[VectorMatch], max_documents: usize) -> Vec<String> {
    matches
        .iter()
        .take(max_documents)
        .filter_map(|hit| {
            let content = hit
                .metadata
                .as_ref()
                .and_then(|metadata| metadata.get("content"))
                .and_then(Value::as_str);
            match content {
                Some(text) => Some(text.to_string()),
                None => {
                    warn!(id = %hit.id, "Search hit has no content metadata, skipping");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Mutex;

    fn hit(id: &str, content: Option<&str>) -> VectorMatch {
        VectorMatch {
            id: id.to_string(),
            score: 0.5,
            metadata: content.map(|text| json!({ "content": text })),
        }
    }

    struct MockServices {
        matches: Vec<VectorMatch>,
        reply: String,
        fail_embed: bool,
        calls: Mutex<Vec<&'static str>>,
    }

    impl MockServices {
        fn new(matches: Vec<VectorMatch>, reply: &str) -> Self {
            Self {
                matches,
                reply: reply.to_string(),
                fail_embed: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        async fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl QueryServices for MockServices {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, AppError> {
            self.calls.lock().await.push("embed");
            if self.fail_embed {
                return Err(AppError::LLMParsing("embedding unavailable".into()));
            }
            Ok(vec![0.1; 4])
        }

        async fn search(
            &self,
            _vector: Vec<f32>,
            top_k: usize,
        ) -> Result<Vec<VectorMatch>, AppError> {
            self.calls.lock().await.push("search");
            Ok(self.matches.iter().take(top_k).cloned().collect())
        }

        async fn complete(&self, _system: &str, _user: &str) -> Result<String, AppError> {
            self.calls.lock().await.push("complete");
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn empty_retrieval_short_circuits_without_a_completion_call() {
        let services = MockServices::new(vec![], "unused");
        let engine = QueryEngine::new(services, QueryConfig::default());

        let outcome = engine.answer("anything?").await.expect("query");
        assert!(matches!(outcome, QueryOutcome::NoMatches));
        assert_eq!(engine.services.calls().await, vec!["embed", "search"]);
    }

    #[tokio::test]
    async fn hits_without_content_metadata_also_short_circuit() {
        let services = MockServices::new(vec![hit("a", None), hit("b", None)], "unused");
        let engine = QueryEngine::new(services, QueryConfig::default());

        let outcome = engine.answer("anything?").await.expect("query");
        assert!(matches!(outcome, QueryOutcome::NoMatches));
        let calls = engine.services.calls().await;
        assert!(!calls.contains(&"complete"));
    }

    #[tokio::test]
    async fn answered_query_extracts_references() {
        let reply = "Two buckets exist.\nReference: bucket.alpha\nReference: bucket.beta";
        let services = MockServices::new(vec![hit("a", Some("{\"bucket\": \"alpha\"}"))], reply);
        let engine = QueryEngine::new(services, QueryConfig::default());

        let outcome = engine.answer("how many buckets?").await.expect("query");
        let answer = match outcome {
            QueryOutcome::Answered(answer) => answer,
            QueryOutcome::NoMatches => panic!("expected an answer"),
        };
        assert_eq!(answer.content, reply);
        assert_eq!(
            answer.references,
            vec!["Reference: bucket.alpha", "Reference: bucket.beta"]
        );
        assert_eq!(
            engine.services.calls().await,
            vec!["embed", "search", "complete"]
        );
    }

    #[tokio::test]
    async fn embed_failure_aborts_before_search() {
        let mut services = MockServices::new(vec![hit("a", Some("doc"))], "unused");
        services.fail_embed = true;
        let engine = QueryEngine::new(services, QueryConfig::default());

        let result = engine.answer("anything?").await;
        assert!(result.is_err());
        assert_eq!(engine.services.calls().await, vec!["embed"]);
    }

    #[test]
    fn extraction_caps_at_the_configured_maximum_and_keeps_order() {
        let matches = vec![
            hit("1", Some("first")),
            hit("2", Some("second")),
            hit("3", Some("third")),
            hit("4", Some("fourth")),
            hit("5", Some("fifth")),
        ];
        let documents = extract_documents(&matches, 3);
        assert_eq!(documents, vec!["first", "second", "third"]);
    }

    #[test]
    fn extraction_skips_hits_missing_content_without_backfilling() {
        let matches = vec![
            hit("1", Some("first")),
            hit("2", None),
            hit("3", Some("third")),
            hit("4", Some("fourth")),
        ];
        // The hit without content falls inside the cap and is dropped; the
        // fourth hit is beyond the cap and never considered.
        let documents = extract_documents(&matches, 3);
        assert_eq!(documents, vec!["first", "third"]);
    }

    #[test]
    fn extraction_tolerates_non_string_content() {
        let matches = vec![VectorMatch {
            id: "weird".into(),
            score: 0.1,
            metadata: Some(json!({ "content": 42 })),
        }];
        assert!(extract_documents(&matches, 3).is_empty());
    }
}
