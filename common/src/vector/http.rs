use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::AppError;

use super::{IndexCatalog, IndexSpec, VectorIndexOps, VectorMatch, VectorRecord};

const API_KEY_HEADER: &str = "Api-Key";

/// Client for the vector index service's control plane (index lifecycle).
/// Data-plane calls go through a per-index [`VectorIndexHandle`] resolved
/// from the host the control plane reports.
#[derive(Clone)]
pub struct VectorServiceClient {
    http: reqwest::Client,
    api_key: String,
    control_url: String,
}

#[derive(Debug, Deserialize)]
struct IndexDescription {
    name: String,
    host: String,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexDescription>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

impl VectorServiceClient {
    pub fn new(http: reqwest::Client, api_key: String, control_url: String) -> Self {
        Self {
            http,
            api_key,
            control_url: control_url.trim_end_matches('/').to_string(),
        }
    }

    async fn list_indexes(&self) -> Result<Vec<IndexDescription>, AppError> {
        let response = self
            .http
            .get(format!("{}/indexes", self.control_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let list: IndexList = check_response(response, "listing indexes").await?.json().await?;
        Ok(list.indexes)
    }

    async fn describe_index(&self, name: &str) -> Result<IndexDescription, AppError> {
        let response = self
            .http
            .get(format!("{}/indexes/{name}", self.control_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("vector index {name}")));
        }
        Ok(check_response(response, "describing index")
            .await?
            .json()
            .await?)
    }

    /// Resolve a data-plane handle for one named index.
    pub async fn index(&self, name: &str) -> Result<VectorIndexHandle, AppError> {
        let description = self.describe_index(name).await?;
        debug!(index = %description.name, host = %description.host, "Resolved index host");
        Ok(VectorIndexHandle {
            http: self.http.clone(),
            api_key: self.api_key.clone(),
            base_url: format!("https://{}", description.host),
        })
    }
}

#[async_trait]
impl IndexCatalog for VectorServiceClient {
    async fn list_index_names(&self) -> Result<Vec<String>, AppError> {
        Ok(self
            .list_indexes()
            .await?
            .into_iter()
            .map(|description| description.name)
            .collect())
    }

    async fn create_index(
        &self,
        name: &str,
        dimension: u32,
        metric: &str,
        spec: &IndexSpec,
    ) -> Result<(), AppError> {
        let body = json!({
            "name": name,
            "dimension": dimension,
            "metric": metric,
            "spec": { "serverless": { "cloud": spec.cloud, "region": spec.region } },
        });
        let response = self
            .http
            .post(format!("{}/indexes", self.control_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        check_response(response, "creating index").await?;
        Ok(())
    }
}

/// Data-plane handle bound to one index host.
#[derive(Clone)]
pub struct VectorIndexHandle {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[async_trait]
impl VectorIndexOps for VectorIndexHandle {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), AppError> {
        let response = self
            .http
            .post(format!("{}/vectors/upsert", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "vectors": records }))
            .send()
            .await?;
        check_response(response, "upserting vectors").await?;
        Ok(())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<VectorMatch>, AppError> {
        let body = json!({
            "vector": vector,
            "topK": top_k,
            "includeValues": false,
            "includeMetadata": include_metadata,
        });
        let response = self
            .http
            .post(format!("{}/query", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;
        let parsed: QueryResponse = check_response(response, "querying index")
            .await?
            .json()
            .await?;
        Ok(parsed.matches)
    }
}

async fn check_response(
    response: reqwest::Response,
    operation: &str,
) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::VectorIndex(format!(
        "{operation} failed with {status}: {body}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_url_trailing_slash_is_normalized() {
        let client = VectorServiceClient::new(
            reqwest::Client::new(),
            "key".into(),
            "https://api.example.io/".into(),
        );
        assert_eq!(client.control_url, "https://api.example.io");
    }

    #[test]
    fn query_response_parses_matches_with_and_without_metadata() {
        let raw = r#"{
            "matches": [
                {"id": "a", "score": 0.12, "metadata": {"content": "chunk text"}},
                {"id": "b", "score": 0.34}
            ]
        }"#;
        let parsed: QueryResponse = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed.matches.len(), 2);
        assert_eq!(parsed.matches[0].id, "a");
        assert!(parsed.matches[0].metadata.is_some());
        assert!(parsed.matches[1].metadata.is_none());
    }

    #[test]
    fn index_list_parses_names_and_hosts() {
        let raw = r#"{
            "indexes": [
                {"name": "inventory-a", "host": "inventory-a-abc.svc.example.io", "dimension": 1536},
                {"name": "inventory-b", "host": "inventory-b-def.svc.example.io"}
            ]
        }"#;
        let parsed: IndexList = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed.indexes.len(), 2);
        assert_eq!(parsed.indexes[0].name, "inventory-a");
        assert!(parsed.indexes[1].host.contains("svc.example.io"));
    }
}
