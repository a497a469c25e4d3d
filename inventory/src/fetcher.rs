use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use common::error::AppError;
use common::storage::snapshot::snapshot_file_name;

use crate::auth;
use crate::credential::ServiceAccountKey;

const ASSET_API_BASE: &str = "https://cloudasset.googleapis.com/v1";
const PAGE_SIZE: u32 = 500;

/// Enumerates every resource descriptor visible to a credential for one
/// project. The whole enumeration either completes or fails as a unit; there
/// is no partial-result recovery.
#[async_trait]
pub trait InventorySource: Send + Sync {
    async fn enumerate(
        &self,
        project_id: &str,
        key: &ServiceAccountKey,
    ) -> Result<Vec<Value>, AppError>;
}

/// REST client for the cloud asset-inventory API.
#[derive(Clone)]
pub struct AssetInventoryClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListAssetsResponse {
    #[serde(default)]
    assets: Vec<Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl AssetInventoryClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: ASSET_API_BASE.to_string(),
        }
    }
}

#[async_trait]
impl InventorySource for AssetInventoryClient {
    async fn enumerate(
        &self,
        project_id: &str,
        key: &ServiceAccountKey,
    ) -> Result<Vec<Value>, AppError> {
        let token = auth::fetch_access_token(&self.http, key).await?;
        let page_size = PAGE_SIZE.to_string();

        let mut assets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(format!("{}/projects/{}/assets", self.base_url, project_id))
                .bearer_auth(&token)
                .query(&[
                    ("contentType", "RESOURCE"),
                    ("pageSize", page_size.as_str()),
                ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::Inventory(format!(
                    "asset listing for {project_id} failed with {status}: {body}"
                )));
            }

            let page: ListAssetsResponse = response.json().await?;
            assets.extend(page.assets);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(assets)
    }
}

/// A materialized inventory snapshot: the timestamped file name plus the
/// serialized JSON document.
#[derive(Debug, Clone)]
pub struct InventorySnapshot {
    pub file_name: String,
    pub bytes: Bytes,
    pub record_count: usize,
}

impl InventorySnapshot {
    pub fn capture(records: Vec<Value>, at: DateTime<Utc>) -> Result<Self, AppError> {
        let record_count = records.len();
        let document = json!({ "assets": records });
        let bytes = serde_json::to_vec_pretty(&document)?;

        Ok(Self {
            file_name: snapshot_file_name(at),
            bytes: Bytes::from(bytes),
            record_count,
        })
    }
}

/// Run a full enumeration and materialize the result as a snapshot named
/// with the current timestamp.
pub async fn fetch_snapshot(
    source: &dyn InventorySource,
    project_id: &str,
    key: &ServiceAccountKey,
) -> Result<InventorySnapshot, AppError> {
    let records = source.enumerate(project_id, key).await?;
    info!(
        project_id,
        records = records.len(),
        "Fetched asset inventory"
    );
    InventorySnapshot::capture(records, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn list_response_parses_camel_case_pagination() {
        let raw = r#"{
            "assets": [
                {"name": "//storage.googleapis.com/projects/_/buckets/example", "assetType": "storage.googleapis.com/Bucket"},
                {"name": "//compute.googleapis.com/projects/p/zones/z/instances/i", "assetType": "compute.googleapis.com/Instance"}
            ],
            "nextPageToken": "page-2"
        }"#;
        let page: ListAssetsResponse = serde_json::from_str(raw).expect("parse");
        assert_eq!(page.assets.len(), 2);
        assert_eq!(page.next_page_token.as_deref(), Some("page-2"));
    }

    #[test]
    fn list_response_tolerates_empty_pages() {
        let page: ListAssetsResponse = serde_json::from_str("{}").expect("parse");
        assert!(page.assets.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn capture_wraps_records_and_names_by_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 15, 30).unwrap();
        let records = vec![json!({"assetType": "storage.googleapis.com/Bucket"})];

        let snapshot = InventorySnapshot::capture(records, at).expect("capture");
        assert_eq!(snapshot.file_name, "gcp_inventory_20240601-081530.json");
        assert_eq!(snapshot.record_count, 1);

        let document: Value = serde_json::from_slice(&snapshot.bytes).expect("round trip");
        assert_eq!(
            document["assets"][0]["assetType"],
            "storage.googleapis.com/Bucket"
        );
    }

    #[test]
    fn capture_of_empty_inventory_still_produces_a_document() {
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 8, 15, 30).unwrap();
        let snapshot = InventorySnapshot::capture(Vec::new(), at).expect("capture");
        let document: Value = serde_json::from_slice(&snapshot.bytes).expect("parse");
        assert!(document["assets"].as_array().unwrap().is_empty());
    }

    struct CannedSource(Vec<Value>);

    #[async_trait]
    impl InventorySource for CannedSource {
        async fn enumerate(
            &self,
            _project_id: &str,
            _key: &ServiceAccountKey,
        ) -> Result<Vec<Value>, AppError> {
            Ok(self.0.clone())
        }
    }

    fn test_key() -> ServiceAccountKey {
        ServiceAccountKey {
            key_type: "service_account".into(),
            client_email: "copilot@example.iam.gserviceaccount.com".into(),
            private_key: "unused".into(),
            private_key_id: None,
            project_id: Some("example-project".into()),
            token_uri: "https://oauth2.googleapis.com/token".into(),
        }
    }

    #[tokio::test]
    async fn fetch_snapshot_materializes_the_source_records() {
        let source = CannedSource(vec![json!({"assetType": "compute.googleapis.com/Instance"})]);
        let snapshot = fetch_snapshot(&source, "example-project", &test_key())
            .await
            .expect("fetch");
        assert_eq!(snapshot.record_count, 1);
        assert!(snapshot.file_name.starts_with("gcp_inventory_"));
        assert!(snapshot.file_name.ends_with(".json"));
    }
}
