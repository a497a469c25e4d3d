pub mod auth;
pub mod credential;
pub mod fetcher;

pub use credential::ServiceAccountKey;
pub use fetcher::{fetch_snapshot, AssetInventoryClient, InventorySnapshot, InventorySource};
