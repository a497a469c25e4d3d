pub mod loader;
pub mod pipeline;

pub use loader::{DefaultSnapshotLoader, SnapshotLoader};
pub use pipeline::{IngestionConfig, IngestionOutcome, IngestionPipeline};
