pub mod ingest;
pub mod insights;
pub mod trends;

pub use ingest::{IngestService, IngestSummary};
pub use insights::{InsightService, WeeklyInsights};
pub use trends::{Aggregation, BucketRow, TrendsService};
