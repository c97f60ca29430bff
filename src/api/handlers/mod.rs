pub mod health;
pub mod insights;
pub mod samples;
pub mod trends;

use chrono::FixedOffset;
use std::sync::Arc;

use crate::repositories::UsageStore;
use crate::services::{IngestService, InsightService, TrendsService};

#[derive(Clone)]
pub struct AppState {
    pub trends: Arc<TrendsService>,
    pub insights: Arc<InsightService>,
    pub ingest: Arc<IngestService>,
}

impl AppState {
    /// All services share one store and one reporting offset.
    pub fn new(store: Arc<dyn UsageStore>, offset: FixedOffset) -> Self {
        Self {
            trends: Arc::new(TrendsService::new(store.clone(), offset)),
            insights: Arc::new(InsightService::new(store.clone(), offset)),
            ingest: Arc::new(IngestService::new(store)),
        }
    }
}
