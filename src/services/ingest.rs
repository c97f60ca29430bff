use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{RawSample, Sample};
use crate::repositories::UsageStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestSummary {
    pub inserted: u64,
}

#[derive(Clone)]
pub struct IngestService {
    store: Arc<dyn UsageStore>,
}

impl IngestService {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    /// Validate every sample, then insert the batch. One bad sample rejects the batch.
    pub async fn ingest(&self, raw: Vec<RawSample>) -> Result<IngestSummary> {
        let samples = raw
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                Sample::try_from(r).map_err(|e| match e {
                    AppError::Validation(msg) => {
                        AppError::Validation(format!("sample {}: {}", i, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if samples.is_empty() {
            return Ok(IngestSummary { inserted: 0 });
        }

        let inserted = self.store.insert_batch(&samples).await?;
        tracing::info!(inserted, "Ingested samples");
        Ok(IngestSummary { inserted })
    }
}
