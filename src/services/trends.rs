use chrono::{FixedOffset, NaiveDate};
use std::collections::HashMap;
use std::sync::Arc;

use crate::bucketing::{self, BucketKey, BucketWindow, Period};
use crate::error::Result;
use crate::models::DeviceTotals;
use crate::repositories::{GroupedSum, StoreQuery, TimeRange, UsageStore};

/// Usage of every device within one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketRow {
    pub key: BucketKey,
    pub totals: DeviceTotals,
}

impl BucketRow {
    fn empty(key: BucketKey) -> Self {
        Self {
            key,
            totals: DeviceTotals::default(),
        }
    }

    pub fn total(&self) -> f64 {
        self.totals.total()
    }
}

/// A gap-filled trend report. Values are unrounded.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub window: BucketWindow,
    pub total_usage: f64,
    pub device_breakdown: DeviceTotals,
    pub rows: Vec<BucketRow>,
}

#[derive(Clone)]
pub struct TrendsService {
    store: Arc<dyn UsageStore>,
    offset: FixedOffset,
}

impl TrendsService {
    pub fn new(store: Arc<dyn UsageStore>, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    pub async fn aggregate(&self, period: Period, reference: NaiveDate) -> Result<Aggregation> {
        let window = bucketing::window(period, reference, self.offset)?;
        tracing::debug!(
            %period,
            start = %window.start,
            end = %window.end,
            buckets = window.keys.len(),
            "Aggregating usage"
        );

        let query = StoreQuery::total(TimeRange::new(window.start, window.end))
            .bucketed(period.bucket_expr())
            .per_device();
        let raw = self.store.sum_grouped_by(&query).await?;

        let rows = merge_onto_skeleton(&window.keys, raw);
        let mut device_breakdown = DeviceTotals::default();
        for row in &rows {
            device_breakdown.accumulate(&row.totals);
        }
        let total_usage = rows.iter().map(BucketRow::total).sum();

        Ok(Aggregation {
            window,
            total_usage,
            device_breakdown,
            rows,
        })
    }
}

/// Lay raw `(bucket, device)` sums onto the skeleton.
///
/// The result has exactly one row per skeleton key, in skeleton order. Raw rows whose
/// key is not part of the skeleton are dropped.
pub fn merge_onto_skeleton(keys: &[BucketKey], raw: Vec<GroupedSum>) -> Vec<BucketRow> {
    let mut rows: Vec<BucketRow> = keys.iter().copied().map(BucketRow::empty).collect();
    let index: HashMap<BucketKey, usize> = keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();

    for sum in raw {
        match (sum.bucket, sum.device) {
            (Some(key), Some(device)) => match index.get(&key) {
                Some(&i) => rows[i].totals.set(device, sum.total_kwh),
                None => {
                    tracing::debug!(bucket = %key, %device, "Dropping row outside the report window")
                }
            },
            _ => tracing::debug!(?sum, "Dropping row without bucket or device"),
        }
    }

    rows
}
