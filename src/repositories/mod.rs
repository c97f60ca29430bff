pub mod memory;
pub mod usage;

pub use memory::InMemoryUsageStore;
pub use usage::PgUsageRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::bucketing::{BucketExpr, BucketKey};
use crate::error::Result;
use crate::models::{Device, Sample};

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// A grouped `SUM(usage_kwh)` request.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub range: TimeRange,
    pub bucket: Option<BucketExpr>,
    pub by_device: bool,
    pub device: Option<Device>,
}

impl StoreQuery {
    /// Sum over the whole range, no grouping.
    pub fn total(range: TimeRange) -> Self {
        Self {
            range,
            bucket: None,
            by_device: false,
            device: None,
        }
    }

    pub fn bucketed(mut self, bucket: BucketExpr) -> Self {
        self.bucket = Some(bucket);
        self
    }

    pub fn per_device(mut self) -> Self {
        self.by_device = true;
        self
    }

    pub fn only(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }
}

/// One row of a grouped sum. Group columns that were not requested are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedSum {
    pub bucket: Option<BucketKey>,
    pub device: Option<Device>,
    pub total_kwh: f64,
}

/// Persistence used by the trend and insight services.
///
/// Implementations assign samples to buckets using the same reporting offset the
/// services build their skeletons with.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn sum_grouped_by(&self, query: &StoreQuery) -> Result<Vec<GroupedSum>>;

    async fn insert_batch(&self, samples: &[Sample]) -> Result<u64>;
}
