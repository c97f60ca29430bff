use async_trait::async_trait;
use chrono::FixedOffset;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{GroupedSum, StoreQuery, UsageStore};
use crate::error::Result;
use crate::models::Sample;

/// Process-local sample store, used with `store.backend: memory` and in tests.
pub struct InMemoryUsageStore {
    samples: RwLock<Vec<Sample>>,
    offset: FixedOffset,
}

impl InMemoryUsageStore {
    pub fn new(offset: FixedOffset) -> Self {
        Self::with_samples(offset, Vec::new())
    }

    pub fn with_samples(offset: FixedOffset, samples: Vec<Sample>) -> Self {
        Self {
            samples: RwLock::new(samples),
            offset,
        }
    }

    pub async fn len(&self) -> usize {
        self.samples.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn sum_grouped_by(&self, query: &StoreQuery) -> Result<Vec<GroupedSum>> {
        let samples = self.samples.read().await;
        let mut groups = BTreeMap::new();

        for sample in samples.iter() {
            if !query.range.contains(sample.timestamp) {
                continue;
            }
            if query.device.is_some_and(|d| d != sample.device) {
                continue;
            }

            let bucket = query
                .bucket
                .map(|expr| expr.key_for(sample.timestamp, self.offset));
            let device = query.by_device.then_some(sample.device);
            *groups.entry((bucket, device)).or_insert(0.0) += sample.usage_kwh;
        }

        Ok(groups
            .into_iter()
            .map(|((bucket, device), total_kwh)| GroupedSum {
                bucket,
                device,
                total_kwh,
            })
            .collect())
    }

    async fn insert_batch(&self, samples: &[Sample]) -> Result<u64> {
        self.samples.write().await.extend_from_slice(samples);
        Ok(samples.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucketing::{BucketExpr, BucketKey};
    use crate::models::Device;
    use crate::repositories::TimeRange;
    use chrono::{TimeZone, Utc};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn sample(d: u32, h: u32, device: Device, kwh: f64) -> Sample {
        Sample::new(Utc.with_ymd_and_hms(2024, 10, d, h, 0, 0).unwrap(), device, kwh).unwrap()
    }

    fn october() -> TimeRange {
        TimeRange::new(
            Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_groups_by_hour_and_device() {
        let store = InMemoryUsageStore::with_samples(
            utc(),
            vec![
                sample(1, 8, Device::Lights, 0.02),
                sample(2, 8, Device::Lights, 0.03),
                sample(1, 8, Device::Fridge, 0.04),
                sample(1, 9, Device::Lights, 0.01),
            ],
        );

        let rows = store
            .sum_grouped_by(
                &StoreQuery::total(october())
                    .bucketed(BucketExpr::HourOfDay)
                    .per_device(),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 3);
        let lights_8 = rows
            .iter()
            .find(|r| r.bucket == Some(BucketKey::Hour(8)) && r.device == Some(Device::Lights))
            .unwrap();
        assert!((lights_8.total_kwh - 0.05).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_range_is_half_open_and_device_filter_applies() {
        let store = InMemoryUsageStore::with_samples(
            utc(),
            vec![
                sample(1, 0, Device::Oven, 1.0),
                Sample::new(
                    Utc.with_ymd_and_hms(2024, 11, 1, 0, 0, 0).unwrap(),
                    Device::Oven,
                    5.0,
                )
                .unwrap(),
                sample(3, 12, Device::Fridge, 2.0),
            ],
        );

        let rows = store
            .sum_grouped_by(&StoreQuery::total(october()).only(Device::Oven))
            .await
            .unwrap();

        assert_eq!(
            rows,
            vec![GroupedSum {
                bucket: None,
                device: None,
                total_kwh: 1.0
            }]
        );
    }

    #[tokio::test]
    async fn test_empty_range_returns_no_rows() {
        let store = InMemoryUsageStore::new(utc());
        let rows = store.sum_grouped_by(&StoreQuery::total(october())).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_insert_batch_appends() {
        let store = InMemoryUsageStore::new(utc());
        let inserted = store
            .insert_batch(&[sample(1, 1, Device::Fridge, 0.03), sample(1, 2, Device::Fridge, 0.03)])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.len().await, 2);
    }
}
