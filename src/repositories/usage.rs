use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate};
use sqlx::{postgres::PgRow, FromRow, Postgres, QueryBuilder, Row};

use super::{GroupedSum, StoreQuery, UsageStore};
use crate::bucketing::{BucketExpr, BucketKey};
use crate::db::DbPool;
use crate::error::Result;
use crate::models::{Device, Sample};

// Stays well below the 65535 bind parameter limit at three columns per row.
const INSERT_CHUNK_SIZE: usize = 1000;

#[derive(Clone)]
pub struct PgUsageRepository {
    pool: DbPool,
    offset: FixedOffset,
}

#[derive(Debug)]
struct GroupedRow {
    bucket_hour: Option<i32>,
    bucket_date: Option<NaiveDate>,
    device: Option<Device>,
    total_kwh: f64,
}

impl<'r> FromRow<'r, PgRow> for GroupedRow {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        let device = row
            .try_get::<Option<String>, _>("device")?
            .map(|name| name.parse::<Device>())
            .transpose()
            .map_err(|e| sqlx::Error::Decode(e.to_string().into()))?;

        Ok(Self {
            bucket_hour: row.try_get("bucket_hour")?,
            bucket_date: row.try_get("bucket_date")?,
            device,
            total_kwh: row.try_get("total_kwh")?,
        })
    }
}

impl From<GroupedRow> for GroupedSum {
    fn from(row: GroupedRow) -> Self {
        let bucket = match (row.bucket_hour, row.bucket_date) {
            (Some(h), _) => u32::try_from(h).ok().map(BucketKey::Hour),
            (None, Some(d)) => Some(BucketKey::Day(d)),
            (None, None) => None,
        };

        GroupedSum {
            bucket,
            device: row.device,
            total_kwh: row.total_kwh,
        }
    }
}

impl PgUsageRepository {
    pub fn new(pool: DbPool, offset: FixedOffset) -> Self {
        Self { pool, offset }
    }

    /// Create the samples table and its indexes if they are missing.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS energy_usage (
                ts TIMESTAMPTZ NOT NULL,
                device TEXT NOT NULL
                    CHECK (device IN ('fridge', 'oven', 'lights', 'ev_charger')),
                usage_kwh DOUBLE PRECISION NOT NULL CHECK (usage_kwh >= 0)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS energy_usage_ts_idx ON energy_usage (ts)")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS energy_usage_device_ts_idx ON energy_usage (device, ts)",
        )
        .execute(&self.pool)
        .await?;

        // Only succeeds when TimescaleDB is installed
        if let Err(e) = sqlx::query(
            "SELECT create_hypertable('energy_usage', 'ts', if_not_exists => TRUE, migrate_data => TRUE)",
        )
        .execute(&self.pool)
        .await
        {
            tracing::debug!(error = %e, "energy_usage stays a plain table");
        }

        Ok(())
    }

    fn build_grouped_query(&self, query: &StoreQuery) -> QueryBuilder<'static, Postgres> {
        let offset_secs = f64::from(self.offset.local_minus_utc());
        let local_ts = |qb: &mut QueryBuilder<'static, Postgres>| {
            qb.push("((ts AT TIME ZONE 'UTC') + make_interval(secs => ");
            qb.push_bind(offset_secs);
            qb.push("))");
        };

        let mut qb = QueryBuilder::new("SELECT ");
        let mut group_by = Vec::new();

        match query.bucket {
            Some(BucketExpr::HourOfDay) => {
                qb.push("CAST(EXTRACT(HOUR FROM ");
                local_ts(&mut qb);
                qb.push(") AS INTEGER) AS bucket_hour, NULL::date AS bucket_date, ");
                group_by.push("bucket_hour");
            }
            Some(BucketExpr::Date) => {
                qb.push("NULL::integer AS bucket_hour, CAST(");
                local_ts(&mut qb);
                qb.push(" AS DATE) AS bucket_date, ");
                group_by.push("bucket_date");
            }
            None => {
                qb.push("NULL::integer AS bucket_hour, NULL::date AS bucket_date, ");
            }
        }

        if query.by_device {
            qb.push("device, ");
            group_by.push("device");
        } else {
            qb.push("NULL::text AS device, ");
        }

        qb.push("CAST(SUM(usage_kwh) AS DOUBLE PRECISION) AS total_kwh ");
        qb.push("FROM energy_usage WHERE ts >= ");
        qb.push_bind(query.range.start);
        qb.push(" AND ts < ");
        qb.push_bind(query.range.end);

        if let Some(device) = query.device {
            qb.push(" AND device = ");
            qb.push_bind(device.as_str());
        }

        if !group_by.is_empty() {
            qb.push(" GROUP BY ");
            qb.push(group_by.join(", "));
        }

        // An ungrouped SUM over zero rows would otherwise come back as a single NULL row
        qb.push(" HAVING COUNT(*) > 0");

        if !group_by.is_empty() {
            qb.push(" ORDER BY ");
            qb.push(group_by.join(", "));
        }

        qb
    }
}

#[async_trait]
impl UsageStore for PgUsageRepository {
    async fn sum_grouped_by(&self, query: &StoreQuery) -> Result<Vec<GroupedSum>> {
        let mut qb = self.build_grouped_query(query);
        let rows = qb
            .build_query_as::<GroupedRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(GroupedSum::from).collect())
    }

    async fn insert_batch(&self, samples: &[Sample]) -> Result<u64> {
        if samples.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in samples.chunks(INSERT_CHUNK_SIZE) {
            let mut qb: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO energy_usage (ts, device, usage_kwh) ");
            qb.push_values(chunk, |mut b, sample| {
                b.push_bind(sample.timestamp)
                    .push_bind(sample.device.as_str())
                    .push_bind(sample.usage_kwh);
            });
            inserted += qb.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }
}
