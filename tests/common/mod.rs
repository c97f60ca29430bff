#![allow(dead_code)]

use axum_test::TestServer;
use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use energy_trends_api::{
    api::{create_router, AppState},
    models::{Device, Sample},
    repositories::InMemoryUsageStore,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;

pub const SAMPLE_INTERVAL_MINUTES: i64 = 15;

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

/// Household-like readings every 15 minutes in `[start, end)`.
///
/// The fridge always runs, the oven sometimes runs around lunch and dinner, lights run
/// in the morning and evening and the car charges overnight. The same seed always
/// yields the same samples.
pub fn generate_samples(start: DateTime<Utc>, end: DateTime<Utc>, seed: u64) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::new();
    let mut current = start;

    while current < end {
        let hour = current.hour();

        samples.push(sample(current, Device::Fridge, rng.gen_range(0.025..0.045)));

        let cooking = (12..14).contains(&hour) || (18..20).contains(&hour);
        if rng.gen_bool(0.5) && cooking {
            samples.push(sample(current, Device::Oven, rng.gen_range(2.5..3.5) / 4.0));
        }

        if (15..24).contains(&hour) || (6..=9).contains(&hour) {
            samples.push(sample(current, Device::Lights, rng.gen_range(0.01..0.05)));
        }

        if hour >= 22 || hour < 2 {
            samples.push(sample(
                current,
                Device::EvCharger,
                rng.gen_range(3.5..4.5) / 16.0,
            ));
        }

        current += Duration::minutes(SAMPLE_INTERVAL_MINUTES);
    }

    samples
}

pub fn sample(timestamp: DateTime<Utc>, device: Device, usage_kwh: f64) -> Sample {
    Sample::new(timestamp, device, usage_kwh).unwrap()
}

pub fn memory_store(samples: Vec<Sample>) -> Arc<InMemoryUsageStore> {
    Arc::new(InMemoryUsageStore::with_samples(utc(), samples))
}

pub fn test_server(store: Arc<InMemoryUsageStore>) -> TestServer {
    let app = create_router(AppState::new(store, utc()));
    TestServer::new(app).unwrap()
}
