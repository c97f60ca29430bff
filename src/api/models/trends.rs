use serde::Serialize;

use crate::models::{Device, DeviceTotals};
use crate::services::Aggregation;

/// Round for presentation. Never applied before accumulation.
pub fn round2(kwh: f64) -> f64 {
    (kwh * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceUsage {
    pub fridge: f64,
    pub oven: f64,
    pub lights: f64,
    #[serde(rename = "ev charger")]
    pub ev_charger: f64,
}

impl From<&DeviceTotals> for DeviceUsage {
    fn from(totals: &DeviceTotals) -> Self {
        Self {
            fridge: round2(totals.get(Device::Fridge)),
            oven: round2(totals.get(Device::Oven)),
            lights: round2(totals.get(Device::Lights)),
            ev_charger: round2(totals.get(Device::EvCharger)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub x: String,
    #[serde(flatten)]
    pub usage: DeviceUsage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResponse {
    pub total_usage_kwh: String,
    pub device_breakdown: DeviceUsage,
    pub data: Vec<TrendPoint>,
}

impl From<&Aggregation> for TrendResponse {
    fn from(agg: &Aggregation) -> Self {
        Self {
            total_usage_kwh: format!("{:.2}", agg.total_usage),
            device_breakdown: DeviceUsage::from(&agg.device_breakdown),
            data: agg
                .rows
                .iter()
                .map(|row| TrendPoint {
                    x: row.key.to_string(),
                    usage: DeviceUsage::from(&row.totals),
                })
                .collect(),
        }
    }
}
