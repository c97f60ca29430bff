use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// The metered appliances. Samples for anything else are rejected at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    Fridge,
    Oven,
    Lights,
    #[serde(alias = "ev charger")]
    EvCharger,
}

impl Device {
    pub const COUNT: usize = 4;

    /// Declaration order, which is also the tie-break order for insights.
    pub const ALL: [Device; Device::COUNT] =
        [Device::Fridge, Device::Oven, Device::Lights, Device::EvCharger];

    /// Name stored in the `device` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Device::Fridge => "fridge",
            Device::Oven => "oven",
            Device::Lights => "lights",
            Device::EvCharger => "ev_charger",
        }
    }

    /// Human-facing name, also the JSON key in trend rows.
    pub fn label(self) -> &'static str {
        match self {
            Device::EvCharger => "ev charger",
            other => other.as_str(),
        }
    }

    fn index(self) -> usize {
        match self {
            Device::Fridge => 0,
            Device::Oven => 1,
            Device::Lights => 2,
            Device::EvCharger => 3,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fridge" => Ok(Device::Fridge),
            "oven" => Ok(Device::Oven),
            "lights" => Ok(Device::Lights),
            "ev_charger" | "ev charger" => Ok(Device::EvCharger),
            other => Err(AppError::Validation(format!("Unknown device: {:?}", other))),
        }
    }
}

/// Per-device kWh with a slot for every known device.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DeviceTotals([f64; Device::COUNT]);

impl DeviceTotals {
    pub fn get(&self, device: Device) -> f64 {
        self.0[device.index()]
    }

    pub fn set(&mut self, device: Device, kwh: f64) {
        self.0[device.index()] = kwh;
    }

    pub fn add(&mut self, device: Device, kwh: f64) {
        self.0[device.index()] += kwh;
    }

    pub fn accumulate(&mut self, other: &DeviceTotals) {
        for device in Device::ALL {
            self.add(device, other.get(device));
        }
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }
}
