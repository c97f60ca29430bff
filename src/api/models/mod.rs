pub mod trends;

pub use trends::{DeviceUsage, TrendPoint, TrendResponse};
