pub mod device;
pub mod insight;
pub mod sample;

pub use device::{Device, DeviceTotals};
pub use insight::Insight;
pub use sample::{RawSample, Sample};
