pub mod api;
pub mod bucketing;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};
