//! Weather Data Stores
//!
//! Collections for the weather-sensor domain:
//! - Device registry keyed by device id
//! - Raw readings keyed by (device, timestamp) with daily aggregation
//! - Daily reports keyed by (device, date) with batch replay
//! - `Session` gating every data operation on the caller's privileges

mod collection;
mod device;
mod reading;
mod report;
mod session;

pub use device::{Device, DeviceRegistry, NewDevice};
pub use reading::{DailyAggregate, WeatherReading, WeatherStore};
pub use report::{DailyReport, DailyReportStore, ReplayOutcome, ReplayPolicy};
pub use session::Session;

use access_control::AccessError;
use storage::StorageError;
use thiserror::Error;

/// Store error types
#[derive(Error, Debug)]
pub enum StoreError {
    /// Uniqueness check failed; the message names the rejected key
    #[error("{0}")]
    DuplicateKey(String),

    /// NaN or infinite measurement, rejected before anything is written
    #[error("Non-finite {field} {value} rejected")]
    NonFinite { field: &'static str, value: f64 },

    #[error(transparent)]
    Access(#[from] AccessError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl StoreError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::DuplicateKey(_) | StoreError::Access(AccessError::DuplicateKey(_)))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StoreError::Access(e) if e.is_unauthorized())
    }
}
