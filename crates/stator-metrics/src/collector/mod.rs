//! Measurement sources.
//!
//! Each collector produces one point group per call, stamped with the time
//! handed in by the caller. Collectors that keep state across calls must
//! synchronise it themselves.

pub mod diskusage;
pub mod process;
pub mod wave;

use chrono::{DateTime, Utc};
use stator_core::PointsAt;

use crate::error::CollectError;

pub use diskusage::DiskUsage;
pub use process::Process;
pub use wave::Wave;

pub trait Collector: Send + Sync {
    fn collect(&self, stamp: DateTime<Utc>) -> Result<PointsAt, CollectError>;
}
