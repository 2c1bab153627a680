//! stator-core — shared types for the stator daemon.
//!
//! Holds the measurement model handed from collectors to formatters, the
//! service descriptor registered with discovery, the call context threaded
//! through every fallible operation, and the duration text form used on the
//! discovery wire.
//!
//! # Architecture
//!
//! ```text
//! entity    Value, Label, Point, PointsAt, Stats
//! service   Service (+ validate, name_id, monitor_url)
//! context   Context (correlation fields + shutdown signal)
//! duration  format_duration / parse_duration
//! ```

pub mod context;
pub mod duration;
pub mod entity;
pub mod error;
pub mod service;

#[cfg(feature = "test-util")]
pub mod testing;

pub use context::{Context, random_id};
pub use entity::*;
pub use error::{DurationError, ServiceError, ServiceResult};
pub use service::Service;
