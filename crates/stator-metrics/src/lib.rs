//! stator-metrics — on-demand metrics exposition.
//!
//! A [`StatsService`] runs its collectors against one shared timestamp, drops
//! any that fail, and renders the rest through a [`Formatter`]. Nothing is
//! stored between passes.
//!
//! # Architecture
//!
//! ```text
//! StatsService
//!   ├── collect() → Stats
//!   │     ├── DiskUsage ("du")
//!   │     ├── Process ("proc")
//!   │     └── Wave ("wave")
//!   └── format() → Prometheus text
//! ```

pub mod collector;
pub mod error;
pub mod formatter;
pub mod service;

pub use collector::{Collector, DiskUsage, Process, Wave};
pub use error::CollectError;
pub use formatter::{Formatter, Prometheus};
pub use service::StatsService;
