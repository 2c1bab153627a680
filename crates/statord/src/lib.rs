//! statord — registers this process with Consul and serves its stats.
//!
//! # HTTP Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus exposition |
//! | GET | `/monitor` | Health-check target for the discovery agent |
//! | GET | `/config` | Loaded configuration |

pub mod config;
pub mod router;
pub mod shutdown;

pub use config::Config;
pub use router::{AppState, build_router};
pub use shutdown::drain;
