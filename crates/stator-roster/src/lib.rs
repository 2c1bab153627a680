//! stator-roster — keeps a service registered with a discovery agent.
//!
//! A [`Roster`] registers the service once at start, re-registers on a fixed
//! interval, and deregisters when its context is cancelled. The discovery
//! backend sits behind the [`Registrar`] trait; [`Consul`] implements it over
//! the [`Client`] transport.
//!
//! # Architecture
//!
//! ```text
//! Roster
//!   ├── start(): validate → register → spawn worker
//!   └── worker: select! { tick → register, cancelled → unregister }
//!         └── Registrar (Consul)
//!               └── Client (HttpClient, hyper http1)
//! ```
//!
//! Failures are logged and never stop the loop.

pub mod client;
pub mod consul;
pub mod error;
pub mod roster;

pub use client::{BoxFuture, Client, HttpClient};
pub use consul::{Consul, ConsulConfig};
pub use error::{ClientError, RegistrarError};
pub use roster::{Registrar, Roster, RosterConfig, RosterState, ServiceConfig, lookup_ip};
