//! Service descriptor, the identity this process registers under.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Placeholder in the monitor template replaced by the service address.
pub const ADDRESS_PLACEHOLDER: &str = "{address}";
/// Placeholder in the monitor template replaced by the service port.
pub const PORT_PLACEHOLDER: &str = "{port}";

/// A service to be registered with discovery.
///
/// Built once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    pub ip_address: String,
    /// Wider than a `u16` so out-of-range configuration can be rejected.
    pub port: u32,
    /// Template for the health-check URL, e.g. `http://{address}:{port}/monitor`.
    pub monitor_spec: String,
}

impl Service {
    /// The registration key, `{name}-{id}`.
    pub fn name_id(&self) -> String {
        format!("{}-{}", self.name, self.id)
    }

    /// Health-check URL with address and port substituted.
    pub fn monitor_url(&self) -> String {
        self.monitor_spec
            .replace(ADDRESS_PLACEHOLDER, &self.ip_address)
            .replace(PORT_PLACEHOLDER, &self.port.to_string())
    }

    /// Check every field, reporting all violations together.
    pub fn validate(&self) -> ServiceResult<()> {
        let mut errs = Vec::new();

        if self.id.is_empty() {
            errs.push("Id must not be blank".to_string());
        }

        if self.name.is_empty() {
            errs.push("Name must not be blank".to_string());
        }

        if self.ip_address.parse::<IpAddr>().is_err() {
            errs.push("IpAddress failed to parse".to_string());
        }

        if !(1..=65535).contains(&self.port) {
            errs.push("Port must be between 1 and 65535".to_string());
        }

        if self.monitor_spec.is_empty() {
            errs.push("MonitorSpec must not be blank".to_string());
        }

        if errs.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Invalid(errs))
        }
    }
}
