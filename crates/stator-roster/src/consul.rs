//! Consul agent registrar.
//!
//! Registers the service with an HTTP health check pointing back at the
//! service's monitor URL, and deregisters it by name-id.

use std::time::Duration;

use http::Method;
use serde::{Deserialize, Serialize};
use stator_core::duration::format_duration;
use stator_core::{Context, Service};

use crate::client::{BoxFuture, Client};
use crate::error::RegistrarError;
use crate::roster::Registrar;

pub const REGISTER_PATH: &str = "/v1/agent/service/register";
pub const DEREGISTER_PATH: &str = "/v1/agent/service/deregister";

/// Consul configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConsulConfig {
    /// Agent address, `host:port`.
    pub agent_address: String,
    /// Timeout for each request to the agent.
    #[serde(with = "stator_core::duration::serde")]
    pub request_timeout: Duration,
    /// Health check period.
    #[serde(with = "stator_core::duration::serde")]
    pub check_interval: Duration,
    /// Health check timeout.
    #[serde(with = "stator_core::duration::serde")]
    pub check_timeout: Duration,
    /// Deregister after the check has been critical this long.
    #[serde(with = "stator_core::duration::serde")]
    pub deregister_after: Duration,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            agent_address: "127.0.0.1:8500".to_string(),
            request_timeout: Duration::from_secs(10),
            check_interval: Duration::from_secs(60),
            check_timeout: Duration::from_secs(10),
            deregister_after: Duration::from_secs(30 * 60),
        }
    }
}

impl ConsulConfig {
    /// Build a registrar sending through `client`.
    pub fn build<C: Client>(&self, client: C) -> Consul<C> {
        Consul {
            client,
            check_interval: self.check_interval,
            check_timeout: self.check_timeout,
            deregister_after: self.deregister_after,
        }
    }
}

/// Registrar backed by a Consul agent.
#[derive(Debug)]
pub struct Consul<C> {
    client: C,
    check_interval: Duration,
    check_timeout: Duration,
    deregister_after: Duration,
}

impl<C: Client> Consul<C> {
    pub fn client(&self) -> &C {
        &self.client
    }

    fn registration<'a>(&self, svc: &'a Service) -> Registration<'a> {
        Registration {
            id: svc.name_id(),
            name: &svc.name,
            tags: &svc.tags,
            address: &svc.ip_address,
            port: svc.port,
            check: Check {
                http: svc.monitor_url(),
                interval: format_duration(self.check_interval),
                timeout: format_duration(self.check_timeout),
                deregister_critical_service_after: format_duration(self.deregister_after),
                status: "passing",
            },
        }
    }
}

impl<C: Client> Registrar for Consul<C> {
    fn register<'a>(
        &'a self,
        ctx: &'a Context,
        svc: &'a Service,
    ) -> BoxFuture<'a, Result<(), RegistrarError>> {
        Box::pin(async move {
            let body =
                serde_json::to_value(self.registration(svc)).map_err(RegistrarError::Encode)?;
            self.client
                .send_object(ctx, Method::PUT, REGISTER_PATH, Some(body))
                .await?;
            Ok(())
        })
    }

    fn unregister<'a>(
        &'a self,
        ctx: &'a Context,
        svc: &'a Service,
    ) -> BoxFuture<'a, Result<(), RegistrarError>> {
        Box::pin(async move {
            let path = format!("{DEREGISTER_PATH}/{}", svc.name_id());
            self.client
                .send_object(ctx, Method::PUT, &path, None)
                .await?;
            Ok(())
        })
    }
}

/// Agent service registration payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Registration<'a> {
    #[serde(rename = "ID")]
    id: String,
    name: &'a str,
    tags: &'a [String],
    address: &'a str,
    port: u32,
    check: Check,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Check {
    #[serde(rename = "HTTP")]
    http: String,
    interval: String,
    timeout: String,
    deregister_critical_service_after: String,
    status: &'static str,
}
