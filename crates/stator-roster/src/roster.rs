//! Periodic registration with a discovery backend.
//!
//! `start` validates the service, registers once, then spawns a worker that
//! re-registers on every interval tick until the context is cancelled, at
//! which point it deregisters and exits. Failures are logged and the loop
//! carries on: there is no backoff and no retry limit.

use std::net::{IpAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stator_core::{Context, Service, random_id};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{Instrument, error, info, warn};

use crate::client::BoxFuture;
use crate::error::RegistrarError;

/// Value of `ip_address` that asks for the outbound address to be looked up.
pub const LOOKUP_IP: &str = "lookup";

/// Registers and deregisters a service with a discovery backend.
pub trait Registrar: Send + Sync {
    fn register<'a>(
        &'a self,
        ctx: &'a Context,
        svc: &'a Service,
    ) -> BoxFuture<'a, Result<(), RegistrarError>>;

    fn unregister<'a>(
        &'a self,
        ctx: &'a Context,
        svc: &'a Service,
    ) -> BoxFuture<'a, Result<(), RegistrarError>>;
}

/// Where a roster is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterState {
    /// Not started, or finished after deregistering.
    Stopped,
    /// Initial registration attempted; worker looping.
    Registered,
    /// Shutdown observed; deregistration in flight.
    Unregistering,
    /// Refused to start; nothing was registered.
    Aborted,
}

/// Configuration of the service to be registered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub id: String,
    pub name: String,
    pub tags: Vec<String>,
    /// Health-check URL template with `{address}` and `{port}` placeholders.
    pub monitor_spec: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            tags: Vec::new(),
            monitor_spec: "http://{address}:{port}/monitor".to_string(),
        }
    }
}

/// Roster configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RosterConfig {
    /// Re-register period.
    #[serde(with = "stator_core::duration::serde")]
    pub interval: Duration,
    /// Address to advertise, or "lookup" to use the outbound interface.
    pub ip_address: String,
    pub service: ServiceConfig,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15 * 60),
            ip_address: LOOKUP_IP.to_string(),
            service: ServiceConfig::default(),
        }
    }
}

/// Repeatedly registers a service and deregisters it when stopped.
pub struct Roster {
    worker: Worker,
    interval: Duration,
}

/// State shared between `start` and the background task.
#[derive(Clone)]
struct Worker {
    registrar: Arc<dyn Registrar>,
    service: Arc<Service>,
    state: Arc<watch::Sender<RosterState>>,
}

impl Roster {
    pub fn new(service: Service, interval: Duration, registrar: Arc<dyn Registrar>) -> Self {
        let (state, _) = watch::channel(RosterState::Stopped);
        Self {
            worker: Worker {
                registrar,
                service: Arc::new(service),
                state: Arc::new(state),
            },
            interval,
        }
    }

    /// Build a roster from config and the port the server is bound to.
    pub fn from_config(cfg: &RosterConfig, port: u16, registrar: Arc<dyn Registrar>) -> Self {
        let ip_address = if cfg.ip_address == LOOKUP_IP {
            match lookup_ip() {
                Some(ip) => ip.to_string(),
                None => {
                    warn!("unable to determine external ip");
                    cfg.ip_address.clone()
                }
            }
        } else {
            cfg.ip_address.clone()
        };

        let service = Service {
            id: cfg.service.id.clone(),
            name: cfg.service.name.clone(),
            tags: cfg.service.tags.clone(),
            ip_address,
            port: u32::from(port),
            monitor_spec: cfg.service.monitor_spec.clone(),
        };

        Self::new(service, cfg.interval, registrar)
    }

    pub fn service(&self) -> &Service {
        &self.worker.service
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> RosterState {
        *self.worker.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<RosterState> {
        self.worker.state.subscribe()
    }

    /// Validate, register once, and spawn the re-register worker.
    ///
    /// Returns `None` without registering if the service is invalid. The
    /// returned handle completes after deregistration, once `ctx` is
    /// cancelled; await it before exiting.
    pub async fn start(&self, ctx: &Context) -> Option<JoinHandle<()>> {
        if let Err(e) = self.worker.service.validate() {
            error!(ctx = %ctx, error = %e, "worker abort");
            self.worker.state.send_replace(RosterState::Aborted);
            return None;
        }
        if self.interval.is_zero() {
            error!(ctx = %ctx, error = "reregister interval must be positive", "worker abort");
            self.worker.state.send_replace(RosterState::Aborted);
            return None;
        }

        let ctx = ctx.with_fields([("worker_id", random_id(7))]);
        info!(ctx = %ctx, name = "roster", "worker starting");

        self.worker.register(&ctx).await;
        self.worker.state.send_replace(RosterState::Registered);

        let worker = self.worker.clone();
        let interval = self.interval;
        let span = ctx.span();
        Some(tokio::spawn(
            async move {
                worker.work(ctx, interval).await;
            }
            .instrument(span),
        ))
    }
}

impl Worker {
    async fn work(self, ctx: Context, interval: Duration) {
        // Open loop: keep registering regardless of outcome.
        let mut tick = tokio::time::interval_at(Instant::now() + interval, interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.register(&ctx).await;
                }
                _ = ctx.cancelled() => {
                    self.state.send_replace(RosterState::Unregistering);
                    info!(ctx = %ctx, "worker shutting down");
                    self.unregister(&ctx.without_cancel()).await;
                    info!(ctx = %ctx, "worker stopped");
                    self.state.send_replace(RosterState::Stopped);
                    return;
                }
            }
        }
    }

    async fn register(&self, ctx: &Context) {
        if let Err(e) = self.registrar.register(ctx, &self.service).await {
            error!(ctx = %ctx, error = %e, "failed to register");
        }
    }

    async fn unregister(&self, ctx: &Context) {
        if let Err(e) = self.registrar.unregister(ctx, &self.service).await {
            error!(ctx = %ctx, error = %e, "failed to unregister");
        }
    }
}

/// Local address of the interface used for outbound traffic.
///
/// Connecting a UDP socket sends nothing; it only selects a route.
pub fn lookup_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use stator_core::testing::LogCapture;
    use tracing::Level;

    use super::*;
    use crate::error::ClientError;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Register,
        Unregister,
    }

    /// A registrar call as seen by the mock.
    #[derive(Debug, Clone)]
    struct Call {
        op: Op,
        fields: Vec<(String, String)>,
        cancellable: bool,
        service: Service,
    }

    #[derive(Default)]
    struct MockRegistrar {
        calls: Mutex<Vec<Call>>,
        fail: bool,
    }

    impl MockRegistrar {
        fn calls(&self, op: Op) -> Vec<Call> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.op == op)
                .cloned()
                .collect()
        }

        fn record(&self, op: Op, ctx: &Context, svc: &Service) -> Result<(), RegistrarError> {
            self.calls.lock().unwrap().push(Call {
                op,
                fields: ctx.fields().to_vec(),
                cancellable: ctx.is_cancellable(),
                service: svc.clone(),
            });
            if self.fail {
                Err(ClientError::Status {
                    status: 500,
                    body: "error from reg".to_string(),
                }
                .into())
            } else {
                Ok(())
            }
        }
    }

    impl Registrar for MockRegistrar {
        fn register<'a>(
            &'a self,
            ctx: &'a Context,
            svc: &'a Service,
        ) -> BoxFuture<'a, Result<(), RegistrarError>> {
            Box::pin(async move { self.record(Op::Register, ctx, svc) })
        }

        fn unregister<'a>(
            &'a self,
            ctx: &'a Context,
            svc: &'a Service,
        ) -> BoxFuture<'a, Result<(), RegistrarError>> {
            Box::pin(async move { self.record(Op::Unregister, ctx, svc) })
        }
    }

    const INTERVAL: Duration = Duration::from_millis(100);

    fn test_service() -> Service {
        Service {
            id: "123".to_string(),
            name: "bargla".to_string(),
            tags: vec!["one".to_string(), "two".to_string()],
            ip_address: "1.2.3.4".to_string(),
            port: 8082,
            monitor_spec: "http://{address}:{port}/monitor".to_string(),
        }
    }

    fn test_roster(fail: bool) -> (Roster, Arc<MockRegistrar>) {
        let registrar = Arc::new(MockRegistrar {
            fail,
            ..Default::default()
        });
        let roster = Roster::new(test_service(), INTERVAL, registrar.clone());
        (roster, registrar)
    }

    fn test_ctx() -> (Context, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let ctx = Context::background()
            .with_fields([("app_id", "stator"), ("run_id", "abc1234")])
            .with_shutdown(rx);
        (ctx, tx)
    }

    #[test]
    fn from_config_uses_bound_port() {
        let cfg = RosterConfig {
            interval: Duration::from_secs(15 * 60),
            ip_address: "1.2.3.4".to_string(),
            service: ServiceConfig {
                id: "123".to_string(),
                name: "bargla".to_string(),
                tags: vec!["one".to_string(), "two".to_string()],
                ..Default::default()
            },
        };

        let roster = Roster::from_config(&cfg, 8082, Arc::new(MockRegistrar::default()));
        assert_eq!(roster.service(), &test_service());
        assert_eq!(roster.interval(), Duration::from_secs(900));
        assert_eq!(roster.state(), RosterState::Stopped);
    }

    #[test]
    fn config_defaults() {
        let cfg: RosterConfig = toml::from_str(
            r#"
[service]
id = "123"
name = "bargla"
"#,
        )
        .unwrap();
        assert_eq!(cfg.interval, Duration::from_secs(900));
        assert_eq!(cfg.ip_address, "lookup");
        assert_eq!(cfg.service.monitor_spec, "http://{address}:{port}/monitor");
    }

    #[tokio::test(start_paused = true)]
    async fn registers_before_start_returns() {
        let (roster, registrar) = test_roster(false);
        let (ctx, tx) = test_ctx();

        let handle = roster.start(&ctx).await.expect("valid service starts");

        let registers = registrar.calls(Op::Register);
        assert_eq!(registers.len(), 1);
        assert_eq!(registers[0].service, test_service());
        assert!(registers[0].cancellable);
        assert_eq!(roster.state(), RosterState::Registered);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn reregisters_each_tick_and_unregisters_on_cancel() {
        let logs = LogCapture::new();
        let _guard = logs.install();
        let (roster, registrar) = test_roster(false);
        let (ctx, tx) = test_ctx();

        let handle = roster.start(&ctx).await.unwrap();

        // Three ticks elapse.
        tokio::time::sleep(INTERVAL * 3 + INTERVAL / 2).await;
        assert_eq!(registrar.calls(Op::Register).len(), 4);
        assert!(registrar.calls(Op::Unregister).is_empty());

        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(registrar.calls(Op::Register).len(), 4);
        let unregisters = registrar.calls(Op::Unregister);
        assert_eq!(unregisters.len(), 1);
        assert_eq!(unregisters[0].service, test_service());

        // Cancellation stripped, correlation fields kept.
        assert!(!unregisters[0].cancellable);
        let registers = registrar.calls(Op::Register);
        assert_eq!(unregisters[0].fields, registers[0].fields);
        assert_eq!(&unregisters[0].fields[..2], ctx.fields());
        assert_eq!(unregisters[0].fields[2].0, "worker_id");

        assert_eq!(
            logs.at(Level::INFO)
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>(),
            ["worker starting", "worker shutting down", "worker stopped"]
        );
        assert!(logs.at(Level::ERROR).is_empty());
        assert_eq!(roster.state(), RosterState::Stopped);

        // Worker task events run inside the context span.
        let infos = logs.at(Level::INFO);
        assert!(infos[0].spans.is_empty());
        assert_eq!(infos[1].spans, ["ctx"]);
        assert_eq!(infos[2].spans, ["ctx"]);
    }

    #[tokio::test(start_paused = true)]
    async fn logs_errors_and_keeps_trying() {
        let logs = LogCapture::new();
        let _guard = logs.install();
        let (roster, registrar) = test_roster(true);
        let (ctx, tx) = test_ctx();

        let handle = roster.start(&ctx).await.unwrap();
        assert_eq!(logs.count("failed to register"), 1);

        tokio::time::sleep(INTERVAL * 2 + INTERVAL / 2).await;
        assert_eq!(registrar.calls(Op::Register).len(), 3);
        assert_eq!(logs.count("failed to register"), 3);

        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(registrar.calls(Op::Unregister).len(), 1);
        assert_eq!(logs.count("failed to unregister"), 1);
        assert_eq!(logs.count("worker stopped"), 1);

        let errors = logs.at(Level::ERROR);
        assert_eq!(errors.len(), 4);
        assert_eq!(errors[0].field("error"), Some("unexpected status 500: error from reg"));
        assert!(errors[0].field("ctx").unwrap().contains("run_id=abc1234"));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_service_aborts_without_registering() {
        let logs = LogCapture::new();
        let _guard = logs.install();
        let registrar = Arc::new(MockRegistrar::default());
        let mut svc = test_service();
        svc.ip_address = String::new();
        let roster = Roster::new(svc, INTERVAL, registrar.clone());
        let (ctx, _tx) = test_ctx();

        assert!(roster.start(&ctx).await.is_none());

        let errors = logs.at(Level::ERROR);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "worker abort");
        assert_eq!(
            errors[0].field("error"),
            Some("invalid Service: IpAddress failed to parse")
        );
        assert!(registrar.calls(Op::Register).is_empty());
        assert_eq!(roster.state(), RosterState::Aborted);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_aborts() {
        let registrar = Arc::new(MockRegistrar::default());
        let roster = Roster::new(test_service(), Duration::ZERO, registrar.clone());

        assert!(roster.start(&Context::background()).await.is_none());
        assert!(registrar.calls(Op::Register).is_empty());
        assert_eq!(roster.state(), RosterState::Aborted);
    }

    #[tokio::test(start_paused = true)]
    async fn state_transitions_are_observable() {
        let (roster, _registrar) = test_roster(false);
        let (ctx, tx) = test_ctx();
        let mut states = roster.subscribe();

        let handle = roster.start(&ctx).await.unwrap();
        assert_eq!(*states.borrow_and_update(), RosterState::Registered);

        tx.send(true).unwrap();
        handle.await.unwrap();
        assert_eq!(*states.borrow_and_update(), RosterState::Stopped);
    }
}
