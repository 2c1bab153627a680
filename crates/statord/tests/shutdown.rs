//! Teardown tests: the roster must deregister however the server stopped.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stator_core::{Context, Service};
use stator_roster::{BoxFuture, Registrar, RegistrarError, Roster};
use statord::drain;
use tokio::sync::watch;

/// Records the names of the calls it receives.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<&'static str>>,
}

impl Recorder {
    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

impl Registrar for Recorder {
    fn register<'a>(
        &'a self,
        _: &'a Context,
        _: &'a Service,
    ) -> BoxFuture<'a, Result<(), RegistrarError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push("register");
            Ok(())
        })
    }

    fn unregister<'a>(
        &'a self,
        _: &'a Context,
        _: &'a Service,
    ) -> BoxFuture<'a, Result<(), RegistrarError>> {
        Box::pin(async move {
            self.calls.lock().unwrap().push("unregister");
            Ok(())
        })
    }
}

fn service() -> Service {
    Service {
        id: "statord-1".to_string(),
        name: "statord".to_string(),
        tags: vec![],
        ip_address: "10.0.0.7".to_string(),
        port: 8087,
        monitor_spec: "http://{address}:{port}/monitor".to_string(),
    }
}

async fn started() -> (Arc<Recorder>, Context, watch::Sender<bool>, Option<tokio::task::JoinHandle<()>>) {
    let recorder = Arc::new(Recorder::default());
    let roster = Roster::new(service(), Duration::from_secs(60), recorder.clone());
    let (tx, rx) = watch::channel(false);
    let ctx = Context::background().with_shutdown(rx);
    let handle = roster.start(&ctx).await;
    assert!(handle.is_some());
    (recorder, ctx, tx, handle)
}

#[tokio::test]
async fn failed_server_still_unregisters() {
    let (recorder, ctx, tx, handle) = started().await;

    let served = Err(io::Error::new(io::ErrorKind::AddrInUse, "accept loop died"));
    let err = drain(&ctx, served, &tx, handle).await.unwrap_err();

    assert_eq!(err.to_string(), "accept loop died");
    assert_eq!(recorder.calls(), ["register", "unregister"]);
    assert!(*tx.borrow());
}

#[tokio::test]
async fn clean_stop_unregisters_once() {
    let (recorder, ctx, tx, handle) = started().await;
    // Already signalled by the graceful-shutdown future.
    tx.send_replace(true);

    drain(&ctx, Ok(()), &tx, handle).await.unwrap();

    assert_eq!(recorder.calls(), ["register", "unregister"]);
}

#[tokio::test]
async fn aborted_roster_has_nothing_to_wait_for() {
    let (tx, rx) = watch::channel(false);
    let ctx = Context::background().with_shutdown(rx);

    drain(&ctx, Ok(()), &tx, None).await.unwrap();
    assert!(*tx.borrow());
}
