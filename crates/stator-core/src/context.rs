//! Call context: correlation fields plus an optional shutdown signal.
//!
//! Every fallible call takes a `&Context` so that failures can be logged with
//! the caller's correlation fields, and so that outbound calls can be cut
//! short on shutdown. [`Context::without_cancel`] keeps the fields while
//! dropping the signal, for work that must finish after shutdown begins.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use tokio::sync::watch;
use tracing::Span;

/// A correlation field attached to a context.
pub type Field = (String, String);

#[derive(Debug, Clone, Default)]
pub struct Context {
    fields: Arc<Vec<Field>>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Context {
    /// No fields, never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// A child context with `kv` appended to the fields.
    pub fn with_fields<K, V>(&self, kv: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = self.fields.as_ref().clone();
        fields.extend(kv.into_iter().map(|(k, v)| (k.into(), v.into())));
        Self {
            fields: Arc::new(fields),
            shutdown: self.shutdown.clone(),
        }
    }

    /// Attach a shutdown signal; the context is cancelled once it reads `true`.
    pub fn with_shutdown(&self, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            fields: Arc::clone(&self.fields),
            shutdown: Some(shutdown),
        }
    }

    /// Same fields, shutdown signal stripped.
    pub fn without_cancel(&self) -> Self {
        Self {
            fields: Arc::clone(&self.fields),
            shutdown: None,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Value of the first field named `key`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_cancellable(&self) -> bool {
        self.shutdown.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        match &self.shutdown {
            Some(rx) => *rx.borrow() || rx.has_changed().is_err(),
            None => false,
        }
    }

    /// Resolves once shutdown is signalled or its sender is dropped.
    ///
    /// Pends forever on a context without a shutdown signal.
    pub async fn cancelled(&self) {
        match &self.shutdown {
            Some(rx) => {
                let mut rx = rx.clone();
                let _ = rx.wait_for(|stop| *stop).await;
            }
            None => std::future::pending().await,
        }
    }

    /// A span carrying the correlation fields.
    pub fn span(&self) -> Span {
        tracing::info_span!("ctx", fields = %self)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// A random alphanumeric identifier, used for run and worker ids.
pub fn random_id(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
