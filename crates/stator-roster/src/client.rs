//! HTTP transport for JSON requests to the discovery agent.
//!
//! One HTTP/1.1 connection per request, driven by hyper over a tokio
//! `TcpStream`. Requests race the caller's context, so a cancelled context
//! aborts the call.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST, USER_AGENT};
use http::Method;
use http_body_util::{BodyExt, Full};
use stator_core::Context;
use tracing::debug;

use crate::error::ClientError;

/// Boxed future returned by the transport and registrar traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Sends an optional JSON body with the given method and path.
pub trait Client: Send + Sync {
    fn send_object<'a>(
        &'a self,
        ctx: &'a Context,
        method: Method,
        path: &'a str,
        body: Option<serde_json::Value>,
    ) -> BoxFuture<'a, Result<(), ClientError>>;
}

/// Client for a single agent address (`host:port`).
#[derive(Debug, Clone)]
pub struct HttpClient {
    address: String,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(), ClientError> {
        let has_body = body.is_some();
        let payload = match body {
            Some(value) => serde_json::to_vec(&value)?,
            None => Vec::new(),
        };

        let stream = tokio::net::TcpStream::connect(&self.address)
            .await
            .map_err(|source| ClientError::Connect {
                address: self.address.clone(),
                source,
            })?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        // Origin-form target; the authority travels in the Host header.
        let mut builder = http::Request::builder()
            .method(method.clone())
            .uri(path)
            .header(HOST, &self.address)
            .header(USER_AGENT, "stator/0.1");
        if has_body {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        let req = builder.body(Full::new(Bytes::from(payload)))?;

        let resp = sender.send_request(req).await?;
        let status = resp.status();
        debug!(%method, address = %self.address, path, status = status.as_u16(), "request sent");

        if !status.is_success() {
            let body = resp
                .into_body()
                .collect()
                .await
                .map(|b| b.to_bytes())
                .unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(())
    }
}

impl Client for HttpClient {
    fn send_object<'a>(
        &'a self,
        ctx: &'a Context,
        method: Method,
        path: &'a str,
        body: Option<serde_json::Value>,
    ) -> BoxFuture<'a, Result<(), ClientError>> {
        Box::pin(async move {
            if ctx.is_cancelled() {
                return Err(ClientError::Cancelled);
            }

            tokio::select! {
                res = tokio::time::timeout(self.timeout, self.send(method, path, body)) => {
                    res.unwrap_or(Err(ClientError::Timeout(self.timeout)))
                }
                _ = ctx.cancelled() => Err(ClientError::Cancelled),
            }
        })
    }
}
