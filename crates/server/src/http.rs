//! HTTP server implementation using Axum

use axum::Router;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

/// Serves a router until its shutdown token is cancelled.
///
/// # Example
///
/// ```ignore
/// let server = HttpServer::new(ServerConfig::new("0.0.0.0", 8000), router);
/// let (handle, token) = server.spawn();
/// // ... later ...
/// token.cancel();
/// handle.await??;
/// ```
#[derive(Clone)]
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
    running: Arc<AtomicBool>,
    bound_addr: Arc<RwLock<Option<SocketAddr>>>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router,
            running: Arc::new(AtomicBool::new(false)),
            bound_addr: Arc::new(RwLock::new(None)),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Address actually bound, once listening
    pub fn address(&self) -> Option<SocketAddr> {
        *self.bound_addr.read()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn run(&self, shutdown_token: CancellationToken) -> Result<()> {
        let addr = self.config.bind_addr()?;

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::bind(addr.to_string(), e))?;

        let local_addr = listener.local_addr().map_err(ServerError::Io)?;
        *self.bound_addr.write() = Some(local_addr);

        info!(%local_addr, "HTTP server listening");
        self.running.store(true, Ordering::SeqCst);

        let result = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(async move {
                shutdown_token.cancelled().await;
                info!("HTTP server received shutdown signal");
            })
            .await;

        self.running.store(false, Ordering::SeqCst);
        *self.bound_addr.write() = None;

        match result {
            Ok(()) => {
                info!("HTTP server shutdown complete");
                Ok(())
            }
            Err(e) => {
                error!(%e, "HTTP server error");
                Err(ServerError::Io(e))
            }
        }
    }

    /// Run on a new task, returning its handle and the token that stops it.
    pub fn spawn(self) -> (tokio::task::JoinHandle<Result<()>>, CancellationToken) {
        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move { self.run(child).await });
        (handle, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use std::time::Duration;

    fn server() -> HttpServer {
        let router = Router::new().route("/", get(|| async { "ok" }));
        HttpServer::new(ServerConfig::new("127.0.0.1", 0), router)
    }

    #[tokio::test]
    async fn test_http_server_shutdown() {
        let server = server();
        let observer = server.clone();
        let (handle, token) = server.spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(observer.is_running());
        assert!(observer.address().is_some());

        token.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(result.is_ok(), "Server should shutdown within timeout");
        assert!(!observer.is_running());
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let server = HttpServer::new(
            ServerConfig::new("127.0.0.1", port),
            Router::new(),
        );
        let err = server.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ServerError::BindError { .. }));
    }
}
