//! HTTP listener.
//!
//! Accepts connections and serves them with the application until shutdown,
//! then drains in-flight connections.

use crate::config::ServerConfig;
use crate::http::App;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

/// HTTP server bound to a listening socket.
pub struct Server {
    /// TCP listener.
    listener: TcpListener,
    /// Application serving each request.
    app: App,
    /// How long to keep accepting, not ready, after shutdown begins.
    readiness_grace: Duration,
    /// How long to wait for open connections once accepting stops.
    shutdown_timeout: Duration,
}

impl Server {
    /// Bind the server to the configured address.
    pub async fn bind(config: &ServerConfig, app: App) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.listen_addr()).await?;

        info!(
            listen = %listener.local_addr()?,
            app = %app.state().app_name(),
            version = %app.state().version(),
            "server listening"
        );

        Ok(Self {
            listener,
            app,
            readiness_grace: config.readiness_grace,
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Address the server is actually bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown, then drain open connections.
    ///
    /// Shutdown first withdraws readiness and keeps accepting for the
    /// readiness grace period, so probes on new connections see the 503.
    #[instrument(skip_all)]
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let graceful = GracefulShutdown::new();

        self.accept_until(&graceful, shutdown.recv()).await;
        info!("server shutting down");

        self.app.state().mark_not_ready();
        if !self.readiness_grace.is_zero() {
            info!(
                grace_ms = self.readiness_grace.as_millis() as u64,
                "readiness withdrawn, still accepting"
            );
            self.accept_until(&graceful, tokio::time::sleep(self.readiness_grace))
                .await;
        }

        drop(self.listener);

        tokio::select! {
            _ = graceful.shutdown() => {
                info!("all connections closed");
            }
            _ = tokio::time::sleep(self.shutdown_timeout) => {
                warn!(
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "shutdown timeout elapsed with connections still open"
                );
            }
        }
    }

    /// Accept and serve connections until `stop` completes.
    async fn accept_until<F: Future>(&self, graceful: &GracefulShutdown, stop: F) {
        tokio::pin!(stop);

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => self.serve(stream, addr, graceful),
                        Err(e) => error!(error = %e, "failed to accept connection"),
                    }
                }

                _ = &mut stop => break,
            }
        }
    }

    /// Serve one connection on its own task.
    fn serve(&self, stream: TcpStream, client_addr: SocketAddr, graceful: &GracefulShutdown) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!(error = %e, "failed to set TCP_NODELAY on client connection");
        }

        let app = self.app.clone();
        let service = service_fn(move |req: Request<Incoming>| {
            let app = app.clone();
            async move { Ok::<_, Infallible>(app.handle(req, Some(client_addr)).await) }
        });

        let conn = http1::Builder::new()
            .timer(TokioTimer::new())
            .keep_alive(true)
            .serve_connection(TokioIo::new(stream), service);
        let conn = graceful.watch(conn);

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(client = %client_addr, error = %e, "connection error");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::metrics::AppMetrics;
    use crate::util::ShutdownSignal;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn start(
        readiness_grace: Duration,
    ) -> (SocketAddr, App, ShutdownSignal, tokio::task::JoinHandle<()>) {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".parse().unwrap();
        config.server.port = 0;
        config.server.readiness_grace = readiness_grace;
        config.server.shutdown_timeout = Duration::from_secs(1);

        let metrics = AppMetrics::new(&config.metrics).unwrap();
        let app = App::new(&config, metrics);

        let server = Server::bind(&config.server, app.clone()).await.unwrap();
        let addr = server.local_addr().unwrap();

        let shutdown = ShutdownSignal::new();
        let handle = tokio::spawn(server.run(shutdown.subscribe()));
        (addr, app, shutdown, handle)
    }

    async fn raw_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_server_serves_and_shuts_down() {
        let (addr, app, shutdown, handle) = start(Duration::ZERO).await;

        let response = raw_get(addr, "/health").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
        assert!(response.contains("\"status\":\"healthy\""));
        assert!(response.to_ascii_lowercase().contains("x-request-id: "));

        shutdown.shutdown();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(!app.state().is_ready());
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_not_ready_during_grace_period() {
        let (addr, app, shutdown, handle) = start(Duration::from_millis(500)).await;

        shutdown.shutdown();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!app.state().is_ready());

        let response = raw_get(addr, "/ready").await;
        assert!(response.starts_with("HTTP/1.1 503"), "{response}");
        assert!(response.contains("\"status\":\"not ready\""));

        let response = raw_get(addr, "/health").await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
