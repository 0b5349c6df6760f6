//! HTTP server with connection-level control.

use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceExt;
use tracing::{debug, info, warn};

use super::handlers::{router, AppState};
use crate::error::Result;

/// Path that simulates a network failure by severing the connection.
const DROP_PATH: &str = "/drop";

/// HTTP server for the simulated endpoints.
///
/// Connections are served manually instead of through `axum::serve` so that
/// `GET /drop` can abort a connection before any response bytes are written;
/// an axum handler always has to produce a response.
pub struct HttpServer {
    /// Bound listener
    listener: TcpListener,
    /// Shared handler state
    state: Arc<AppState>,
}

impl HttpServer {
    /// Bind the listener.
    pub async fn bind(addr: SocketAddr, state: Arc<AppState>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, state })
    }

    /// Address the server is listening on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the process is killed.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serve until the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send,
    {
        let app = router(Arc::clone(&self.state));

        info!(addr = %self.listener.local_addr()?, "Starting HTTP server");

        tokio::pin!(signal);

        loop {
            let (socket, remote_addr) = tokio::select! {
                _ = &mut signal => {
                    info!("Shutdown signal received, stopping HTTP server");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                },
            };

            let app = app.clone();
            tokio::spawn(async move {
                let service = service_fn(move |request: Request<Incoming>| {
                    let app = app.clone();
                    async move { route_or_drop(app, request).await }
                });

                let result = Builder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(socket), service)
                    .await;

                // Severed /drop connections surface as errors here, so
                // connection failures are routine and stay at debug level.
                if let Err(e) = result {
                    debug!(remote_addr = %remote_addr, error = %e, "Connection closed with error");
                }
            });
        }
    }
}

/// Forward a request to the router, or abort for the drop path.
///
/// Returning an error makes hyper tear the connection down without writing
/// a response, which is exactly what the drop path simulates.
async fn route_or_drop(
    app: Router,
    request: Request<Incoming>,
) -> std::result::Result<axum::response::Response, io::Error> {
    if request.method() == Method::GET && request.uri().path() == DROP_PATH {
        debug!("Dropping connection on request");
        return Err(io::Error::new(
            io::ErrorKind::ConnectionAborted,
            "simulated connection drop",
        ));
    }

    let request = request.map(Body::new);
    match app.oneshot(request).await {
        Ok(response) => Ok(response),
        Err(infallible) => match infallible {},
    }
}
