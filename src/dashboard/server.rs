use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::config::DashboardConfig;
use crate::error::{Result, VectorboardError};
use crate::table::GridReport;

use super::router::build_router;

#[derive(Clone)]
pub(crate) struct AppState {
    pub report: Arc<GridReport>,
    pub started_at: Instant,
}

/// Serves a finished report over HTTP.
pub struct DashboardServer {
    addr: SocketAddr,
    report: Arc<GridReport>,
}

impl DashboardServer {
    #[must_use]
    pub fn new(report: GridReport, config: &DashboardConfig) -> Self {
        let bind = config.bind_host();
        let addr: SocketAddr = format!("{bind}:{}", config.port)
            .parse()
            .unwrap_or_else(|e| {
                tracing::warn!("invalid bind '{bind}': {e}, falling back to 127.0.0.1");
                SocketAddr::from(([127, 0, 0, 1], config.port))
            });

        if config.share {
            tracing::warn!("dashboard binding to {addr}, reachable from other hosts");
        }

        Self {
            addr,
            report: Arc::new(report),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> Result<()> {
        self.serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("failed to listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let state = AppState {
            report: self.report,
            started_at: Instant::now(),
        };
        let router = build_router(state);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| VectorboardError::Bind(self.addr.to_string(), e))?;
        let local = listener.local_addr().unwrap_or(self.addr);
        tracing::info!("dashboard running at http://{local}");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("dashboard shutting down");
            })
            .await
            .map_err(|e| VectorboardError::Dashboard(e.to_string()))?;

        Ok(())
    }
}
