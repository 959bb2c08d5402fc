//! Web dashboard for grid-search reports.
//!
//! Serves the info table, the query list, the results table and a timing
//! chart for a finished [`GridReport`](crate::table::GridReport).

pub mod render;
mod router;
mod server;

pub use server::DashboardServer;

use crate::config::DashboardConfig;
use crate::error::Result;
use crate::table::GridReport;

/// Serve `report` until Ctrl-C.
pub async fn serve(report: GridReport, config: &DashboardConfig) -> Result<()> {
    DashboardServer::new(report, config).serve().await
}
