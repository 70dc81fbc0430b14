// Meter Readings - Web Server
// POST /api/meter-reading-uploads, GET /api/db-status, GET /api/health

use anyhow::{Context, Result};
use meter_readings::api::{router, AppState};
use meter_readings::config::{init_tracing, Settings};
use meter_readings::{seed_accounts, IngestOptions, SqliteStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(false);

    let settings = Settings::from_env()?;
    info!("Meter Readings server starting with {:?}", settings);

    // Open database and seed reference accounts on first start
    let mut store = SqliteStore::open(&settings.database_path)
        .with_context(|| format!("Failed to open database {:?}", settings.database_path))?;

    // The CSV is only read when the accounts table is empty
    seed_accounts(&mut store, &settings.accounts_csv)
        .context("Failed to seed accounts")?;

    let state = AppState::new(store, IngestOptions::new().with_ordering(settings.ordering));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&settings.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.listen_addr))?;

    info!("Server running on http://{}", settings.listen_addr);
    info!("Upload: POST http://{}/api/meter-reading-uploads", settings.listen_addr);

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
