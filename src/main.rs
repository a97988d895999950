use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use phenoscope::server;
use phenoscope::store::{DataPaths, DatasetStore};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // All three tables load once, up front; any failure aborts startup.
    let paths = DataPaths::default();
    let store = match DatasetStore::load(&paths) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            error!("failed to load dataset: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        patients = store.len(),
        features = store.feature_names().len(),
        "dataset loaded"
    );

    let app = server::router(store);
    let addr = SocketAddr::from(([127, 0, 0, 1], 8050));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            return ExitCode::FAILURE;
        }
    };
    info!("serving dashboard on http://{addr}");
    if let Err(err) = axum::serve(listener, app).await {
        error!("server error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
