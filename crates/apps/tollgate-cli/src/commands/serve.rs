//! Serve a paid resource.

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use tollgate_facilitator::HttpFacilitator;
use tollgate_guard::{router, ResourceGuard};

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, Render, ServeOutput};

type LoadFuture = Pin<Box<dyn Future<Output = io::Result<Bytes>> + Send>>;

/// Body served when no file is configured.
pub const SAMPLE_BODY: &[u8] = b"Payment received. This is the Tollgate sample resource.\n";

/// Execute the serve command.
///
/// Runs until Ctrl-C.
pub async fn serve(
    config: CliConfig,
    format: OutputFormat,
    listen: Option<String>,
    path: Option<String>,
    file: Option<PathBuf>,
) -> CliResult<String> {
    let listen = listen.unwrap_or_else(|| config.server.listen.clone());
    let path = path.unwrap_or_else(|| config.server.path.clone());
    if !path.starts_with('/') {
        return Err(CliError::config(format!("path must start with '/': {}", path)));
    }
    let file = file.or_else(|| config.server.file.clone());
    if let Some(file) = &file {
        if !file.is_file() {
            return Err(CliError::user(format!("File not found: {}", file.display())));
        }
    }

    let server_config = config.server_config()?;
    let facilitator = HttpFacilitator::new(&server_config.facilitator)?;
    let guard = Arc::new(ResourceGuard::try_new(server_config, facilitator)?);
    check_facilitator(&guard).await;

    let app = router(&path, Arc::clone(&guard), loader(file));
    let listener = TcpListener::bind(&listen).await?;
    let local = listener.local_addr()?;

    let banner = ServeOutput {
        listen: local.to_string(),
        path,
        network: guard.config().network.to_string(),
        price: guard.config().price.clone(),
        pay_to: guard.config().pay_to.clone(),
    };
    println!("{}", banner.render(format));
    info!(listen = %local, "Serving paid resource");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(match format {
        OutputFormat::Human => "Server stopped".to_string(),
        OutputFormat::Json => serde_json::json!({ "stopped": true }).to_string(),
    })
}

/// Loader reading the file on every paid request, so edits are served
/// without a restart.
fn loader(file: Option<PathBuf>) -> impl Fn() -> LoadFuture + Clone + Send + Sync + 'static {
    move || -> LoadFuture {
        let file = file.clone();
        Box::pin(async move {
            match file {
                Some(path) => tokio::fs::read(&path).await.map(Bytes::from),
                None => Ok(Bytes::from_static(SAMPLE_BODY)),
            }
        })
    }
}

/// Warn early if the facilitator does not settle on the configured network.
async fn check_facilitator(guard: &ResourceGuard<HttpFacilitator>) {
    let network = &guard.config().network;
    match guard.facilitator().supports_network(network).await {
        Ok(true) => debug!(network = %network, "Facilitator supports network"),
        Ok(false) => warn!(
            network = %network,
            facilitator = %guard.facilitator().base_url(),
            "Facilitator does not list this network; payments will fail verification"
        ),
        Err(e) => warn!(error = %e, "Could not query facilitator capabilities"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
