// SPDX-License-Identifier: MIT OR Apache-2.0

//! `cfgserver` binary: loads settings, opens the backend and serves HTTP.

use cfgserver::domain::Result;
use cfgserver::settings::{Args, ServerSettings};
use cfgserver::{http, logging};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() {
    if let Err(e) = run(Args::parse()).await {
        eprintln!("cfgserver: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = ServerSettings::load(&args)?;
    logging::init(&settings.log_level);

    info!(backend = %settings.backend, label = %settings.default_label, "starting");

    let store = settings.open_store().await?;
    let server = Arc::new(settings.build_server(store)?);

    #[cfg(feature = "reload")]
    let _watcher = start_watcher(&settings, &server)?;

    http::serve(server, &settings.bind, shutdown_signal()).await
}

#[cfg(feature = "reload")]
fn start_watcher(
    settings: &ServerSettings,
    server: &Arc<cfgserver::service::ConfigServer>,
) -> Result<Option<cfgserver::adapters::FileWatcher>> {
    use cfgserver::adapters::FileWatcher;
    use cfgserver::ports::StoreWatcher;
    use cfgserver::settings::Backend;

    let Backend::File(root) = settings.backend()? else {
        return Ok(None);
    };
    if !settings.watch || server.cache().is_none() {
        return Ok(None);
    }

    let mut watcher = FileWatcher::new(&root, None)?;
    let server = Arc::clone(server);
    watcher.watch(Arc::new(move |path: String| {
        info!(%path, "repository changed, dropping cached documents");
        server.invalidate_all();
    }))?;
    Ok(Some(watcher))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
