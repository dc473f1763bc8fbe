#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Taiko L2 chain syncer: keeps a taiko-geth node in sync with the L1 protocol.

use clap::Parser;
use tracing::info;

use syncer_config::Opts;
use syncer_driver::Driver;
use syncer_primitives::shutdown::{ShutdownSignal, run_until_shutdown};

#[cfg(all(feature = "jemalloc", unix))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    if let Ok(custom_env_file) = std::env::var("ENV_FILE") {
        // Try from custom env file, and abort if it fails
        dotenvy::from_filename(custom_env_file)?;
    } else {
        // The default .env file is optional
        dotenvy::dotenv().ok();
    }

    let opts = Opts::parse();

    let log_provider = opts.telemetry.setup(&opts.instance_name)?;

    info!("🔄 Taiko L2 syncer starting...");

    let shutdown_signal = ShutdownSignal::new();
    let on_shutdown = || {
        info!("👋 Taiko L2 syncer shutting down...");
        log_provider.shutdown();
    };

    let run_driver = async {
        let driver = Driver::new(opts).await?;
        driver.start().await
    };

    run_until_shutdown::<_, (), eyre::Report>(run_driver, shutdown_signal, on_shutdown).await
}
