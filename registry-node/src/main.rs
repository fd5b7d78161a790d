mod config;
mod consensus;
mod http;
mod logging;

use actix_web::{web, App, HttpServer};
use clap::Parser;
use config::NodeConfig;
use registry_common::params::ModuleParams;
use registry_core::ledger::InMemoryLedger;
use registry_core::storage::Storage;
use registry_core::Chain;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = NodeConfig::parse();
    logging::init(&config.log_dir, config.log_level)?;

    log::info!("opening storage at {}", config.data_dir);
    let storage = Storage::open(&config.data_dir)?;
    let ledger = Arc::new(InMemoryLedger::new());
    let chain = Arc::new(Chain::new(storage, ModuleParams::default(), ledger));

    log::info!("serving query API on {}", config.rpc_bind_address);
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(chain.clone()))
            .configure(http::configure)
    })
    .bind(&config.rpc_bind_address)?
    .run()
    .await?;

    Ok(())
}
