mod api;
mod blockchain;
mod chain;
mod config;
mod error;
mod pipeline;
mod purger;
mod sighting;
mod stats;
mod store;
mod transaction;
mod watchdog;

use std::io;
use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::info;

use api::AppState;
use chain::RpcChainClient;
use config::{Config, StoreBackend};
use pipeline::Session;
use store::{BLOCKS_TREE, MemoryStore, SIGHTINGS_TREE, SharedStore, SledStore};

fn open_stores(config: &Config) -> io::Result<(SharedStore, SharedStore)> {
    match config.store_backend {
        StoreBackend::Memory => {
            let sightings: SharedStore = Arc::new(MemoryStore::new());
            let blocks: SharedStore = Arc::new(MemoryStore::new());
            Ok((sightings, blocks))
        }
        StoreBackend::Sled => {
            let db = store::sled_store::open_db(config.data_dir.join("gas.sled"))
                .map_err(io::Error::other)?;
            let sightings: SharedStore =
                Arc::new(SledStore::open_tree(&db, SIGHTINGS_TREE).map_err(io::Error::other)?);
            let blocks: SharedStore =
                Arc::new(SledStore::open_tree(&db, BLOCKS_TREE).map_err(io::Error::other)?);
            Ok((sightings, blocks))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = Config::from_env();
    info!("Starting... (upstream {})", config.rpc_url);

    std::fs::create_dir_all(&config.data_dir)?;
    let (sightings, blocks) = open_stores(&config)?;

    let chain = RpcChainClient::new(config.rpc_url.clone(), config.poll_interval)
        .map_err(io::Error::other)?;
    let session = Session::new(config.clone(), Arc::new(chain), sightings, blocks);
    let handle = session.start_with_upstream();

    let state = web::Data::new(AppState {
        latest: session.latest(),
        canary: session.canary(),
    });

    info!("Serving gas price stats at http://{}:{}", config.host, config.port);
    let result = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await;

    handle.stop();
    result
}
