mod api;
mod blockchain;
mod config;
mod error;
mod node;
mod storage;
mod sync;
mod transaction;
mod wallet;

use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::{info, warn};
use std::io;
use std::sync::Arc;

use api::AppState;
use blockchain::Blockchain;
use config::NodeConfig;
use node::Node;
use storage::FileStorage;
use sync::HttpPeerClient;
use wallet::Wallet;

fn main() -> io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = NodeConfig::from_env();

    let mut wallet = Wallet::new(&config.data_dir, &config.node_id);
    if wallet.load_keys().is_err() {
        warn!("no wallet for node {}, create one via POST /wallet", config.node_id);
    }

    let storage = FileStorage::new(&config.data_dir, &config.node_id);
    info!("persisting state to {}", storage.path().display());
    let ledger = Blockchain::new(wallet.public_key.clone(), Box::new(storage));
    // The blocking client is built outside the async runtime.
    let peers = HttpPeerClient::new(config.peer_timeout).map_err(io::Error::other)?;
    let state = web::Data::new(AppState::new(Node::new(ledger, Arc::new(peers)), wallet));

    info!(
        "⛓️ Starting ledger node {} at http://{}:{}",
        config.node_id, config.host, config.port
    );

    actix_web::rt::System::new().block_on(serve(config, state.clone()))
}

async fn serve(config: NodeConfig, state: web::Data<AppState>) -> io::Result<()> {
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
