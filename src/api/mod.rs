mod balance;
mod chain;
mod health;
pub mod models;
mod nodes;
mod tx;
mod wallet;

use actix_web::web::ServiceConfig;

pub use models::AppState;

/// Routes live at the root: peers address each other as `http://host:port/<route>`.
pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(health::health_check)
        .service(chain::get_chain)
        .service(chain::mine_block)
        .service(chain::resolve_conflicts)
        .service(chain::broadcast_block)
        .service(tx::post_transaction)
        .service(tx::broadcast_transaction)
        .service(tx::get_open_transactions)
        .service(balance::get_own_balance)
        .service(balance::get_balance)
        .service(wallet::create_wallet)
        .service(wallet::load_wallet)
        .service(nodes::add_node)
        .service(nodes::remove_node)
        .service(nodes::get_nodes);
}
