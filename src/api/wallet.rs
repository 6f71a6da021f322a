use actix_web::{HttpResponse, Responder, get, post, web};
use log::{error, info};

use super::models::{AppState, MessageResponse, WalletResponse};
use crate::wallet::Wallet;

fn wallet_response(state: &AppState, wallet: &Wallet) -> Option<WalletResponse> {
    let public_key = wallet.public_key.clone()?;
    let private_key = wallet.private_key.clone()?;
    let funds = state.node.balance(&public_key);
    Some(WalletResponse {
        public_key,
        private_key,
        funds,
    })
}

/// Generate and save a new key pair; it becomes the node's mining identity.
#[post("/wallet")]
pub async fn create_wallet(state: web::Data<AppState>) -> impl Responder {
    let mut wallet = state.wallet();
    wallet.create_keys();
    if let Err(err) = wallet.save_keys() {
        error!("POST /wallet - saving keys failed: {err}");
        return HttpResponse::InternalServerError()
            .json(MessageResponse::new("Saving the keys failed."));
    }
    state.node.set_identity(wallet.public_key.clone());
    info!("POST /wallet - new identity created");
    match wallet_response(&state, &wallet) {
        Some(resp) => HttpResponse::Created().json(resp),
        None => HttpResponse::InternalServerError().json(MessageResponse::new("Saving the keys failed.")),
    }
}

/// Load the saved key pair from disk.
#[get("/wallet")]
pub async fn load_wallet(state: web::Data<AppState>) -> impl Responder {
    let mut wallet = state.wallet();
    if let Err(err) = wallet.load_keys() {
        error!("GET /wallet - loading keys failed: {err}");
        return HttpResponse::InternalServerError()
            .json(MessageResponse::new("Loading the keys failed."));
    }
    state.node.set_identity(wallet.public_key.clone());
    match wallet_response(&state, &wallet) {
        Some(resp) => HttpResponse::Created().json(resp),
        None => HttpResponse::InternalServerError().json(MessageResponse::new("Loading the keys failed.")),
    }
}
