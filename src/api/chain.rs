use actix_web::{HttpResponse, Responder, get, post, web};
use log::{error, info, warn};

use super::models::{AppState, MessageResponse, MineResponse, ResolveResponse};
use crate::error::MineError;
use crate::node::BlockReceipt;
use crate::sync::BlockEnvelope;

/// Full chain as a JSON array of blocks (also served to peers).
#[get("/chain")]
pub async fn get_chain(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.node.chain())
}

/// Mine the open pool into a new block. The proof search and the broadcast
/// run on the blocking pool.
#[post("/mine")]
pub async fn mine_block(state: web::Data<AppState>) -> impl Responder {
    let worker = state.clone();
    let mined = match web::block(move || worker.node.mine()).await {
        Ok(mined) => mined,
        Err(err) => {
            error!("POST /mine - worker failed: {err}");
            return HttpResponse::InternalServerError()
                .json(MessageResponse::new("Adding a block failed."));
        }
    };

    match mined {
        Ok(block) => {
            let funds = state
                .node
                .public_key()
                .map(|pk| state.node.balance(&pk))
                .unwrap_or_default();
            info!("POST /mine - block #{} added", block.index);
            HttpResponse::Created().json(MineResponse {
                message: "Block added successfully.".into(),
                block,
                funds,
            })
        }
        Err(MineError::ConflictsPending) => {
            HttpResponse::Conflict().json(MessageResponse::new("Resolve conflicts first, block not added!"))
        }
        Err(MineError::NoIdentity) => {
            HttpResponse::BadRequest().json(MessageResponse::new("No wallet set up."))
        }
        Err(err) => {
            warn!("POST /mine - {err}");
            HttpResponse::InternalServerError()
                .json(MessageResponse::new(format!("Adding a block failed: {err}")))
        }
    }
}

/// Fetch peer chains and adopt the longest valid one.
#[post("/resolve-conflicts")]
pub async fn resolve_conflicts(state: web::Data<AppState>) -> impl Responder {
    let worker = state.clone();
    match web::block(move || worker.node.resolve()).await {
        Ok(replaced) => {
            let message = if replaced {
                "Chain was replaced!"
            } else {
                "Local chain kept!"
            };
            HttpResponse::Ok().json(ResolveResponse {
                message: message.into(),
                replaced,
            })
        }
        Err(err) => {
            error!("POST /resolve-conflicts - worker failed: {err}");
            HttpResponse::InternalServerError().json(MessageResponse::new("Resolving failed."))
        }
    }
}

/// Peer endpoint: a block mined elsewhere.
#[post("/broadcast-block")]
pub async fn broadcast_block(
    state: web::Data<AppState>,
    body: web::Json<BlockEnvelope>,
) -> impl Responder {
    let block = body.into_inner().block;
    let index = block.index;
    match state.node.receive_block(block) {
        BlockReceipt::Added => {
            info!("POST /broadcast-block - block #{index} added");
            HttpResponse::Created().json(MessageResponse::new("Block added"))
        }
        BlockReceipt::Invalid(err) => {
            warn!("POST /broadcast-block - block #{index} rejected: {err}");
            HttpResponse::Conflict().json(MessageResponse::new("Block seems invalid."))
        }
        BlockReceipt::Ahead => HttpResponse::Ok().json(MessageResponse::new(
            "Blockchain seems to differ from local blockchain.",
        )),
        BlockReceipt::Behind => HttpResponse::Conflict().json(MessageResponse::new(
            "Blockchain seems to be shorter, block not added",
        )),
    }
}
