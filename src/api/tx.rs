use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, error, info, warn};
use std::time::Instant;

use super::models::{AppState, MessageResponse, NewTxRequest, NewTxResponse};
use crate::transaction::Transaction;

/// Create, sign and submit a transaction from the local wallet.
#[post("/transaction")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<NewTxRequest>,
) -> impl Responder {
    let t0 = Instant::now();
    let NewTxRequest { recipient, amount } = body.into_inner();

    let (sender, signature) = {
        let wallet = state.wallet();
        let Some(sender) = wallet.public_key.clone() else {
            return HttpResponse::BadRequest().json(MessageResponse::new("No wallet set up."));
        };
        match wallet.sign_transaction(&recipient, amount) {
            Ok(signature) => (sender, signature),
            Err(err) => {
                error!("POST /transaction - signing failed: {err}");
                return HttpResponse::InternalServerError()
                    .json(MessageResponse::new("Signing the transaction failed."));
            }
        }
    };

    let worker = state.clone();
    let submitter = sender.clone();
    let submitted = web::block(move || {
        worker
            .node
            .submit_transaction(&submitter, &recipient, &signature, amount, false)
    })
    .await;

    match submitted {
        Ok(Ok(transaction)) => {
            info!("POST /transaction - OK ({} ms)", t0.elapsed().as_millis());
            HttpResponse::Created().json(NewTxResponse {
                message: "Successfully added transaction.".into(),
                transaction,
                funds: state.node.balance(&sender),
            })
        }
        Ok(Err(err)) => {
            warn!("POST /transaction - rejected: {err}");
            HttpResponse::InternalServerError()
                .json(MessageResponse::new(format!("Creating a transaction failed: {err}")))
        }
        Err(err) => {
            error!("POST /transaction - worker failed: {err}");
            HttpResponse::InternalServerError()
                .json(MessageResponse::new("Creating a transaction failed."))
        }
    }
}

/// Peer endpoint: a transaction admitted elsewhere. Never re-broadcast.
#[post("/broadcast-transaction")]
pub async fn broadcast_transaction(
    state: web::Data<AppState>,
    body: web::Json<Transaction>,
) -> impl Responder {
    let tx = body.into_inner();
    debug!(
        "POST /broadcast-transaction - {} -> {} ({})",
        tx.sender, tx.recipient, tx.amount
    );
    match state
        .node
        .submit_transaction(&tx.sender, &tx.recipient, &tx.signature, tx.amount, true)
    {
        Ok(_) => HttpResponse::Created().json(MessageResponse::new("Successfully added transaction.")),
        Err(err) => {
            warn!("POST /broadcast-transaction - declined: {err}");
            HttpResponse::InternalServerError()
                .json(MessageResponse::new("Creating a transaction failed."))
        }
    }
}

/// Open transaction pool.
#[get("/transactions")]
pub async fn get_open_transactions(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.node.open_transactions())
}
