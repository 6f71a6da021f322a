use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, BalanceResponse, MessageResponse};

/// Balance of the local wallet's participant.
#[get("/balance")]
pub async fn get_own_balance(state: web::Data<AppState>) -> impl Responder {
    let Some(participant) = state.node.public_key() else {
        return HttpResponse::BadRequest().json(MessageResponse::new("No wallet set up."));
    };
    let funds = state.node.balance(&participant);
    HttpResponse::Ok().json(BalanceResponse { participant, funds })
}

#[get("/balance/{participant}")]
pub async fn get_balance(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let participant = path.into_inner().0;
    let funds = state.node.balance(&participant);
    HttpResponse::Ok().json(BalanceResponse { participant, funds })
}
