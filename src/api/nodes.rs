use actix_web::{HttpResponse, Responder, delete, get, post, web};
use log::info;

use super::models::{AppState, MessageResponse, NodeRequest, NodesResponse};

#[post("/node")]
pub async fn add_node(state: web::Data<AppState>, body: web::Json<NodeRequest>) -> impl Responder {
    let node = body.into_inner().node;
    let node = node.trim();
    if node.is_empty() {
        return HttpResponse::BadRequest().json(MessageResponse::new("No node data found."));
    }
    state.node.add_peer(node);
    info!("POST /node - added peer {node}");
    HttpResponse::Created().json(NodesResponse {
        message: "Node added successfully.".into(),
        all_nodes: state.node.peers(),
    })
}

#[delete("/node/{node_url}")]
pub async fn remove_node(state: web::Data<AppState>, path: web::Path<(String,)>) -> impl Responder {
    let node = path.into_inner().0;
    state.node.remove_peer(&node);
    info!("DELETE /node - removed peer {node}");
    HttpResponse::Ok().json(NodesResponse {
        message: "Node removed".into(),
        all_nodes: state.node.peers(),
    })
}

#[get("/nodes")]
pub async fn get_nodes(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(NodesResponse {
        message: "Known peer nodes".into(),
        all_nodes: state.node.peers(),
    })
}
