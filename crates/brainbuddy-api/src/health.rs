use axum::Json;

use brainbuddy_types::api::{IndexResponse, PingResponse, StatusResponse};

pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        app: "BrainBuddy API",
        status: "ok",
    })
}

pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse { pong: true })
}
