//! Liveness endpoint.

use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn healthcheck() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(healthcheck));
}
