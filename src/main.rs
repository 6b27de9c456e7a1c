use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use redking_backend::config::ServerConfig;
use redking_backend::services::GameFlowService;
use redking_backend::ws::hub::ConnectionHub;
use redking_backend::ws::session;
use redking_backend::{health, telemetry};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env();
    let hub = Arc::new(ConnectionHub::new());
    let service = GameFlowService::new(hub.clone());

    tracing::info!(port = config.port, "starting Red King server");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(service.clone()))
            .app_data(web::Data::new(hub.clone()))
            .configure(health::configure)
            .route("/ws", web::get().to(session::upgrade))
    })
    .bind(("0.0.0.0", config.port))?
    .run()
    .await
}
