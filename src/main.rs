// src/main.rs
use actix_web::{App, HttpResponse, HttpServer, middleware, web};
use log::info;
use std::sync::Arc;

mod config;
mod errors;
mod handlers;
mod models;
mod navigation;
mod report;
mod services;

use crate::config::Config;
use crate::services::{ApiClient, FlowRegistry, PhotoValidator};

#[derive(Clone)]
pub struct AppState {
    flows: Arc<FlowRegistry>,
    photo_validator: Arc<PhotoValidator>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    info!("Starting AutoCheck service...");

    let config = Config::from_env()?;
    info!("Analysis backend at {}", config.api_url);

    let backend = Arc::new(ApiClient::new(&config.api_url, config.debug));
    let flows = Arc::new(FlowRegistry::new(backend, config.timings, config.flow_ttl));
    let photo_validator = Arc::new(PhotoValidator::new(config.max_photo_bytes));

    let app_state = AppState {
        flows,
        photo_validator,
    };

    info!("Starting HTTP server on {}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(middleware::Logger::default())
            .service(web::scope("/api/v1").configure(handlers::configure))
            .route("/health", web::get().to(health_check))
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;

    Ok(())
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "autocheck",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
