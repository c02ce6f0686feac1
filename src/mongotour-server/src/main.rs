use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use mongotour_core::config::{Config, VCAP_SERVICES};
use mongotour_core::MongoConnector;
use mongotour_server::{api, telemetry};

#[actix_web::main]
async fn main() -> Result<()> {
    let _guard = telemetry::init_telemetry(Path::new("./logs"))?;

    // Load configuration
    let mut config = Config::load("config.json").unwrap_or_else(|_| {
        tracing::warn!("Failed to load config.json, using defaults");
        Config::default()
    });
    config.apply_env(|key| std::env::var(key).ok())?;

    let vcap_services = std::env::var(VCAP_SERVICES).ok();

    tracing::info!("mongotour starting");
    tracing::info!("  Port: {}", config.port);
    tracing::info!("  Service: {} (ssl={})", config.service_name, config.use_ssl);
    tracing::info!("  Collection: {}", config.collection_name);
    tracing::info!("  Static dir: {}", config.static_dir);

    // Every request resolves the url again; this only reports a bad binding early
    match config.connection_url(vcap_services.as_deref()) {
        Ok(_) if !config.url.is_empty() => tracing::info!("  Using configured connection url"),
        Ok(_) => tracing::info!("  Using {} binding", VCAP_SERVICES),
        Err(e) => tracing::error!("Connection url unavailable: {}", e),
    }

    let templates = api::load_templates(&config).context("Failed to load templates")?;

    let app_state = web::Data::new(api::AppState {
        connector: Arc::new(MongoConnector::new(config.database.clone())),
        templates: Arc::new(templates),
        config: Arc::new(config.clone()),
        vcap_services,
    });

    let bind_addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(TracingLogger::default())
            .configure(api::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;

    tracing::info!("Server stopped");

    Ok(())
}
