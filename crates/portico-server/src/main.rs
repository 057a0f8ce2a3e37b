// Portico Server
//
// Main server binary for the portico remote database gateway.

use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;
use log::info;
use portico_engine::mem::MemEngine;
use portico_meta::MetaService;
use portico_server::config::ServerConfig;
use portico_server::{logging, routes};
use portico_session::{SessionConfig, SessionStore};

#[actix_web::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = match ServerConfig::from_file("config.toml") {
        Ok(cfg) => cfg,
        Err(_) => {
            eprintln!("Warning: config.toml not found, using defaults");
            ServerConfig::default()
        }
    };

    // Initialize logging
    logging::init_logging(
        &config.logging.level,
        &config.logging.file_path,
        config.logging.log_to_console,
    )?;

    info!("Starting portico gateway v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: host={}, port={}",
        config.server.host, config.server.port
    );

    // The in-memory reference engine backs the gateway out of the box; a
    // production deployment swaps in its own Engine implementation.
    let engine = Arc::new(MemEngine::new());
    info!("Engine initialized (portico-mem)");

    let store = Arc::new(SessionStore::new(SessionConfig {
        connection_capacity: config.session.connection_capacity,
        statement_capacity: config.session.statement_capacity,
        idle_ttl: config.idle_ttl(),
    }));
    store.start_sweeper(config.sweep_interval());
    info!(
        "Session store initialized (connections={}, statements={}, idle_ttl={}s)",
        config.session.connection_capacity,
        config.session.statement_capacity,
        config.session.idle_ttl_seconds
    );

    let advertised = config.advertised_address();
    let service = Arc::new(
        MetaService::new(engine, Arc::clone(&store), advertised.clone())
            .with_default_frame_size(config.session.default_frame_size),
    );
    info!("Meta service initialized, advertising {}", advertised);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting HTTP server on {}", bind_addr);
    info!("Endpoints: POST /, GET /health");

    let max_request_bytes = config.limits.max_request_bytes;
    let service_data = web::Data::new(service);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(service_data.clone())
            .app_data(web::PayloadConfig::new(max_request_bytes))
            .configure(routes::configure_routes)
    })
    .bind(&bind_addr)?
    .workers(if config.server.workers == 0 {
        num_cpus::get()
    } else {
        config.server.workers
    })
    .run()
    .await?;

    info!("Server shutdown complete");
    Ok(())
}
