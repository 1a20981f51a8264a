use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::sync::Arc;

mod config;
mod controllers;
mod db;
mod models;

use config::Config;
use db::Database;

pub struct AppState {
    pub db: Arc<Database>,
    pub config: Config,
    /// Server start time for uptime calculation
    pub started_at: std::time::Instant,
}

impl AppState {
    pub fn new(db: Arc<Database>, config: Config) -> Self {
        Self {
            db,
            config,
            started_at: std::time::Instant::now(),
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("notekeep v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    let port = config.port;

    if let Err(e) = config::ensure_database_dir(&config.database_url) {
        log::error!("Failed to create database directory: {}", e);
        std::process::exit(1);
    }

    // The store cannot guarantee index consistency without its schema
    log::info!("Initializing database at {}", config.database_url);
    let db = match Database::with_config(&config.database_url, &config.pool) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            log::error!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    if config.verify_index_on_startup {
        log::info!("Verifying search index");
        if let Err(e) = db.check_search_index() {
            log::warn!("Search index check failed ({}), rebuilding", e);
            if let Err(e) = db.rebuild_search_index() {
                log::error!("Failed to rebuild search index: {}", e);
                std::process::exit(1);
            }
        }
    }

    match db.count_notes() {
        Ok(count) => log::info!("Loaded {} notes", count),
        Err(e) => log::warn!("Failed to count notes: {}", e),
    }

    let state = web::Data::new(AppState::new(Arc::clone(&db), config.clone()));

    log::info!("Starting HTTP server on 0.0.0.0:{}", port);
    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .app_data(controllers::notes::json_config())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config_routes)
            .configure(controllers::notes::config)
    })
    .bind(("0.0.0.0", port))?
    .run();

    // Get server handle for graceful shutdown
    let server_handle = server.handle();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        log::info!("Received Ctrl+C, shutting down...");

        let server_stop = server_handle.stop(true);
        if tokio::time::timeout(std::time::Duration::from_secs(5), server_stop).await.is_err() {
            log::warn!("Timeout waiting for HTTP server to stop, forcing exit...");
        }

        log::info!("Shutdown complete");
    });

    server.await
}
