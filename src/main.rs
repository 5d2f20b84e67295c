// src/main.rs - admin gateway entry point
use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fleetdesk::backend::BackendClient;
use fleetdesk::config::{load_config, Config};
use fleetdesk::handlers::{configure_routes, AppState};
use fleetdesk::monitoring::{configure_health, Metrics, RequestLogger};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Конфигурация (внутри подхватывается .env)
    let config = load_config()?;

    setup_logging(&config)?;

    if config.is_production() {
        validate_production_config(&config)?;
    }

    config.print_startup_info();

    let backend = BackendClient::new(&config.backend)
        .map_err(|e| anyhow::anyhow!("Failed to create backend client: {}", e))?;

    let app_state = Arc::new(AppState::new(backend, config.clone()));

    let metrics_arc = Arc::new(Metrics::new());
    let metrics = web::Data::new(metrics_arc.clone());

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server at http://{}", bind_address);

    let server_config = config.clone();
    let mut server = HttpServer::new(move || {
        let cors = setup_cors(&server_config.security.allowed_origins, server_config.is_production());

        App::new()
            .wrap(cors)
            .wrap(setup_security_headers())
            .wrap(Logger::default())
            .wrap(RequestLogger::new(metrics_arc.clone()))
            .app_data(web::Data::new(app_state.clone()))
            .app_data(metrics.clone())
            .app_data(web::JsonConfig::default().limit(server_config.security.max_request_size))
            .configure(configure_health)
            .configure(configure_routes)
    })
    .keep_alive(Duration::from_secs(config.server.keep_alive))
    .client_request_timeout(Duration::from_secs(config.server.client_timeout));

    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server.bind(&bind_address)?.run().await?;

    log::info!("Server stopped");
    Ok(())
}

fn setup_cors(allowed_origins: &[String], is_production: bool) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("x-request-id"),
        ])
        .expose_headers(vec![header::CONTENT_LENGTH])
        .supports_credentials()
        .max_age(3600);

    if allowed_origins.iter().any(|o| o == "*") && !is_production {
        log::warn!("⚠️  Using wildcard CORS (*) in development mode");
        return cors.allow_any_origin().allow_any_header().allow_any_method();
    }

    for origin in allowed_origins.iter().filter(|o| !o.is_empty() && *o != "*") {
        log::debug!("Adding CORS origin: {}", origin);
        cors = cors.allowed_origin(origin);
    }

    cors
}

fn setup_logging(config: &Config) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            let level = config.logging.level.as_str();
            tracing_subscriber::EnvFilter::new(level)
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

fn validate_production_config(config: &Config) -> anyhow::Result<()> {
    if config.security.allowed_origins.iter().any(|o| o == "*") {
        anyhow::bail!("Wildcard CORS origins not allowed in production!");
    }

    if !config.backend.api_url.starts_with("https://") {
        log::warn!("Backend URL is not HTTPS in production: {}", config.backend.api_url);
    }

    Ok(())
}

fn setup_security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
}
