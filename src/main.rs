use actix_web::middleware::from_fn;
use actix_web::{App, HttpServer, web};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod app;
mod model;
mod service;

use app::AppState;
use model::Config;
use model::config::LogFormat;

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true).with_span_list(false))
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present (ignore if missing)
    let _ = dotenvy::dotenv();

    let config = Config::from_env();
    init_tracing(&config);

    let bind_addr = config.bind_addr();
    let state = AppState::new(&config).map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize application");
        std::io::Error::other(e.to_string())
    })?;

    let classification_service = web::Data::new(state.classification_service);
    let document_loader = web::Data::new(state.document_loader);
    let config = web::Data::new(config);

    tracing::info!(
        service = %config.service_name,
        environment = config.environment.as_str(),
        "Starting document classification server on {}",
        bind_addr
    );

    HttpServer::new(move || {
        App::new()
            .wrap(from_fn(api::middleware::request_logging))
            .wrap(from_fn(api::middleware::request_context))
            .app_data(config.clone())
            .app_data(classification_service.clone())
            .app_data(document_loader.clone())
            .configure(api::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
