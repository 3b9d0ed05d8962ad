/**
 * Gift Guru Backend - Main entry point
 *
 * This is the Rust/Actix-Web server application that turns a gift form
 * (recipient, budget, interests, taboos) into gift ideas from Google Gemini.
 */

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::io;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use gift_guru::config::AppConfig;
use gift_guru::gemini::{GeminiClient, GenerationProvider};
use gift_guru::routes;

/**
 * Main application entry point
 *
 * Sets up and starts the Actix-Web HTTP server with:
 * - Configuration loaded once from the environment (.env supported)
 * - A shared Gemini client with the configured request timeout
 * - CORS middleware for cross-origin requests from the frontend
 * - Route configuration for API endpoints
 */
#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting Gift Guru Backend...");

    let config = AppConfig::from_env()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    if !config.has_credential() {
        tracing::warn!(
            "Neither GEMINI_API_KEY nor GOOGLE_GENERATIVE_AI_API_KEY is set; \
             recommendation requests will fail until one is configured"
        );
    }

    let gemini = GeminiClient::from_config(&config)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    let provider: Arc<dyn GenerationProvider> = Arc::new(gemini);

    let bind_address = config.bind_address.clone();
    tracing::info!(model = %config.model, "Listening on {}", bind_address);

    let config = web::Data::new(config);
    let provider = web::Data::from(provider);

    // Create and start the HTTP server
    HttpServer::new(move || {
        // Configure CORS to allow cross-origin requests from frontend
        let cors = Cors::permissive();

        App::new()
            .app_data(config.clone())   // Read-only settings shared across workers
            .app_data(provider.clone()) // One pooled Gemini client
            .wrap(Logger::default())
            .wrap(cors)
            .configure(routes::init)
    })
    .bind(bind_address)?
    .run()
    .await
}
