/**
 * HTTP Route handlers for the Gift Guru API
 *
 * This module defines the REST API endpoints that the gift form frontend calls.
 * The recommendation route forwards the user's needs to Gemini and returns
 * structured suggestions, or the raw answer when it could not be parsed.
 */

use actix_web::{get, post, web, HttpResponse, Result as ActixResult};
use serde_json::json;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::gemini::GenerationProvider;
use crate::models::ResponseEnvelope;
use crate::recommend::recommend;

/**
 * POST /api/chat - Generate gift recommendations
 *
 * Accepts `{ messages: [{ role, content }] }` (the last message is used) or any
 * other JSON body, which is forwarded to the model as-is.
 *
 * @param config - Application configuration holding the API key and model
 * @param provider - Text generation backend (Gemini in production)
 * @param body - Raw request body
 * @returns 200 with `suggestions` (plus `raw` and `error` when the answer was not JSON),
 *   500 with `error` when the key is missing, the body is invalid or Gemini fails
 */
#[post("/api/chat")]
async fn chat(
    config: web::Data<AppConfig>,
    provider: web::Data<dyn GenerationProvider>,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("recommend", %request_id);

    let result = recommend(config.get_ref(), provider.get_ref(), &body)
        .instrument(span)
        .await;

    match result {
        Ok(envelope) => Ok(HttpResponse::Ok().json(envelope)),
        Err(e) => {
            tracing::error!(%request_id, "Server error: {}", e);
            Ok(HttpResponse::build(e.status_code()).json(ResponseEnvelope::failure(e.to_string())))
        }
    }
}

/**
 * GET /health - Liveness probe
 *
 * Reports the configured model and whether an API key is present.
 * Never echoes the key itself.
 */
#[get("/health")]
async fn health(config: web::Data<AppConfig>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "model": config.model,
        "credential_configured": config.has_credential(),
    })))
}

/**
 * Mount the Gift Guru endpoints
 *
 * Adds the recommendation route and the health probe. Both expect
 * `AppConfig` in app data; `/api/chat` also needs a `GenerationProvider`.
 *
 * @param cfg - service config of the App (or test App) being built
 */
pub fn init(cfg: &mut web::ServiceConfig) {
    cfg.service(chat)     // POST /api/chat
        .service(health); // GET /health
}
