//! HTTP handler functions for the parcel lookup API.

use actix_web::http::header;
use actix_web::{HttpResponse, web};
use parcel_lookup_parcel_models::{HealthResponse, ParcelError, ParcelOutcome, ParcelQuery};

use crate::AppState;

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let cache = state.resolver.cache();
    HttpResponse::Ok().json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache_entries: cache.entry_count(),
        cache_hits: cache.hits(),
        cache_misses: cache.misses(),
    })
}

/// `POST /resolve-parcel`
///
/// Body: `{ "address"?: string, "lat"?: number, "lon"?: number }`.
/// Validation failures are `400`; every other outcome, including lookup
/// failures, is `200` with a `status` field.
pub async fn resolve_parcel(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let query = match parse_body(&body) {
        Ok(query) => query,
        Err(e) => {
            log::debug!("Rejected request body: {e}");
            return respond(&ParcelOutcome::from(e));
        }
    };

    let outcome = state.resolver.resolve(&query).await;
    respond(&outcome)
}

/// Any method other than `POST` on `/resolve-parcel`.
pub async fn method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed()
        .insert_header((header::ALLOW, "POST"))
        .json(ParcelOutcome::from(ParcelError::bad_request(
            "Method not allowed; use POST",
        )))
}

/// An empty body is treated as an empty query (and so reports missing
/// input rather than malformed JSON).
fn parse_body(body: &[u8]) -> Result<ParcelQuery, ParcelError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ParcelQuery::default());
    }

    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ParcelError::bad_request(format!("Malformed JSON body: {e}")))?;

    ParcelQuery::from_json(&value)
}

fn respond(outcome: &ParcelOutcome) -> HttpResponse {
    match outcome.error_code() {
        Some(code) if code.is_client_error() => HttpResponse::BadRequest().json(outcome),
        _ => HttpResponse::Ok().json(outcome),
    }
}
