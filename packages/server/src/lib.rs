#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web service for parcel resolution.
//!
//! Exposes `POST /resolve-parcel` and `GET /api/health`. All resolution
//! logic lives in [`parcel_lookup_resolver`]; this crate only parses
//! request bodies and maps outcomes to HTTP status codes.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use parcel_lookup_resolver::Resolver;
use parcel_lookup_resolver::config::ResolverConfig;

/// Default bind address when `BIND_ADDR` is unset.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1";

/// Default port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 8080;

/// Shared application state.
pub struct AppState {
    /// Resolution pipeline and its cache.
    pub resolver: Arc<Resolver>,
}

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub bind_addr: String,
    pub port: u16,
}

impl ServerOptions {
    /// Reads `BIND_ADDR` and `PORT`, falling back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self { bind_addr, port }
    }
}

/// Registers the service routes. Shared by [`run_server`] and tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/resolve-parcel")
            .route(web::post().to(handlers::resolve_parcel))
            .default_service(web::to(handlers::method_not_allowed)),
    )
    .service(web::scope("/api").route("/health", web::get().to(handlers::health)));
}

/// Starts the parcel lookup server.
///
/// Builds the production resolver from `config` and serves until the
/// process is stopped. The caller provides the async runtime (e.g. via
/// `#[actix_web::main]`) and initializes logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the resolver cannot be built, the
/// HTTP server fails to bind, or it encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(options: ServerOptions, config: &ResolverConfig) -> std::io::Result<()> {
    let resolver = Resolver::from_config(config).map_err(std::io::Error::other)?;

    let state = web::Data::new(AppState {
        resolver: Arc::new(resolver),
    });

    let ServerOptions { bind_addr, port } = options;
    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
