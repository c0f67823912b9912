#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parcel lookup HTTP server.
//!
//! Configuration comes from the environment; see
//! [`parcel_lookup_resolver::config`] and [`parcel_lookup_server::ServerOptions`].

use parcel_lookup_resolver::config::ResolverConfig;
use parcel_lookup_server::{ServerOptions, run_server};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    run_server(ServerOptions::from_env(), &ResolverConfig::from_env()).await
}
