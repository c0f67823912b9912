#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command line entry point for parcel lookup.
//!
//! `serve` runs the HTTP service, `resolve` performs a single lookup and
//! prints the response envelope, and `route` shows which jurisdiction and
//! feature service a request would be sent to without touching the network.

use clap::{Parser, Subcommand};
use parcel_lookup_jurisdiction::JurisdictionRegistry;
use parcel_lookup_jurisdiction_models::{Coordinate, EndpointConfig};
use parcel_lookup_parcel_models::ParcelQuery;
use parcel_lookup_resolver::Resolver;
use parcel_lookup_resolver::config::ResolverConfig;
use parcel_lookup_server::ServerOptions;
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// CLI definitions
// ---------------------------------------------------------------------------

/// Resolve street addresses and coordinates to tax parcels.
#[derive(Parser)]
#[command(name = "parcel_lookup")]
#[command(about = "Resolve addresses and coordinates to tax parcels")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service.
    Serve {
        /// Address to bind (overrides `BIND_ADDR`).
        #[arg(long)]
        bind_addr: Option<String>,

        /// Port to listen on (overrides `PORT`).
        #[arg(long)]
        port: Option<u16>,
    },

    /// Resolve one request and print the JSON envelope.
    Resolve {
        /// Street address to geocode.
        #[arg(long)]
        address: Option<String>,

        /// Latitude (WGS84). Takes priority over the address.
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude (WGS84).
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },

    /// Print the routing decision without any network calls.
    Route {
        /// Street address used for keyword routing.
        #[arg(long)]
        address: String,

        /// Latitude (WGS84).
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude (WGS84).
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,
    },
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind_addr, port } => cmd_serve(bind_addr, port).await,
        Commands::Resolve { address, lat, lon } => {
            cmd_resolve(ParcelQuery { address, lat, lon }).await
        }
        Commands::Route { address, lat, lon } => cmd_route(&address, lat.zip(lon)),
    }
}

#[allow(clippy::future_not_send)]
async fn cmd_serve(
    bind_addr: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    let defaults = ServerOptions::from_env();
    let options = ServerOptions {
        bind_addr: bind_addr.unwrap_or(defaults.bind_addr),
        port: port.unwrap_or(defaults.port),
    };

    parcel_lookup_server::run_server(options, &ResolverConfig::from_env()).await?;
    Ok(())
}

async fn cmd_resolve(query: ParcelQuery) -> Result<(), Box<dyn std::error::Error>> {
    let resolver = Resolver::from_config(&ResolverConfig::from_env())?;
    let outcome = resolver.resolve(&query).await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.is_ok() {
        log::warn!("Lookup did not produce a parcel");
    }
    Ok(())
}

fn cmd_route(address: &str, coord: Option<(f64, f64)>) -> Result<(), Box<dyn std::error::Error>> {
    let registry = JurisdictionRegistry::embedded()?;
    let coord = coord.map(|(lat, lon)| Coordinate::new(lat, lon));
    if let Some(c) = coord
        && !c.is_valid()
    {
        return Err(format!("coordinate out of range: {}, {}", c.lat, c.lon).into());
    }

    let report = route_report(&registry, address, coord);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// The primary route plus the endpoints a lookup would query, in order.
fn route_report(
    registry: &JurisdictionRegistry,
    address: &str,
    coord: Option<Coordinate>,
) -> Value {
    let route = parcel_lookup_jurisdiction::route(registry, Some(address), coord);
    let fallback = route.state.opposite();

    let describe = |endpoint: Option<&EndpointConfig>| {
        endpoint.map_or(Value::Null, |e| {
            json!({ "source": e.source_label, "url": e.endpoint_url })
        })
    };

    json!({
        "state": route.state,
        "county": route.county,
        "endpoint": describe(registry.endpoint(route)),
        "fallback": {
            "state": fallback,
            "endpoint": describe(registry.statewide_endpoint(fallback)),
        },
    })
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn resolve_accepts_negative_longitude() {
        let cli = Cli::try_parse_from([
            "parcel_lookup",
            "resolve",
            "--lat",
            "39.158",
            "--lon",
            "-75.524",
        ])
        .unwrap();
        let Commands::Resolve { address, lat, lon } = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(address, None);
        assert_eq!(lat, Some(39.158));
        assert_eq!(lon, Some(-75.524));
    }

    #[test]
    fn lat_without_lon_is_rejected() {
        assert!(
            Cli::try_parse_from(["parcel_lookup", "route", "--address", "x", "--lat", "39.1"])
                .is_err()
        );
    }

    #[test]
    fn dover_coordinate_routes_to_kent_with_maryland_fallback() {
        let registry = JurisdictionRegistry::embedded().unwrap();
        let report = route_report(
            &registry,
            "123 Main St, Dover, DE 19901",
            Some(Coordinate::new(39.158, -75.524)),
        );

        assert_eq!(report["state"], "delaware");
        assert_eq!(report["county"], "kent");
        assert_eq!(report["endpoint"]["source"], "Kent County Parcels");
        assert_eq!(report["fallback"]["state"], "maryland");
        assert_eq!(
            report["fallback"]["endpoint"]["source"],
            "Maryland iMAP Parcel Boundaries"
        );
    }

    #[test]
    fn maryland_address_has_no_county() {
        let registry = JurisdictionRegistry::embedded().unwrap();
        let report = route_report(&registry, "1 Main St, Easton, Maryland", None);

        assert_eq!(report["state"], "maryland");
        assert_eq!(report["county"], Value::Null);
        assert_eq!(
            report["endpoint"]["source"],
            "Maryland iMAP Parcel Boundaries"
        );
        assert_eq!(report["fallback"]["state"], "delaware");
        assert_eq!(
            report["fallback"]["endpoint"]["source"],
            "Delaware FirstMap Statewide Parcels"
        );
    }
}
