#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resolves an address or coordinate to a normalized parcel record.
//!
//! The [`Resolver`] runs one request through the full pipeline:
//!
//! 1. validate the query (never cached)
//! 2. consult the [`cache::ResultCache`]
//! 3. geocode the address when no coordinate was supplied
//! 4. route to a state, and to a county where the state has county services
//! 5. search the routed endpoint
//! 6. if nothing was found, search the other state's statewide endpoint once
//! 7. normalize the first feature into a parcel record
//!
//! Every outcome, success or failure, is cached under the request's key.
//! Panics inside the pipeline are caught and reported as `INTERNAL_ERROR`.

pub mod cache;
pub mod config;
pub mod normalize;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt as _;
use parcel_lookup_geocoder::Geocoder;
use parcel_lookup_geocoder::census::CensusGeocoder;
use parcel_lookup_http::HttpError;
use parcel_lookup_jurisdiction::{JurisdictionRegistry, RegistryError};
use parcel_lookup_jurisdiction_models::{Coordinate, EndpointConfig, JurisdictionRoute};
use parcel_lookup_parcel_models::{ErrorCode, ParcelError, ParcelOutcome, ParcelQuery, ResolveInput};
use parcel_lookup_spatial::arcgis::ArcGisFeatureService;
use parcel_lookup_spatial::{RawFeatureAttributes, SpatialEngine, SpatialError};
use thiserror::Error;

use crate::cache::{ResultCache, cache_key};
use crate::config::ResolverConfig;

/// Errors from building a resolver.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The embedded jurisdiction registry is invalid.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The HTTP client could not be built.
    #[error(transparent)]
    Http(#[from] HttpError),
}

/// The parcel resolution pipeline and its cache.
pub struct Resolver {
    registry: Arc<JurisdictionRegistry>,
    geocoder: Geocoder,
    spatial: SpatialEngine,
    cache: ResultCache,
}

impl Resolver {
    /// Assembles a resolver from its parts.
    #[must_use]
    pub const fn new(
        registry: Arc<JurisdictionRegistry>,
        geocoder: Geocoder,
        spatial: SpatialEngine,
        cache: ResultCache,
    ) -> Self {
        Self {
            registry,
            geocoder,
            spatial,
            cache,
        }
    }

    /// Builds the production resolver: embedded registry, Census geocoder,
    /// and `ArcGIS` feature services sharing one HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`ResolverError`] if the embedded registry is invalid or the
    /// HTTP client cannot be built.
    pub fn from_config(config: &ResolverConfig) -> Result<Self, ResolverError> {
        let registry = JurisdictionRegistry::embedded()?;
        let client = parcel_lookup_http::build_client(config.http_timeout)?;

        let census = CensusGeocoder::new(
            client.clone(),
            config.geocoder_url.clone(),
            config.geocoder_benchmark.clone(),
        );
        let arcgis = ArcGisFeatureService::new(client);

        log::info!(
            "Resolver ready: {} jurisdictions, geocoder {}, timeout {:?}, {} retries, cache capacity {}",
            registry.definitions().len(),
            config.geocoder_url,
            config.http_timeout,
            config.retry.max_retries,
            config.cache_capacity
        );

        Ok(Self::new(
            Arc::new(registry),
            Geocoder::new(Arc::new(census), config.retry),
            SpatialEngine::new(Arc::new(arcgis), config.retry),
            ResultCache::new(config.cache_capacity),
        ))
    }

    #[must_use]
    pub fn registry(&self) -> &JurisdictionRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Validates and resolves a raw query.
    pub async fn resolve(&self, query: &ParcelQuery) -> ParcelOutcome {
        match query.validate() {
            Ok(input) => self.resolve_input(&input).await,
            Err(e) => {
                log::info!("Rejected query {query:?}: {e}");
                e.into()
            }
        }
    }

    /// Resolves an already validated input, using the cache.
    pub async fn resolve_input(&self, input: &ResolveInput) -> ParcelOutcome {
        let key = cache_key(input);
        let outcome = self
            .cache
            .get_or_resolve(key.clone(), self.resolve_guarded(input))
            .await;

        match &outcome {
            ParcelOutcome::Ok(record) => {
                log::info!(
                    "Resolved '{key}' to parcel {} ({})",
                    record.parcel_id,
                    record.source
                );
            }
            ParcelOutcome::Error(e) => log::info!("Resolved '{key}' to {e}"),
        }

        outcome
    }

    async fn resolve_guarded(&self, input: &ResolveInput) -> ParcelOutcome {
        match AssertUnwindSafe(self.resolve_uncached(input))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::error!("Resolver panicked: {detail}");
                ParcelError::new(ErrorCode::Internal, "Internal error while resolving parcel")
                    .into()
            }
        }
    }

    async fn resolve_uncached(&self, input: &ResolveInput) -> ParcelOutcome {
        let address = input.address.as_deref();

        let coord = match (input.coordinate, address) {
            (Some(coord), _) => coord,
            (None, Some(address)) => match self.geocoder.geocode(address).await {
                Ok(hit) => hit.coordinate,
                Err(e) => {
                    log::warn!("Geocoding '{address}' failed: {e}");
                    return ParcelError::new(
                        ErrorCode::GeocodeError,
                        format!("Could not geocode address: {e}"),
                    )
                    .into();
                }
            },
            (None, None) => return ParcelError::missing_input().into(),
        };

        let route = parcel_lookup_jurisdiction::route(&self.registry, address, Some(coord));
        let Some(primary) = self.registry.endpoint(route) else {
            return missing_endpoint(&route);
        };
        log::info!(
            "Routed ({}, {}) to {} via {}",
            coord.lat,
            coord.lon,
            route_label(&route),
            primary.source_label
        );

        let primary_failure = match self.search(primary, coord).await {
            Ok(Some(raw)) => return finish(&raw, primary),
            Ok(None) => None,
            Err(e) => Some(e),
        };

        let fallback_route = JurisdictionRoute {
            state: route.state.opposite(),
            county: None,
        };
        let Some(fallback) = self.registry.endpoint(fallback_route) else {
            return missing_endpoint(&fallback_route);
        };
        log::info!(
            "No parcel from {}, falling back to {}",
            primary.source_label,
            fallback.source_label
        );

        let fallback_failure = match self.search(fallback, coord).await {
            Ok(Some(raw)) => return finish(&raw, fallback),
            Ok(None) => None,
            Err(e) => Some(e),
        };

        not_found(primary_failure.as_ref(), fallback_failure.as_ref())
    }

    async fn search(
        &self,
        endpoint: &EndpointConfig,
        coord: Coordinate,
    ) -> Result<Option<RawFeatureAttributes>, SpatialError> {
        self.spatial
            .query_point(endpoint, coord)
            .await
            .inspect_err(|e| log::warn!("{}: every step failed: {e}", endpoint.source_label))
    }
}

fn finish(raw: &RawFeatureAttributes, endpoint: &EndpointConfig) -> ParcelOutcome {
    normalize::normalize(raw, endpoint).map_or_else(
        || {
            ParcelOutcome::from(ParcelError::new(
                ErrorCode::NoParcel,
                format!("Feature from {} has no parcel identifier", endpoint.source_label),
            ))
        },
        ParcelOutcome::from,
    )
}

/// Outcome when neither search produced a feature. A primary endpoint that
/// failed every step with an HTTP status is surfaced as `HTTP_<status>`.
fn not_found(primary: Option<&SpatialError>, fallback: Option<&SpatialError>) -> ParcelOutcome {
    if let Some(e) = primary
        && let Some(status) = e.status()
    {
        return ParcelError::new(ErrorCode::Http(status), format!("Parcel service failed: {e}"))
            .into();
    }

    let failures: Vec<String> = [primary, fallback]
        .into_iter()
        .flatten()
        .map(ToString::to_string)
        .collect();

    let message = if failures.is_empty() {
        "No parcel found at this location".to_string()
    } else {
        format!(
            "No parcel found at this location (endpoint failure: {})",
            failures.join("; ")
        )
    };

    ParcelError::new(ErrorCode::NoParcel, message).into()
}

fn missing_endpoint(route: &JurisdictionRoute) -> ParcelOutcome {
    log::error!("No endpoint configured for {}", route_label(route));
    ParcelError::new(
        ErrorCode::Internal,
        format!("No endpoint configured for {}", route_label(route)),
    )
    .into()
}

fn route_label(route: &JurisdictionRoute) -> String {
    route.county.map_or_else(
        || route.state.to_string(),
        |county| format!("{}/{county}", route.state),
    )
}
