#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding for parcel lookups.
//!
//! Turns a free-form address into a WGS84 coordinate. The [`Geocoder`] tries
//! each spelling from [`address::address_variants`] in order, wrapping every
//! call to the [`GeocodingBackend`] in the shared retry policy. A response
//! without a match counts as a failed attempt, so it is retried too.
//!
//! The production backend is the US Census Bureau one-line geocoder
//! ([`census::CensusGeocoder`]).

pub mod address;
pub mod census;

use std::sync::Arc;

use async_trait::async_trait;
use parcel_lookup_http::HttpError;
use parcel_lookup_http::retry::{RetryPolicy, Retryable, with_retry};
use parcel_lookup_jurisdiction_models::Coordinate;
use thiserror::Error;

/// A geocoding hit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    /// Best-match coordinate.
    pub coordinate: Coordinate,
    /// The matched/canonical address returned by the geocoder.
    pub matched_address: Option<String>,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The service answered but found no match.
    #[error("No match for '{address}'")]
    NoMatch {
        /// The variant that was looked up.
        address: String,
    },

    /// The address was empty after trimming.
    #[error("Address is empty")]
    EmptyAddress,

    /// Every variant failed after retries.
    #[error("All {variants} address variants failed; last error: {last}")]
    Exhausted {
        /// How many variants were tried.
        variants: usize,
        /// The error from the final attempt of the final variant.
        last: Box<Self>,
    },
}

impl Retryable for GeocodeError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_retryable(),
            Self::Parse { .. } | Self::NoMatch { .. } => true,
            Self::EmptyAddress | Self::Exhausted { .. } => false,
        }
    }
}

/// A single-line geocoding service.
///
/// Implementations make exactly one upstream call per [`lookup`] and do not
/// retry; [`Geocoder`] owns the retry policy.
///
/// [`lookup`]: GeocodingBackend::lookup
#[async_trait]
pub trait GeocodingBackend: Send + Sync {
    /// Short identifier used in logs (e.g. `"census"`).
    fn name(&self) -> &str;

    /// Looks up one address spelling.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails or the response cannot
    /// be parsed. A successful response without a match is `Ok(None)`.
    async fn lookup(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError>;
}

/// Address-variant geocoder with bounded retries per variant.
#[derive(Clone)]
pub struct Geocoder {
    backend: Arc<dyn GeocodingBackend>,
    retry: RetryPolicy,
}

impl Geocoder {
    /// Creates a geocoder over the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn GeocodingBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Geocodes an address, returning the first variant that matches.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::EmptyAddress`] for blank input and
    /// [`GeocodeError::Exhausted`] (carrying the last underlying error) when
    /// every variant failed after retries.
    pub async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocodeError> {
        let variants = address::address_variants(address);
        let mut last_error = None;

        for variant in &variants {
            let label = format!("{} geocode '{variant}'", self.backend.name());
            let result = with_retry(&self.retry, &label, || async move {
                self.backend
                    .lookup(variant)
                    .await?
                    .ok_or_else(|| GeocodeError::NoMatch {
                        address: variant.clone(),
                    })
            })
            .await;

            match result {
                Ok(hit) => {
                    log::info!(
                        "Geocoded '{variant}' to ({}, {})",
                        hit.coordinate.lat,
                        hit.coordinate.lon
                    );
                    return Ok(hit);
                }
                Err(e) => {
                    log::warn!("Geocoding variant '{variant}' failed: {e}");
                    last_error = Some(e);
                }
            }
        }

        let Some(last) = last_error else {
            return Err(GeocodeError::EmptyAddress);
        };

        Err(GeocodeError::Exhausted {
            variants: variants.len(),
            last: Box::new(last),
        })
    }
}
