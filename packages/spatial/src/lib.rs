#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spatial query engine for parcel feature services.
//!
//! [`SpatialEngine::query_point`] walks the [`plan::search_plan`] against one
//! endpoint and returns the attributes of the first feature found. Each step
//! goes through the shared retry policy. A step that fails, either with a
//! service-level error body or with an HTTP or decoding failure that
//! survives the retries, counts as a miss and the search moves on.
//!
//! When no step finds a feature, a `where=1=1` probe is sent to tell an
//! empty neighborhood apart from a broken endpoint. The probe only logs.

pub mod arcgis;
pub mod plan;
pub mod projection;

use std::sync::Arc;

use async_trait::async_trait;
use parcel_lookup_http::HttpError;
use parcel_lookup_http::retry::{RetryPolicy, Retryable, with_retry};
use parcel_lookup_jurisdiction_models::{Coordinate, EndpointConfig};
use thiserror::Error;

use crate::plan::{FeatureQuery, search_plan};

/// Attribute object of one feature, as returned by the service.
pub type RawFeatureAttributes = serde_json::Map<String, serde_json::Value>;

/// Failure of a feature query after retries.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// HTTP request failed.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The response was JSON but not a feature query result.
    #[error("Failed to decode feature response: {message}")]
    Decode {
        /// Description of the decoding failure.
        message: String,
    },
}

impl SpatialError {
    /// Upstream HTTP status, when the failure was a non-success response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http(e) => e.status(),
            Self::Decode { .. } => None,
        }
    }
}

impl Retryable for SpatialError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_retryable(),
            Self::Decode { .. } => true,
        }
    }
}

/// Outcome of a single feature query that reached the service.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResponse {
    /// Matching features (possibly none).
    Features(Vec<RawFeatureAttributes>),
    /// The service rejected the query in its response body.
    ServiceError {
        code: Option<i64>,
        message: String,
    },
}

/// A feature layer that can answer [`FeatureQuery`] requests.
///
/// Implementations make exactly one upstream call per [`query`] and do not
/// retry.
///
/// [`query`]: FeatureService::query
#[async_trait]
pub trait FeatureService: Send + Sync {
    /// Runs one query against `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError`] if the request fails or the body is not a
    /// query result.
    async fn query(
        &self,
        endpoint: &EndpointConfig,
        query: &FeatureQuery,
    ) -> Result<QueryResponse, SpatialError>;
}

/// Runs the search plan against feature services.
#[derive(Clone)]
pub struct SpatialEngine {
    service: Arc<dyn FeatureService>,
    retry: RetryPolicy,
}

impl SpatialEngine {
    #[must_use]
    pub fn new(service: Arc<dyn FeatureService>, retry: RetryPolicy) -> Self {
        Self { service, retry }
    }

    /// Finds the parcel feature at or near `coord`.
    ///
    /// Returns `Ok(None)` when no step of the plan produced a feature and at
    /// least one step got an answer from the service.
    ///
    /// # Errors
    ///
    /// Returns the last [`SpatialError`] when every step failed after
    /// exhausting the retry policy, i.e. the endpoint never answered.
    pub async fn query_point(
        &self,
        endpoint: &EndpointConfig,
        coord: Coordinate,
    ) -> Result<Option<RawFeatureAttributes>, SpatialError> {
        let mut answered = false;
        let mut last_failure = None;

        for step in search_plan() {
            let query = step.to_query(coord);
            let label = format!("{} [{step}]", endpoint.source_label);

            match with_retry(&self.retry, &label, || self.service.query(endpoint, &query)).await {
                Ok(QueryResponse::Features(features)) => {
                    answered = true;
                    if let Some(first) = features.into_iter().next() {
                        log::info!(
                            "{}: found feature at ({}, {}) with {step}",
                            endpoint.source_label,
                            coord.lat,
                            coord.lon
                        );
                        return Ok(Some(first));
                    }
                    log::debug!("{label}: no features");
                }
                Ok(QueryResponse::ServiceError { code, message }) => {
                    answered = true;
                    log::warn!("{label}: service error {code:?}: {message}");
                }
                Err(e) => {
                    log::warn!("{label}: step failed: {e}");
                    last_failure = Some(e);
                }
            }
        }

        self.probe(endpoint, coord).await;

        match last_failure {
            Some(e) if !answered => Err(e),
            _ => Ok(None),
        }
    }

    /// Asks for any rows at all and logs what that says about the endpoint.
    async fn probe(&self, endpoint: &EndpointConfig, coord: Coordinate) {
        let query = FeatureQuery::probe();
        let label = format!("{} [probe]", endpoint.source_label);

        match with_retry(&self.retry, &label, || self.service.query(endpoint, &query)).await {
            Ok(QueryResponse::Features(rows)) if !rows.is_empty() => {
                log::info!(
                    "{}: endpoint is reachable and has data, but no parcel near ({}, {})",
                    endpoint.source_label,
                    coord.lat,
                    coord.lon
                );
            }
            Ok(QueryResponse::Features(_)) => {
                log::warn!(
                    "{}: endpoint returned no rows even for where=1=1",
                    endpoint.source_label
                );
            }
            Ok(QueryResponse::ServiceError { code, message }) => {
                log::warn!(
                    "{}: probe rejected with {code:?}: {message}",
                    endpoint.source_label
                );
            }
            Err(e) => {
                log::warn!("{}: probe failed: {e}", endpoint.source_label);
            }
        }
    }
}
