//! `ArcGIS` `FeatureServer` / `MapServer` query client.
//!
//! Sends one `query` request per call with `f=json` and flattens the
//! response's `features[].attributes` objects. A `200` response carrying an
//! `error` object (unsupported relationship, bad geometry) is reported as
//! [`QueryResponse::ServiceError`] rather than as a failure.

use async_trait::async_trait;
use parcel_lookup_jurisdiction_models::EndpointConfig;

use crate::plan::FeatureQuery;
use crate::{FeatureService, QueryResponse, RawFeatureAttributes, SpatialError};

/// Live `ArcGIS` REST client.
#[derive(Debug, Clone)]
pub struct ArcGisFeatureService {
    client: reqwest::Client,
}

impl ArcGisFeatureService {
    #[must_use]
    pub const fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeatureService for ArcGisFeatureService {
    async fn query(
        &self,
        endpoint: &EndpointConfig,
        query: &FeatureQuery,
    ) -> Result<QueryResponse, SpatialError> {
        let params = query.to_params(&endpoint.out_fields_param());
        let body =
            parcel_lookup_http::get_json(&self.client, &endpoint.endpoint_url, &params).await?;
        parse_query_response(&body)
    }
}

/// Parses a `query` response body.
///
/// # Errors
///
/// Returns [`SpatialError::Decode`] if the body has neither an `error`
/// object nor a `features` array.
pub fn parse_query_response(body: &serde_json::Value) -> Result<QueryResponse, SpatialError> {
    if let Some(error) = body.get("error") {
        return Ok(QueryResponse::ServiceError {
            code: error["code"].as_i64(),
            message: error["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    let features = body["features"]
        .as_array()
        .ok_or_else(|| SpatialError::Decode {
            message: "No features array in ArcGIS response".to_string(),
        })?;

    // Features are { "attributes": {...}, "geometry": {...} }; geometry is
    // never requested, so only attributes are kept.
    let attributes: Vec<RawFeatureAttributes> = features
        .iter()
        .filter_map(|feature| feature.get("attributes")?.as_object().cloned())
        .collect();

    Ok(QueryResponse::Features(attributes))
}
