//! US Census Bureau single-line address geocoder.
//!
//! Uses the free `locations/onelineaddress` endpoint. No API key required.

use async_trait::async_trait;
use parcel_lookup_jurisdiction_models::Coordinate;

use crate::{GeocodeError, GeocodedAddress, GeocodingBackend};

/// Public Census geocoder base URL.
pub const DEFAULT_BASE_URL: &str = "https://geocoding.geo.census.gov/geocoder";

/// Benchmark (address range vintage) used when none is configured.
pub const DEFAULT_BENCHMARK: &str = "Public_AR_Current";

/// Census Bureau one-line address client.
#[derive(Debug, Clone)]
pub struct CensusGeocoder {
    client: reqwest::Client,
    base_url: String,
    benchmark: String,
}

impl CensusGeocoder {
    /// Creates a client. `base_url` must not have a trailing slash.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        benchmark: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            benchmark: benchmark.into(),
        }
    }
}

#[async_trait]
impl GeocodingBackend for CensusGeocoder {
    fn name(&self) -> &'static str {
        "census"
    }

    async fn lookup(&self, address: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let url = format!("{}/locations/onelineaddress", self.base_url);
        let params = [
            ("address", address.to_string()),
            ("benchmark", self.benchmark.clone()),
            ("format", "json".to_string()),
        ];

        let body = parcel_lookup_http::get_json(&self.client, &url, &params).await?;
        parse_match(&body)
    }
}

/// Reads the best match out of a `onelineaddress` response.
///
/// Returns `Ok(None)` when the service answered but found no match.
fn parse_match(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let Some(matches) = body.pointer("/result/addressMatches").and_then(|m| m.as_array()) else {
        return Err(parse_error("response has no result.addressMatches"));
    };
    let Some(best) = matches.first() else {
        return Ok(None);
    };

    let axis = |name: &str| {
        best.pointer(&format!("/coordinates/{name}"))
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| parse_error(&format!("match has no numeric coordinates.{name}")))
    };
    let (lon, lat) = (axis("x")?, axis("y")?);

    Ok(Some(GeocodedAddress {
        coordinate: Coordinate::new(lat, lon),
        matched_address: best
            .get("matchedAddress")
            .and_then(serde_json::Value::as_str)
            .map(ToOwned::to_owned),
    }))
}

fn parse_error(message: &str) -> GeocodeError {
    GeocodeError::Parse {
        message: message.to_string(),
    }
}
