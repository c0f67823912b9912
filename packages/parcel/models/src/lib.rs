#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and response types for parcel resolution.
//!
//! Every resolution ends in a [`ParcelOutcome`], serialized with a `status`
//! tag of `"ok"` or `"error"`. Error codes are serialized as their literal
//! names (`"NO_PARCEL"`, `"HTTP_503"`, ...).

use std::fmt;
use std::str::FromStr;

use parcel_lookup_jurisdiction_models::Coordinate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Raw resolution request as sent by clients.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParcelQuery {
    /// Free-form street address.
    pub address: Option<String>,
    /// Latitude (WGS84).
    pub lat: Option<f64>,
    /// Longitude (WGS84).
    pub lon: Option<f64>,
}

impl ParcelQuery {
    /// Reads a query from an arbitrary JSON value.
    ///
    /// Coordinates may be JSON numbers or numeric strings. Unknown keys are
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ErrorCode::BadRequest`] error if the value is not an
    /// object, `address` is not a string, or a coordinate is not numeric.
    pub fn from_json(body: &serde_json::Value) -> Result<Self, ParcelError> {
        let Some(obj) = body.as_object() else {
            return Err(ParcelError::bad_request(
                "Request body must be a JSON object",
            ));
        };

        let address = match obj.get("address") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(ParcelError::bad_request("address must be a string")),
        };

        Ok(Self {
            address,
            lat: coordinate_component(obj, "lat")?,
            lon: coordinate_component(obj, "lon")?,
        })
    }

    /// Checks the query and extracts the usable inputs.
    ///
    /// The address is trimmed; a blank address counts as absent. A
    /// coordinate is only used when both `lat` and `lon` are present.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::BadRequest`] for out-of-range or non-finite
    /// coordinates and [`ErrorCode::MissingInput`] when neither an address
    /// nor a full coordinate is present.
    pub fn validate(&self) -> Result<ResolveInput, ParcelError> {
        let address = self
            .address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from);

        let coordinate = match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => {
                let coord = Coordinate::new(lat, lon);
                if !coord.is_valid() {
                    return Err(ParcelError::bad_request(format!(
                        "Coordinates out of range: ({lat}, {lon})"
                    )));
                }
                Some(coord)
            }
            _ => None,
        };

        if address.is_none() && coordinate.is_none() {
            return Err(ParcelError::missing_input());
        }

        Ok(ResolveInput {
            address,
            coordinate,
        })
    }
}

fn coordinate_component(
    obj: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Result<Option<f64>, ParcelError> {
    match obj.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| ParcelError::bad_request(format!("{key} is not a valid number"))),
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ParcelError::bad_request(format!("{key} must be numeric, got '{s}'"))),
        Some(_) => Err(ParcelError::bad_request(format!("{key} must be numeric"))),
    }
}

/// Validated resolution input. At least one field is set.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveInput {
    /// Trimmed, non-empty address.
    pub address: Option<String>,
    /// In-range coordinate; takes priority over the address.
    pub coordinate: Option<Coordinate>,
}

/// A normalized parcel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelRecord {
    /// Authoritative parcel identifier. Never empty.
    pub parcel_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parcel_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction_name: Option<String>,
    /// Public viewer link for the parcel.
    pub viewer_url: String,
    /// Source label of the endpoint that produced the record.
    pub source: String,
    /// Attributes exactly as returned by the feature service.
    pub raw: serde_json::Map<String, serde_json::Value>,
}

/// Error taxonomy returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Neither an address nor a coordinate was supplied.
    MissingInput,
    /// The request body was malformed.
    BadRequest,
    /// The address could not be geocoded.
    GeocodeError,
    /// No parcel was found in either jurisdiction.
    NoParcel,
    /// A feature service failed with this HTTP status.
    Http(u16),
    /// Unexpected failure inside the resolver.
    Internal,
}

impl ErrorCode {
    /// Whether the error was caused by the request itself.
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(self, Self::MissingInput | Self::BadRequest)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput => f.write_str("MISSING_INPUT"),
            Self::BadRequest => f.write_str("BAD_REQUEST"),
            Self::GeocodeError => f.write_str("GEOCODE_ERROR"),
            Self::NoParcel => f.write_str("NO_PARCEL"),
            Self::Http(status) => write!(f, "HTTP_{status}"),
            Self::Internal => f.write_str("INTERNAL_ERROR"),
        }
    }
}

/// Returned when parsing an unknown error code string.
#[derive(Debug, thiserror::Error)]
#[error("Unknown error code: {0}")]
pub struct UnknownErrorCode(String);

impl FromStr for ErrorCode {
    type Err = UnknownErrorCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MISSING_INPUT" => Ok(Self::MissingInput),
            "BAD_REQUEST" => Ok(Self::BadRequest),
            "GEOCODE_ERROR" => Ok(Self::GeocodeError),
            "NO_PARCEL" => Ok(Self::NoParcel),
            "INTERNAL_ERROR" => Ok(Self::Internal),
            other => other
                .strip_prefix("HTTP_")
                .and_then(|status| status.parse().ok())
                .map(Self::Http)
                .ok_or_else(|| UnknownErrorCode(other.to_string())),
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A resolution failure as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ParcelError {
    pub code: ErrorCode,
    pub message: String,
}

impl ParcelError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn missing_input() -> Self {
        Self::new(
            ErrorCode::MissingInput,
            "Provide an address or both lat and lon",
        )
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }
}

/// Final result of one resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParcelOutcome {
    Ok(ParcelRecord),
    Error(ParcelError),
}

impl ParcelOutcome {
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// The error code, if this is an error outcome.
    #[must_use]
    pub const fn error_code(&self) -> Option<ErrorCode> {
        match self {
            Self::Ok(_) => None,
            Self::Error(e) => Some(e.code),
        }
    }
}

impl From<ParcelRecord> for ParcelOutcome {
    fn from(record: ParcelRecord) -> Self {
        Self::Ok(record)
    }
}

impl From<ParcelError> for ParcelOutcome {
    fn from(error: ParcelError) -> Self {
        Self::Error(error)
    }
}

/// Response body of the health endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    /// Entries currently held by the result cache.
    pub cache_entries: u64,
    /// Lookups answered from the cache since startup.
    pub cache_hits: u64,
    /// Lookups that had to be resolved since startup.
    pub cache_misses: u64,
}
