#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Coordinate, jurisdiction tag, and endpoint configuration types.
//!
//! These types are shared by the router, the spatial query engine, and the
//! resolver. Endpoint configuration is deserialized from the embedded
//! jurisdiction TOML files and is never mutated after startup.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lon: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Returns `true` if both components are finite and within the WGS84
    /// latitude/longitude ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Top-level jurisdiction (state) with its own parcel data service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum State {
    /// Delaware (primary market; has county-level services).
    Delaware,
    /// Maryland (single statewide service).
    Maryland,
}

impl State {
    /// All supported states.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Delaware, Self::Maryland]
    }

    /// The neighboring state queried as a cross-jurisdiction fallback.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Delaware => Self::Maryland,
            Self::Maryland => Self::Delaware,
        }
    }
}

/// Sub-jurisdiction (county) within a state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum County {
    /// New Castle County, DE (north).
    NewCastle,
    /// Kent County, DE (central).
    Kent,
    /// Sussex County, DE (south).
    Sussex,
}

/// The routing decision for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JurisdictionRoute {
    /// Top-level jurisdiction.
    pub state: State,
    /// County, when the state has county services and one was detected.
    pub county: Option<County>,
}

/// A lat/lon rectangle. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl BoundingBox {
    /// Returns `true` if the coordinate lies inside the box (edges included).
    #[must_use]
    pub fn contains(&self, coord: Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&coord.lat)
            && (self.min_lon..=self.max_lon).contains(&coord.lon)
    }
}

/// A latitude band `[south, north)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatitudeBand {
    /// Southern edge (inclusive).
    pub south: f64,
    /// Northern edge (exclusive).
    pub north: f64,
}

impl LatitudeBand {
    /// Returns `true` if `lat` falls inside the band.
    #[must_use]
    pub fn contains(&self, lat: f64) -> bool {
        lat >= self.south && lat < self.north
    }

    /// Returns `true` if the two bands share any latitude.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.south < other.north && other.south < self.north
    }
}

/// Canonical parcel fields populated by the attribute normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum CanonicalField {
    /// Authoritative parcel identifier (required).
    ParcelId,
    /// Tax map number.
    MapNumber,
    /// Tax map grid.
    GridNumber,
    /// Parcel number within the map/grid.
    ParcelNumber,
    /// Name of the jurisdiction (county or city) that owns the record.
    JurisdictionName,
}

impl CanonicalField {
    /// All canonical fields in normalization order.
    pub const ALL: &[Self] = &[
        Self::ParcelId,
        Self::MapNumber,
        Self::GridNumber,
        Self::ParcelNumber,
        Self::JurisdictionName,
    ];
}

/// Ordered alias lists per canonical field.
///
/// Each list is scanned in order; the first alias whose value is present
/// and non-empty wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAliases {
    /// Aliases for the parcel identifier.
    pub parcel_id: Vec<String>,
    /// Aliases for the tax map number.
    #[serde(default)]
    pub map_number: Vec<String>,
    /// Aliases for the tax map grid.
    #[serde(default)]
    pub grid_number: Vec<String>,
    /// Aliases for the parcel number.
    #[serde(default)]
    pub parcel_number: Vec<String>,
    /// Aliases for the jurisdiction name.
    #[serde(default)]
    pub jurisdiction_name: Vec<String>,
}

impl FieldAliases {
    /// Returns the alias list for a canonical field.
    #[must_use]
    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        match field {
            CanonicalField::ParcelId => &self.parcel_id,
            CanonicalField::MapNumber => &self.map_number,
            CanonicalField::GridNumber => &self.grid_number,
            CanonicalField::ParcelNumber => &self.parcel_number,
            CanonicalField::JurisdictionName => &self.jurisdiction_name,
        }
    }
}

/// Everything needed to query and interpret one parcel feature service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// ArcGIS layer `query` URL.
    pub endpoint_url: String,
    /// Attribute names requested via `outFields` (empty means `*`).
    #[serde(default)]
    pub out_fields: Vec<String>,
    /// Canonical field aliases for this service's schema.
    pub field_aliases: FieldAliases,
    /// Human-readable source label returned with each parcel.
    pub source_label: String,
    /// Public viewer URL. `{parcel_id}` is replaced with the parcel ID.
    pub viewer_base_url: String,
}

impl EndpointConfig {
    /// The `outFields` query value.
    #[must_use]
    pub fn out_fields_param(&self) -> String {
        if self.out_fields.is_empty() {
            "*".to_string()
        } else {
            self.out_fields.join(",")
        }
    }
}
