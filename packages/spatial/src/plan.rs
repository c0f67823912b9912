//! The ordered search plan for locating the parcel under a coordinate.
//!
//! Parcel layers disagree about projections and about which spatial
//! relationships they support, and geocoded points often land in a street
//! right-of-way rather than on a parcel. The plan therefore widens the search
//! step by step: buffered point queries first (in both spatial references),
//! then envelope queries. Every step is a [`SearchStep`] value that produces
//! exactly one [`FeatureQuery`].

use std::fmt;

use geo::{Point, Rect};
use parcel_lookup_jurisdiction_models::Coordinate;
use strum_macros::Display;

use crate::projection;

/// Maximum features requested by a search step.
pub const STEP_RECORD_COUNT: u32 = 10;

/// Maximum features requested by the reachability probe.
pub const PROBE_RECORD_COUNT: u32 = 3;

/// Spatial references tried, in order.
pub const SPATIAL_REFERENCES: [SpatialReference; 2] =
    [SpatialReference::Wgs84, SpatialReference::WebMercator];

/// `(buffer distance in meters, relationship)` pairs for the point pass.
pub const POINT_STRATEGIES: [(f64, SpatialRelationship); 9] = [
    (25.0, SpatialRelationship::Intersects),
    (25.0, SpatialRelationship::Within),
    (50.0, SpatialRelationship::Intersects),
    (50.0, SpatialRelationship::Contains),
    (100.0, SpatialRelationship::Intersects),
    (250.0, SpatialRelationship::Intersects),
    (250.0, SpatialRelationship::Overlaps),
    (500.0, SpatialRelationship::Intersects),
    (1000.0, SpatialRelationship::Intersects),
];

/// Envelope half-widths in meters for the envelope pass.
pub const ENVELOPE_DISTANCES: [f64; 4] = [50.0, 150.0, 400.0, 1000.0];

/// Spatial reference of a query geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SpatialReference {
    /// EPSG:4326 longitude/latitude degrees.
    #[strum(serialize = "EPSG:4326")]
    Wgs84,
    /// EPSG:3857 spherical Web Mercator meters.
    #[strum(serialize = "EPSG:3857")]
    WebMercator,
}

impl SpatialReference {
    /// The well-known ID sent as `inSR`.
    #[must_use]
    pub const fn wkid(self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
        }
    }
}

/// `ArcGIS` spatial relationship between the query geometry and features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SpatialRelationship {
    #[strum(serialize = "esriSpatialRelIntersects")]
    Intersects,
    #[strum(serialize = "esriSpatialRelWithin")]
    Within,
    #[strum(serialize = "esriSpatialRelContains")]
    Contains,
    #[strum(serialize = "esriSpatialRelOverlaps")]
    Overlaps,
}

/// One step of the search plan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchStep {
    /// The coordinate as a point, buffered by `distance_m`.
    PointBuffer {
        srs: SpatialReference,
        distance_m: f64,
        relationship: SpatialRelationship,
    },
    /// An envelope extending `distance_m` around the coordinate, intersected.
    Envelope {
        srs: SpatialReference,
        distance_m: f64,
    },
}

impl fmt::Display for SearchStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PointBuffer {
                srs,
                distance_m,
                relationship,
            } => write!(f, "point {distance_m}m {relationship} ({srs})"),
            Self::Envelope { srs, distance_m } => {
                write!(f, "envelope {distance_m}m ({srs})")
            }
        }
    }
}

impl SearchStep {
    /// Builds the feature query for this step around `coord`.
    #[must_use]
    pub fn to_query(&self, coord: Coordinate) -> FeatureQuery {
        let filter = match *self {
            Self::PointBuffer {
                srs,
                distance_m,
                relationship,
            } => QueryFilter::Point {
                point: projection::point_in(coord, srs),
                srs,
                distance_m,
                relationship,
            },
            Self::Envelope { srs, distance_m } => QueryFilter::Envelope {
                rect: projection::envelope_around(coord, srs, distance_m),
                srs,
                relationship: SpatialRelationship::Intersects,
            },
        };

        FeatureQuery {
            filter,
            result_record_count: STEP_RECORD_COUNT,
        }
    }
}

/// The full ordered search plan: every point step for WGS84, then for Web
/// Mercator, then every envelope step in the same order.
#[must_use]
pub fn search_plan() -> Vec<SearchStep> {
    let points = SPATIAL_REFERENCES.iter().flat_map(|&srs| {
        POINT_STRATEGIES
            .iter()
            .map(move |&(distance_m, relationship)| SearchStep::PointBuffer {
                srs,
                distance_m,
                relationship,
            })
    });

    let envelopes = SPATIAL_REFERENCES.iter().flat_map(|&srs| {
        ENVELOPE_DISTANCES
            .iter()
            .map(move |&distance_m| SearchStep::Envelope { srs, distance_m })
    });

    points.chain(envelopes).collect()
}

/// Which features a query selects.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    /// Buffered point geometry.
    Point {
        point: Point<f64>,
        srs: SpatialReference,
        distance_m: f64,
        relationship: SpatialRelationship,
    },
    /// Envelope geometry.
    Envelope {
        rect: Rect<f64>,
        srs: SpatialReference,
        relationship: SpatialRelationship,
    },
    /// No geometry, `where=1=1`.
    All,
}

/// A single `query` request against a feature layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureQuery {
    pub filter: QueryFilter,
    pub result_record_count: u32,
}

impl FeatureQuery {
    /// The reachability probe: any rows at all, no geometry.
    #[must_use]
    pub const fn probe() -> Self {
        Self {
            filter: QueryFilter::All,
            result_record_count: PROBE_RECORD_COUNT,
        }
    }

    /// Renders the `query` endpoint parameters.
    #[must_use]
    pub fn to_params(&self, out_fields: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("f", "json".to_string()),
            ("outFields", out_fields.to_string()),
            ("returnGeometry", "false".to_string()),
            ("resultRecordCount", self.result_record_count.to_string()),
        ];

        match &self.filter {
            QueryFilter::Point {
                point,
                srs,
                distance_m,
                relationship,
            } => {
                params.push(("geometry", format!("{},{}", point.x(), point.y())));
                params.push(("geometryType", "esriGeometryPoint".to_string()));
                params.push(("inSR", srs.wkid().to_string()));
                params.push(("spatialRel", relationship.to_string()));
                params.push(("distance", distance_m.to_string()));
                params.push(("units", "esriSRUnit_Meter".to_string()));
            }
            QueryFilter::Envelope {
                rect,
                srs,
                relationship,
            } => {
                params.push((
                    "geometry",
                    format!(
                        "{},{},{},{}",
                        rect.min().x,
                        rect.min().y,
                        rect.max().x,
                        rect.max().y
                    ),
                ));
                params.push(("geometryType", "esriGeometryEnvelope".to_string()));
                params.push(("inSR", srs.wkid().to_string()));
                params.push(("spatialRel", relationship.to_string()));
            }
            QueryFilter::All => {
                params.push(("where", "1=1".to_string()));
            }
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn plan_order_is_points_then_envelopes() {
        let plan = search_plan();
        assert_eq!(plan.len(), 2 * 9 + 2 * 4);

        assert_eq!(
            plan[0],
            SearchStep::PointBuffer {
                srs: SpatialReference::Wgs84,
                distance_m: 25.0,
                relationship: SpatialRelationship::Intersects,
            }
        );
        assert_eq!(
            plan[9],
            SearchStep::PointBuffer {
                srs: SpatialReference::WebMercator,
                distance_m: 25.0,
                relationship: SpatialRelationship::Intersects,
            }
        );
        assert_eq!(
            plan[18],
            SearchStep::Envelope {
                srs: SpatialReference::Wgs84,
                distance_m: 50.0,
            }
        );
        assert_eq!(
            plan[25],
            SearchStep::Envelope {
                srs: SpatialReference::WebMercator,
                distance_m: 1000.0,
            }
        );
    }

    #[test]
    fn point_query_params() {
        let step = SearchStep::PointBuffer {
            srs: SpatialReference::Wgs84,
            distance_m: 50.0,
            relationship: SpatialRelationship::Contains,
        };
        let params = step
            .to_query(Coordinate::new(39.5, -75.6))
            .to_params("PIN,MAP");

        assert_eq!(param(&params, "f"), Some("json"));
        assert_eq!(param(&params, "outFields"), Some("PIN,MAP"));
        assert_eq!(param(&params, "returnGeometry"), Some("false"));
        assert_eq!(param(&params, "resultRecordCount"), Some("10"));
        assert_eq!(param(&params, "geometry"), Some("-75.6,39.5"));
        assert_eq!(param(&params, "geometryType"), Some("esriGeometryPoint"));
        assert_eq!(param(&params, "inSR"), Some("4326"));
        assert_eq!(param(&params, "spatialRel"), Some("esriSpatialRelContains"));
        assert_eq!(param(&params, "distance"), Some("50"));
        assert_eq!(param(&params, "units"), Some("esriSRUnit_Meter"));
        assert_eq!(param(&params, "where"), None);
    }

    #[test]
    fn envelope_query_params() {
        let step = SearchStep::Envelope {
            srs: SpatialReference::WebMercator,
            distance_m: 150.0,
        };
        let params = step.to_query(Coordinate::new(0.0, 0.0)).to_params("*");

        assert_eq!(param(&params, "geometryType"), Some("esriGeometryEnvelope"));
        assert_eq!(param(&params, "inSR"), Some("3857"));
        assert_eq!(
            param(&params, "spatialRel"),
            Some("esriSpatialRelIntersects")
        );
        assert_eq!(param(&params, "distance"), None);

        let bounds: Vec<f64> = param(&params, "geometry")
            .unwrap()
            .split(',')
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(bounds.len(), 4);
        assert!((bounds[0] - -150.0).abs() < 1e-6);
        assert!((bounds[3] - 150.0).abs() < 1e-6);
    }

    #[test]
    fn probe_has_no_geometry() {
        let params = FeatureQuery::probe().to_params("*");
        assert_eq!(param(&params, "where"), Some("1=1"));
        assert_eq!(param(&params, "resultRecordCount"), Some("3"));
        assert_eq!(param(&params, "geometry"), None);
    }

    #[test]
    fn steps_describe_themselves() {
        let step = SearchStep::PointBuffer {
            srs: SpatialReference::WebMercator,
            distance_m: 250.0,
            relationship: SpatialRelationship::Overlaps,
        };
        assert_eq!(
            step.to_string(),
            "point 250m esriSpatialRelOverlaps (EPSG:3857)"
        );
    }
}
