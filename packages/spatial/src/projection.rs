//! Coordinate conversions for building query geometries.
//!
//! Feature services are queried in either WGS84 (EPSG:4326) or spherical
//! Web Mercator (EPSG:3857). Points are expressed as `x = lon, y = lat` in
//! WGS84 and as projected meters in Web Mercator.

use std::f64::consts::PI;

use geo::{Point, Rect};
use parcel_lookup_jurisdiction_models::Coordinate;

use crate::plan::SpatialReference;

/// Half the equatorial circumference of the Web Mercator sphere, in meters.
pub const WEB_MERCATOR_EXTENT: f64 = 20_037_508.34;

/// Latitude at which Web Mercator becomes square; the poles project to
/// infinity, so latitudes beyond this are clamped.
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_78;

/// Approximate length of one degree of latitude, in meters.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Projects a WGS84 coordinate to Web Mercator meters.
///
/// Latitude is clamped to [`WEB_MERCATOR_MAX_LAT`] so the result is always
/// finite.
#[must_use]
pub fn to_web_mercator(coord: Coordinate) -> Point<f64> {
    let lat = coord.lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);
    let x = coord.lon * WEB_MERCATOR_EXTENT / 180.0;
    let y = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    Point::new(x, y * WEB_MERCATOR_EXTENT / 180.0)
}

/// The coordinate as a point in the given spatial reference.
#[must_use]
pub fn point_in(coord: Coordinate, srs: SpatialReference) -> Point<f64> {
    match srs {
        SpatialReference::Wgs84 => Point::new(coord.lon, coord.lat),
        SpatialReference::WebMercator => to_web_mercator(coord),
    }
}

/// A square-ish envelope extending `distance_m` meters from the coordinate
/// in every direction, expressed in the given spatial reference.
///
/// In WGS84 the longitude half-width widens with latitude
/// (`Δlon = m / (111320 × cos(lat))`).
#[must_use]
pub fn envelope_around(coord: Coordinate, srs: SpatialReference, distance_m: f64) -> Rect<f64> {
    match srs {
        SpatialReference::Wgs84 => {
            let d_lat = distance_m / METERS_PER_DEGREE;
            let d_lon = distance_m / (METERS_PER_DEGREE * coord.lat.to_radians().cos());
            Rect::new(
                (coord.lon - d_lon, coord.lat - d_lat),
                (coord.lon + d_lon, coord.lat + d_lat),
            )
        }
        SpatialReference::WebMercator => {
            let center = to_web_mercator(coord);
            Rect::new(
                (center.x() - distance_m, center.y() - distance_m),
                (center.x() + distance_m, center.y() + distance_m),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-3;

    #[test]
    fn projects_known_point() {
        let p = to_web_mercator(Coordinate::new(39.5, -75.6));
        assert!((p.x() - -8_415_753.502_8).abs() < EPS);
        assert!((p.y() - 4_793_547.458_4).abs() < EPS);
    }

    #[test]
    fn equator_and_antimeridian() {
        let origin = to_web_mercator(Coordinate::new(0.0, 0.0));
        assert!(origin.x().abs() < EPS);
        assert!(origin.y().abs() < EPS);

        let east = to_web_mercator(Coordinate::new(0.0, 180.0));
        assert!((east.x() - WEB_MERCATOR_EXTENT).abs() < EPS);
    }

    #[test]
    fn poles_are_clamped_to_the_mercator_square() {
        for (lat, sign) in [(-90.0, -1.0), (90.0, 1.0)] {
            let p = to_web_mercator(Coordinate::new(lat, -75.6));
            assert!(p.y().is_finite(), "lat {lat} projected to {}", p.y());
            assert!((p.y() - sign * WEB_MERCATOR_EXTENT).abs() < 1.0);
        }

        let rect = envelope_around(
            Coordinate::new(-90.0, 0.0),
            SpatialReference::WebMercator,
            50.0,
        );
        assert!(rect.min().y.is_finite());
    }

    #[test]
    fn wgs84_point_is_lon_lat() {
        let p = point_in(Coordinate::new(39.5, -75.6), SpatialReference::Wgs84);
        assert!((p.x() - -75.6).abs() < f64::EPSILON);
        assert!((p.y() - 39.5).abs() < f64::EPSILON);
    }

    #[test]
    fn wgs84_envelope_widens_longitude_with_latitude() {
        let rect = envelope_around(Coordinate::new(39.5, -75.6), SpatialReference::Wgs84, 100.0);
        let half_height = (rect.max().y - rect.min().y) / 2.0;
        let half_width = (rect.max().x - rect.min().x) / 2.0;
        assert!((half_height - 0.000_898_311).abs() < 1e-8);
        assert!((half_width - 0.001_164_182).abs() < 1e-8);
    }

    #[test]
    fn mercator_envelope_is_offset_in_meters() {
        let coord = Coordinate::new(39.5, -75.6);
        let center = to_web_mercator(coord);
        let rect = envelope_around(coord, SpatialReference::WebMercator, 400.0);
        assert!((rect.min().x - (center.x() - 400.0)).abs() < EPS);
        assert!((rect.max().y - (center.y() + 400.0)).abs() < EPS);
    }
}
