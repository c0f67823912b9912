//! State-level routing.
//!
//! A coordinate always beats address text: the first bounding box (in
//! registry order) that contains the coordinate wins. Without a coordinate,
//! or when no box contains it, the address text is searched for state names
//! and abbreviations. If that fails too, the registry's default state is
//! returned. This function never fails.

use parcel_lookup_jurisdiction_models::{Coordinate, State};

use crate::padded_words;
use crate::registry::{JurisdictionDefinition, JurisdictionRegistry};

/// Decides which state governs a location.
#[must_use]
pub fn decide_route(
    registry: &JurisdictionRegistry,
    address: Option<&str>,
    coord: Option<Coordinate>,
) -> State {
    if let Some(coord) = coord
        && let Some(def) = registry
            .definitions()
            .iter()
            .find(|d| d.bounds.contains(coord))
    {
        log::debug!(
            "Routed ({}, {}) to {} by bounding box",
            coord.lat,
            coord.lon,
            def.state
        );
        return def.state;
    }

    if let Some(address) = address {
        let text = padded_words(address);
        if let Some(def) = registry
            .definitions()
            .iter()
            .find(|d| mentions_state(d, &text))
        {
            log::debug!("Routed '{address}' to {} by address text", def.state);
            return def.state;
        }
    }

    log::debug!(
        "No routing match, using default state {}",
        registry.default_state()
    );
    registry.default_state()
}

/// Full names match anywhere in the text; abbreviations only as whole words
/// so `"de"` does not match `"Delancey"`.
fn mentions_state(def: &JurisdictionDefinition, padded_text: &str) -> bool {
    def.names
        .iter()
        .any(|name| padded_text.contains(&name.to_lowercase()))
        || def
            .abbreviations
            .iter()
            .any(|abbr| padded_text.contains(&padded_words(abbr)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> JurisdictionRegistry {
        JurisdictionRegistry::embedded().unwrap()
    }

    #[test]
    fn coordinate_beats_address_text() {
        // Inside the Delaware box even though the text says Maryland.
        assert_eq!(
            decide_route(
                &registry(),
                Some("10 Harbor Way, Baltimore, Maryland 21202"),
                Some(Coordinate::new(39.5, -75.6)),
            ),
            State::Delaware
        );
    }

    #[test]
    fn maryland_coordinates_route_to_maryland() {
        assert_eq!(
            decide_route(&registry(), None, Some(Coordinate::new(39.29, -76.61))),
            State::Maryland
        );
    }

    #[test]
    fn uses_text_when_coordinate_is_outside_every_box() {
        assert_eq!(
            decide_route(
                &registry(),
                Some("1 Main St, Hagerstown, MD"),
                Some(Coordinate::new(45.0, -100.0)),
            ),
            State::Maryland
        );
    }

    #[test]
    fn matches_state_names_case_insensitively() {
        assert_eq!(
            decide_route(&registry(), Some("1 main st, easton, MARYLAND"), None),
            State::Maryland
        );
    }

    #[test]
    fn abbreviations_must_be_whole_words() {
        // "md" only appears inside "Amdale", so nothing matches and the
        // default wins.
        assert_eq!(
            decide_route(&registry(), Some("1 Amdale Rd"), None),
            State::Delaware
        );
    }

    #[test]
    fn falls_back_to_default_state() {
        assert_eq!(decide_route(&registry(), None, None), State::Delaware);
        assert_eq!(
            decide_route(&registry(), Some("somewhere unknown"), None),
            State::Delaware
        );
    }
}
