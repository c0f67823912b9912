//! County detection within a state that has county-level parcel services.
//!
//! Three heuristics, first match wins:
//!
//! 1. City name found in the locality part of the address.
//! 2. Five-digit postal code found in the address.
//! 3. Coordinate latitude inside a county's band.
//!
//! `None` means "use the statewide service".

use std::sync::LazyLock;

use parcel_lookup_jurisdiction_models::{Coordinate, County};
use regex::Regex;

use crate::padded_words;
use crate::registry::JurisdictionDefinition;

/// ZIP or ZIP+4. Only the five-digit prefix is captured.
static POSTAL_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{5})(?:-\d{4})?\b").expect("valid regex"));

/// Detects the county for an address and/or coordinate.
///
/// Returns `None` when the state has no county services or when none of
/// the heuristics match.
#[must_use]
pub fn detect_county(
    definition: &JurisdictionDefinition,
    address: Option<&str>,
    coord: Option<Coordinate>,
) -> Option<County> {
    if definition.counties.is_empty() {
        return None;
    }

    let by_text = address.and_then(|address| {
        by_city(definition, address).or_else(|| by_postal_code(definition, address))
    });

    by_text.or_else(|| coord.and_then(|c| by_latitude(definition, c.lat)))
}

fn by_city(definition: &JurisdictionDefinition, address: &str) -> Option<County> {
    let locality = padded_words(locality(address));

    definition
        .counties
        .iter()
        .find(|county| {
            county
                .cities
                .iter()
                .any(|city| locality.contains(&padded_words(city)))
        })
        .map(|county| {
            log::debug!("County {} matched by city name", county.county);
            county.county
        })
}

fn by_postal_code(definition: &JurisdictionDefinition, address: &str) -> Option<County> {
    let code = last_postal_code(address)?;

    definition
        .counties
        .iter()
        .find(|county| county.postal_codes.iter().any(|c| c == code))
        .map(|county| {
            log::debug!("County {} matched by postal code {code}", county.county);
            county.county
        })
}

fn by_latitude(definition: &JurisdictionDefinition, lat: f64) -> Option<County> {
    definition
        .counties
        .iter()
        .find(|county| county.latitude_band.is_some_and(|band| band.contains(lat)))
        .map(|county| {
            log::debug!("County {} matched by latitude {lat}", county.county);
            county.county
        })
}

/// Everything after the street line (`"123 Main St, Dover, DE"` →
/// `" Dover, DE"`). Single-segment addresses are returned unchanged.
fn locality(address: &str) -> &str {
    match address.split_once(',') {
        Some((_, rest)) if !rest.trim().is_empty() => rest,
        _ => address,
    }
}

/// The last five-digit postal code in the text, so a leading house number
/// like `"19901 Main St"` does not win over a trailing ZIP.
fn last_postal_code(address: &str) -> Option<&str> {
    POSTAL_CODE_RE
        .captures_iter(address)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use parcel_lookup_jurisdiction_models::State;

    use super::*;
    use crate::JurisdictionRegistry;

    fn delaware() -> JurisdictionDefinition {
        JurisdictionRegistry::embedded()
            .unwrap()
            .get(State::Delaware)
            .unwrap()
            .clone()
    }

    #[test]
    fn city_name_wins_over_postal_code() {
        // Wilmington is New Castle, 19901 is Kent.
        assert_eq!(
            detect_county(&delaware(), Some("1 Market St, Wilmington, DE 19901"), None),
            Some(County::NewCastle)
        );
    }

    #[test]
    fn street_names_do_not_count_as_cities() {
        assert_eq!(
            detect_county(&delaware(), Some("12 Dover Rd, Lewes, DE"), None),
            Some(County::Sussex)
        );
    }

    #[test]
    fn city_match_is_case_insensitive() {
        assert_eq!(
            detect_county(&delaware(), Some("5 ocean ave, REHOBOTH BEACH, de"), None),
            Some(County::Sussex)
        );
    }

    #[test]
    fn falls_back_to_postal_code() {
        assert_eq!(
            detect_county(&delaware(), Some("400 Unknown Ln, Somewhere, DE 19963"), None),
            Some(County::Sussex)
        );
    }

    #[test]
    fn uses_last_postal_code_not_house_number() {
        assert_eq!(last_postal_code("19901 Some Rd, DE 19720"), Some("19720"));
        assert_eq!(last_postal_code("1 Main St, DE 19904-1234"), Some("19904"));
        assert_eq!(last_postal_code("1 Main St"), None);
    }

    #[test]
    fn falls_back_to_latitude_band() {
        let de = delaware();
        assert_eq!(
            detect_county(&de, None, Some(Coordinate::new(39.5, -75.6))),
            Some(County::NewCastle)
        );
        assert_eq!(
            detect_county(&de, None, Some(Coordinate::new(39.158, -75.524))),
            Some(County::Kent)
        );
        assert_eq!(
            detect_county(&de, None, Some(Coordinate::new(38.6, -75.3))),
            Some(County::Sussex)
        );
    }

    #[test]
    fn returns_none_outside_every_heuristic() {
        assert_eq!(
            detect_county(
                &delaware(),
                Some("1 Nowhere Rd"),
                Some(Coordinate::new(40.5, -75.5))
            ),
            None
        );
    }

    #[test]
    fn states_without_counties_never_match() {
        let registry = JurisdictionRegistry::embedded().unwrap();
        let maryland = registry.get(State::Maryland).unwrap();
        assert_eq!(
            detect_county(
                maryland,
                Some("1 Main St, Dover, DE 19901"),
                Some(Coordinate::new(39.158, -75.524))
            ),
            None
        );
    }
}
