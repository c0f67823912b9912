//! Compile-time registry of jurisdiction configurations.
//!
//! Each state is defined in a TOML file under `jurisdictions/`. The files
//! are embedded with [`include_str!`], parsed once at startup, validated, and
//! then shared read-only for the lifetime of the process.

use std::collections::BTreeSet;

use parcel_lookup_jurisdiction_models::{
    BoundingBox, CanonicalField, County, EndpointConfig, JurisdictionRoute, LatitudeBand, State,
};
use serde::Deserialize;

use crate::RegistryError;

/// A state-level jurisdiction loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct JurisdictionDefinition {
    /// Which state this file describes.
    pub state: State,
    /// Human-readable name.
    pub name: String,
    /// Whether this is the primary market used when nothing else matches.
    #[serde(default)]
    pub default: bool,
    /// Full names matched as substrings of the address text.
    #[serde(default)]
    pub names: Vec<String>,
    /// Abbreviations matched as whole words of the address text.
    #[serde(default)]
    pub abbreviations: Vec<String>,
    /// Hand-tuned bounding box tested before any text matching.
    pub bounds: BoundingBox,
    /// Statewide parcel service (also the cross-jurisdiction fallback target).
    pub endpoint: EndpointConfig,
    /// County services, ordered north to south.
    #[serde(default)]
    pub counties: Vec<CountyDefinition>,
}

/// A county-level service within a state.
#[derive(Debug, Clone, Deserialize)]
pub struct CountyDefinition {
    /// County tag.
    pub county: County,
    /// Human-readable name.
    pub name: String,
    /// City names inside the county, lowercase.
    #[serde(default)]
    pub cities: Vec<String>,
    /// Five-digit postal codes inside the county.
    #[serde(default)]
    pub postal_codes: Vec<String>,
    /// Latitude band used when neither city nor postal code matched.
    pub latitude_band: Option<LatitudeBand>,
    /// County parcel service.
    pub endpoint: EndpointConfig,
}

// ── Compile-time embedded TOML files ────────────────────────────────

/// Registry order matters: the router tests bounding boxes in this order,
/// and Maryland's box covers part of Delaware.
const JURISDICTION_TOMLS: &[(&str, &str)] = &[
    ("delaware", include_str!("../jurisdictions/delaware.toml")),
    ("maryland", include_str!("../jurisdictions/maryland.toml")),
];

/// Validated, immutable set of jurisdiction definitions.
#[derive(Debug, Clone)]
pub struct JurisdictionRegistry {
    definitions: Vec<JurisdictionDefinition>,
    default_state: State,
}

impl JurisdictionRegistry {
    /// Loads the jurisdictions embedded in the binary.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if any embedded file is malformed or the
    /// set fails validation.
    pub fn embedded() -> Result<Self, RegistryError> {
        Self::from_tomls(JURISDICTION_TOMLS)
    }

    /// Parses `(name, toml)` pairs into a validated registry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] for malformed TOML, or any of the
    /// validation errors from [`Self::new`].
    pub fn from_tomls(tomls: &[(&str, &str)]) -> Result<Self, RegistryError> {
        let definitions = tomls
            .iter()
            .map(|(name, toml_str)| {
                toml::de::from_str(toml_str).map_err(|source| RegistryError::Parse {
                    name: (*name).to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<JurisdictionDefinition>, _>>()?;

        Self::new(definitions)
    }

    /// Validates a list of definitions, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the list is empty, a state appears
    /// twice, there is not exactly one default, a state's fallback neighbor
    /// is missing, any endpoint has no parcel ID aliases, or county latitude
    /// bands overlap.
    pub fn new(definitions: Vec<JurisdictionDefinition>) -> Result<Self, RegistryError> {
        if definitions.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = BTreeSet::new();
        for def in &definitions {
            if !seen.insert(def.state) {
                return Err(RegistryError::DuplicateState { state: def.state });
            }
        }

        for def in &definitions {
            if !seen.contains(&def.state.opposite()) {
                return Err(RegistryError::MissingFallback {
                    state: def.state,
                    fallback: def.state.opposite(),
                });
            }
            validate_endpoint(&def.endpoint)?;
            validate_counties(def)?;
        }

        let defaults: Vec<State> = definitions
            .iter()
            .filter(|d| d.default)
            .map(|d| d.state)
            .collect();
        let default_state = match defaults.as_slice() {
            [state] => *state,
            [] => return Err(RegistryError::NoDefault),
            _ => return Err(RegistryError::MultipleDefaults { states: defaults }),
        };

        log::debug!(
            "Loaded {} jurisdictions (default: {default_state})",
            definitions.len()
        );

        Ok(Self {
            definitions,
            default_state,
        })
    }

    /// All definitions in routing order.
    #[must_use]
    pub fn definitions(&self) -> &[JurisdictionDefinition] {
        &self.definitions
    }

    /// The primary market, used when routing finds no better match.
    #[must_use]
    pub const fn default_state(&self) -> State {
        self.default_state
    }

    /// Looks up a state's definition.
    #[must_use]
    pub fn get(&self, state: State) -> Option<&JurisdictionDefinition> {
        self.definitions.iter().find(|d| d.state == state)
    }

    /// Returns the statewide endpoint for a state.
    #[must_use]
    pub fn statewide_endpoint(&self, state: State) -> Option<&EndpointConfig> {
        self.get(state).map(|d| &d.endpoint)
    }

    /// Returns the endpoint that governs a route: the county service when a
    /// county was detected, otherwise the statewide service.
    #[must_use]
    pub fn endpoint(&self, route: JurisdictionRoute) -> Option<&EndpointConfig> {
        let def = self.get(route.state)?;
        match route.county {
            Some(county) => def
                .counties
                .iter()
                .find(|c| c.county == county)
                .map(|c| &c.endpoint),
            None => Some(&def.endpoint),
        }
    }
}

fn validate_endpoint(endpoint: &EndpointConfig) -> Result<(), RegistryError> {
    if endpoint.field_aliases.parcel_id.is_empty() {
        return Err(RegistryError::MissingParcelIdAliases {
            source_label: endpoint.source_label.clone(),
        });
    }

    for &field in CanonicalField::ALL {
        if endpoint
            .field_aliases
            .aliases(field)
            .iter()
            .any(|alias| alias.trim().is_empty())
        {
            return Err(RegistryError::BlankAlias {
                source_label: endpoint.source_label.clone(),
                field,
            });
        }
    }
    Ok(())
}

fn validate_counties(def: &JurisdictionDefinition) -> Result<(), RegistryError> {
    let bands: Vec<(County, LatitudeBand)> = def
        .counties
        .iter()
        .filter_map(|c| c.latitude_band.map(|b| (c.county, b)))
        .collect();

    for (i, (a_county, a)) in bands.iter().enumerate() {
        for (b_county, b) in &bands[i + 1..] {
            if a.overlaps(b) {
                return Err(RegistryError::OverlappingBands {
                    first: *a_county,
                    second: *b_county,
                });
            }
        }
    }

    for county in &def.counties {
        validate_endpoint(&county.endpoint)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_DE: &str = r#"
        state = "delaware"
        name = "Delaware"
        default = true

        [bounds]
        min_lat = 38.4
        max_lat = 39.9
        min_lon = -75.8
        max_lon = -75.0

        [endpoint]
        endpoint_url = "https://de.test/query"
        source_label = "DE"
        viewer_base_url = "https://de.test/{parcel_id}"

        [endpoint.field_aliases]
        parcel_id = ["PIN"]
    "#;

    const MINIMAL_MD: &str = r#"
        state = "maryland"
        name = "Maryland"

        [bounds]
        min_lat = 37.9
        max_lat = 39.7
        min_lon = -79.5
        max_lon = -75.0

        [endpoint]
        endpoint_url = "https://md.test/query"
        source_label = "MD"
        viewer_base_url = "https://md.test/{parcel_id}"

        [endpoint.field_aliases]
        parcel_id = ["ACCTID"]
    "#;

    #[test]
    fn loads_embedded_jurisdictions() {
        let registry = JurisdictionRegistry::embedded().unwrap();
        assert_eq!(registry.definitions().len(), JURISDICTION_TOMLS.len());
        assert_eq!(registry.default_state(), State::Delaware);
    }

    #[test]
    fn delaware_is_tested_before_maryland() {
        let registry = JurisdictionRegistry::embedded().unwrap();
        let order: Vec<State> = registry.definitions().iter().map(|d| d.state).collect();
        assert_eq!(order, vec![State::Delaware, State::Maryland]);
    }

    #[test]
    fn every_county_has_an_endpoint() {
        let registry = JurisdictionRegistry::embedded().unwrap();
        let delaware = registry.get(State::Delaware).unwrap();
        for county in [County::NewCastle, County::Kent, County::Sussex] {
            let endpoint = registry
                .endpoint(JurisdictionRoute {
                    state: State::Delaware,
                    county: Some(county),
                })
                .unwrap();
            assert!(!endpoint.endpoint_url.is_empty());
            assert!(delaware.counties.iter().any(|c| c.county == county));
        }
    }

    #[test]
    fn embedded_postal_codes_are_disjoint_and_five_digits() {
        let registry = JurisdictionRegistry::embedded().unwrap();
        let mut seen = BTreeSet::new();
        for def in registry.definitions() {
            for county in &def.counties {
                for code in &county.postal_codes {
                    assert_eq!(code.len(), 5, "bad postal code {code}");
                    assert!(code.chars().all(|c| c.is_ascii_digit()));
                    assert!(seen.insert(code.clone()), "{code} listed twice");
                }
            }
        }
    }

    #[test]
    fn route_without_county_uses_statewide_endpoint() {
        let registry = JurisdictionRegistry::embedded().unwrap();
        let endpoint = registry
            .endpoint(JurisdictionRoute {
                state: State::Maryland,
                county: None,
            })
            .unwrap();
        assert_eq!(
            endpoint,
            registry.statewide_endpoint(State::Maryland).unwrap()
        );
    }

    #[test]
    fn rejects_missing_fallback_neighbor() {
        let err = JurisdictionRegistry::from_tomls(&[("de", MINIMAL_DE)]).unwrap_err();
        assert!(matches!(err, RegistryError::MissingFallback { .. }));
    }

    #[test]
    fn rejects_duplicate_states() {
        let err = JurisdictionRegistry::from_tomls(&[("a", MINIMAL_DE), ("b", MINIMAL_DE)])
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::DuplicateState {
                state: State::Delaware
            }
        ));
    }

    #[test]
    fn requires_a_default_state() {
        let no_default = MINIMAL_DE.replace("default = true", "");
        let err = JurisdictionRegistry::from_tomls(&[("de", &no_default), ("md", MINIMAL_MD)])
            .unwrap_err();
        assert!(matches!(err, RegistryError::NoDefault));
    }

    #[test]
    fn rejects_empty_parcel_id_aliases() {
        let broken = MINIMAL_MD.replace(r#"parcel_id = ["ACCTID"]"#, "parcel_id = []");
        let err =
            JurisdictionRegistry::from_tomls(&[("de", MINIMAL_DE), ("md", &broken)]).unwrap_err();
        assert!(matches!(err, RegistryError::MissingParcelIdAliases { .. }));
    }

    #[test]
    fn rejects_blank_optional_aliases() {
        let broken = MINIMAL_DE.replace(
            r#"parcel_id = ["PIN"]"#,
            "parcel_id = [\"PIN\"]\n        map_number = [\"MAP\", \"  \"]",
        );
        let err =
            JurisdictionRegistry::from_tomls(&[("de", &broken), ("md", MINIMAL_MD)]).unwrap_err();
        let RegistryError::BlankAlias { source_label, field } = &err else {
            panic!("expected a blank alias error, got {err:?}");
        };
        assert_eq!(source_label, "DE");
        assert_eq!(*field, CanonicalField::MapNumber);
    }

    #[test]
    fn reports_malformed_toml_by_name() {
        let err = JurisdictionRegistry::from_tomls(&[("broken", "state = ")]).unwrap_err();
        assert!(matches!(err, RegistryError::Parse { ref name, .. } if name == "broken"));
    }
}
