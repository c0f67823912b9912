#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Jurisdiction routing for parcel lookups.
//!
//! Decides which state's parcel service governs a location ([`router`]),
//! refines that to a county service where the state has one ([`county`]),
//! and exposes the embedded endpoint configuration ([`registry`]).
//!
//! Routing is pure: no network calls, no failures. Anything that cannot be
//! classified falls back to the registry's default state and its statewide
//! service.

pub mod county;
pub mod registry;
pub mod router;

use parcel_lookup_jurisdiction_models::{
    CanonicalField, Coordinate, County, JurisdictionRoute, State,
};

pub use registry::{CountyDefinition, JurisdictionDefinition, JurisdictionRegistry};

/// Errors from loading or validating the jurisdiction registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A jurisdiction file is not valid TOML or does not match the schema.
    #[error("Failed to parse jurisdiction '{name}': {source}")]
    Parse {
        /// Name of the offending file.
        name: String,
        /// Underlying parse error.
        source: toml::de::Error,
    },

    /// No jurisdictions were configured.
    #[error("No jurisdictions configured")]
    Empty,

    /// The same state was configured twice.
    #[error("Jurisdiction {state} is configured more than once")]
    DuplicateState {
        /// The duplicated state.
        state: State,
    },

    /// A state's cross-jurisdiction fallback neighbor is not configured.
    #[error("Jurisdiction {state} has no fallback: {fallback} is not configured")]
    MissingFallback {
        /// State missing its neighbor.
        state: State,
        /// The neighbor that should be configured.
        fallback: State,
    },

    /// No state is marked `default = true`.
    #[error("No default jurisdiction configured")]
    NoDefault,

    /// More than one state is marked `default = true`.
    #[error("Multiple default jurisdictions configured: {states:?}")]
    MultipleDefaults {
        /// The states marked as default.
        states: Vec<State>,
    },

    /// An endpoint has an empty `parcel_id` alias list.
    #[error("Endpoint '{source_label}' has no parcel_id aliases")]
    MissingParcelIdAliases {
        /// Label of the offending endpoint.
        source_label: String,
    },

    /// An alias list contains an empty or whitespace-only attribute name.
    #[error("Endpoint '{source_label}' has a blank {field} alias")]
    BlankAlias {
        /// Label of the offending endpoint.
        source_label: String,
        /// Field whose alias list holds the blank entry.
        field: CanonicalField,
    },

    /// Two county latitude bands overlap.
    #[error("Latitude bands for {first} and {second} overlap")]
    OverlappingBands {
        /// First county.
        first: County,
        /// Second county.
        second: County,
    },
}

/// Computes the full route for a request: state first, then county.
#[must_use]
pub fn route(
    registry: &JurisdictionRegistry,
    address: Option<&str>,
    coord: Option<Coordinate>,
) -> JurisdictionRoute {
    let state = router::decide_route(registry, address, coord);
    let county = registry
        .get(state)
        .and_then(|def| county::detect_county(def, address, coord));

    JurisdictionRoute { state, county }
}

/// Lowercases `text`, turns punctuation into spaces, collapses whitespace,
/// and pads the result with one space on each side.
///
/// Padding lets callers match whole words and phrases with a plain
/// `contains(" dover ")`.
pub(crate) fn padded_words(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();

    let mut out = String::with_capacity(cleaned.len() + 2);
    out.push(' ');
    for word in cleaned.split_whitespace() {
        out.push_str(word);
        out.push(' ');
    }
    out
}
