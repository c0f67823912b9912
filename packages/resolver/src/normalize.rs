//! Maps raw feature attributes onto a [`ParcelRecord`].
//!
//! Each canonical field is filled from the first alias (in configured order)
//! that holds a usable value: present, non-null, and not a blank string.
//! Numbers and booleans are rendered as strings.

use parcel_lookup_jurisdiction_models::{CanonicalField, EndpointConfig};
use parcel_lookup_parcel_models::ParcelRecord;
use parcel_lookup_spatial::RawFeatureAttributes;

/// Placeholder replaced with the parcel ID in viewer URLs.
pub const PARCEL_ID_PLACEHOLDER: &str = "{parcel_id}";

/// Largest magnitude at which every integer is exactly representable in
/// an `f64`.
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Builds a parcel record from a feature's attributes.
///
/// Returns `None` when no `parcel_id` alias holds a usable value.
#[must_use]
pub fn normalize(raw: &RawFeatureAttributes, endpoint: &EndpointConfig) -> Option<ParcelRecord> {
    let field = |f: CanonicalField| first_value(raw, endpoint.field_aliases.aliases(f));

    let Some(parcel_id) = field(CanonicalField::ParcelId) else {
        log::debug!(
            "{}: feature has none of the parcel_id aliases {:?}",
            endpoint.source_label,
            endpoint.field_aliases.parcel_id
        );
        return None;
    };

    Some(ParcelRecord {
        viewer_url: viewer_url(&endpoint.viewer_base_url, &parcel_id),
        map_number: field(CanonicalField::MapNumber),
        grid_number: field(CanonicalField::GridNumber),
        parcel_number: field(CanonicalField::ParcelNumber),
        jurisdiction_name: field(CanonicalField::JurisdictionName),
        source: endpoint.source_label.clone(),
        raw: raw.clone(),
        parcel_id,
    })
}

fn first_value(raw: &RawFeatureAttributes, aliases: &[String]) -> Option<String> {
    aliases
        .iter()
        .find_map(|alias| raw.get(alias).and_then(render))
}

/// Renders a scalar attribute value. Blank strings, nulls, arrays, and
/// objects are not usable.
fn render(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        serde_json::Value::Number(n) => Some(render_number(n)),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            None
        }
    }
}

/// Services often store integral IDs in double columns; `1234.0` renders
/// as `"1234"`.
#[allow(clippy::cast_possible_truncation)]
fn render_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT_INT => {
            (f as i64).to_string()
        }
        _ => n.to_string(),
    }
}

/// Builds the public viewer link for a parcel.
///
/// `{parcel_id}` in the base is replaced with the percent-encoded ID. A base
/// without the placeholder gets a `parcel_id` query parameter instead.
#[must_use]
pub fn viewer_url(base: &str, parcel_id: &str) -> String {
    if base.contains(PARCEL_ID_PLACEHOLDER) {
        let encoded: String = url::form_urlencoded::byte_serialize(parcel_id.as_bytes()).collect();
        return base.replace(PARCEL_ID_PLACEHOLDER, &encoded);
    }

    match url::Url::parse(base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("parcel_id", parcel_id);
            url.to_string()
        }
        Err(e) => {
            log::warn!("Viewer base URL '{base}' does not parse ({e}), appending raw");
            let encoded: String =
                url::form_urlencoded::byte_serialize(parcel_id.as_bytes()).collect();
            let separator = if base.contains('?') { '&' } else { '?' };
            format!("{base}{separator}parcel_id={encoded}")
        }
    }
}
