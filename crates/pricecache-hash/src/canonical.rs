//! Recursive canonicalization of pricing request payloads.
//!
//! Two requests that mean the same thing must canonicalize to structurally
//! equal trees: object key order, primitive array order, and the casing of
//! configured identifier fields never affect the output. Nullish values are
//! dropped entirely rather than kept as placeholders.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Largest float that still maps losslessly onto an integer (2^53).
const MAX_INTEGRAL_F64: f64 = 9_007_199_254_740_992.0;

/// Canonical form of a request value.
///
/// An explicit discriminated union so every canonicalization rule is an
/// exhaustive match. Mappings use a [`BTreeMap`], which gives the stable
/// ordinal key order required for deterministic serialization.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    Bool(bool),
    Num(Number),
    Str(String),
    Seq(Vec<CanonicalValue>),
    Map(BTreeMap<String, CanonicalValue>),
}

impl CanonicalValue {
    /// Renders the compact canonical JSON for this value.
    ///
    /// Hand-rolled writer rather than a serde round-trip: the output must be
    /// byte-deterministic and the writer is infallible for this type.
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out);
        out
    }

    fn write_json(&self, out: &mut String) {
        match self {
            CanonicalValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            CanonicalValue::Num(n) => {
                out.push_str(&n.to_string());
            }
            CanonicalValue::Str(s) => write_escaped(out, s),
            CanonicalValue::Seq(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_json(out);
                }
                out.push(']');
            }
            CanonicalValue::Map(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    write_escaped(out, key);
                    out.push(':');
                    value.write_json(out);
                }
                out.push('}');
            }
        }
    }

    fn is_primitive(&self) -> bool {
        matches!(
            self,
            CanonicalValue::Bool(_) | CanonicalValue::Num(_) | CanonicalValue::Str(_)
        )
    }
}

/// Field sets that control case folding during canonicalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalizeOptions {
    /// String values under these keys are lower-cased.
    pub lowercase_keys: BTreeSet<String>,

    /// String elements of arrays under these keys are lower-cased.
    pub lowercase_array_keys: BTreeSet<String>,
}

impl Default for CanonicalizeOptions {
    fn default() -> Self {
        let lowercase_keys = [
            "process",
            "process_type",
            "material_code",
            "material_id",
            "leadtime_profile",
            "lead_time_option",
            "ship_to_region",
            "catalog_version",
            "pricing_factors_version",
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect();

        let lowercase_array_keys = [
            "finishes",
            "finish_ids",
            "tolerances",
            "secondary_operations",
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect();

        Self {
            lowercase_keys,
            lowercase_array_keys,
        }
    }
}

/// Canonicalizes a request value.
///
/// Returns `None` for nullish input; containers drop nullish members rather
/// than storing a placeholder.
pub fn canonicalize(value: &Value, options: &CanonicalizeOptions) -> Option<CanonicalValue> {
    canonicalize_at(value, None, options)
}

/// Canonicalizes and serializes in one step. Nullish input renders as `null`.
pub fn to_canonical_json(value: &Value, options: &CanonicalizeOptions) -> String {
    match canonicalize(value, options) {
        Some(canonical) => canonical.to_json(),
        None => "null".to_string(),
    }
}

fn canonicalize_at(
    value: &Value,
    parent_key: Option<&str>,
    options: &CanonicalizeOptions,
) -> Option<CanonicalValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(CanonicalValue::Bool(*b)),
        Value::Number(n) => Some(CanonicalValue::Num(round_number(n))),
        Value::String(s) => {
            let fold = parent_key.is_some_and(|key| options.lowercase_keys.contains(key));
            let text = if fold { s.to_lowercase() } else { s.clone() };
            Some(CanonicalValue::Str(text))
        }
        Value::Array(items) => Some(canonicalize_array(items, parent_key, options)),
        Value::Object(map) => Some(canonicalize_object(map, options)),
    }
}

fn canonicalize_array(
    items: &[Value],
    parent_key: Option<&str>,
    options: &CanonicalizeOptions,
) -> CanonicalValue {
    // Elements inherit the array's enclosing key for lowercase-field lookups.
    let mut canonical: Vec<CanonicalValue> = items
        .iter()
        .filter_map(|item| canonicalize_at(item, parent_key, options))
        .collect();

    if canonical.is_empty() {
        return CanonicalValue::Seq(canonical);
    }

    if parent_key.is_some_and(|key| options.lowercase_array_keys.contains(key)) {
        for item in &mut canonical {
            if let CanonicalValue::Str(s) = item {
                *s = s.to_lowercase();
            }
        }
    }

    if canonical.iter().all(CanonicalValue::is_primitive) {
        canonical.sort_by(primitive_cmp);
    } else {
        // Composite elements sort by their own canonical serialization.
        canonical.sort_by_key(|item| item.to_json());
    }

    CanonicalValue::Seq(canonical)
}

fn canonicalize_object(
    map: &serde_json::Map<String, Value>,
    options: &CanonicalizeOptions,
) -> CanonicalValue {
    let mut entries = BTreeMap::new();
    for (key, value) in map {
        if let Some(canonical) = canonicalize_at(value, Some(key.as_str()), options) {
            entries.insert(key.clone(), canonical);
        }
    }
    CanonicalValue::Map(entries)
}

/// Rounds to six decimal places, half up, and folds negative zero into
/// zero. Integers pass through untouched.
fn round_number(n: &Number) -> Number {
    if n.is_i64() || n.is_u64() {
        return n.clone();
    }
    let Some(f) = n.as_f64() else {
        return n.clone();
    };

    let rounded = round_half_up(f * 1_000_000.0) / 1_000_000.0;
    if rounded == 0.0 {
        // Folds negative zero.
        return Number::from(0);
    }

    if rounded.fract() == 0.0 && rounded.abs() <= MAX_INTEGRAL_F64 {
        Number::from(rounded as i64)
    } else {
        // from_f64 only rejects non-finite values; an overflowing multiply
        // above lands here and keeps the original token.
        Number::from_f64(rounded).unwrap_or_else(|| n.clone())
    }
}

/// Nearest integer, with ties rounding toward positive infinity.
///
/// `f64::round` rounds ties away from zero, which disagrees on negative
/// ties; only the exact `-x.5` case needs adjusting.
fn round_half_up(value: f64) -> f64 {
    if value.fract() == -0.5 {
        value + 0.5
    } else {
        value.round()
    }
}

/// Total order over canonical primitives.
///
/// Same-typed values compare natively; mixed types fall back to a
/// type-tagged string key so the order stays total.
fn primitive_cmp(a: &CanonicalValue, b: &CanonicalValue) -> Ordering {
    match (a, b) {
        (CanonicalValue::Num(x), CanonicalValue::Num(y)) => compare_numbers(x, y),
        (CanonicalValue::Bool(x), CanonicalValue::Bool(y)) => x.cmp(y),
        (CanonicalValue::Str(x), CanonicalValue::Str(y)) => x.cmp(y),
        _ => tagged_key(a).cmp(&tagged_key(b)),
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a.cmp(&b);
    }
    let a = x.as_f64().unwrap_or_default();
    let b = y.as_f64().unwrap_or_default();
    // Tie-break on the rendered token so equal-looking floats stay ordered.
    a.total_cmp(&b).then_with(|| x.to_string().cmp(&y.to_string()))
}

fn tagged_key(value: &CanonicalValue) -> String {
    match value {
        CanonicalValue::Str(s) => format!("s:{s}"),
        CanonicalValue::Num(n) => format!("n:{n}"),
        CanonicalValue::Bool(true) => "b:1".to_string(),
        CanonicalValue::Bool(false) => "b:0".to_string(),
        // Callers only pass primitives; composites already sorted elsewhere.
        CanonicalValue::Seq(_) | CanonicalValue::Map(_) => value.to_json(),
    }
}

fn write_escaped(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical_json(value: &Value) -> String {
        to_canonical_json(value, &CanonicalizeOptions::default())
    }

    #[test]
    fn test_nullish_values_are_dropped_at_any_depth() {
        let value = json!({"a": 1, "b": null, "c": {"d": null, "e": 2}});
        assert_eq!(canonical_json(&value), r#"{"a":1,"c":{"e":2}}"#);
    }

    #[test]
    fn test_null_root_serializes_as_null() {
        assert_eq!(canonical_json(&Value::Null), "null");
    }

    #[test]
    fn test_object_key_order_is_irrelevant() {
        let a = json!({"x": 1, "y": 2, "z": 3});
        let b = json!({"z": 3, "x": 1, "y": 2});
        assert_eq!(canonical_json(&a), canonical_json(&b));
    }

    #[test]
    fn test_primitive_array_order_is_irrelevant() {
        let a = json!({"sizes": [3, 1, 2]});
        let b = json!({"sizes": [2, 3, 1]});
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(canonical_json(&a), r#"{"sizes":[1,2,3]}"#);
    }

    #[test]
    fn test_mixed_primitive_array_has_total_order() {
        let a = json!({"tags": ["a", 2, true, false]});
        let b = json!({"tags": [false, "a", true, 2]});
        assert_eq!(canonical_json(&a), canonical_json(&b));
    }

    #[test]
    fn test_composite_array_sorts_by_serialization() {
        let a = json!({"parts": [{"id": "b"}, {"id": "a"}]});
        let b = json!({"parts": [{"id": "a"}, {"id": "b"}]});
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(canonical_json(&a), r#"{"parts":[{"id":"a"},{"id":"b"}]}"#);
    }

    #[test]
    fn test_float_rounding_to_six_decimals() {
        let value = json!({"price": 12.12345678});
        assert_eq!(canonical_json(&value), r#"{"price":12.123457}"#);
    }

    #[test]
    fn test_ties_round_toward_positive_infinity() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-0.5), 0.0);
        assert_eq!(round_half_up(-1.5), -1.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-1.7), -2.0);
        assert_eq!(round_half_up(1.2), 1.0);
    }

    #[test]
    fn test_negative_rounding_mirrors_positive_away_from_ties() {
        let value = json!({"price": -12.12345678});
        assert_eq!(canonical_json(&value), r#"{"price":-12.123457}"#);
    }

    #[test]
    fn test_negative_zero_folds_to_zero() {
        let value = json!({"offset": -0.0});
        assert_eq!(canonical_json(&value), r#"{"offset":0}"#);
    }

    #[test]
    fn test_integral_floats_render_without_fraction() {
        let value = json!({"quantity": 25.0});
        assert_eq!(canonical_json(&value), r#"{"quantity":25}"#);
    }

    #[test]
    fn test_integers_pass_through() {
        let value = json!({"quantity": 25});
        assert_eq!(canonical_json(&value), r#"{"quantity":25}"#);
    }

    #[test]
    fn test_lowercase_keys_fold_case() {
        let a = json!({"process": "CNC_MILLING"});
        let b = json!({"process": "cnc_milling"});
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(canonical_json(&a), r#"{"process":"cnc_milling"}"#);
    }

    #[test]
    fn test_unlisted_keys_keep_case() {
        let value = json!({"note": "Keep My Case"});
        assert_eq!(canonical_json(&value), r#"{"note":"Keep My Case"}"#);
    }

    #[test]
    fn test_lowercase_array_keys_fold_elements() {
        let a = json!({"finishes": ["Anodize", "POWDER"]});
        let b = json!({"finishes": ["powder", "anodize"]});
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(canonical_json(&a), r#"{"finishes":["anodize","powder"]}"#);
    }

    #[test]
    fn test_null_array_elements_are_dropped() {
        let value = json!({"tolerances": ["ISO7", null, "ISO6"]});
        assert_eq!(canonical_json(&value), r#"{"tolerances":["iso6","iso7"]}"#);
    }

    #[test]
    fn test_empty_array_survives() {
        let value = json!({"finishes": []});
        assert_eq!(canonical_json(&value), r#"{"finishes":[]}"#);
    }

    #[test]
    fn test_string_escaping() {
        let value = json!({"note": "line\none \"two\" \\ three"});
        assert_eq!(
            canonical_json(&value),
            r#"{"note":"line\none \"two\" \\ three"}"#
        );
    }

    #[test]
    fn test_custom_option_sets() {
        let mut options = CanonicalizeOptions::default();
        options.lowercase_keys.insert("customer_ref".to_string());

        let value = json!({"customer_ref": "ABC"});
        assert_eq!(
            to_canonical_json(&value, &options),
            r#"{"customer_ref":"abc"}"#
        );
    }

    #[test]
    fn test_structural_equality_of_canonical_trees() {
        let options = CanonicalizeOptions::default();
        let a = canonicalize(&json!({"b": [2, 1], "a": null, "c": 1.0}), &options);
        let b = canonicalize(&json!({"c": 1, "b": [1, 2]}), &options);
        assert_eq!(a, b);
    }
}
