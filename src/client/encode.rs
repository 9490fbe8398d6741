//! Wire encoding of request parameters.
//!
//! POST bodies are form-encoded from the top-level parameters. GET and DELETE
//! flatten nested values into the query string: `parent.child` for mapping
//! entries and `parent[i]` for sequence elements.
//!
//! The server rebuilds the signed text from what it receives, so mapping
//! entries holding `null` are removed with [`without_nulls`] before signing.
//! A `null` sequence element has no query form and is rejected.

use crate::auth::canonical::{canonicalize, format_number};
use crate::core::{AsterError, Result};
use crate::types::{ParamValue, Params};

/// Copy of `params` with every `null` mapping entry removed, at any depth.
///
/// Sequence elements are kept in place so indices do not shift.
#[must_use]
pub fn without_nulls(params: &Params) -> Params {
    params
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), prune(value)))
        .collect()
}

fn prune(value: &ParamValue) -> ParamValue {
    match value {
        ParamValue::Object(map) => ParamValue::Object(without_nulls(map)),
        ParamValue::Array(items) => ParamValue::Array(items.iter().map(prune).collect()),
        other => other.clone(),
    }
}

/// Form body pairs for a POST request.
///
/// Strings are sent verbatim, other scalars as their canonical text and
/// nested values as canonical JSON.
///
/// # Errors
///
/// Returns `AsterError::Encoding` for non-finite numbers.
pub fn form_pairs(params: &Params) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::with_capacity(params.len());
    for (key, value) in params {
        let text = match value {
            ParamValue::Null => continue,
            ParamValue::String(s) => s.clone(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Number(n) => format_number(n)?,
            ParamValue::Array(_) | ParamValue::Object(_) => canonicalize(value)?,
        };
        pairs.push((key.clone(), text));
    }
    Ok(pairs)
}

/// Flattened query pairs for a GET or DELETE request.
///
/// # Errors
///
/// Returns `AsterError::Encoding` for non-finite numbers and `null` sequence
/// elements.
pub fn query_pairs(params: &Params) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        flatten(key, value, &mut pairs)?;
    }
    Ok(pairs)
}

fn flatten(prefix: &str, value: &ParamValue, out: &mut Vec<(String, String)>) -> Result<()> {
    match value {
        ParamValue::Null if prefix.ends_with(']') => {
            return Err(AsterError::encoding_field(
                "Null sequence element cannot be sent in a query string",
                prefix,
            ));
        }
        ParamValue::Null => {}
        ParamValue::Bool(b) => out.push((prefix.to_string(), b.to_string())),
        ParamValue::Number(n) => out.push((prefix.to_string(), format_number(n)?)),
        ParamValue::String(s) => out.push((prefix.to_string(), s.clone())),
        ParamValue::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(&format!("{prefix}[{i}]"), item, out)?;
            }
        }
        ParamValue::Object(map) => {
            for (key, item) in map {
                let nested = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&nested, item, out)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::params_from_json;
    use serde_json::json;

    fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
        list.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_form_pairs() {
        let params = params_from_json(json!({
            "symbol": "BTCUSDT",
            "reduceOnly": true,
            "quantity": 2.0,
            "nonce": 1_700_000_000_000_000u64,
            "clientId": null,
            "legs": [{"b": 1, "a": "x"}],
        }))
        .unwrap();

        assert_eq!(
            form_pairs(&params).unwrap(),
            pairs(&[
                ("legs", r#"[{"a":"x","b":1}]"#),
                ("nonce", "1700000000000000"),
                ("quantity", "2"),
                ("reduceOnly", "true"),
                ("symbol", "BTCUSDT"),
            ])
        );
    }

    #[test]
    fn test_query_pairs_flatten_nested() {
        let params = params_from_json(json!({
            "symbol": "BTCUSDT",
            "filter": {"status": "NEW", "side": "BUY"},
            "ids": [10, 11],
            "skip": null,
        }))
        .unwrap();

        assert_eq!(
            query_pairs(&params).unwrap(),
            pairs(&[
                ("filter.side", "BUY"),
                ("filter.status", "NEW"),
                ("ids[0]", "10"),
                ("ids[1]", "11"),
                ("symbol", "BTCUSDT"),
            ])
        );
    }

    #[test]
    fn test_query_pairs_nested_arrays_of_objects() {
        let params = params_from_json(json!({"orders": [{"id": 1}, {"id": 2}]})).unwrap();
        assert_eq!(
            query_pairs(&params).unwrap(),
            pairs(&[("orders[0].id", "1"), ("orders[1].id", "2")])
        );
    }

    #[test]
    fn test_without_nulls() {
        let params = params_from_json(json!({
            "symbol": "BTCUSDT",
            "clientId": null,
            "filter": {"status": null, "side": "BUY"},
            "legs": [{"id": 1, "tag": null}],
        }))
        .unwrap();

        let expected = params_from_json(json!({
            "symbol": "BTCUSDT",
            "filter": {"side": "BUY"},
            "legs": [{"id": 1}],
        }))
        .unwrap();
        assert_eq!(without_nulls(&params), expected);
    }

    #[test]
    fn test_query_rejects_null_sequence_element() {
        let params = params_from_json(json!({"ids": [1, null, 3]})).unwrap();
        match query_pairs(&params).unwrap_err() {
            AsterError::Encoding { field, .. } => assert_eq!(field.as_deref(), Some("ids[1]")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut params = Params::new();
        params.insert("price".into(), f64::INFINITY.into());
        assert!(form_pairs(&params).is_err());
        assert!(query_pairs(&params).is_err());
    }
}
