//! Canonical JSON text of a parameter tree.
//!
//! The server re-derives this text from the parameters it receives and hashes
//! it, so the output must be byte-for-byte stable:
//!
//! - mapping keys in byte-wise lexicographic order at every depth
//! - sequences in their original order
//! - compact notation, no whitespace
//! - explicit `null` preserved
//! - one textual form per number
//! - `<`, `>`, `&`, U+2028 and U+2029 escaped as `\u` sequences

use crate::core::{AsterError, Result};
use crate::types::{Number, ParamValue, Params};

/// Canonicalize a single parameter tree.
///
/// # Errors
///
/// Returns [`AsterError::Encoding`] if the tree contains a non-finite float.
pub fn canonicalize(value: &ParamValue) -> Result<String> {
    let mut out = String::new();
    write_value(&mut out, value)?;
    Ok(out)
}

/// Canonicalize top-level request parameters as a JSON object.
///
/// # Errors
///
/// Returns [`AsterError::Encoding`] if any value contains a non-finite float.
pub fn canonicalize_params(params: &Params) -> Result<String> {
    let mut out = String::new();
    write_object(&mut out, params)?;
    Ok(out)
}

fn write_value(out: &mut String, value: &ParamValue) -> Result<()> {
    match value {
        ParamValue::Null => out.push_str("null"),
        ParamValue::Bool(true) => out.push_str("true"),
        ParamValue::Bool(false) => out.push_str("false"),
        ParamValue::Number(n) => out.push_str(&format_number(n)?),
        ParamValue::String(s) => write_string(out, s)?,
        ParamValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item)?;
            }
            out.push(']');
        }
        ParamValue::Object(map) => write_object(out, map)?,
    }
    Ok(())
}

fn write_object(out: &mut String, map: &Params) -> Result<()> {
    out.push('{');
    // BTreeMap<String, _> iterates in byte-wise key order
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(out, key)?;
        out.push(':');
        write_value(out, value)?;
    }
    out.push('}');
    Ok(())
}

fn write_string(out: &mut String, s: &str) -> Result<()> {
    let quoted = serde_json::to_string(s)
        .map_err(|e| AsterError::encoding(format!("Failed to encode string: {e}")))?;
    // The verifier also escapes HTML-sensitive characters and JS line separators
    for c in quoted.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    Ok(())
}

/// Render a number the way the verifier does.
///
/// Floats use the shortest round-trip digits. Integral floats carry no
/// fractional part. Magnitudes below `1e-6` or from `1e21` up switch to
/// exponent form with an explicit sign on positive exponents (`1e+21`).
///
/// # Errors
///
/// Returns [`AsterError::Encoding`] for NaN and infinities.
pub fn format_number(n: &Number) -> Result<String> {
    match *n {
        Number::UInt(v) => Ok(v.to_string()),
        Number::Int(v) => Ok(v.to_string()),
        Number::Float(v) => format_float(v),
    }
}

fn format_float(v: f64) -> Result<String> {
    if !v.is_finite() {
        return Err(AsterError::encoding(format!(
            "Non-finite number {v} has no canonical text"
        )));
    }

    let abs = v.abs();
    if abs != 0.0 && !(1e-6..1e21).contains(&abs) {
        let mut text = format!("{v:e}");
        if let Some(pos) = text.find('e') {
            if !text[pos + 1..].starts_with('-') {
                text.insert(pos + 1, '+');
            }
        }
        return Ok(text);
    }

    Ok(format!("{v}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::params_from_json;
    use serde_json::json;

    fn canon(value: serde_json::Value) -> String {
        canonicalize(&ParamValue::from(value)).unwrap()
    }

    #[test]
    fn test_sorts_top_level_keys() {
        let params = params_from_json(json!({
            "symbol": "BTCUSDT",
            "side": "BUY",
            "quantity": "1.5",
        }))
        .unwrap();

        assert_eq!(
            canonicalize_params(&params).unwrap(),
            r#"{"quantity":"1.5","side":"BUY","symbol":"BTCUSDT"}"#
        );
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let mut a = Params::new();
        a.insert("zeta".into(), 1u64.into());
        a.insert("alpha".into(), "x".into());
        a.insert("mid".into(), ParamValue::Null);

        let mut b = Params::new();
        b.insert("mid".into(), ParamValue::Null);
        b.insert("alpha".into(), "x".into());
        b.insert("zeta".into(), 1u64.into());

        assert_eq!(
            canonicalize_params(&a).unwrap(),
            canonicalize_params(&b).unwrap()
        );
        assert_eq!(
            canonicalize_params(&a).unwrap(),
            r#"{"alpha":"x","mid":null,"zeta":1}"#
        );
    }

    #[test]
    fn test_nested_objects_sorted_arrays_kept() {
        assert_eq!(
            canon(json!({
                "orders": [
                    {"symbol": "ETHUSDT", "price": "10"},
                    {"symbol": "BTCUSDT", "price": "20"}
                ],
                "b": {"y": 1, "x": {"d": true, "c": false}}
            })),
            r#"{"b":{"x":{"c":false,"d":true},"y":1},"orders":[{"price":"10","symbol":"ETHUSDT"},{"price":"20","symbol":"BTCUSDT"}]}"#
        );
    }

    #[test]
    fn test_keys_sorted_bytewise() {
        // Uppercase sorts before lowercase; no locale folding
        assert_eq!(
            canon(json!({"b": 1, "B": 2, "a": 3, "_": 4})),
            r#"{"B":2,"_":4,"a":3,"b":1}"#
        );
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(canonicalize_params(&Params::new()).unwrap(), "{}");
        assert_eq!(canon(json!([])), "[]");
        assert_eq!(canon(json!({"a": {}, "b": []})), r#"{"a":{},"b":[]}"#);
    }

    #[test]
    fn test_explicit_null_is_distinct_from_absent() {
        let with_null = canon(json!({"a": 1, "b": null}));
        let without = canon(json!({"a": 1}));
        assert_eq!(with_null, r#"{"a":1,"b":null}"#);
        assert_ne!(with_null, without);
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(
            canon(json!({"memo": "say \"hi\"\n\\ tab\t é"})),
            "{\"memo\":\"say \\\"hi\\\"\\n\\\\ tab\\t é\"}"
        );
    }

    #[test]
    fn test_html_and_line_separator_escaping() {
        assert_eq!(
            canon(json!({"memo": "a<b>&c\u{2028}d\u{2029}"})),
            r#"{"memo":"a\u003cb\u003e\u0026c\u2028d\u2029"}"#
        );
        // Keys follow the same rules
        assert_eq!(canon(json!({"a&b": 1})), r#"{"a\u0026b":1}"#);
    }

    #[test]
    fn test_number_formatting() {
        let f = |v: f64| format_number(&Number::Float(v)).unwrap();
        assert_eq!(f(1.5), "1.5");
        assert_eq!(f(5.0), "5");
        assert_eq!(f(0.1), "0.1");
        assert_eq!(f(-0.25), "-0.25");
        assert_eq!(f(0.0), "0");
        assert_eq!(f(1e20), "100000000000000000000");
        assert_eq!(f(1e21), "1e+21");
        assert_eq!(f(1.5e-7), "1.5e-7");
        assert_eq!(f(0.000001), "0.000001");

        assert_eq!(format_number(&Number::UInt(u64::MAX)).unwrap(), "18446744073709551615");
        assert_eq!(format_number(&Number::Int(-42)).unwrap(), "-42");
    }

    #[test]
    fn test_same_number_same_text() {
        assert_eq!(canon(json!({"n": 5})), canon(json!({"n": 5})));
        assert_eq!(
            canonicalize(&ParamValue::from(5.0)).unwrap(),
            canonicalize(&ParamValue::from(5u64)).unwrap()
        );
    }

    #[test]
    fn test_non_finite_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut params = Params::new();
            params.insert("price".into(), ParamValue::Array(vec![bad.into()]));
            let err = canonicalize_params(&params).unwrap_err();
            assert!(matches!(err, AsterError::Encoding { .. }));
        }
    }

    #[test]
    fn test_output_is_valid_json() {
        let original = json!({"a": [1, {"z": null, "y": "q"}], "b": -7, "c": 2.5});
        let text = canon(original.clone());
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, original);
    }
}
