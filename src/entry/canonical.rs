//! JSON Canonicalization Scheme (RFC 8785)
//!
//! Produces exactly one byte sequence per logical JSON value: object keys
//! sorted by UTF-16 code units, no insignificant whitespace, minimal string
//! escaping and ECMAScript number formatting.

use std::cmp::Ordering;

use serde_json::{Map, Number, Value};

use crate::error::{Result, VerificationError};

/// Largest integer a double represents exactly.
const MAX_SAFE_INTEGER: u64 = 1 << 53;

/// Canonicalize an already parsed JSON value.
pub fn canonicalize(value: &Value) -> Result<Vec<u8>> {
    let mut out = String::new();
    write_value(&mut out, value)?;
    Ok(out.into_bytes())
}

/// Parse JSON text and canonicalize it.
pub fn canonicalize_json(input: &[u8]) -> Result<Vec<u8>> {
    let value: Value = serde_json::from_slice(input)?;
    canonicalize(&value)
}

fn write_value(out: &mut String, value: &Value) -> Result<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => out.push_str(&format_number(n)?),
        Value::String(s) => write_string(out, s)?,
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item)?;
            }
            out.push(']');
        }
        Value::Object(map) => write_object(out, map)?,
    }
    Ok(())
}

fn write_object(out: &mut String, map: &Map<String, Value>) -> Result<()> {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|(a, _), (b, _)| compare_utf16(a, b));

    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
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

fn compare_utf16(a: &str, b: &str) -> Ordering {
    a.encode_utf16().cmp(b.encode_utf16())
}

// serde_json escapes exactly the characters RFC 8785 requires, using the
// short forms and lowercase \u00xx for the remaining controls.
fn write_string(out: &mut String, s: &str) -> Result<()> {
    out.push_str(&serde_json::to_string(s)?);
    Ok(())
}

fn format_number(n: &Number) -> Result<String> {
    if let Some(u) = n.as_u64() {
        if u <= MAX_SAFE_INTEGER {
            return Ok(u.to_string());
        }
        return format_double(u as f64);
    }
    if let Some(i) = n.as_i64() {
        if i.unsigned_abs() <= MAX_SAFE_INTEGER {
            return Ok(i.to_string());
        }
        return format_double(i as f64);
    }
    match n.as_f64() {
        Some(f) => format_double(f),
        None => Err(VerificationError::EncodingError(format!(
            "unrepresentable number: {}",
            n
        ))),
    }
}

/// ECMAScript `Number.prototype.toString` for finite doubles.
pub fn format_double(value: f64) -> Result<String> {
    if !value.is_finite() {
        return Err(VerificationError::EncodingError(format!(
            "non-finite number cannot be canonicalized: {}",
            value
        )));
    }
    if value == 0.0 {
        // Also covers -0.
        return Ok("0".to_string());
    }
    if value < 0.0 {
        return Ok(format!("-{}", format_double(-value)?));
    }

    // Rust's `{:e}` yields the shortest round-tripping digits.
    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = scientific.split_once('e').ok_or_else(|| {
        VerificationError::EncodingError(format!("unexpected float format: {}", scientific))
    })?;
    let exponent: i32 = exponent.parse().map_err(|_| {
        VerificationError::EncodingError(format!("unexpected float format: {}", scientific))
    })?;
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    let k = digits.len() as i32;
    let n = exponent + 1;

    let formatted = if k <= n && n <= 21 {
        format!("{}{}", digits, "0".repeat((n - k) as usize))
    } else if 0 < n && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        format!("{}.{}", int_part, frac_part)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let e = n - 1;
        let sign = if e < 0 { '-' } else { '+' };
        if k == 1 {
            format!("{}e{}{}", digits, sign, e.abs())
        } else {
            format!("{}.{}e{}{}", &digits[..1], &digits[1..], sign, e.abs())
        }
    };
    Ok(formatted)
}
