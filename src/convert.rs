use chrono::NaiveDate;

use crate::error::{FinnError, Result};
use crate::mapping::{FieldSpec, FieldType};

/// A converted column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Str(s) => serde_json::Value::from(s.as_str()),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Bool(b) => serde_json::Value::from(*b),
            Self::Date(d) => serde_json::Value::from(d.format("%Y-%m-%d").to_string()),
        }
    }
}

pub fn convert(spec: &FieldSpec, raw: &str) -> Result<Value> {
    let failed = |cause: String| FinnError::Conversion {
        field: spec.name.clone(),
        raw: raw.to_string(),
        cause,
    };
    let trimmed = raw.trim();
    match spec.field_type {
        FieldType::Str => Ok(Value::Str(raw.to_string())),
        FieldType::Int => {
            let i = parse_int(trimmed).map_err(failed)?;
            if !spec.negate() {
                return Ok(Value::Int(i));
            }
            i.checked_neg()
                .map(Value::Int)
                .ok_or_else(|| failed("number out of range after negate".to_string()))
        }
        FieldType::Float => {
            let f: f64 = trimmed
                .parse()
                .map_err(|e: std::num::ParseFloatError| failed(e.to_string()))?;
            if !f.is_finite() {
                return Err(failed("not a finite number".to_string()));
            }
            Ok(Value::Float(if spec.negate() { -f } else { f }))
        }
        FieldType::Bool => parse_bool(trimmed)
            .map(Value::Bool)
            .ok_or_else(|| failed("expected one of 1, t, true, 0, f, false".to_string())),
        FieldType::Date => NaiveDate::parse_from_str(trimmed, spec.date_format())
            .map(Value::Date)
            .map_err(|e| failed(format!("{e} (format {})", spec.date_format()))),
    }
}

pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Integer literal with the radix taken from its prefix: `0x` hex, `0o` or a
/// bare leading zero octal, `0b` binary, decimal otherwise. Underscores are
/// allowed between digits only when a prefix is present.
pub fn parse_int(s: &str) -> std::result::Result<i64, String> {
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let lower = body.to_ascii_lowercase();
    let (radix, digits, prefixed) = if let Some(d) = lower.strip_prefix("0x") {
        (16, d, true)
    } else if let Some(d) = lower.strip_prefix("0o") {
        (8, d, true)
    } else if let Some(d) = lower.strip_prefix("0b") {
        (2, d, true)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..], true)
    } else {
        (10, lower.as_str(), false)
    };

    let digits = if prefixed {
        digits.trim_start_matches('_').replace('_', "")
    } else {
        digits.to_string()
    };
    if digits.is_empty() {
        return Err("invalid integer literal".to_string());
    }
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(format!("invalid digit for base {radix}"));
    }

    let magnitude = u64::from_str_radix(&digits, radix).map_err(|e| e.to_string())?;
    if negative {
        if magnitude > i64::MAX as u64 + 1 {
            return Err("number too small to fit in i64".to_string());
        }
        Ok((magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).map_err(|_| "number too large to fit in i64".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::FieldTarget;
    use serde_json::Map;

    fn spec(name: &str, field_type: FieldType) -> FieldSpec {
        FieldSpec {
            position: 0,
            name: name.to_string(),
            field_type,
            options: Map::new(),
            target: Some(FieldTarget::for_name(name)),
        }
    }

    fn with_option(mut s: FieldSpec, key: &str, value: serde_json::Value) -> FieldSpec {
        s.options.insert(key.to_string(), value);
        s
    }

    #[test]
    fn test_string_passthrough() {
        let s = spec("description", FieldType::Str);
        assert_eq!(convert(&s, "  Coffee ").unwrap(), Value::Str("  Coffee ".into()));
        assert_eq!(convert(&s, "").unwrap(), Value::Str(String::new()));
    }

    #[test]
    fn test_int_radix_prefixes() {
        assert_eq!(parse_int("42"), Ok(42));
        assert_eq!(parse_int("-42"), Ok(-42));
        assert_eq!(parse_int("+7"), Ok(7));
        assert_eq!(parse_int("0x1F"), Ok(31));
        assert_eq!(parse_int("0o17"), Ok(15));
        assert_eq!(parse_int("017"), Ok(15));
        assert_eq!(parse_int("0b101"), Ok(5));
        assert_eq!(parse_int("0x_ff_ff"), Ok(65535));
        assert_eq!(parse_int("0"), Ok(0));
        assert_eq!(parse_int("-9223372036854775808"), Ok(i64::MIN));
    }

    #[test]
    fn test_int_rejects_bad_input() {
        assert!(parse_int("").is_err());
        assert!(parse_int("12a").is_err());
        assert!(parse_int("08").is_err());
        assert!(parse_int("0x").is_err());
        assert!(parse_int("1_000").is_err());
        assert!(parse_int("9223372036854775808").is_err());
        assert!(parse_int("--1").is_err());
    }

    #[test]
    fn test_int_conversion_trims_and_negates() {
        let s = spec("ref", FieldType::Int);
        assert_eq!(convert(&s, " 12 ").unwrap(), Value::Int(12));
        let s = with_option(s, "negate", serde_json::Value::Bool(true));
        assert_eq!(convert(&s, "12").unwrap(), Value::Int(-12));
    }

    #[test]
    fn test_int_negate_overflow_is_conversion_error() {
        let s = with_option(
            spec("amount", FieldType::Int),
            "negate",
            serde_json::Value::Bool(true),
        );
        let err = convert(&s, "-9223372036854775808").unwrap_err();
        assert!(matches!(err, FinnError::Conversion { .. }));
        assert!(err.is_row_scoped());
        assert_eq!(convert(&s, "9223372036854775807").unwrap(), Value::Int(-i64::MAX));
    }

    #[test]
    fn test_float_conversion() {
        let s = spec("amount", FieldType::Float);
        assert_eq!(convert(&s, "42.50").unwrap(), Value::Float(42.5));
        assert_eq!(convert(&s, " -3.25 ").unwrap(), Value::Float(-3.25));
        let err = convert(&s, "abc").unwrap_err();
        match err {
            FinnError::Conversion { field, raw, .. } => {
                assert_eq!(field, "amount");
                assert_eq!(raw, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_float_rejects_non_finite() {
        let s = spec("amount", FieldType::Float);
        for raw in ["NaN", "nan", "inf", "-infinity", "1e400"] {
            let err = convert(&s, raw).unwrap_err();
            assert!(
                matches!(err, FinnError::Conversion { ref cause, .. } if cause == "not a finite number"),
                "{raw}: {err}"
            );
        }
    }

    #[test]
    fn test_float_negate_flips_sign() {
        let s = with_option(
            spec("amount", FieldType::Float),
            "negate",
            serde_json::Value::Bool(true),
        );
        assert_eq!(convert(&s, "19.99").unwrap(), Value::Float(-19.99));
    }

    #[test]
    fn test_bool_literals() {
        for t in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(t), Some(true), "{t}");
        }
        for f in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(f), Some(false), "{f}");
        }
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool("tRUE"), None);
        let s = spec("consolidated", FieldType::Bool);
        assert!(convert(&s, "maybe").is_err());
        assert_eq!(convert(&s, " true ").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_date_default_format() {
        let s = spec("date", FieldType::Date);
        assert_eq!(
            convert(&s, "01/15/2020").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2020, 1, 15).unwrap())
        );
        assert!(convert(&s, "2020-01-15").is_err());
        assert!(convert(&s, "13/45/2020").is_err());
    }

    #[test]
    fn test_date_custom_format() {
        let s = with_option(
            spec("date", FieldType::Date),
            "format",
            serde_json::Value::from("%Y-%m-%d"),
        );
        assert_eq!(
            convert(&s, "2020-01-15").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2020, 1, 15).unwrap())
        );
    }

    #[test]
    fn test_to_json() {
        let d = Value::Date(NaiveDate::from_ymd_opt(2021, 3, 4).unwrap());
        assert_eq!(d.to_json(), serde_json::Value::from("2021-03-04"));
        assert_eq!(Value::Int(3).to_json(), serde_json::Value::from(3));
        assert_eq!(Value::Int(3).as_f64(), Some(3.0));
        assert_eq!(Value::Str("x".into()).as_f64(), None);
    }
}
