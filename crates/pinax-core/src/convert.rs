//! Value conversion engine.
//!
//! Turns one raw string into a typed value for a field's [`TypeShape`].
//! The first matching route wins:
//!
//! 1. a converter registered in [`BindConfig`] for the exact type (a
//!    converter for `T` also serves `Option<T>`),
//! 2. the well-known leaf types (time, duration, URL, IP, CIDR, regex),
//! 3. the text-unmarshaling capability ([`TextUnmarshal`](crate::TextUnmarshal)
//!    or `FromStr` via [`TypeShape::parsed`]),
//! 4. the primitive kind switch.
//!
//! An empty value for an `Option<T>` field yields `None` without running any
//! conversion.

use std::any::Any;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

use crate::config::BindConfig;
use crate::net::IpNetwork;
use crate::shape::{BoxError, BoxedValue, KnownType, LeafRepr, Primitive, ShapeKind, TypeShape};

const BOOL_HINT: &str = "accepted values are true/false, 1/0, yes/no, on/off, t/f, y/n";
const TIME_HINT: &str = "use RFC 3339, for example 2024-01-02T15:04:05Z";
const DURATION_HINT: &str = "use a duration such as 300ms, 1.5h or 2h45m";
const DECIMAL_HINT: &str =
    "integer field got a decimal-looking value, send a whole number or use a float field";
const NEGATIVE_HINT: &str = "negative values are not allowed for unsigned fields";

/// Error produced when a raw string cannot be converted.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// The value does not parse as the expected type.
    #[error("cannot parse {value:?} as {expected}: {reason}")]
    Invalid {
        /// Name of the expected type.
        expected: &'static str,
        /// The raw input.
        value: String,
        /// Why parsing failed.
        reason: String,
        /// A suggestion for the caller, if one applies.
        hint: Option<&'static str>,
        /// The parser's own error.
        #[source]
        source: Option<BoxError>,
    },

    /// An empty value where the type has no empty form (time, numbers).
    #[error("empty value is not a valid {expected}")]
    Empty {
        /// Name of the expected type.
        expected: &'static str,
    },

    /// The type is of a kind that is never bound.
    #[error("cannot bind into {type_name}: {kind} fields are not supported")]
    Unsupported {
        /// Name of the type.
        type_name: &'static str,
        /// The kind label (`array`, `tuple`, ...).
        kind: &'static str,
    },

    /// The type has no built-in conversion and no converter is registered.
    #[error("no converter registered for {type_name}")]
    NoConverter {
        /// Name of the type.
        type_name: &'static str,
    },

    /// A converter produced a value of the wrong type.
    #[error("converter for {type_name} returned a value of another type")]
    TypeMismatch {
        /// Name of the type.
        type_name: &'static str,
    },
}

impl ConvertError {
    fn invalid(expected: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            expected,
            value: value.to_string(),
            reason: reason.into(),
            hint: None,
            source: None,
        }
    }

    fn with_hint(mut self, new_hint: &'static str) -> Self {
        if let Self::Invalid { hint, .. } = &mut self {
            *hint = Some(new_hint);
        }
        self
    }

    fn with_source(mut self, cause: impl Into<BoxError>) -> Self {
        if let Self::Invalid { source, .. } = &mut self {
            *source = Some(cause.into());
        }
        self
    }

    /// The suggestion attached to the error, if any.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Invalid { hint, .. } => *hint,
            _ => None,
        }
    }

    /// Returns true for the kinds that no input can fix.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::Unsupported { .. } | Self::NoConverter { .. } | Self::TypeMismatch { .. }
        )
    }
}

/// Converts `raw` into a boxed value of the shape's type.
///
/// # Errors
///
/// Returns a [`ConvertError`] if no route accepts the value.
pub fn convert_value(
    raw: &str,
    shape: &TypeShape,
    config: &BindConfig,
) -> Result<BoxedValue, ConvertError> {
    if let Some(converter) = config.converter(shape.id()) {
        return converter.convert(raw).map_err(|err| {
            ConvertError::invalid(shape.name(), raw, err.to_string()).with_source(err)
        });
    }

    match shape.kind() {
        ShapeKind::Optional(opt) => {
            if raw.is_empty() {
                return Ok(opt.none());
            }
            let inner = convert_value(raw, opt.inner(), config)?;
            opt.wrap(inner).ok_or(ConvertError::TypeMismatch {
                type_name: opt.inner().name(),
            })
        }
        ShapeKind::Leaf(leaf) => match leaf.repr() {
            LeafRepr::Known(known) => convert_known(raw, known, config),
            LeafRepr::Text(unmarshal) => unmarshal(raw).map_err(|err| {
                ConvertError::invalid(shape.name(), raw, err.to_string()).with_source(err)
            }),
            LeafRepr::Primitive(primitive) => convert_primitive(raw, primitive, config),
            LeafRepr::Opaque => Err(ConvertError::NoConverter {
                type_name: shape.name(),
            }),
        },
        ShapeKind::Unsupported(kind) => Err(ConvertError::Unsupported {
            type_name: shape.name(),
            kind,
        }),
        other => Err(ConvertError::Unsupported {
            type_name: shape.name(),
            kind: other.label(),
        }),
    }
}

/// Converts `raw` and writes it into `slot`, which must hold the shape's type.
///
/// An empty value for an `Option<T>` field leaves the slot untouched and
/// returns `Ok(false)`.
///
/// # Errors
///
/// Returns a [`ConvertError`] if conversion fails or the slot has another type.
pub fn convert_into(
    raw: &str,
    shape: &TypeShape,
    slot: &mut dyn Any,
    config: &BindConfig,
) -> Result<bool, ConvertError> {
    if raw.is_empty() && shape.is_optional() {
        return Ok(false);
    }
    let value = convert_value(raw, shape, config)?;
    if shape.assign(slot, value) {
        Ok(true)
    } else {
        Err(ConvertError::TypeMismatch {
            type_name: shape.name(),
        })
    }
}

/// Generous boolean parsing.
///
/// Accepts `true/false`, `1/0`, `yes/no`, `on/off`, `t/f` and `y/n` in any
/// case, with surrounding whitespace ignored. The empty string is `false`.
///
/// # Errors
///
/// Returns an error for any other input.
pub fn parse_bool(raw: &str) -> Result<bool, ConvertError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(false);
    }
    parse_bool_value(trimmed).ok_or_else(|| {
        ConvertError::invalid("bool", raw, "not a recognised boolean").with_hint(BOOL_HINT)
    })
}

fn parse_bool_value(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
        _ => None,
    }
}

fn boxed<T: Any + Send + Sync>(value: T) -> BoxedValue {
    Box::new(value)
}

fn convert_primitive(
    raw: &str,
    primitive: Primitive,
    config: &BindConfig,
) -> Result<BoxedValue, ConvertError> {
    let detect = config.settings().detect_int_base;
    match primitive {
        Primitive::Str => Ok(boxed(raw.to_string())),
        Primitive::Bool => {
            if raw.trim().is_empty() {
                return Err(ConvertError::Empty { expected: "bool" });
            }
            parse_bool(raw).map(boxed)
        }
        Primitive::Char => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(boxed(c)),
                (None, _) => Err(ConvertError::Empty { expected: "char" }),
                _ => Err(ConvertError::invalid("char", raw, "expected a single character")),
            }
        }
        Primitive::I8 => signed::<i8>(raw, "i8", detect),
        Primitive::I16 => signed::<i16>(raw, "i16", detect),
        Primitive::I32 => signed::<i32>(raw, "i32", detect),
        Primitive::I64 => signed::<i64>(raw, "i64", detect),
        Primitive::I128 => signed::<i128>(raw, "i128", detect),
        Primitive::Isize => signed::<isize>(raw, "isize", detect),
        Primitive::U8 => unsigned::<u8>(raw, "u8", detect),
        Primitive::U16 => unsigned::<u16>(raw, "u16", detect),
        Primitive::U32 => unsigned::<u32>(raw, "u32", detect),
        Primitive::U64 => unsigned::<u64>(raw, "u64", detect),
        Primitive::U128 => unsigned::<u128>(raw, "u128", detect),
        Primitive::Usize => unsigned::<usize>(raw, "usize", detect),
        Primitive::F32 => float::<f32>(raw, "f32"),
        Primitive::F64 => float::<f64>(raw, "f64"),
    }
}

/// Splits an optional base prefix off `digits`. Underscores are only
/// accepted together with base detection.
fn split_radix(digits: &str, detect: bool) -> (u32, String) {
    if !detect {
        return (10, digits.to_string());
    }
    let lower = digits.to_ascii_lowercase();
    let (radix, rest) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..])
    } else {
        (10, lower.as_str())
    };
    (radix, rest.replace('_', ""))
}

fn integer_error(raw: &str, expected: &'static str, reason: String) -> ConvertError {
    let err = ConvertError::invalid(expected, raw, reason);
    if raw.contains(['.', 'e', 'E']) && raw.parse::<f64>().is_ok() {
        err.with_hint(DECIMAL_HINT)
    } else {
        err
    }
}

fn signed<T>(raw: &str, expected: &'static str, detect: bool) -> Result<BoxedValue, ConvertError>
where
    T: TryFrom<i128> + Any + Send + Sync,
{
    if raw.is_empty() {
        return Err(ConvertError::Empty { expected });
    }
    let (negative, digits) = match raw.as_bytes()[0] {
        b'-' => (true, &raw[1..]),
        b'+' => (false, &raw[1..]),
        _ => (false, raw),
    };
    let (radix, digits) = split_radix(digits, detect);
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(integer_error(raw, expected, "invalid digit found in string".into()));
    }
    let magnitude = u128::from_str_radix(&digits, radix)
        .map_err(|err| integer_error(raw, expected, err.to_string()).with_source(err))?;
    let value = if negative {
        0_i128.checked_sub_unsigned(magnitude)
    } else {
        i128::try_from(magnitude).ok()
    };
    value
        .and_then(|value| T::try_from(value).ok())
        .map(boxed)
        .ok_or_else(|| ConvertError::invalid(expected, raw, format!("value out of range for {expected}")))
}

fn unsigned<T>(raw: &str, expected: &'static str, detect: bool) -> Result<BoxedValue, ConvertError>
where
    T: TryFrom<u128> + Any + Send + Sync,
{
    if raw.is_empty() {
        return Err(ConvertError::Empty { expected });
    }
    if raw.starts_with('-') {
        return Err(ConvertError::invalid(expected, raw, "value must not be negative")
            .with_hint(NEGATIVE_HINT));
    }
    let digits = raw.strip_prefix('+').unwrap_or(raw);
    let (radix, digits) = split_radix(digits, detect);
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return Err(integer_error(raw, expected, "invalid digit found in string".into()));
    }
    let value = u128::from_str_radix(&digits, radix)
        .map_err(|err| integer_error(raw, expected, err.to_string()).with_source(err))?;
    T::try_from(value)
        .ok()
        .map(boxed)
        .ok_or_else(|| ConvertError::invalid(expected, raw, format!("value out of range for {expected}")))
}

fn float<T>(raw: &str, expected: &'static str) -> Result<BoxedValue, ConvertError>
where
    T: std::str::FromStr<Err = std::num::ParseFloatError> + Any + Send + Sync,
{
    if raw.is_empty() {
        return Err(ConvertError::Empty { expected });
    }
    raw.parse::<T>()
        .map(boxed)
        .map_err(|err| ConvertError::invalid(expected, raw, err.to_string()).with_source(err))
}

fn convert_known(raw: &str, known: KnownType, config: &BindConfig) -> Result<BoxedValue, ConvertError> {
    let layouts = &config.settings().time_layouts;
    match known {
        KnownType::DateTime => parse_datetime(raw, layouts).map(boxed),
        KnownType::DateTimeUtc => {
            parse_datetime(raw, layouts).map(|dt| boxed(dt.with_timezone(&Utc)))
        }
        KnownType::NaiveDate => parse_naive_date(raw, layouts).map(boxed),
        KnownType::NaiveDateTime => parse_naive_datetime(raw, layouts).map(boxed),
        KnownType::Duration => parse_duration(raw).map(boxed),
        KnownType::Url => url::Url::parse(raw).map(boxed).map_err(|err| {
            ConvertError::invalid("Url", raw, err.to_string()).with_source(err)
        }),
        KnownType::IpAddr => raw.parse::<IpAddr>().map(boxed).map_err(|err| {
            ConvertError::invalid("IpAddr", raw, err.to_string()).with_source(err)
        }),
        KnownType::Ipv4Addr => raw.parse::<Ipv4Addr>().map(boxed).map_err(|err| {
            ConvertError::invalid("Ipv4Addr", raw, err.to_string()).with_source(err)
        }),
        KnownType::Ipv6Addr => raw.parse::<Ipv6Addr>().map(boxed).map_err(|err| {
            ConvertError::invalid("Ipv6Addr", raw, err.to_string()).with_source(err)
        }),
        KnownType::IpNetwork => raw.parse::<IpNetwork>().map(boxed).map_err(|err| {
            ConvertError::invalid("IpNetwork", raw, err.to_string()).with_source(err)
        }),
        KnownType::Regex => regex::Regex::new(raw).map(boxed).map_err(|err| {
            ConvertError::invalid("Regex", raw, "invalid regular expression").with_source(err)
        }),
    }
}

const NAIVE_DATETIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const ZONED_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f %z"];

/// Parses a point in time, trying the built-in layouts and then the
/// configured `chrono` formats. Values without a zone are taken as UTC.
///
/// # Errors
///
/// Returns [`ConvertError::Empty`] for an empty string and
/// [`ConvertError::Invalid`] when no layout matches.
pub fn parse_datetime(raw: &str, layouts: &[String]) -> Result<DateTime<FixedOffset>, ConvertError> {
    if raw.is_empty() {
        return Err(ConvertError::Empty { expected: "DateTime" });
    }
    builtin_datetime(raw)
        .or_else(|| custom_datetime(raw, layouts))
        .ok_or_else(|| {
            ConvertError::invalid("DateTime", raw, "no known time layout matched").with_hint(TIME_HINT)
        })
}

fn utc(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    naive.and_utc().fixed_offset()
}

fn builtin_datetime(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(utc(date.and_time(NaiveTime::MIN)));
    }
    for layout in ZONED_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(raw, layout) {
            return Some(dt);
        }
    }
    for layout in NAIVE_DATETIME_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(utc(naive));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt);
    }
    rfc850(raw)
}

/// `Monday, 02-Jan-06 15:04:05 GMT`
fn rfc850(raw: &str) -> Option<DateTime<FixedOffset>> {
    let stamp = raw
        .strip_suffix(" GMT")
        .or_else(|| raw.strip_suffix(" UTC"))?;
    NaiveDateTime::parse_from_str(stamp, "%A, %d-%b-%y %H:%M:%S")
        .ok()
        .map(utc)
}

fn custom_datetime(raw: &str, layouts: &[String]) -> Option<DateTime<FixedOffset>> {
    layouts.iter().find_map(|layout| {
        DateTime::parse_from_str(raw, layout)
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(raw, layout).ok().map(utc))
            .or_else(|| {
                NaiveDate::parse_from_str(raw, layout)
                    .ok()
                    .map(|date| utc(date.and_time(NaiveTime::MIN)))
            })
    })
}

fn parse_naive_date(raw: &str, layouts: &[String]) -> Result<NaiveDate, ConvertError> {
    if raw.is_empty() {
        return Err(ConvertError::Empty { expected: "NaiveDate" });
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_datetime(raw, layouts).map(|dt| dt.naive_local().date())
}

fn parse_naive_datetime(raw: &str, layouts: &[String]) -> Result<NaiveDateTime, ConvertError> {
    if raw.is_empty() {
        return Err(ConvertError::Empty {
            expected: "NaiveDateTime",
        });
    }
    NAIVE_DATETIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .map_or_else(|| parse_datetime(raw, layouts).map(|dt| dt.naive_local()), Ok)
}

const NANOS_PER_UNIT: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("\u{b5}s", 1_000),
    ("\u{3bc}s", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60_000_000_000),
    ("h", 3_600_000_000_000),
];

/// Parses a duration string such as `300ms`, `1.5h` or `2h45m`.
///
/// A bare `0` is accepted; every other component needs a unit (`ns`, `us`,
/// `µs`, `ms`, `s`, `m`, `h`). Negative durations are rejected.
///
/// # Errors
///
/// Returns an error for malformed input.
pub fn parse_duration(raw: &str) -> Result<Duration, ConvertError> {
    let invalid = |reason: &str| ConvertError::invalid("Duration", raw, reason).with_hint(DURATION_HINT);

    if raw.is_empty() {
        return Err(ConvertError::Empty { expected: "Duration" });
    }
    let mut rest = raw.strip_prefix('+').unwrap_or(raw);
    if rest.starts_with('-') {
        return Err(invalid("negative durations are not supported"));
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }
    if rest.is_empty() {
        return Err(invalid("missing value"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let (int_part, after) = rest.split_at(int_len);
        let (frac_part, after) = match after.strip_prefix('.') {
            Some(after) => {
                let len = after.find(|c: char| !c.is_ascii_digit()).unwrap_or(after.len());
                after.split_at(len)
            }
            None => ("", after),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("expected a number"));
        }
        let unit_len = after
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(after.len());
        let (unit, after) = after.split_at(unit_len);
        let Some(&(_, scale)) = NANOS_PER_UNIT.iter().find(|(name, _)| *name == unit) else {
            return Err(if unit.is_empty() {
                invalid("missing unit")
            } else {
                invalid("unknown unit")
            });
        };

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid("value out of range"))?
        };
        let mut nanos = whole.checked_mul(scale).ok_or_else(|| invalid("value out of range"))?;
        if !frac_part.is_empty() {
            let digits = &frac_part[..frac_part.len().min(18)];
            let frac: u128 = digits.parse().map_err(|_| invalid("value out of range"))?;
            let denominator = 10_u128.pow(u32::try_from(digits.len()).unwrap_or(18));
            nanos = nanos
                .checked_add(frac * scale / denominator)
                .ok_or_else(|| invalid("value out of range"))?;
        }
        total = total
            .checked_add(nanos)
            .ok_or_else(|| invalid("value out of range"))?;
        rest = after;
    }

    let secs = u64::try_from(total / 1_000_000_000).map_err(|_| invalid("value out of range"))?;
    let subsec = u32::try_from(total % 1_000_000_000).map_err(|_| invalid("value out of range"))?;
    Ok(Duration::new(secs, subsec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::FieldType;

    fn convert<T: FieldType>(raw: &str) -> Result<T, ConvertError> {
        convert_with::<T>(raw, &BindConfig::default())
    }

    fn convert_with<T: FieldType>(raw: &str, config: &BindConfig) -> Result<T, ConvertError> {
        convert_value(raw, &T::shape(), config).map(|value| *value.downcast::<T>().unwrap())
    }

    #[test]
    fn test_parse_bool_generous() {
        for raw in ["true", "TRUE", "1", "yes", "On", "t", "Y", " true "] {
            assert!(parse_bool(raw).unwrap(), "{raw}");
        }
        for raw in ["false", "0", "no", "OFF", "f", "n", ""] {
            assert!(!parse_bool(raw).unwrap(), "{raw}");
        }
        let err = parse_bool("maybe").unwrap_err();
        assert_eq!(err.hint(), Some(BOOL_HINT));
    }

    #[test]
    fn test_bool_field_rejects_empty() {
        assert!(matches!(convert::<bool>(""), Err(ConvertError::Empty { .. })));
        assert!(convert::<bool>("yes").unwrap());
    }

    #[test]
    fn test_integers() {
        assert_eq!(convert::<i32>("42").unwrap(), 42);
        assert_eq!(convert::<i32>("-42").unwrap(), -42);
        assert_eq!(convert::<i64>("+7").unwrap(), 7);
        assert_eq!(convert::<i8>("-128").unwrap(), -128);
        assert!(convert::<i8>("128").is_err());
        assert_eq!(convert::<u64>("18446744073709551615").unwrap(), u64::MAX);
        assert!(convert::<u8>("256").is_err());
        assert!(convert::<i32>("0x10").is_err());
        assert!(convert::<i32>("--1").is_err());
    }

    #[test]
    fn test_integer_hints() {
        let err = convert::<i32>("3.14").unwrap_err();
        assert_eq!(err.hint(), Some(DECIMAL_HINT));

        let err = convert::<u32>("-1").unwrap_err();
        assert_eq!(err.hint(), Some(NEGATIVE_HINT));
    }

    #[test]
    fn test_integer_base_detection() {
        let config = BindConfig::builder().detect_int_base(true).build();
        assert_eq!(convert_with::<i32>("0x1F", &config).unwrap(), 31);
        assert_eq!(convert_with::<i32>("-0b101", &config).unwrap(), -5);
        assert_eq!(convert_with::<u16>("0o17", &config).unwrap(), 15);
        assert_eq!(convert_with::<u16>("017", &config).unwrap(), 15);
        assert_eq!(convert_with::<u32>("1_000", &config).unwrap(), 1000);
        assert_eq!(convert_with::<u32>("0", &config).unwrap(), 0);
        // Without detection the leading zero is decimal.
        assert_eq!(convert::<u16>("017").unwrap(), 17);
    }

    #[test]
    fn test_floats_and_chars() {
        assert!((convert::<f64>("1.5e3").unwrap() - 1500.0).abs() < f64::EPSILON);
        assert!((convert::<f32>("-0.25").unwrap() + 0.25).abs() < f32::EPSILON);
        assert!(convert::<f64>("abc").is_err());
        assert_eq!(convert::<char>("x").unwrap(), 'x');
        assert!(convert::<char>("xy").is_err());
    }

    #[test]
    fn test_string_passthrough() {
        assert_eq!(convert::<String>("  spaced  ").unwrap(), "  spaced  ");
        assert_eq!(convert::<String>("").unwrap(), "");
    }

    #[test]
    fn test_optional_empty_is_none() {
        assert_eq!(convert::<Option<i32>>("").unwrap(), None);
        assert_eq!(convert::<Option<i32>>("5").unwrap(), Some(5));

        let mut slot: Option<i32> = None;
        let shape = <Option<i32>>::shape();
        let assigned = convert_into("", &shape, &mut slot, &BindConfig::default()).unwrap();
        assert!(!assigned);
        assert_eq!(slot, None);
    }

    #[test]
    fn test_times() {
        let dt = convert::<DateTime<FixedOffset>>("2024-01-02T15:04:05+02:00").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 7200);

        let dt = convert::<DateTime<Utc>>("2024-01-02T15:04:05.123456789Z").unwrap();
        assert_eq!(dt.timestamp_subsec_nanos(), 123_456_789);

        let dt = convert::<DateTime<Utc>>("2024-01-02").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-02T00:00:00+00:00");

        assert!(convert::<DateTime<Utc>>("2024-01-02 15:04:05").is_ok());
        assert!(convert::<DateTime<Utc>>("2024-01-02 15:04:05 +0100").is_ok());
        assert!(convert::<DateTime<Utc>>("Tue, 02 Jan 2024 15:04:05 GMT").is_ok());
        assert!(convert::<DateTime<Utc>>("Tue, 02 Jan 2024 15:04:05 +0000").is_ok());
        assert!(convert::<DateTime<Utc>>("Tuesday, 02-Jan-24 15:04:05 GMT").is_ok());

        let date = convert::<NaiveDate>("2024-02-29").unwrap();
        assert_eq!(date.to_string(), "2024-02-29");
        let naive = convert::<NaiveDateTime>("2024-01-02T03:04:05").unwrap();
        assert_eq!(naive.to_string(), "2024-01-02 03:04:05");
    }

    #[test]
    fn test_time_empty_is_error() {
        assert!(matches!(
            convert::<DateTime<Utc>>(""),
            Err(ConvertError::Empty { .. })
        ));
        let err = convert::<DateTime<Utc>>("yesterday").unwrap_err();
        assert_eq!(err.hint(), Some(TIME_HINT));
    }

    #[test]
    fn test_custom_time_layout() {
        assert!(convert::<NaiveDate>("02/01/2024").is_err());
        let config = BindConfig::builder().time_layout("%d/%m/%Y").build();
        let date = convert_with::<NaiveDate>("02/01/2024", &config).unwrap();
        assert_eq!(date.to_string(), "2024-01-02");
    }

    #[test]
    fn test_durations() {
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("300ms").unwrap(), Duration::from_millis(300));
        assert_eq!(parse_duration("1.5h").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("2h45m").unwrap(), Duration::from_secs(9900));
        assert_eq!(parse_duration("1m30.5s").unwrap(), Duration::from_millis(90_500));
        assert_eq!(parse_duration("10\u{b5}s").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration(".5s").unwrap(), Duration::from_millis(500));
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("5d").is_err());
        assert!(parse_duration("h").is_err());
        assert!(matches!(parse_duration(""), Err(ConvertError::Empty { .. })));
    }

    #[test]
    fn test_network_types() {
        let ip = convert::<IpAddr>("::1").unwrap();
        assert!(ip.is_loopback());
        assert!(convert::<Ipv4Addr>("::1").is_err());
        assert!(convert::<IpAddr>("300.1.1.1").is_err());

        let net = convert::<IpNetwork>("10.0.0.0/8").unwrap();
        assert!(net.contains("10.1.2.3".parse().unwrap()));

        let url = convert::<url::Url>("https://example.com/a?b=c").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert!(convert::<url::Url>("/relative/path").is_err());
    }

    #[test]
    fn test_regex() {
        let re = convert::<regex::Regex>("^a+$").unwrap();
        assert!(re.is_match("aaa"));
        assert!(convert::<regex::Regex>("(unclosed").is_err());
    }

    #[test]
    fn test_converter_takes_priority() {
        let config = BindConfig::builder()
            .converter(|raw: &str| Ok::<_, BoxError>(raw.len() as u32 * 10))
            .build();
        assert_eq!(convert_with::<u32>("abc", &config).unwrap(), 30);
        // Pointer transparency: the u32 converter also serves Option<u32>.
        assert_eq!(convert_with::<Option<u32>>("ab", &config).unwrap(), Some(20));
    }

    #[test]
    fn test_converter_error_is_wrapped() {
        let config = BindConfig::builder()
            .converter(|_: &str| Err::<u32, _>("always fails"))
            .build();
        let err = convert_with::<u32>("1", &config).unwrap_err();
        assert!(err.to_string().contains("always fails"));
    }

    #[test]
    fn test_unsupported_kinds() {
        let err = convert_value("1", &<[u8; 2]>::shape(), &BindConfig::default()).unwrap_err();
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn test_text_unmarshal() {
        #[derive(Debug, Clone, PartialEq)]
        struct Upper(String);

        impl crate::shape::TextUnmarshal for Upper {
            fn unmarshal_text(text: &str) -> Result<Self, BoxError> {
                if text.is_empty() {
                    return Err("empty".into());
                }
                Ok(Self(text.to_uppercase()))
            }
        }

        impl FieldType for Upper {
            fn shape() -> TypeShape {
                TypeShape::text::<Self>()
            }
        }

        assert_eq!(convert::<Upper>("abc").unwrap(), Upper("ABC".into()));
        assert!(convert::<Upper>("").is_err());
    }
}
