//! Compile-time constants and the primitive conversions the coercion layer folds.
//!
//! The conversions follow ECMAScript (ToNumber, ToInt32, ToUint32, ToBoolean,
//! ToString) so that a folded constant matches what the generated coercion
//! expression computes at run time. The one deliberate difference is the
//! legacy string-to-double routine used by `legacy_number_coercion`.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    Int(i32),
    Uint(u32),
    String(String),
}

impl ConstantValue {
    /// ECMAScript ToNumber. With `legacy` set, strings go through the runtime's own parser.
    pub fn to_number(&self, legacy: bool) -> f64 {
        match self {
            ConstantValue::Undefined => f64::NAN,
            ConstantValue::Null => 0.0,
            ConstantValue::Boolean(value) => {
                if *value {
                    1.0
                } else {
                    0.0
                }
            }
            ConstantValue::Number(value) => *value,
            ConstantValue::Int(value) => f64::from(*value),
            ConstantValue::Uint(value) => f64::from(*value),
            ConstantValue::String(text) => {
                if legacy {
                    legacy_string_to_double(text)
                } else {
                    string_to_number(text)
                }
            }
        }
    }

    pub fn to_int32(&self, legacy: bool) -> i32 {
        match self {
            ConstantValue::Int(value) => *value,
            other => number_to_int32(other.to_number(legacy)),
        }
    }

    pub fn to_uint32(&self, legacy: bool) -> u32 {
        match self {
            ConstantValue::Uint(value) => *value,
            other => number_to_uint32(other.to_number(legacy)),
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            ConstantValue::Undefined | ConstantValue::Null => false,
            ConstantValue::Boolean(value) => *value,
            ConstantValue::Number(value) => !(value.is_nan() || *value == 0.0),
            ConstantValue::Int(value) => *value != 0,
            ConstantValue::Uint(value) => *value != 0,
            ConstantValue::String(text) => !text.is_empty(),
        }
    }

    /// ECMAScript ToString.
    pub fn to_js_string(&self) -> String {
        match self {
            ConstantValue::Undefined => "undefined".to_owned(),
            ConstantValue::Null => "null".to_owned(),
            ConstantValue::Boolean(value) => value.to_string(),
            ConstantValue::Number(value) => number_to_js_string(*value),
            ConstantValue::Int(value) => value.to_string(),
            ConstantValue::Uint(value) => value.to_string(),
            ConstantValue::String(text) => text.clone(),
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, ConstantValue::Undefined | ConstantValue::Null)
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_js_string())
    }
}

pub fn number_to_int32(value: f64) -> i32 {
    number_to_uint32(value) as i32
}

pub fn number_to_uint32(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }

    const TWO_32: f64 = 4_294_967_296.0;
    let wrapped = value.trunc().rem_euclid(TWO_32);
    wrapped as u32
}

/// ECMAScript Number::toString(10).
pub fn number_to_js_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value == 0.0 {
        return "0".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_owned();
    }
    if value < 0.0 {
        return format!("-{}", number_to_js_string(-value));
    }

    // Shortest round-trip digits, e.g. "3.5e1"
    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let exponent: i32 = exponent.parse().unwrap_or(0);

    let k = digits.len() as i32;
    let n = exponent + 1;

    if k <= n && n <= 21 {
        let mut out = digits;
        out.extend(std::iter::repeat_n('0', (n - k) as usize));
        out
    } else if 0 < n && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        format!("{}.{}", int_part, frac_part)
    } else if -6 < n && n <= 0 {
        format!("0.{}{}", "0".repeat((-n) as usize), digits)
    } else {
        let exponent = n - 1;
        let sign = if exponent >= 0 { "+" } else { "-" };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{}", first, sign, exponent.abs())
        } else {
            format!("{}.{}e{}{}", first, rest, sign, exponent.abs())
        }
    }
}

fn is_js_whitespace(ch: char) -> bool {
    ch.is_whitespace() || ch == '\u{FEFF}'
}

/// ECMAScript StringToNumber.
pub fn string_to_number(text: &str) -> f64 {
    let trimmed = text.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }

    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = trimmed.strip_prefix(prefix) {
            return parse_radix_digits(digits, radix);
        }
    }

    parse_decimal_literal(trimmed)
}

/// The runtime's own string-to-double routine.
///
/// Unlike StringToNumber it accepts a sign in front of a hex literal
/// (`-0x1A` is -26, not NaN) and knows nothing about `0o` and `0b`.
pub fn legacy_string_to_double(text: &str) -> f64 {
    let trimmed = text.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }

    let (negative, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    if let Some(digits) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        let value = parse_radix_digits(digits, 16);
        return if negative { -value } else { value };
    }

    parse_decimal_literal(trimmed)
}

fn parse_radix_digits(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }

    let mut value = 0.0f64;
    for ch in digits.chars() {
        let Some(digit) = ch.to_digit(radix) else {
            return f64::NAN;
        };
        value = value * f64::from(radix) + f64::from(digit);
    }

    value
}

// StrDecimalLiteral: sign? (Infinity | digits [. digits] | . digits) [(e|E) sign? digits]
fn parse_decimal_literal(text: &str) -> f64 {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let negative = text.starts_with('-');

    if unsigned == "Infinity" {
        return if negative {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let bytes = unsigned.as_bytes();
    let mut index = 0;
    let mut mantissa_digits = 0;

    while index < bytes.len() && bytes[index].is_ascii_digit() {
        index += 1;
        mantissa_digits += 1;
    }
    if index < bytes.len() && bytes[index] == b'.' {
        index += 1;
        while index < bytes.len() && bytes[index].is_ascii_digit() {
            index += 1;
            mantissa_digits += 1;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }

    if index < bytes.len() && (bytes[index] == b'e' || bytes[index] == b'E') {
        index += 1;
        if index < bytes.len() && (bytes[index] == b'+' || bytes[index] == b'-') {
            index += 1;
        }
        let exponent_start = index;
        while index < bytes.len() && bytes[index].is_ascii_digit() {
            index += 1;
        }
        if index == exponent_start {
            return f64::NAN;
        }
    }

    if index != bytes.len() {
        return f64::NAN;
    }

    text.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
#[path = "tests/constant_value_tests.rs"]
mod tests;
