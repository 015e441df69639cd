//! Small JavaScript source helpers shared by the IR, coercion and dispatch code.

use crate::avm2::constant_value::{ConstantValue, number_to_js_string};

/// Renders a constant as a JavaScript literal.
///
/// Negative numbers come out unparenthesized, callers that splice the literal
/// next to an operator wrap it themselves.
pub(crate) fn constant_literal(value: &ConstantValue) -> String {
    match value {
        ConstantValue::Undefined => "undefined".to_owned(),
        ConstantValue::Null => "null".to_owned(),
        ConstantValue::Boolean(value) => value.to_string(),
        ConstantValue::Number(value) => number_literal(*value),
        ConstantValue::Int(value) => value.to_string(),
        ConstantValue::Uint(value) => value.to_string(),
        ConstantValue::String(text) => escape_js_string(text),
    }
}

/// Like `Number::toString` except that negative zero keeps its sign.
pub(crate) fn number_literal(value: f64) -> String {
    if value == 0.0 && value.is_sign_negative() {
        return "-0".to_owned();
    }

    number_to_js_string(value)
}

pub(crate) fn escape_js_string(value: &str) -> String {
    let mut escaped = String::from("\"");

    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            '\0' => escaped.push_str("\\0"),
            // Valid in JSON strings but line terminators inside JS string literals
            '\u{2028}' => escaped.push_str("\\u2028"),
            '\u{2029}' => escaped.push_str("\\u2029"),
            control if control.is_control() => {
                escaped.push_str(&format!("\\u{:04X}", control as u32));
            }
            normal => escaped.push(normal),
        }
    }

    escaped.push('"');
    escaped
}

/// True for text that can be evaluated twice without observable difference:
/// a plain identifier or a literal.
pub(crate) fn is_simple_expression(expression: &str) -> bool {
    let expression = expression.trim();
    if expression.is_empty() {
        return false;
    }

    let is_identifier = expression
        .chars()
        .next()
        .is_some_and(|first| first == '_' || first == '$' || first.is_ascii_alphabetic())
        && expression
            .chars()
            .all(|ch| ch == '_' || ch == '$' || ch.is_ascii_alphanumeric());

    let is_number = expression
        .chars()
        .all(|ch| ch.is_ascii_digit() || ch == '.');

    is_identifier || is_number
}

pub(crate) fn sanitize_identifier(raw: &str) -> String {
    let mut result = String::new();

    // A leading digit is kept, callers prefix the identifier
    for ch in raw.chars() {
        if ch == '_' || ch == '$' || ch.is_ascii_alphanumeric() {
            result.push(ch);
        } else {
            result.push('_');
        }
    }

    if result.is_empty() {
        "_method".to_owned()
    } else {
        result
    }
}

pub(crate) fn is_js_reserved(name: &str) -> bool {
    matches!(
        name,
        "break"
            | "case"
            | "catch"
            | "class"
            | "const"
            | "continue"
            | "debugger"
            | "default"
            | "delete"
            | "do"
            | "else"
            | "export"
            | "extends"
            | "finally"
            | "for"
            | "function"
            | "if"
            | "import"
            | "in"
            | "instanceof"
            | "new"
            | "return"
            | "super"
            | "switch"
            | "this"
            | "throw"
            | "try"
            | "typeof"
            | "var"
            | "void"
            | "while"
            | "with"
            | "yield"
            | "enum"
            | "implements"
            | "interface"
            | "let"
            | "package"
            | "private"
            | "protected"
            | "public"
            | "static"
            | "await"
            | "undefined"
            | "null"
            | "true"
            | "false"
            | "NaN"
            | "Infinity"
            | "eval"
            | "arguments"
    )
}
