use crate::avm2::constant_value::ConstantValue;
use crate::avm2::multiname::{Multiname, MultinamePool};
use crate::avm2::namespace::{Namespace, NamespaceKind};
use crate::backends::js::js_coercion::{Coercer, PrimitiveType};
use crate::backends::js::js_context::{Code, CompileContext, ValueDescriptor};
use crate::settings::CompilerSettings;
use proptest::prelude::*;
use std::rc::Rc;

fn legacy_settings() -> CompilerSettings {
    CompilerSettings {
        legacy_number_coercion: true,
        ..CompilerSettings::default()
    }
}

fn primitive(pool: &mut MultinamePool, name: &str) -> Rc<Multiname> {
    pool.qname(&Namespace::public(), name)
}

fn string(text: &str) -> ConstantValue {
    ConstantValue::String(text.to_owned())
}

#[test]
fn primitive_types_are_only_the_top_level_public_names() {
    let mut pool = MultinamePool::new();
    let package = Namespace::new(NamespaceKind::Public, "geom");

    assert_eq!(
        PrimitiveType::from_multiname(&primitive(&mut pool, "int")),
        Some(PrimitiveType::Int)
    );
    assert_eq!(
        PrimitiveType::from_multiname(&primitive(&mut pool, "String")),
        Some(PrimitiveType::String)
    );
    assert_eq!(
        PrimitiveType::from_multiname(&pool.qname(&package, "int")),
        None
    );
    assert_eq!(
        PrimitiveType::from_multiname(&primitive(&mut pool, "Point")),
        None
    );
}

#[test]
fn legacy_folding_of_exponent_strings_is_bare() {
    let legacy = legacy_settings();
    let coercer = Coercer::new(&legacy);

    assert_eq!(coercer.coerce_constant(&string("3.5e1"), PrimitiveType::Number), "35");
    assert_eq!(coercer.coerce_constant(&string("3.5e1"), PrimitiveType::Int), "35");
}

#[test]
fn generic_folding_is_parenthesized() {
    let settings = CompilerSettings::default();
    let coercer = Coercer::new(&settings);

    assert_eq!(coercer.coerce_constant(&string("3.5e1"), PrimitiveType::Number), "(35)");
    assert_eq!(coercer.coerce_constant(&string("3.5e1"), PrimitiveType::Int), "(35)");
    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Number(0.5), PrimitiveType::Number),
        "(0.5)"
    );
}

#[test]
fn legacy_parser_accepts_signed_hex() {
    let legacy = legacy_settings();
    let generic = CompilerSettings::default();

    assert_eq!(
        Coercer::new(&legacy).coerce_constant(&string("-0x1A"), PrimitiveType::Number),
        "(-26)"
    );
    assert_eq!(
        Coercer::new(&generic).coerce_constant(&string("-0x1A"), PrimitiveType::Number),
        "(NaN)"
    );
    assert_eq!(
        Coercer::new(&legacy).coerce_constant(&string("0x1A"), PrimitiveType::Int),
        "26"
    );
    assert_eq!(
        Coercer::new(&generic).coerce_constant(&string("0x1A"), PrimitiveType::Int),
        "(26)"
    );
}

#[test]
fn legacy_mode_leaves_non_string_constants_alone() {
    let legacy = legacy_settings();
    let coercer = Coercer::new(&legacy);

    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Number(35.0), PrimitiveType::Number),
        "(35)"
    );
    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Boolean(true), PrimitiveType::Int),
        "(1)"
    );
}

#[test]
fn integer_folding_wraps_like_the_runtime() {
    let settings = CompilerSettings::default();
    let coercer = Coercer::new(&settings);

    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Number(2_147_483_648.0), PrimitiveType::Int),
        "(-2147483648)"
    );
    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Number(f64::NAN), PrimitiveType::Int),
        "(0)"
    );
    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Int(-1), PrimitiveType::Uint),
        "(4294967295)"
    );
    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Number(-7.9), PrimitiveType::Int),
        "(-7)"
    );
}

#[test]
fn boolean_folding_uses_truthiness() {
    let settings = CompilerSettings::default();
    let coercer = Coercer::new(&settings);

    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Number(0.0), PrimitiveType::Boolean),
        "false"
    );
    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Number(f64::NAN), PrimitiveType::Boolean),
        "false"
    );
    assert_eq!(coercer.coerce_constant(&string(""), PrimitiveType::Boolean), "false");
    assert_eq!(coercer.coerce_constant(&string("0"), PrimitiveType::Boolean), "true");
    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Null, PrimitiveType::Boolean),
        "false"
    );
}

#[test]
fn string_folding_keeps_null_and_undefined_as_null() {
    let settings = CompilerSettings::default();
    let coercer = Coercer::new(&settings);

    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Null, PrimitiveType::String),
        "null"
    );
    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Undefined, PrimitiveType::String),
        "null"
    );
    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Number(1e21), PrimitiveType::String),
        "\"1e+21\""
    );
    assert_eq!(
        coercer.coerce_constant(&ConstantValue::Boolean(true), PrimitiveType::String),
        "\"true\""
    );
    assert_eq!(
        coercer.coerce_constant(&string("say \"hi\"\n"), PrimitiveType::String),
        "\"say \\\"hi\\\"\\n\""
    );
}

#[test]
fn dynamic_rules_wrap_the_operand() {
    let settings = CompilerSettings::default();
    let coercer = Coercer::new(&settings);

    assert_eq!(coercer.coerce_expression("x", PrimitiveType::Number), "(+x)");
    assert_eq!(coercer.coerce_expression("x", PrimitiveType::Int), "(x | 0)");
    assert_eq!(coercer.coerce_expression("x", PrimitiveType::Uint), "(x >>> 0)");
    assert_eq!(coercer.coerce_expression("x", PrimitiveType::Boolean), "(!!x)");
    assert_eq!(
        coercer.coerce_expression("x", PrimitiveType::String),
        "(x == null ? null : \"\" + x)"
    );
    assert_eq!(
        coercer.coerce_expression("a.b()", PrimitiveType::String),
        "$rt.coerceString(a.b())"
    );
}

#[test]
fn legacy_dynamic_rules_go_through_the_runtime_parser() {
    let legacy = legacy_settings();
    let coercer = Coercer::new(&legacy);

    assert_eq!(
        coercer.coerce_expression("x", PrimitiveType::Number),
        "$rt.toNumber(x)"
    );
    assert_eq!(
        coercer.coerce_expression("x", PrimitiveType::Int),
        "($rt.toNumber(x) | 0)"
    );
    assert_eq!(coercer.coerce_expression("x", PrimitiveType::Uint), "(x >>> 0)");
}

#[test]
fn unknown_types_pass_the_value_through() {
    let settings = CompilerSettings::default();
    let mut ctx = CompileContext::new(&settings);
    let mut pool = MultinamePool::new();
    let point = pool.qname(&Namespace::new(NamespaceKind::Public, "geom"), "Point");
    let coercer = Coercer::new(&settings);

    ctx.push_value(ValueDescriptor::expression("a.b"));
    let value = ctx.pop_value().expect("pop");

    let coerced = coercer
        .coerce(&mut ctx, value, Some(&point))
        .expect("coerce");
    assert_eq!(coerced, Code::value(value));

    let untyped = coercer.coerce(&mut ctx, value, None).expect("coerce");
    assert_eq!(untyped, Code::value(value));
}

#[test]
fn bound_constants_are_folded() {
    let settings = CompilerSettings::default();
    let mut ctx = CompileContext::new(&settings);
    let mut pool = MultinamePool::new();
    let int = primitive(&mut pool, "int");
    let coercer = Coercer::new(&settings);

    let literal = ctx.push_value(ValueDescriptor::literal(string("3.5e1")));
    let value = ctx.pop_value().expect("pop");

    let coerced = coercer.coerce(&mut ctx, value, Some(&int)).expect("coerce");
    ctx.emit_statement(Code::wrap("return ", coerced, ";"));

    assert_eq!(ctx.render().expect("render"), "return (35);\n");
    assert!(ctx.block(literal).expect("block").is_suppressed());
}

#[test]
fn string_coercion_of_a_bound_value_declares_it() {
    let settings = CompilerSettings::default();
    let mut ctx = CompileContext::new(&settings);
    let mut pool = MultinamePool::new();
    let string_type = primitive(&mut pool, "String");
    let coercer = Coercer::new(&settings);

    ctx.push_value(ValueDescriptor::expression("a.b()"));
    let value = ctx.pop_value().expect("pop");

    let coerced = coercer
        .coerce(&mut ctx, value, Some(&string_type))
        .expect("coerce");
    ctx.emit_statement(Code::wrap("return ", coerced, ";"));

    assert_eq!(
        ctx.render().expect("render"),
        "var s0 = a.b();\nreturn (s0 == null ? null : \"\" + s0);\n"
    );
}

// ToInt32 by integer arithmetic, independent of the float based folding
fn wrap_to_int32(value: f64) -> i32 {
    (value.trunc() as i64).rem_euclid(1i64 << 32) as u32 as i32
}

proptest! {
    #[test]
    fn int_folding_matches_integer_wrapping(value in -1.0e12f64..1.0e12f64) {
        let settings = CompilerSettings::default();
        let coercer = Coercer::new(&settings);

        prop_assert_eq!(
            coercer.coerce_constant(&ConstantValue::Number(value), PrimitiveType::Int),
            format!("({})", wrap_to_int32(value))
        );
        prop_assert_eq!(
            coercer.coerce_constant(&ConstantValue::Number(value), PrimitiveType::Uint),
            format!("({})", wrap_to_int32(value) as u32)
        );
    }

    #[test]
    fn decimal_strings_fold_to_their_integer_value(value in any::<i32>()) {
        let settings = CompilerSettings::default();
        let coercer = Coercer::new(&settings);

        prop_assert_eq!(
            coercer.coerce_constant(&string(&value.to_string()), PrimitiveType::Int),
            format!("({})", value)
        );
    }
}
