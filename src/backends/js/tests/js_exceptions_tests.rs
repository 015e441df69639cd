use crate::avm2::class_ref::ClassRegistry;
use crate::avm2::multiname::MultinamePool;
use crate::avm2::namespace::Namespace;
use crate::backends::js::js_context::{Code, CompileContext};
use crate::backends::js::js_exceptions::{
    DispatchOutcome, ErrorFactory, ExceptionRegion, RuntimeErrorFactory, emit_catch_prologue,
    emit_handler_dispatch,
};
use crate::settings::CompilerSettings;

const PROLOGUE: &str = "\
if (e instanceof TypeError) {
    var $original = e;
    e = $rt.createError(\"TypeError\", $original.message);
    e.source = $original;
}
var s0 = e;
";

#[test]
fn runtime_factory_calls_the_runtime_helper() {
    assert_eq!(
        RuntimeErrorFactory.construct("RangeError", "\"out of range\""),
        "$rt.createError(\"RangeError\", \"out of range\")"
    );
}

#[test]
fn catch_prologue_converts_host_type_errors_and_binds_slot_zero() {
    let settings = CompilerSettings::default();
    let mut ctx = CompileContext::new(&settings);

    let exception = emit_catch_prologue(&mut ctx, &RuntimeErrorFactory);
    assert_eq!(ctx.stack_depth(), 1);

    let mut rethrow = Code::text("throw ");
    rethrow.push_value(exception).push_str(";");
    ctx.emit_statement(rethrow);

    assert_eq!(
        ctx.render().expect("render"),
        format!("{}throw s0;\n", PROLOGUE)
    );
}

#[test]
fn region_bounds_are_half_open() {
    let region = ExceptionRegion::new(4, 10, 20);

    assert!(!region.covers(3));
    assert!(region.covers(4));
    assert!(region.covers(9));
    assert!(!region.covers(10));
}

#[test]
fn star_type_catches_everything() {
    let mut pool = MultinamePool::new();
    let any = ExceptionRegion::new(0, 1, 2).with_type(pool.qname(&Namespace::public(), "*"));
    let typed =
        ExceptionRegion::new(0, 1, 2).with_type(pool.qname(&Namespace::public(), "RangeError"));

    assert!(any.type_filter().is_none());
    assert!(ExceptionRegion::new(0, 1, 2).type_filter().is_none());
    assert!(typed.type_filter().is_some());
}

#[test]
fn first_match_wins_and_catch_all_ends_the_chain() {
    let settings = CompilerSettings::default();
    let mut ctx = CompileContext::new(&settings);
    let mut pool = MultinamePool::new();
    let mut registry = ClassRegistry::new();
    let public = Namespace::public();

    registry.register(&public, "RangeError");
    registry.register(&public, "Error");

    let range = ExceptionRegion::new(0, 10, 10).with_type(pool.qname(&public, "RangeError"));
    let catch_all = ExceptionRegion::new(0, 10, 20);
    let error = ExceptionRegion::new(0, 10, 30).with_type(pool.qname(&public, "Error"));

    let exception = emit_catch_prologue(&mut ctx, &RuntimeErrorFactory);
    let outcome = emit_handler_dispatch(
        &mut ctx,
        &[&range, &catch_all, &error],
        exception,
        &registry,
    )
    .expect("dispatch");

    assert_eq!(outcome, DispatchOutcome::Handled { target: 20 });
    assert_eq!(ctx.interned_classes().len(), 1);

    let expected = format!(
        "{}{}",
        PROLOGUE,
        "\
if ($classes[0].isInstance(s0)) {
    pc = 10;
    continue;
}
pc = 20;
continue;
"
    );
    assert_eq!(ctx.render().expect("render"), expected);
}

#[test]
fn unmatched_typed_handlers_rethrow() {
    let settings = CompilerSettings::default();
    let mut ctx = CompileContext::new(&settings);
    let mut pool = MultinamePool::new();
    let mut registry = ClassRegistry::new();
    let public = Namespace::public();

    registry.register(&public, "RangeError");
    registry.register(&public, "Error");

    let range = ExceptionRegion::new(0, 10, 10).with_type(pool.qname(&public, "RangeError"));
    let error = ExceptionRegion::new(0, 10, 30).with_type(pool.qname(&public, "Error"));

    let exception = emit_catch_prologue(&mut ctx, &RuntimeErrorFactory);
    let outcome =
        emit_handler_dispatch(&mut ctx, &[&range, &error], exception, &registry).expect("dispatch");

    assert_eq!(outcome, DispatchOutcome::Rethrow);

    let source = ctx.render().expect("render");
    let range_test = source
        .find("$classes[0].isInstance(s0)")
        .expect("RangeError test");
    let error_test = source
        .find("$classes[1].isInstance(s0)")
        .expect("Error test");
    assert!(range_test < error_test);
    assert!(source.ends_with("}\nthrow s0;\n"));
}

#[test]
fn unknown_handler_types_are_looked_up_by_name() {
    let settings = CompilerSettings::default();
    let mut ctx = CompileContext::new(&settings);
    let mut pool = MultinamePool::new();
    let registry = ClassRegistry::new();

    let region = ExceptionRegion::new(0, 10, 10)
        .with_type(pool.qname(&Namespace::public(), "MissingError"));

    let exception = emit_catch_prologue(&mut ctx, &RuntimeErrorFactory);
    emit_handler_dispatch(&mut ctx, &[&region], exception, &registry).expect("dispatch");

    assert_eq!(ctx.interned_names().len(), 1);
    assert!(
        ctx.render()
            .expect("render")
            .contains("if ($rt.getClass($names[0]).isInstance(s0)) {")
    );
}
