use crate::{Code, Compiler};
use crate::avm2::class_ref::ClassRegistry;
use crate::avm2::multiname::MultinamePool;
use crate::avm2::namespace::Namespace;
use crate::avm2::runtime_traits::RuntimeTraits;
use crate::avm2::traits::{RuntimeTraitInfo, TraitKind};
use crate::backends::js::JsModuleBuilder;
use crate::backends::js::js_context::{ConstantTables, SlotKind, ValueDescriptor};
use crate::backends::js::js_exceptions::{ExceptionRegion, RuntimeErrorFactory};
use crate::backends::js::js_function::LoweredMethod;
use crate::compiler_messages::compiler_errors::{CompilerError, ErrorMetaDataKey, ErrorType};
use crate::settings::CompilerSettings;

fn lowered(source: &str, tables: ConstantTables) -> LoweredMethod {
    LoweredMethod {
        source: source.to_owned(),
        tables,
    }
}

fn function_source<'a>(source: &'a str, name: &str) -> &'a str {
    let start = source
        .find(&format!("function {}(", name))
        .expect("function is in the module");
    let rest = &source[start..];
    match rest[1..].find("\nfunction ") {
        Some(end) => &rest[..end + 1],
        None => rest,
    }
}

#[test]
fn method_identifiers_are_sanitized_and_unique() {
    let mut module = JsModuleBuilder::new();

    assert_eq!(module.method_identifier("get value"), "get_value");
    assert_eq!(module.method_identifier("delete"), "_delete");
    assert_eq!(module.method_identifier("3d"), "_3d");
    assert_eq!(module.method_identifier("run"), "run");
    assert_eq!(module.method_identifier("run"), "run_1");
    assert_eq!(module.method_identifier("run"), "run_2");
}

#[test]
fn failed_methods_are_reported_and_the_rest_are_kept() {
    let mut module = JsModuleBuilder::new();

    module.add_method(
        "first",
        Ok(lowered("function first() {\n}\n", ConstantTables::new())),
    );
    module.add_method(
        "broken",
        Err(CompilerError::new_stack_underflow(0)),
    );
    module.add_method(
        "second",
        Ok(lowered("function second() {\n}\n", ConstantTables::new())),
    );

    let (output, messages) = module.finish();

    assert_eq!(output.method_names, vec!["first", "second"]);
    assert_eq!(
        output.source,
        "function first() {\n}\n\nfunction second() {\n}\n"
    );

    assert_eq!(messages.errors.len(), 1);
    assert_eq!(
        messages.errors[0].metadata(ErrorMetaDataKey::MethodName),
        Some("broken")
    );
}

#[test]
fn compiler_lowers_a_batch_of_methods() {
    let settings = CompilerSettings {
        strict_variable_resolution: true,
        ..CompilerSettings::default()
    };
    let factory = RuntimeErrorFactory;
    let registry = ClassRegistry::new();
    let mut compiler = Compiler::new(&settings, &factory, &registry);

    let getter = compiler.lower_method("get x", 0, 1, Vec::new(), |builder| {
        builder.begin_case(0, 0)?;
        let ctx = builder.context_mut();
        let receiver = ctx.get_local(0)?;
        let mut read = Code::value(receiver);
        read.push_str(".x");
        ctx.push_value(ValueDescriptor::expression(read));
        let value = ctx.pop_value()?;
        builder.emit_return(Some(value));
        Ok(())
    });

    let broken = compiler.lower_method("broken", 0, 1, Vec::new(), |builder| {
        builder.begin_case(0, 0)?;
        builder
            .context_mut()
            .resolve_variable(3, SlotKind::StackTemp)?;
        Ok(())
    });

    assert_eq!(getter, "get_x");
    assert_eq!(broken, "broken");

    let (output, messages) = compiler.finish();

    assert!(output.source.contains("function get_x() {"));
    assert!(output.source.contains("                return l0.x;\n"));
    assert!(!output.source.contains("function broken"));

    assert_eq!(messages.errors.len(), 1);
    let error = &messages.errors[0];
    assert_eq!(error.error_type, ErrorType::UnresolvedVariable);
    assert_eq!(error.metadata(ErrorMetaDataKey::MethodName), Some("broken"));
    assert_eq!(error.metadata(ErrorMetaDataKey::SlotKind), Some("stack"));
}

#[test]
fn compiler_exports_trait_tables() {
    let settings = CompilerSettings {
        pretty: false,
        ..CompilerSettings::default()
    };
    let factory = RuntimeErrorFactory;
    let registry = ClassRegistry::new();
    let compiler = Compiler::new(&settings, &factory, &registry);

    let mut pool = MultinamePool::new();
    let mut traits = RuntimeTraits::new(None, None);
    traits
        .declare_trait(RuntimeTraitInfo::new(
            pool.qname(&Namespace::public(), "hp"),
            TraitKind::Slot,
        ))
        .expect("slot");

    let json = compiler.lower_traits(&traits).expect("export");
    assert_eq!(
        json,
        r#"{"next_slot":2,"traits":{"hp":{"":{"kind":"slot","slot":1}}},"enumerable":["hp"]}"#
    );
}

#[test]
fn class_indexes_are_shared_by_every_method_of_a_module() {
    let settings = CompilerSettings::default();
    let factory = RuntimeErrorFactory;
    let mut pool = MultinamePool::new();
    let public = Namespace::public();
    let mut registry = ClassRegistry::new();
    let range_error = registry.register(&public, "RangeError");
    let type_error = registry.register(&public, "TypeError");
    let unused = registry.register(&public, "Unused");
    let range_name = pool.qname(&public, "RangeError");
    let type_name = pool.qname(&public, "TypeError");
    let stray_name = pool.qname(&public, "stray");

    let mut compiler = Compiler::new(&settings, &factory, &registry);

    for (method, catch_type) in [
        ("range", &range_name),
        ("type", &type_name),
        ("range_again", &range_name),
    ] {
        let regions = vec![ExceptionRegion::new(0, 4, 4).with_type(catch_type.clone())];
        compiler.lower_method(method, 0, 1, regions, |builder| {
            builder.begin_case(0, 0)?;
            builder.context_mut().emit_statement("$rt.risky();");
            builder.emit_return(None);
            builder.begin_handler_case(4)?;
            builder.emit_return(None);
            Ok(())
        });
    }

    // Interned before failing, none of it may reach the module tables
    compiler.lower_method("broken", 0, 1, Vec::new(), |builder| {
        let ctx = builder.context_mut();
        ctx.intern_class(&unused);
        ctx.intern_name(&stray_name);
        ctx.pop_value()?;
        Ok(())
    });

    let (output, messages) = compiler.finish();
    assert_eq!(messages.errors.len(), 1);
    assert_eq!(output.method_names, vec!["range", "type", "range_again"]);

    let class_ids = output
        .tables
        .classes
        .iter()
        .map(|class| class.id())
        .collect::<Vec<_>>();
    assert_eq!(class_ids, vec![range_error.id(), type_error.id()]);
    assert!(output.tables.names.is_empty());

    let source = &output.source;
    assert!(function_source(source, "range").contains("if ($classes[0].isInstance(s0)) {"));
    assert!(function_source(source, "type").contains("if ($classes[1].isInstance(s0)) {"));
    assert!(
        function_source(source, "range_again").contains("if ($classes[0].isInstance(s0)) {")
    );
    assert!(!function_source(source, "type").contains("$classes[0]"));
}

#[test]
fn methods_lowered_against_stale_tables_are_rejected() {
    let mut pool = MultinamePool::new();
    let public = Namespace::public();
    let x = pool.qname(&public, "x");
    let y = pool.qname(&public, "y");

    let mut module = JsModuleBuilder::new();

    let mut first_tables = ConstantTables::new();
    first_tables.names.push(x);
    module.add_method("first", Ok(lowered("function first() {\n}\n", first_tables)));

    // Built from empty tables, so its `$names[0]` would mean `y` instead of `x`
    let mut stale_tables = ConstantTables::new();
    stale_tables.names.push(y);
    module.add_method("stale", Ok(lowered("function stale() {\n}\n", stale_tables)));

    assert_eq!(module.tables().names.len(), 1);

    let (output, messages) = module.finish();
    assert_eq!(output.method_names, vec!["first"]);
    assert_eq!(messages.errors.len(), 1);
    assert_eq!(messages.errors[0].error_type, ErrorType::Compiler);
    assert_eq!(
        messages.errors[0].metadata(ErrorMetaDataKey::MethodName),
        Some("stale")
    );
}
