//! Exception handler dispatch.
//!
//! A method with exception regions runs its dispatch loop inside one `try`. The
//! `catch` side normalizes host errors into guest errors, binds the caught value
//! as the only operand on the stack and then picks the first region whose type
//! matches, by jumping to its target like any other branch.

use crate::avm2::class_ref::ClassResolver;
use crate::avm2::multiname::Multiname;
use crate::backends::js::js_context::{BlockId, Code, CompileContext, ValueDescriptor};
use crate::backends::js::js_expr::escape_js_string;
use crate::backends::js::js_function::emit_jump;
use crate::codegen_log;
use crate::compiler_messages::compiler_errors::CompilerError;
use crate::settings::{CAUGHT_VALUE, RUNTIME_HELPERS};
use std::rc::Rc;

/// The host error class raised by generated code, e.g. for a call on `null`.
pub const HOST_TYPE_ERROR: &str = "TypeError";

/// The guest error kind host type errors are converted to.
pub const GUEST_TYPE_ERROR: &str = "TypeError";

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionRegion {
    /// Inclusive start offset of the protected range.
    pub start: u32,
    /// Exclusive end offset.
    pub end: u32,
    pub target: u32,
    // None or `*` catches everything
    pub catch_type: Option<Rc<Multiname>>,
}

impl ExceptionRegion {
    pub fn new(start: u32, end: u32, target: u32) -> Self {
        ExceptionRegion {
            start,
            end,
            target,
            catch_type: None,
        }
    }

    pub fn with_type(mut self, catch_type: Rc<Multiname>) -> Self {
        self.catch_type = Some(catch_type);
        self
    }

    pub fn covers(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    /// The type the handler is restricted to, `None` for a catch-all.
    pub fn type_filter(&self) -> Option<&Rc<Multiname>> {
        self.catch_type
            .as_ref()
            .filter(|catch_type| catch_type.name().is_some_and(|name| name != "*"))
    }
}

/// Builds the expression that constructs a guest error at run time.
pub trait ErrorFactory {
    /// `message` is a JavaScript expression, not a string to quote.
    fn construct(&self, kind: &str, message: &str) -> String;
}

/// Constructs errors through the runtime helper object.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuntimeErrorFactory;

impl ErrorFactory for RuntimeErrorFactory {
    fn construct(&self, kind: &str, message: &str) -> String {
        format!(
            "{}.createError({}, {})",
            RUNTIME_HELPERS,
            escape_js_string(kind),
            message
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A catch-all region ended the chain, nothing after it can run.
    Handled { target: u32 },
    /// The chain ends by rethrowing when no typed region matched.
    Rethrow,
}

/// Emits the start of the `catch` body and returns the binding of the caught value.
///
/// Host type errors are replaced by the equivalent guest error, with the original
/// kept as its `source`. The caught value becomes stack slot 0 and is always declared,
/// the handler cases read it back under that name.
pub fn emit_catch_prologue(ctx: &mut CompileContext, factory: &dyn ErrorFactory) -> BlockId {
    ctx.emit_statement(format!(
        "if ({} instanceof {}) {{",
        CAUGHT_VALUE, HOST_TYPE_ERROR
    ));
    ctx.move_indent(1);
    ctx.emit_statement(format!("var $original = {};", CAUGHT_VALUE));
    ctx.emit_statement(format!(
        "{} = {};",
        CAUGHT_VALUE,
        factory.construct(GUEST_TYPE_ERROR, "$original.message")
    ));
    ctx.emit_statement(format!("{}.source = $original;", CAUGHT_VALUE));
    ctx.move_indent(-1);
    ctx.emit_statement("}");

    // Nothing the try body bound is known to have run
    ctx.reset_slots();
    ctx.push_value(ValueDescriptor::expression(CAUGHT_VALUE).declared())
}

/// Emits the test chain for the regions active at one throw site.
///
/// Regions are tried in order and the first match wins. A region without a type
/// matches anything and stops the chain. If nothing matched the value is rethrown.
/// Handler types the resolver does not know are looked up by name at run time.
pub fn emit_handler_dispatch(
    ctx: &mut CompileContext,
    regions: &[&ExceptionRegion],
    exception: BlockId,
    resolver: &dyn ClassResolver,
) -> Result<DispatchOutcome, CompilerError> {
    for region in regions {
        let Some(catch_type) = region.type_filter() else {
            codegen_log!(format!("[Catch] Catch-all handler at {}", region.target));
            emit_jump(ctx, region.target);
            return Ok(DispatchOutcome::Handled {
                target: region.target,
            });
        };

        let class_expression = match resolver.resolve_class(catch_type) {
            Some(class) => {
                let index = ctx.intern_class(&class);
                ctx.class_reference(index)?
            }
            None => {
                let index = ctx.intern_name(catch_type);
                format!("{}.getClass({})", RUNTIME_HELPERS, ctx.name_reference(index)?)
            }
        };

        codegen_log!(format!(
            "[Catch] {} handler at {}",
            class_expression, region.target
        ));

        let mut test = Code::text(format!("if ({}.isInstance(", class_expression));
        test.push_value(exception).push_str(")) {");
        ctx.emit_statement(test);

        ctx.move_indent(1);
        emit_jump(ctx, region.target);
        ctx.move_indent(-1);
        ctx.emit_statement("}");
    }

    let mut rethrow = Code::text("throw ");
    rethrow.push_value(exception).push_str(";");
    ctx.emit_statement(rethrow);

    Ok(DispatchOutcome::Rethrow)
}

#[cfg(test)]
#[path = "tests/js_exceptions_tests.rs"]
mod tests;
