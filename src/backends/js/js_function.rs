//! Assembles one method body around the dispatch loop.
//!
//! Every basic block of the method becomes a `case` of a `switch` on the dispatch
//! state, inside a `while (true)` loop. A branch assigns the target offset and
//! `continue`s. Methods with exception regions wrap the switch in a `try` whose
//! `catch` picks the handler from the offset the exception was thrown at.

use crate::avm2::class_ref::ClassResolver;
use crate::backends::js::js_context::{
    BlockId, Code, CompileContext, ConstantTables, SlotKind, ValueDescriptor, variable_name,
};
use crate::backends::js::js_exceptions::{
    ErrorFactory, ExceptionRegion, emit_catch_prologue, emit_handler_dispatch,
};
use crate::compiler_messages::compiler_errors::CompilerError;
use crate::settings::{CAUGHT_VALUE, CompilerSettings, DISPATCH_STATE};
use crate::{codegen_log, return_compiler_error};

/// Assigns the dispatch state and re-enters the loop.
pub fn emit_jump(ctx: &mut CompileContext, target: u32) {
    ctx.emit_statement(format!("{} = {};", DISPATCH_STATE, target));
    ctx.emit_statement("continue;");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub param_count: u32,
    /// Local registers including the receiver in local 0.
    pub local_count: u32,
}

impl MethodSignature {
    pub fn new(name: &str, param_count: u32, local_count: u32) -> Self {
        MethodSignature {
            name: name.to_owned(),
            param_count,
            local_count: local_count.max(param_count + 1),
        }
    }
}

/// A rendered method and the constant tables its source indexes into.
#[derive(Debug, Clone)]
pub struct LoweredMethod {
    pub source: String,
    pub tables: ConstantTables,
}

pub struct MethodBodyBuilder<'s> {
    ctx: CompileContext<'s>,
    factory: &'s dyn ErrorFactory,
    local_count: u32,
    regions: Vec<ExceptionRegion>,

    // In emission order
    case_offsets: Vec<u32>,
    case_open: bool,
}

impl<'s> MethodBodyBuilder<'s> {
    pub fn new(
        settings: &'s CompilerSettings,
        factory: &'s dyn ErrorFactory,
        signature: &MethodSignature,
        regions: Vec<ExceptionRegion>,
    ) -> Self {
        Self::with_tables(settings, factory, signature, regions, ConstantTables::new())
    }

    /// Emits the function header and opens the dispatch loop.
    ///
    /// Parameters arrive in `l1..ln`, the receiver is bound to local 0. Names and
    /// classes are interned after the entries already in `tables`.
    pub fn with_tables(
        settings: &'s CompilerSettings,
        factory: &'s dyn ErrorFactory,
        signature: &MethodSignature,
        regions: Vec<ExceptionRegion>,
        tables: ConstantTables,
    ) -> Self {
        let mut ctx = CompileContext::with_tables(settings, tables);

        let parameters = (1..=signature.param_count)
            .map(|index| variable_name(SlotKind::Local, index))
            .collect::<Vec<_>>();

        ctx.emit_statement(format!(
            "function {}({}) {{",
            signature.name,
            parameters.join(", ")
        ));
        ctx.move_indent(1);

        ctx.set_local(0, ValueDescriptor::expression("this"));
        for index in 1..=signature.param_count {
            ctx.set_local(
                index,
                ValueDescriptor::expression(variable_name(SlotKind::Local, index)),
            );
        }

        ctx.emit_statement(format!("var {} = 0;", DISPATCH_STATE));
        if settings.loop_guard.is_some() {
            ctx.emit_statement("var $guard = 0;");
        }

        ctx.emit_statement("while (true) {");
        ctx.move_indent(1);

        if let Some(limit) = settings.loop_guard {
            ctx.emit_statement(format!("if (++$guard > {}) {{", limit));
            ctx.move_indent(1);
            ctx.emit_statement(format!(
                "throw {};",
                factory.construct("Error", "\"Loop guard exceeded\"")
            ));
            ctx.move_indent(-1);
            ctx.emit_statement("}");
        }

        if !regions.is_empty() {
            ctx.emit_statement("try {");
            ctx.move_indent(1);
        }

        ctx.emit_statement(format!("switch ({}) {{", DISPATCH_STATE));
        ctx.move_indent(1);

        codegen_log!(format!(
            "[Method] {} with {} exception regions",
            signature.name,
            regions.len()
        ));

        MethodBodyBuilder {
            ctx,
            factory,
            local_count: signature.local_count,
            regions,
            case_offsets: Vec::new(),
            case_open: false,
        }
    }

    pub fn context(&self) -> &CompileContext<'s> {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut CompileContext<'s> {
        &mut self.ctx
    }

    pub fn case_offsets(&self) -> &[u32] {
        &self.case_offsets
    }

    /// Opens the case for the basic block at `offset`.
    ///
    /// `stack_depth` is the operand stack height on entry. All slots are read back
    /// from their variables inside the case, so whatever the previous case left
    /// in a slot is declared first.
    pub fn begin_case(&mut self, offset: u32, stack_depth: u32) -> Result<(), CompilerError> {
        if self.case_offsets.contains(&offset) {
            return_compiler_error!("Case {} was opened twice", offset);
        }

        let falls_through = self.case_open;
        self.flush_slots()?;
        self.close_case();
        self.ctx.reset_slots();

        if self.ctx.settings().emit_offsets {
            self.ctx.emit_statement(format!("// offset {}", offset));
        }

        self.ctx.emit_statement(format!("case {}: {{", offset));
        self.ctx.move_indent(1);
        self.case_offsets.push(offset);
        self.case_open = true;

        // Handlers pick the region from the state, so it must be exact on fallthrough too
        if falls_through && !self.regions.is_empty() {
            self.ctx
                .emit_statement(format!("{} = {};", DISPATCH_STATE, offset));
        }

        for local in 0..self.local_count {
            self.ctx.set_local(
                local,
                ValueDescriptor::expression(variable_name(SlotKind::Local, local)),
            );
        }

        for slot in 0..stack_depth {
            self.ctx.push_value(ValueDescriptor::expression(variable_name(
                SlotKind::StackTemp,
                slot,
            )));
        }

        Ok(())
    }

    /// Opens a handler case. The caught value is the only operand on entry.
    pub fn begin_handler_case(&mut self, offset: u32) -> Result<BlockId, CompilerError> {
        self.begin_case(offset, 1)?;
        self.ctx.peek_value()
    }

    pub fn jump(&mut self, target: u32) -> Result<(), CompilerError> {
        self.flush_slots()?;
        emit_jump(&mut self.ctx, target);
        Ok(())
    }

    /// Jumps to `target` when `condition` holds, otherwise execution continues in this case.
    pub fn branch_if(&mut self, condition: Code, target: u32) -> Result<(), CompilerError> {
        self.flush_slots()?;

        let statement = Code::wrap("if (", condition, ") {");
        self.ctx.emit_statement(statement);
        self.ctx.move_indent(1);
        emit_jump(&mut self.ctx, target);
        self.ctx.move_indent(-1);
        self.ctx.emit_statement("}");

        Ok(())
    }

    pub fn emit_return(&mut self, value: Option<BlockId>) {
        match value {
            Some(value) => {
                let mut statement = Code::text("return ");
                statement.push_value(value).push_str(";");
                self.ctx.emit_statement(statement);
            }
            None => {
                self.ctx.emit_statement("return;");
            }
        }
    }

    /// Closes the loop, emits the handler dispatch and renders the method.
    pub fn finish(mut self, resolver: &dyn ClassResolver) -> Result<LoweredMethod, CompilerError> {
        // A handler of the last case still reads its slots
        self.flush_slots()?;
        self.close_case();

        self.ctx.emit_statement("default: {");
        self.ctx.move_indent(1);
        self.ctx.emit_statement(format!(
            "throw {};",
            self.factory.construct(
                "Error",
                &format!("\"Invalid dispatch target: \" + {}", DISPATCH_STATE)
            )
        ));
        self.ctx.move_indent(-1);
        self.ctx.emit_statement("}");

        self.ctx.move_indent(-1);
        self.ctx.emit_statement("}");

        if !self.regions.is_empty() {
            self.emit_catch(resolver)?;
        }

        // while, function
        self.ctx.move_indent(-1);
        self.ctx.emit_statement("}");
        self.ctx.move_indent(-1);
        self.ctx.emit_statement("}");

        let source = self.ctx.render()?;
        Ok(LoweredMethod {
            source,
            tables: self.ctx.into_tables(),
        })
    }

    fn emit_catch(&mut self, resolver: &dyn ClassResolver) -> Result<(), CompilerError> {
        self.ctx.move_indent(-1);
        self.ctx.emit_statement(format!("}} catch ({}) {{", CAUGHT_VALUE));
        self.ctx.move_indent(1);

        let exception = emit_catch_prologue(&mut self.ctx, self.factory);

        // Cases guarded by the same regions share one dispatch chain
        let mut groups: Vec<(Vec<usize>, Vec<u32>)> = Vec::new();
        for &offset in &self.case_offsets {
            let active = self
                .regions
                .iter()
                .enumerate()
                .filter(|(_, region)| region.covers(offset))
                .map(|(index, _)| index)
                .collect::<Vec<_>>();

            if active.is_empty() {
                continue;
            }

            match groups.iter_mut().find(|(regions, _)| *regions == active) {
                Some((_, offsets)) => offsets.push(offset),
                None => groups.push((active, vec![offset])),
            }
        }

        if !groups.is_empty() {
            self.ctx
                .emit_statement(format!("switch ({}) {{", DISPATCH_STATE));
            self.ctx.move_indent(1);

            for (active, offsets) in &groups {
                let Some((last, leading)) = offsets.split_last() else {
                    continue;
                };

                for offset in leading {
                    self.ctx.emit_statement(format!("case {}:", offset));
                }
                self.ctx.emit_statement(format!("case {}: {{", last));
                self.ctx.move_indent(1);

                let regions = active
                    .iter()
                    .map(|&index| &self.regions[index])
                    .collect::<Vec<_>>();
                emit_handler_dispatch(&mut self.ctx, &regions, exception, resolver)?;

                self.ctx.move_indent(-1);
                self.ctx.emit_statement("}");
            }

            self.ctx.move_indent(-1);
            self.ctx.emit_statement("}");
        }

        // Thrown outside every region
        let mut rethrow = Code::text("throw ");
        rethrow.push_value(exception).push_str(";");
        self.ctx.emit_statement(rethrow);

        self.ctx.move_indent(-1);
        self.ctx.emit_statement("}");

        Ok(())
    }

    fn close_case(&mut self) {
        if self.case_open {
            self.ctx.move_indent(-1);
            self.ctx.emit_statement("}");
            self.case_open = false;
        }
    }

    // Values left in slots are read from their variables by whatever runs next
    fn flush_slots(&mut self) -> Result<(), CompilerError> {
        let depth = self.ctx.stack_depth();

        for (slot_kind, slot_id, id) in self.ctx.live_slots() {
            if slot_kind == SlotKind::StackTemp && slot_id >= depth {
                continue;
            }
            if self.ctx.is_slot_variable(id) {
                continue;
            }
            self.ctx.mark_declared(id)?;
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/js_function_tests.rs"]
mod tests;
