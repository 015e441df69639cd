//! Per-method compile state and the block IR.
//!
//! Code is not written out while a method is being translated. Every statement and
//! every variable binding becomes a `Block` in one ordered stream, and values refer
//! to earlier bindings by `BlockId` instead of by name. Only when the stream is
//! rendered do we know how often each binding was read, so only then is it decided
//! whether a binding gets a `var` declaration or is inlined into its single use.

use crate::avm2::class_ref::ClassRef;
use crate::avm2::constant_value::ConstantValue;
use crate::avm2::multiname::Multiname;
use crate::backends::js::js_expr::{constant_literal, is_simple_expression};
use crate::compiler_messages::compiler_errors::CompilerError;
use crate::settings::{
    CLASSES_TABLE, CompilerSettings, MINIMUM_LIKELY_BLOCKS, MINIMUM_LIKELY_NAMES, NAMES_TABLE,
};
use crate::{codegen_log, return_compiler_error};
use rustc_hash::FxHashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Local,
    StackTemp,
}

impl SlotKind {
    pub fn prefix(self) -> &'static str {
        match self {
            SlotKind::Local => "l",
            SlotKind::StackTemp => "s",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SlotKind::Local => "local",
            SlotKind::StackTemp => "stack",
        }
    }
}

/// The JavaScript name a materialized binding is declared under.
pub fn variable_name(slot_kind: SlotKind, slot_id: u32) -> String {
    format!("{}{}", slot_kind.prefix(), slot_id)
}

/// Position of a block in the stream. Doubles as the handle to a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CodePart {
    Text(String),
    // Rendered as the binding's name or its inlined value, decided at render time
    Use(BlockId),
}

/// A fragment of JavaScript with holes for bound values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Code {
    parts: Vec<CodePart>,
}

impl Code {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(text: impl Into<String>) -> Self {
        let mut code = Code::new();
        code.parts.push(CodePart::Text(text.into()));
        code
    }

    pub fn value(id: BlockId) -> Self {
        Code {
            parts: vec![CodePart::Use(id)],
        }
    }

    pub fn push_str(&mut self, text: &str) -> &mut Self {
        match self.parts.last_mut() {
            Some(CodePart::Text(last)) => last.push_str(text),
            _ => self.parts.push(CodePart::Text(text.to_owned())),
        }
        self
    }

    pub fn push_value(&mut self, id: BlockId) -> &mut Self {
        self.parts.push(CodePart::Use(id));
        self
    }

    pub fn append(&mut self, other: Code) -> &mut Self {
        for part in other.parts {
            match part {
                CodePart::Text(text) => self.push_str(&text),
                CodePart::Use(id) => self.push_value(id),
            };
        }
        self
    }

    pub fn wrap(prefix: &str, inner: Code, suffix: &str) -> Code {
        let mut code = Code::text(prefix);
        code.append(inner);
        code.push_str(suffix);
        code
    }

    pub fn parts(&self) -> &[CodePart] {
        &self.parts
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// `Some` when the fragment is nothing but one bound value.
    pub fn as_single_value(&self) -> Option<BlockId> {
        match self.parts.as_slice() {
            [CodePart::Use(id)] => Some(*id),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [CodePart::Text(text)] => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for Code {
    fn from(text: &str) -> Self {
        Code::text(text)
    }
}

impl From<String> for Code {
    fn from(text: String) -> Self {
        Code::text(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Literal(ConstantValue),
    Expression(Code),
    StackRef(BlockId),
    LocalRef(BlockId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueDescriptor {
    pub kind: ValueKind,

    // Forces a `var` declaration even for a single use, e.g. when evaluation order matters
    pub must_declare: bool,
}

impl ValueDescriptor {
    pub fn literal(value: ConstantValue) -> Self {
        ValueDescriptor {
            kind: ValueKind::Literal(value),
            must_declare: false,
        }
    }

    pub fn expression(code: impl Into<Code>) -> Self {
        ValueDescriptor {
            kind: ValueKind::Expression(code.into()),
            must_declare: false,
        }
    }

    pub fn stack_ref(id: BlockId) -> Self {
        ValueDescriptor {
            kind: ValueKind::StackRef(id),
            must_declare: false,
        }
    }

    pub fn local_ref(id: BlockId) -> Self {
        ValueDescriptor {
            kind: ValueKind::LocalRef(id),
            must_declare: false,
        }
    }

    pub fn declared(mut self) -> Self {
        self.must_declare = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct VariableBinding {
    pub slot_kind: SlotKind,
    pub slot_id: u32,
    pub value: ValueDescriptor,
}

impl VariableBinding {
    pub fn name(&self) -> String {
        variable_name(self.slot_kind, self.slot_id)
    }
}

#[derive(Debug, Clone)]
pub enum BlockKind {
    Statement(Code),
    Binding(VariableBinding),
}

#[derive(Debug, Clone)]
pub struct Block {
    position: usize,
    indent: usize,
    suppressed: bool,
    usage_positions: Vec<usize>,
    kind: BlockKind,
}

impl Block {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Set by `render` for bindings that were inlined or dropped.
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Stream positions of the blocks that read this binding.
    pub fn usage_positions(&self) -> &[usize] {
        &self.usage_positions
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    pub fn binding(&self) -> Option<&VariableBinding> {
        match &self.kind {
            BlockKind::Binding(binding) => Some(binding),
            BlockKind::Statement(_) => None,
        }
    }
}

/// The `$names` and `$classes` tables generated code indexes into.
///
/// One pair is shared by every method of a module. A method starts from the
/// module's tables and may only append to them.
#[derive(Debug, Clone, Default)]
pub struct ConstantTables {
    pub names: Vec<Rc<Multiname>>,
    pub classes: Vec<ClassRef>,
}

impl ConstantTables {
    pub fn new() -> Self {
        ConstantTables {
            names: Vec::with_capacity(MINIMUM_LIKELY_NAMES),
            classes: Vec::new(),
        }
    }

    /// True when `base` is a prefix of these tables, so every index valid in
    /// `base` still denotes the same entry here.
    pub fn extends(&self, base: &ConstantTables) -> bool {
        self.names.len() >= base.names.len()
            && self.classes.len() >= base.classes.len()
            && self
                .names
                .iter()
                .zip(&base.names)
                .all(|(name, existing)| name.id() == existing.id())
            && self
                .classes
                .iter()
                .zip(&base.classes)
                .all(|(class, existing)| class.id() == existing.id())
    }
}

/// Everything that lives for the translation of one method body.
///
/// Not shared between methods. A fresh context is created per method, seeded
/// with the module's constant tables, and dropped once `render` has produced
/// its source.
pub struct CompileContext<'s> {
    settings: &'s CompilerSettings,

    // Index i is rendered as `$names[i]`
    names: Vec<Rc<Multiname>>,
    classes: Vec<ClassRef>,

    blocks: Vec<Block>,

    // Most recent binding per slot, what a read of that slot currently sees
    live_bindings: FxHashMap<(SlotKind, u32), BlockId>,

    indent: usize,
    stack_depth: u32,
}

impl<'s> CompileContext<'s> {
    pub fn new(settings: &'s CompilerSettings) -> Self {
        Self::with_tables(settings, ConstantTables::new())
    }

    /// Interning continues after the entries already in `tables`.
    pub fn with_tables(settings: &'s CompilerSettings, tables: ConstantTables) -> Self {
        CompileContext {
            settings,
            names: tables.names,
            classes: tables.classes,
            blocks: Vec::with_capacity(MINIMUM_LIKELY_BLOCKS),
            live_bindings: FxHashMap::default(),
            indent: 0,
            stack_depth: 0,
        }
    }

    #[inline]
    pub fn settings(&self) -> &'s CompilerSettings {
        self.settings
    }

    /// Position the next block will take.
    #[inline]
    pub fn position(&self) -> usize {
        self.blocks.len()
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Only affects blocks emitted afterwards.
    pub fn move_indent(&mut self, delta: isize) {
        self.indent = self.indent.saturating_add_signed(delta);
    }

    pub fn stack_depth(&self) -> u32 {
        self.stack_depth
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.0)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    // ---- Name and class tables ----

    /// Returns the table index of `multiname`, registering it on first use.
    pub fn intern_name(&mut self, multiname: &Rc<Multiname>) -> usize {
        if let Some(index) = self
            .names
            .iter()
            .position(|existing| existing.id() == multiname.id())
        {
            return index;
        }

        self.names.push(Rc::clone(multiname));
        self.names.len() - 1
    }

    /// The expression that reads an interned name at run time.
    pub fn name_reference(&self, index: usize) -> Result<String, CompilerError> {
        if index >= self.names.len() {
            return Err(CompilerError::new_name_index_out_of_range(
                index,
                self.names.len(),
            ));
        }

        Ok(format!("{}[{}]", NAMES_TABLE, index))
    }

    pub fn interned_names(&self) -> &[Rc<Multiname>] {
        &self.names
    }

    pub fn intern_class(&mut self, class: &ClassRef) -> usize {
        if let Some(index) = self
            .classes
            .iter()
            .position(|existing| existing.id() == class.id())
        {
            return index;
        }

        self.classes.push(class.clone());
        self.classes.len() - 1
    }

    pub fn class_reference(&self, index: usize) -> Result<String, CompilerError> {
        if index >= self.classes.len() {
            return_compiler_error!(
                "Class index {} used before it was interned ({} classes registered)",
                index,
                self.classes.len()
            );
        }

        Ok(format!("{}[{}]", CLASSES_TABLE, index))
    }

    pub fn interned_classes(&self) -> &[ClassRef] {
        &self.classes
    }

    /// Gives up the context, keeping only its constant tables.
    pub fn into_tables(self) -> ConstantTables {
        ConstantTables {
            names: self.names,
            classes: self.classes,
        }
    }

    // ---- Block stream ----

    pub fn emit_statement(&mut self, code: impl Into<Code>) -> BlockId {
        self.push_block(BlockKind::Statement(code.into()))
    }

    /// Binds a new value to a slot. Later reads of the slot see this binding.
    ///
    /// Readers of the binding being replaced are declared first when that binding
    /// renders as the slot's name, otherwise they would read the new value.
    pub fn bind_variable(
        &mut self,
        slot_id: u32,
        slot_kind: SlotKind,
        value: ValueDescriptor,
    ) -> BlockId {
        codegen_log!(format!(
            "[IR] Bind {} at {}",
            variable_name(slot_kind, slot_id),
            self.blocks.len()
        ));

        if let Some(previous) = self.live_bindings.get(&(slot_kind, slot_id)).copied() {
            if self.renders_as_name(previous) {
                self.declare_readers(previous);
            }
        }

        let id = self.push_block(BlockKind::Binding(VariableBinding {
            slot_kind,
            slot_id,
            value,
        }));

        self.live_bindings.insert((slot_kind, slot_id), id);
        id
    }

    /// Finds the binding a read of the slot sees and records the read.
    ///
    /// A miss is an error under strict resolution. Otherwise an `undefined`
    /// placeholder is bound so the read still renders.
    pub fn resolve_variable(
        &mut self,
        slot_id: u32,
        slot_kind: SlotKind,
    ) -> Result<BlockId, CompilerError> {
        let id = match self.live_bindings.get(&(slot_kind, slot_id)) {
            Some(id) => *id,
            None => {
                if self.settings.strict_variable_resolution {
                    return Err(CompilerError::new_unresolved_variable(
                        slot_id,
                        slot_kind.as_str(),
                    ));
                }

                codegen_log!(format!(
                    "[IR] {} read before it was bound, using undefined",
                    variable_name(slot_kind, slot_id)
                ));
                self.bind_variable(
                    slot_id,
                    slot_kind,
                    ValueDescriptor::literal(ConstantValue::Undefined),
                )
            }
        };

        let position = self.blocks.len();
        self.blocks[id.0].usage_positions.push(position);

        Ok(id)
    }

    /// Forces a `var` declaration for a binding no matter how often it is read.
    pub fn mark_declared(&mut self, id: BlockId) -> Result<(), CompilerError> {
        let slot = match self.blocks.get_mut(id.0).map(|block| &mut block.kind) {
            Some(BlockKind::Binding(binding)) => {
                binding.value.must_declare = true;
                (binding.slot_kind, binding.slot_id)
            }
            _ => return_compiler_error!("Block {} is not a variable binding", id.0),
        };

        // Already replaced in its slot, so its readers may render after the new binding
        if self.live_bindings.get(&slot) != Some(&id) {
            self.declare_readers(id);
        }

        Ok(())
    }

    /// Forgets every slot binding without declaring anything.
    ///
    /// Only valid where control flow starts over, after the bindings still
    /// needed have been declared. Whatever follows reads slots through their
    /// variables again.
    pub fn reset_slots(&mut self) {
        self.live_bindings.clear();
        self.stack_depth = 0;
    }

    /// The constant a binding holds, following stack and local copies.
    pub fn constant_value(&self, id: BlockId) -> Option<&ConstantValue> {
        let binding = self.blocks.get(id.0)?.binding()?;

        match &binding.value.kind {
            ValueKind::Literal(value) => Some(value),
            ValueKind::StackRef(source) | ValueKind::LocalRef(source) => {
                self.constant_value(*source)
            }
            ValueKind::Expression(_) => None,
        }
    }

    /// Every slot that currently has a binding, oldest binding first.
    pub fn live_slots(&self) -> Vec<(SlotKind, u32, BlockId)> {
        let mut slots: Vec<(SlotKind, u32, BlockId)> = self
            .live_bindings
            .iter()
            .map(|(&(slot_kind, slot_id), &id)| (slot_kind, slot_id, id))
            .collect();
        slots.sort_by_key(|(_, _, id)| *id);
        slots
    }

    /// True for a binding whose value is just its own slot variable, as bound
    /// when control enters a case.
    pub fn is_slot_variable(&self, id: BlockId) -> bool {
        self.blocks
            .get(id.0)
            .and_then(Block::binding)
            .is_some_and(Self::reads_own_variable)
    }

    // ---- Operand stack and locals ----

    pub fn push_value(&mut self, value: ValueDescriptor) -> BlockId {
        let id = self.bind_variable(self.stack_depth, SlotKind::StackTemp, value);
        self.stack_depth += 1;
        id
    }

    pub fn pop_value(&mut self) -> Result<BlockId, CompilerError> {
        if self.stack_depth == 0 {
            return Err(CompilerError::new_stack_underflow(self.stack_depth));
        }

        self.stack_depth -= 1;
        self.resolve_variable(self.stack_depth, SlotKind::StackTemp)
    }

    pub fn peek_value(&mut self) -> Result<BlockId, CompilerError> {
        if self.stack_depth == 0 {
            return Err(CompilerError::new_stack_underflow(self.stack_depth));
        }

        self.resolve_variable(self.stack_depth - 1, SlotKind::StackTemp)
    }

    pub fn set_local(&mut self, index: u32, value: ValueDescriptor) -> BlockId {
        self.bind_variable(index, SlotKind::Local, value)
    }

    pub fn get_local(&mut self, index: u32) -> Result<BlockId, CompilerError> {
        self.resolve_variable(index, SlotKind::Local)
    }

    // ---- Rendering ----

    /// How a read of the binding renders right now.
    ///
    /// The answer changes as more reads are recorded, so only the result of
    /// `render` is final.
    pub fn render_value(&self, id: BlockId) -> Result<String, CompilerError> {
        let Some(block) = self.blocks.get(id.0) else {
            return_compiler_error!("Block {} does not exist", id.0);
        };

        let BlockKind::Binding(binding) = &block.kind else {
            return_compiler_error!(format!("Block {} is a statement and has no value", id.0), {
                CompilationStage => "Render"
            });
        };

        if Self::is_materialized(block, binding) {
            return Ok(binding.name());
        }

        self.render_binding_value(binding)
    }

    pub fn render_code(&self, code: &Code) -> Result<String, CompilerError> {
        let mut out = String::new();

        for part in &code.parts {
            match part {
                CodePart::Text(text) => out.push_str(text),
                CodePart::Use(id) => out.push_str(&self.render_value(*id)?),
            }
        }

        Ok(out)
    }

    /// Renders the whole stream, deciding for every binding whether it is
    /// declared, inlined or dropped.
    pub fn render(&mut self) -> Result<String, CompilerError> {
        let mut out = String::new();

        for index in 0..self.blocks.len() {
            let line = self.render_block(&self.blocks[index])?;

            match line {
                Some(line) => {
                    if self.settings.pretty {
                        for _ in 0..self.blocks[index].indent {
                            out.push_str("    ");
                        }
                    }
                    out.push_str(&line);
                    out.push('\n');
                }
                None => self.blocks[index].suppressed = true,
            }
        }

        codegen_log!(format!("[IR] Rendered {} blocks", self.blocks.len()));

        Ok(out)
    }

    fn render_block(&self, block: &Block) -> Result<Option<String>, CompilerError> {
        let binding = match &block.kind {
            BlockKind::Statement(code) => return Ok(Some(self.render_code(code)?)),
            BlockKind::Binding(binding) => binding,
        };

        if Self::is_materialized(block, binding) {
            return Ok(Some(format!(
                "var {} = {};",
                binding.name(),
                self.render_binding_value(binding)?
            )));
        }

        // Nobody reads it, but evaluating it may still have side effects
        if block.usage_positions.is_empty() {
            if let ValueKind::Expression(code) = &binding.value.kind {
                let rendered = self.render_code(code)?;
                if !is_simple_expression(&rendered) {
                    return Ok(Some(format!("{};", rendered)));
                }
            }
        }

        Ok(None)
    }

    fn render_binding_value(&self, binding: &VariableBinding) -> Result<String, CompilerError> {
        match &binding.value.kind {
            ValueKind::Literal(value) => {
                let literal = constant_literal(value);
                if literal.starts_with('-') {
                    Ok(format!("({})", literal))
                } else {
                    Ok(literal)
                }
            }
            ValueKind::Expression(code) => self.render_code(code),
            ValueKind::StackRef(source) | ValueKind::LocalRef(source) => {
                self.render_value(*source)
            }
        }
    }

    /// True when reads of the binding render as its variable name. The read
    /// count of a replaced binding is final, so the answer only changes through
    /// `mark_declared`.
    fn renders_as_name(&self, id: BlockId) -> bool {
        match self.blocks.get(id.0) {
            Some(block) => match &block.kind {
                BlockKind::Binding(binding) => {
                    Self::reads_own_variable(binding) || Self::is_materialized(block, binding)
                }
                BlockKind::Statement(_) => false,
            },
            None => false,
        }
    }

    fn declare_readers(&mut self, id: BlockId) {
        let readers = self.blocks[id.0].usage_positions.clone();

        for position in readers {
            if let Some(BlockKind::Binding(reader)) =
                self.blocks.get_mut(position).map(|block| &mut block.kind)
            {
                reader.value.must_declare = true;
            }
        }
    }

    fn is_materialized(block: &Block, binding: &VariableBinding) -> bool {
        binding.value.must_declare
            || (block.usage_positions.len() > 1 && !Self::reads_own_variable(binding))
    }

    fn reads_own_variable(binding: &VariableBinding) -> bool {
        match &binding.value.kind {
            ValueKind::Expression(code) => code.as_text() == Some(binding.name().as_str()),
            _ => false,
        }
    }

    fn push_block(&mut self, kind: BlockKind) -> BlockId {
        let id = BlockId(self.blocks.len());

        self.blocks.push(Block {
            position: id.0,
            indent: self.indent,
            suppressed: false,
            usage_positions: Vec::new(),
            kind,
        });

        id
    }
}

#[cfg(test)]
#[path = "tests/js_context_tests.rs"]
mod tests;
