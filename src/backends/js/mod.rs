//! JavaScript backend for AVM2 method bodies.
//!
//! Each method is lowered on its own into a `function` whose body is a dispatch
//! loop over its basic blocks. A failing method does not stop the others: its
//! error is collected and the host keeps running that method on the fallback path.
//! All functions of a module index into the same `$names` and `$classes` tables.

pub mod js_coercion;
pub mod js_context;
pub mod js_exceptions;
pub mod js_expr;
pub mod js_function;
pub mod js_traits;

#[cfg(test)]
mod tests;

use crate::avm2::class_ref::ClassResolver;
use crate::backends::js::js_context::ConstantTables;
use crate::backends::js::js_exceptions::{ErrorFactory, ExceptionRegion};
use crate::backends::js::js_expr::{is_js_reserved, sanitize_identifier};
use crate::backends::js::js_function::{LoweredMethod, MethodBodyBuilder, MethodSignature};
use crate::codegen_log;
use crate::compiler_messages::compiler_errors::{
    CompilerError, CompilerMessages, ErrorMetaDataKey,
};
use crate::settings::CompilerSettings;
use rustc_hash::FxHashSet;

/// Compiles one method body.
///
/// `body` drives the builder through the method's basic blocks. The builder is
/// finished and rendered once it returns. `tables` are the module's constant
/// tables so far, the result carries them with this method's entries appended.
pub fn lower_method_to_js<'s, F>(
    settings: &'s CompilerSettings,
    factory: &'s dyn ErrorFactory,
    resolver: &dyn ClassResolver,
    signature: &MethodSignature,
    regions: Vec<ExceptionRegion>,
    tables: ConstantTables,
    body: F,
) -> Result<LoweredMethod, CompilerError>
where
    F: FnOnce(&mut MethodBodyBuilder<'s>) -> Result<(), CompilerError>,
{
    let mut builder = MethodBodyBuilder::with_tables(settings, factory, signature, regions, tables);
    body(&mut builder)?;
    builder.finish(resolver)
}

/// Result of lowering a batch of methods.
#[derive(Debug, Clone, Default)]
pub struct JsModule {
    /// Complete JS source code.
    pub source: String,

    /// Generated function names, in the order the methods were added.
    pub method_names: Vec<String>,

    /// What the host installs as `$names` and `$classes` before running `source`.
    pub tables: ConstantTables,
}

/// Collects compiled methods into one source and failed ones into messages.
#[derive(Debug, Default)]
pub struct JsModuleBuilder {
    module: JsModule,
    messages: CompilerMessages,
    used_identifiers: FxHashSet<String>,
}

impl JsModuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A JS function name for a method, unique in this module.
    pub fn method_identifier(&mut self, raw: &str) -> String {
        let mut identifier = sanitize_identifier(raw);

        if is_js_reserved(&identifier)
            || identifier
                .chars()
                .next()
                .is_some_and(|first| first.is_ascii_digit())
        {
            identifier = format!("_{}", identifier);
        }

        let mut candidate = identifier.clone();
        let mut suffix = 1usize;

        while self.used_identifiers.contains(&candidate) {
            candidate = format!("{}_{}", identifier, suffix);
            suffix += 1;
        }

        self.used_identifiers.insert(candidate.clone());
        candidate
    }

    /// The tables the next method has to be lowered against.
    pub fn tables(&self) -> &ConstantTables {
        &self.module.tables
    }

    /// Adds the outcome of compiling one method.
    ///
    /// Errors are tagged with the method name so the driver can route that method
    /// to the fallback path. A failed method leaves the tables untouched.
    pub fn add_method(&mut self, name: &str, result: Result<LoweredMethod, CompilerError>) {
        let result = result.and_then(|lowered| {
            if lowered.tables.extends(&self.module.tables) {
                Ok(lowered)
            } else {
                Err(CompilerError::compiler_error(
                    "Method was lowered against stale constant tables",
                ))
            }
        });

        match result {
            Ok(lowered) => {
                if !self.module.source.is_empty() {
                    self.module.source.push('\n');
                }
                self.module.source.push_str(&lowered.source);
                self.module.method_names.push(name.to_owned());
                self.module.tables = lowered.tables;
            }
            Err(mut error) => {
                codegen_log!(format!("[Module] {} failed: {}", name, error));
                error.new_metadata_entry(ErrorMetaDataKey::MethodName, name);
                self.messages.push(error);
            }
        }
    }

    pub fn finish(self) -> (JsModule, CompilerMessages) {
        (self.module, self.messages)
    }
}
