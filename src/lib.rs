pub mod settings;

pub mod compiler_messages {
    pub mod compiler_dev_logging;
    pub mod compiler_errors;
    pub mod display_messages;
}

pub mod avm2 {
    pub mod class_ref;
    pub mod constant_value;
    pub mod multiname;
    pub mod namespace;
    pub mod runtime_traits;
    pub mod traits;
}

pub mod backends {
    pub mod js;
}

use crate::avm2::class_ref::ClassResolver;
use crate::avm2::runtime_traits::RuntimeTraits;
use crate::backends::js::js_exceptions::{ErrorFactory, ExceptionRegion};
use crate::backends::js::js_function::{MethodBodyBuilder, MethodSignature};
use crate::backends::js::{JsModule, JsModuleBuilder, lower_method_to_js};
use crate::compiler_messages::compiler_errors::{CompilerError, CompilerMessages};
use crate::settings::CompilerSettings;

pub use crate::backends::js::js_coercion::{Coercer, PrimitiveType};
pub use crate::backends::js::js_context::{
    BlockId, Code, CompileContext, ConstantTables, SlotKind, ValueDescriptor,
};
pub use crate::backends::js::js_exceptions::RuntimeErrorFactory;

/// Entry point for a driver compiling the methods of one bytecode container.
///
/// The object model is outside this crate. It is reached through the class
/// resolver, and through the error factory for errors raised by generated code.
pub struct Compiler<'a> {
    settings: &'a CompilerSettings,
    factory: &'a dyn ErrorFactory,
    resolver: &'a dyn ClassResolver,
    module: JsModuleBuilder,
}

impl<'a> Compiler<'a> {
    pub fn new(
        settings: &'a CompilerSettings,
        factory: &'a dyn ErrorFactory,
        resolver: &'a dyn ClassResolver,
    ) -> Self {
        Self {
            settings,
            factory,
            resolver,
            module: JsModuleBuilder::new(),
        }
    }

    pub fn settings(&self) -> &'a CompilerSettings {
        self.settings
    }

    pub fn coercer(&self) -> Coercer<'a> {
        Coercer::new(self.settings)
    }

    // -----------------------------
    //        METHOD LOWERING
    // -----------------------------
    /// Lowers one method body and adds it to the module.
    /// A failure is recorded against the method and does not stop the batch.
    /// Returns the JS function name the method was given.
    pub fn lower_method<F>(
        &mut self,
        raw_name: &str,
        param_count: u32,
        local_count: u32,
        regions: Vec<ExceptionRegion>,
        body: F,
    ) -> String
    where
        F: FnOnce(&mut MethodBodyBuilder<'a>) -> Result<(), CompilerError>,
    {
        let name = self.module.method_identifier(raw_name);
        let signature = MethodSignature::new(&name, param_count, local_count);

        let result = lower_method_to_js(
            self.settings,
            self.factory,
            self.resolver,
            &signature,
            regions,
            self.module.tables().clone(),
            body,
        );

        self.module.add_method(&name, result);
        name
    }

    // -----------------------------
    //         TRAIT EXPORT
    // -----------------------------
    pub fn lower_traits(&self, traits: &RuntimeTraits) -> Result<String, CompilerError> {
        backends::js::js_traits::lower_traits_to_json(traits, self.resolver, self.settings.pretty)
    }

    pub fn finish(self) -> (JsModule, CompilerMessages) {
        self.module.finish()
    }
}
