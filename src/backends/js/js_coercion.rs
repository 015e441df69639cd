//! Coercion of values to the primitive types `Number`, `int`, `uint`, `Boolean` and `String`.
//!
//! A value whose constant is known at compile time is folded into a literal (the
//! static rule). Anything else is wrapped in the JavaScript expression that performs
//! the same conversion at run time (the dynamic rule). Both rules have to agree,
//! so the folding in `avm2::constant_value` mirrors what the emitted expressions do.

use crate::avm2::constant_value::ConstantValue;
use crate::avm2::multiname::Multiname;
use crate::backends::js::js_context::{BlockId, Code, CompileContext};
use crate::backends::js::js_expr::{escape_js_string, is_simple_expression, number_literal};
use crate::coercion_log;
use crate::compiler_messages::compiler_errors::CompilerError;
use crate::settings::{CompilerSettings, RUNTIME_HELPERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Number,
    Int,
    Uint,
    Boolean,
    String,
}

impl PrimitiveType {
    /// Only the top-level public names denote the primitives. A user class called
    /// `int` in some package is just a class.
    pub fn from_multiname(multiname: &Multiname) -> Option<Self> {
        [
            ("Number", PrimitiveType::Number),
            ("int", PrimitiveType::Int),
            ("uint", PrimitiveType::Uint),
            ("Boolean", PrimitiveType::Boolean),
            ("String", PrimitiveType::String),
        ]
        .into_iter()
        .find(|(name, _)| multiname.is_public_top_level(name))
        .map(|(_, primitive)| primitive)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveType::Number => "Number",
            PrimitiveType::Int => "int",
            PrimitiveType::Uint => "uint",
            PrimitiveType::Boolean => "Boolean",
            PrimitiveType::String => "String",
        }
    }
}

pub struct Coercer<'s> {
    settings: &'s CompilerSettings,
}

impl<'s> Coercer<'s> {
    pub fn new(settings: &'s CompilerSettings) -> Self {
        Coercer { settings }
    }

    #[inline]
    fn legacy(&self) -> bool {
        self.settings.legacy_number_coercion
    }

    /// Coerces a bound value to `static_type`.
    ///
    /// Types other than the five primitives leave the value untouched, the
    /// runtime checks those on assignment.
    pub fn coerce(
        &self,
        ctx: &mut CompileContext,
        value: BlockId,
        static_type: Option<&Multiname>,
    ) -> Result<Code, CompilerError> {
        let Some(target) = static_type.and_then(PrimitiveType::from_multiname) else {
            return Ok(Code::value(value));
        };

        if let Some(constant) = ctx.constant_value(value) {
            let folded = self.coerce_constant(constant, target);
            coercion_log!(format!(
                "[Coerce] Folded {:?} to {} as {}",
                constant,
                folded,
                target.as_str()
            ));
            return Ok(Code::text(folded));
        }

        // The String rule reads its operand twice
        if target == PrimitiveType::String {
            ctx.mark_declared(value)?;
        }

        Ok(self.coerce_code(Code::value(value), target))
    }

    /// The static rule: the literal a known constant coerces to.
    pub fn coerce_constant(&self, value: &ConstantValue, target: PrimitiveType) -> String {
        // Strings folded by the runtime's own parser come out as bare literals
        let legacy_string = self.legacy() && matches!(value, ConstantValue::String(_));

        let numeric = |literal: String| {
            if legacy_string && !literal.starts_with('-') {
                literal
            } else {
                format!("({})", literal)
            }
        };

        match target {
            PrimitiveType::Number => numeric(number_literal(value.to_number(self.legacy()))),
            PrimitiveType::Int => numeric(value.to_int32(self.legacy()).to_string()),
            PrimitiveType::Uint => format!("({})", value.to_uint32(false)),
            PrimitiveType::Boolean => value.to_boolean().to_string(),
            PrimitiveType::String => {
                if value.is_nullish() {
                    "null".to_owned()
                } else {
                    escape_js_string(&value.to_js_string())
                }
            }
        }
    }

    /// The dynamic rule for an operand only known at run time.
    ///
    /// A `String` coercion evaluates its operand twice when it is a single bound
    /// value, so that value has to be declared.
    pub fn coerce_code(&self, operand: Code, target: PrimitiveType) -> Code {
        match target {
            PrimitiveType::Number => {
                if self.legacy() {
                    Code::wrap(&format!("{}.toNumber(", RUNTIME_HELPERS), operand, ")")
                } else {
                    Code::wrap("(+", operand, ")")
                }
            }
            PrimitiveType::Int => {
                if self.legacy() {
                    Code::wrap(&format!("({}.toNumber(", RUNTIME_HELPERS), operand, ") | 0)")
                } else {
                    Code::wrap("(", operand, " | 0)")
                }
            }
            PrimitiveType::Uint => Code::wrap("(", operand, " >>> 0)"),
            PrimitiveType::Boolean => Code::wrap("(!!", operand, ")"),
            PrimitiveType::String => {
                let repeatable = operand.as_single_value().is_some()
                    || operand.as_text().is_some_and(is_simple_expression);

                if repeatable {
                    let mut code = Code::text("(");
                    code.append(operand.clone())
                        .push_str(" == null ? null : \"\" + ")
                        .append(operand)
                        .push_str(")");
                    code
                } else {
                    Code::wrap(&format!("{}.coerceString(", RUNTIME_HELPERS), operand, ")")
                }
            }
        }
    }

    /// The dynamic rule on already rendered source text.
    pub fn coerce_expression(&self, expression: &str, target: PrimitiveType) -> String {
        let code = self.coerce_code(Code::text(expression), target);
        code.as_text().map(str::to_owned).unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "tests/js_coercion_tests.rs"]
mod tests;
