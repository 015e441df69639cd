use std::collections::HashMap;
use std::fmt;

// The final set of errors collected while compiling a batch of methods.
// A failing method only contributes its error here, the rest of the batch keeps going.
#[derive(Debug, Default)]
pub struct CompilerMessages {
    pub errors: Vec<CompilerError>,
}

impl CompilerMessages {
    pub fn new() -> Self {
        CompilerMessages { errors: Vec::new() }
    }

    pub fn push(&mut self, error: CompilerError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum ErrorMetaDataKey {
    CompilationStage,
    MethodName,

    // Identity of the offending slot or name
    SlotId,
    SlotKind,
    NameIndex,
    TableSize,
    TraitName,

    ConfigKey,

    PrimarySuggestion,
}

#[derive(Debug, Clone)]
pub struct CompilerError {
    pub msg: String,
    pub error_type: ErrorType,

    // Structured detail about what went wrong, mostly for the driver deciding on a fallback
    pub metadata: HashMap<ErrorMetaDataKey, String>,
}

impl CompilerError {
    pub fn new(msg: impl Into<String>, error_type: ErrorType) -> CompilerError {
        CompilerError {
            msg: msg.into(),
            error_type,
            metadata: HashMap::new(),
        }
    }

    pub fn with_error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = error_type;
        self
    }

    pub fn with_metadata(mut self, key: ErrorMetaDataKey, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value.into());
        self
    }

    pub fn new_metadata_entry(&mut self, key: ErrorMetaDataKey, value: impl Into<String>) {
        self.metadata.insert(key, value.into());
    }

    pub fn metadata(&self, key: ErrorMetaDataKey) -> Option<&str> {
        self.metadata.get(&key).map(String::as_str)
    }

    /// A stack or local reference could not be found under strict resolution.
    pub fn new_unresolved_variable(slot_id: u32, slot_kind: &str) -> Self {
        CompilerError::new(
            format!("Unresolved {} variable in slot {}", slot_kind, slot_id),
            ErrorType::UnresolvedVariable,
        )
        .with_metadata(ErrorMetaDataKey::SlotId, slot_id.to_string())
        .with_metadata(ErrorMetaDataKey::SlotKind, slot_kind)
    }

    /// Two traits were given the same slot while linking a class.
    pub fn new_duplicate_slot(slot_id: u32, trait_name: &str) -> Self {
        CompilerError::new(
            format!(
                "Slot {} is already occupied, cannot assign it to '{}'",
                slot_id, trait_name
            ),
            ErrorType::DuplicateSlotAllocation,
        )
        .with_metadata(ErrorMetaDataKey::SlotId, slot_id.to_string())
        .with_metadata(ErrorMetaDataKey::TraitName, trait_name)
    }

    pub fn new_name_index_out_of_range(index: usize, table_size: usize) -> Self {
        CompilerError::new(
            format!(
                "Name index {} used before it was interned ({} names registered)",
                index, table_size
            ),
            ErrorType::NameIndexOutOfRange,
        )
        .with_metadata(ErrorMetaDataKey::NameIndex, index.to_string())
        .with_metadata(ErrorMetaDataKey::TableSize, table_size.to_string())
    }

    pub fn new_stack_underflow(depth: u32) -> Self {
        CompilerError::new(
            format!("Operand stack underflow at depth {}", depth),
            ErrorType::StackUnderflow,
        )
        .with_metadata(ErrorMetaDataKey::SlotId, depth.to_string())
    }

    pub fn new_config_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, ErrorType::Config)
    }

    /// Create a compiler error (internal bug, not the bytecode's fault)
    pub fn compiler_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, ErrorType::Compiler)
    }

    /// Whether the driver may retry this method on a non-optimizing path.
    pub fn is_method_local(&self) -> bool {
        matches!(
            self.error_type,
            ErrorType::UnresolvedVariable | ErrorType::NameIndexOutOfRange | ErrorType::StackUnderflow
        )
    }
}

impl fmt::Display for CompilerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", error_type_to_str(&self.error_type), self.msg)
    }
}

impl std::error::Error for CompilerError {}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ErrorType {
    UnresolvedVariable,
    DuplicateSlotAllocation,
    NameIndexOutOfRange,
    StackUnderflow,
    Config,
    Compiler,
}

pub fn error_type_to_str(e_type: &ErrorType) -> &'static str {
    match e_type {
        ErrorType::UnresolvedVariable => "Unresolved Variable",
        ErrorType::DuplicateSlotAllocation => "Duplicate Slot Allocation",
        ErrorType::NameIndexOutOfRange => "Name Index Out Of Range",
        ErrorType::StackUnderflow => "Stack Underflow",
        ErrorType::Config => "Malformed Config",
        ErrorType::Compiler => "Compiler Bug",
    }
}

/// Returns a new CompilerError for internal compiler bugs.
///
/// Usage:
/// `return_compiler_error!("Case {} was opened twice", offset)`;
/// `return_compiler_error!("Missing binding", { CompilationStage => "Render" })`;
#[macro_export]
macro_rules! return_compiler_error {
    ($msg:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_messages::compiler_errors::CompilerError {
            msg: $msg.into(),
            error_type: $crate::compiler_messages::compiler_errors::ErrorType::Compiler,
            metadata: {
                let mut map = std::collections::HashMap::new();
                $(
                    map.insert(
                        $crate::compiler_messages::compiler_errors::ErrorMetaDataKey::$key,
                        String::from($value),
                    );
                )*
                map
            },
        })
    };
    ($($arg:tt)*) => {
        return Err($crate::compiler_messages::compiler_errors::CompilerError::compiler_error(
            format!($($arg)*),
        ))
    };
}
