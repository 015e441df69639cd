use crate::compiler_messages::compiler_errors::{CompilerError, ErrorMetaDataKey};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const SETTINGS_FILE_NAME: &str = "avm2_codegen.toml";

// Names bound by the host when it turns the generated source into a function.
pub const NAMES_TABLE: &str = "$names";
pub const CLASSES_TABLE: &str = "$classes";
pub const RUNTIME_HELPERS: &str = "$rt";
pub const DISPATCH_STATE: &str = "pc";
pub const CAUGHT_VALUE: &str = "e";

// Rough guesses for how much each per-method table should reserve up front.
// Most methods in real SWFs are short accessors, so these stay small.
pub const MINIMUM_LIKELY_BLOCKS: usize = 16;
pub const MINIMUM_LIKELY_NAMES: usize = 4;

/// Compiler-wide switches. Threaded explicitly into every compile context and coercer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
    /// Route Number/int coercion of strings through the runtime's own string-to-double
    /// routine instead of the generic numeric cast.
    pub legacy_number_coercion: bool,

    /// Fail the method when a stack or local slot is read before it was bound.
    /// When off, a placeholder `undefined` binding is synthesized instead.
    pub strict_variable_resolution: bool,

    /// Emit indentation.
    pub pretty: bool,

    /// Emit `// offset N` comments at every case head.
    pub emit_offsets: bool,

    /// Maximum dispatch loop iterations before the generated code throws.
    pub loop_guard: Option<u32>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        CompilerSettings {
            legacy_number_coercion: false,
            strict_variable_resolution: false,
            pretty: true,
            emit_offsets: false,
            loop_guard: None,
        }
    }
}

impl CompilerSettings {
    pub fn from_toml_str(source: &str) -> Result<Self, CompilerError> {
        let settings: CompilerSettings = toml::from_str(source).map_err(|e| {
            CompilerError::new_config_error(format!("Could not parse compiler settings: {}", e))
        })?;

        if settings.loop_guard == Some(0) {
            return Err(CompilerError::new_config_error(
                "loop_guard must be at least 1 when it is set",
            )
            .with_metadata(ErrorMetaDataKey::ConfigKey, "loop_guard"));
        }

        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, CompilerError> {
        let source = fs::read_to_string(path).map_err(|e| {
            CompilerError::new_config_error(format!(
                "Could not read settings file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
