use crate::compiler_messages::compiler_errors::{
    CompilerError, CompilerMessages, ErrorMetaDataKey, ErrorType,
};
use saying::say;

pub fn print_compiler_messages(messages: CompilerMessages) {
    for err in messages.errors {
        print_formatted_error(err);
    }
}

pub fn print_formatted_error(e: CompilerError) {
    let method = e
        .metadata(ErrorMetaDataKey::MethodName)
        .unwrap_or("<anonymous>")
        .to_owned();
    let msg = e.msg.clone();

    match e.error_type {
        ErrorType::UnresolvedVariable | ErrorType::StackUnderflow => {
            say!("\n(ಠ_ಠ) ", Dark Magenta method);
            say!(Red "Method skipped by the compiler: ", msg);
            say!(Yellow "The method will run on the fallback path.");
        }

        ErrorType::NameIndexOutOfRange => {
            say!("\n(ಠ_ಠ) ", Dark Magenta method);
            say!(Red "Bad name reference: ", msg);
        }

        ErrorType::DuplicateSlotAllocation => {
            say!(Red "Class linking failed");
            say!(msg);
        }

        ErrorType::Config => {
            say!(Yellow "Malformed compiler settings: ", msg);
            if let Some(key) = e.metadata(ErrorMetaDataKey::ConfigKey) {
                say!(Dark Magenta "Key ", Bright {key});
            }
            return;
        }

        ErrorType::Compiler => {
            say!("\nヽ༼☉ ‿ ⚆༽ﾉ ", Dark Magenta method);
            say!(Red "Compiler Bug: ", msg);
            if let Some(stage) = e.metadata(ErrorMetaDataKey::CompilationStage) {
                say!(Dark Magenta "Stage ", Bright {stage});
            }
            return;
        }
    }

    if let Some(suggestion) = e.metadata(ErrorMetaDataKey::PrimarySuggestion) {
        say!(Dark Yellow suggestion);
    }
}
