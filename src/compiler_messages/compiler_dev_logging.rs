// CODEGEN LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_codegen")]
macro_rules! codegen_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_codegen"))]
macro_rules! codegen_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// TRAIT TABLE LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_traits")]
macro_rules! traits_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_traits"))]
macro_rules! traits_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}

// COERCION LOGGING MACROS
#[macro_export]
#[cfg(feature = "show_coercion")]
macro_rules! coercion_log {
    ($($arg:tt)*) => {
        saying::say!($($arg)*);
    };
}

#[macro_export]
#[cfg(not(feature = "show_coercion"))]
macro_rules! coercion_log {
    ($($arg:tt)*) => {
        // Nothing
    };
}
