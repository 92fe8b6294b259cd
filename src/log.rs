//! Log-level macro shims.
//!
//! Expands each level to `log`'s macro when the `log` feature is enabled, and to a no-op
//! `format_args!` (still type-checking its arguments) otherwise, so call sites never need to be
//! conditionally compiled themselves. `$d` stands in for a literal `$` in the generated
//! `macro_rules!` bodies, the usual workaround for nesting a repetition inside a macro that
//! itself generates a macro.
macro_rules! log_level {
    ($d:tt $name:ident, $log_macro:ident) => {
        #[cfg(feature = "log")]
        macro_rules! $name {
            ($d($d t:tt)*) => {{ log::$log_macro!($d($d t)*); }};
        }

        #[cfg(not(feature = "log"))]
        macro_rules! $name {
            ($d($d t:tt)*) => {{ format_args!($d($d t)*); }};
        }
    };
}

log_level!($ error, error);
log_level!($ warn, warn);
log_level!($ info, info);
log_level!($ debug, debug);
log_level!($ trace, trace);
