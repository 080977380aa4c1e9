/// Target used for every trace line emitted by the scanner.
pub const LOG_TARGET: &str = "cardscan";

/// Emits a debug trace only when the session's debug flag is set.
#[macro_export]
macro_rules! debug_log {
    ($options:expr, $($arg:tt)+) => {
        if $options.debug {
            ::log::debug!(target: $crate::utils::logger::LOG_TARGET, $($arg)+);
        }
    };
}
