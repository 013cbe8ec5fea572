//! Internal logging helpers for structured scan events.

/// Single logging target for the crate.
pub(crate) const LOG_TARGET: &str = "sstable_scan";

macro_rules! scan_log {
    ($level:expr, $event:expr, $fmt:expr $(, $args:expr)* $(,)?) => {{
        if log::log_enabled!($level) {
            log::log!(
                target: crate::logging::LOG_TARGET,
                $level,
                "event={} {}",
                $event,
                format_args!($fmt $(, $args)*)
            );
        }
    }};
}

pub(crate) use scan_log;
