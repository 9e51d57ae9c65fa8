//! ---
//! rcs_section: "03-logging"
//! rcs_subsection: "module"
//! rcs_type: "source"
//! rcs_scope: "code"
//! rcs_description: "Structured logging context and lifecycle event helpers."
//! rcs_version: "v0.1.0"
//! rcs_owner: "tbd"
//! ---
//! Level-specific macros that stamp every event with the corridor context.

#[doc(hidden)]
#[macro_export]
macro_rules! __rcs_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        $crate::tracing::event!(
            $level,
            corridor = ctx.corridor.unwrap_or(""),
            train = ctx.train.unwrap_or(""),
            station = ctx.station.unwrap_or(""),
            tick = ctx.tick.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an informational log enriched with corridor context.
#[macro_export]
macro_rules! rcs_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__rcs_event!($crate::tracing::Level::INFO, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__rcs_event!($crate::tracing::Level::INFO, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with corridor context.
#[macro_export]
macro_rules! rcs_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__rcs_event!($crate::tracing::Level::DEBUG, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__rcs_event!($crate::tracing::Level::DEBUG, $crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a warning enriched with corridor context.
#[macro_export]
macro_rules! rcs_warn {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__rcs_event!($crate::tracing::Level::WARN, $ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__rcs_event!($crate::tracing::Level::WARN, $crate::LogContext::default(), $($arg)+)
    };
}
