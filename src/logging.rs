//! Wire-level and internal event logging. The three macros tag events
//! with a direction under the `popgate` target, so release builds can
//! filter everything else out while still sharing one subscriber.

use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    filter::FilterFn, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, Layer,
};

/// A line received from the client.
#[macro_export]
macro_rules! incoming {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::tracing::event!(
            target: "popgate::incoming",
            $crate::tracing::Level::$level,
            $($msg),*
        )
    };

    ($($msg:expr),*) => {
        $crate::incoming!(level = TRACE, $($msg),*)
    };
}

/// A response line sent to the client.
#[macro_export]
macro_rules! outgoing {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::tracing::event!(
            target: "popgate::outgoing",
            $crate::tracing::Level::$level,
            $($msg),*
        )
    };

    ($($msg:expr),*) => {
        $crate::outgoing!(level = TRACE, $($msg),*)
    };
}

/// Anything that never touches the wire.
#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::tracing::event!(
            target: "popgate::internal",
            $crate::tracing::Level::$level,
            $($msg),*
        )
    };

    ($($msg:expr),*) => {
        $crate::internal!(level = TRACE, $($msg),*)
    };
}

/// Install the global subscriber. `LOG_LEVEL` takes any level name
/// `tracing` knows (`off`, `error`, `warn`, `info`, `debug`, `trace`);
/// unset or unparseable values fall back to everything in debug builds
/// and `info` in release builds.
pub fn init() {
    let fallback = if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    let level = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|raw| LevelFilter::from_str(raw.trim()).ok())
        .unwrap_or(fallback);

    let format = tracing_subscriber::fmt::layer()
        .compact()
        .with_ansi(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339());

    // release builds log only this crate's targets
    let ours = FilterFn::new(|metadata| {
        cfg!(debug_assertions) || metadata.target().starts_with("popgate")
    });

    tracing_subscriber::Registry::default()
        .with(format.with_filter(level).with_filter(ours))
        .init();
}
