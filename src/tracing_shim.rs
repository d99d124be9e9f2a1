//! `tracing` when the `tracing` feature is enabled, and no-op stand-ins otherwise.
//!
//! Code in this crate logs through this module rather than through `tracing` directly, so that
//! call sites need no `#[cfg]`. Only the items the crate uses are provided.

#![allow(unused_imports, unused_macros)]

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, debug_span, info, warn};
#[cfg(feature = "tracing")]
pub(crate) use tracing_futures::Instrument;

/// Discards an event.
#[cfg(not(feature = "tracing"))]
macro_rules! event {
    ($($x:tt)*) => {};
}

/// Stands in for a span, which `Instrument::instrument` then ignores.
#[cfg(not(feature = "tracing"))]
macro_rules! event_span {
    ($($x:tt)*) => {
        ()
    };
}

#[cfg(not(feature = "tracing"))]
pub(crate) use {event as debug, event as info, event as warn, event_span as debug_span};

/// Attaching a span to a future is a no-op without `tracing`.
#[cfg(not(feature = "tracing"))]
pub(crate) trait Instrument: Sized {
    /// Returns the future unchanged.
    fn instrument(self, span: ()) -> Self;
}

#[cfg(not(feature = "tracing"))]
impl<T> Instrument for T {
    #[inline]
    fn instrument(self, (): ()) -> Self {
        self
    }
}
