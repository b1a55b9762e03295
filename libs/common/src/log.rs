//! log_msg!() vs warn_msg!() macros
//! ---
//!
//! Applications and libraries in this workspace log through these macros
//! rather than calling `tracing` directly:
//!
//! 1. `log_msg!()` for progress of the ceremony (blocks, transactions, deployment steps).
//!
//! 2. `warn_msg!()` for failures that are tolerated, e.g. a contract read that
//! failed and left the previous value in place.
//!
//! 3. `debug_msg!()` for chatty details, such as each field read.
//!
//! Binaries must call [`init_tracing`] once at startup, otherwise nothing is printed.
//!

#[doc(hidden)]
pub use tracing;

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info";

/// Install a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Calling it twice is harmless, the second call is ignored.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[macro_export]
macro_rules! log_msg {
    ($($arg:tt)*) => {
        $crate::log::tracing::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! warn_msg {
    ($($arg:tt)*) => {
        $crate::log::tracing::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! debug_msg {
    ($($arg:tt)*) => {
        $crate::log::tracing::debug!($($arg)*)
    };
}
