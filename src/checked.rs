//! Render-path contract checks.
//!
//! Construction code always validates and returns [`crate::ConfigError`].
//! Checks that would sit inside per-sample loops live here instead: they
//! run in debug builds and whenever the `checked` feature is enabled, and
//! vanish from plain release builds.

/// True when render-path contract checks are compiled in.
#[inline(always)]
pub const fn enabled() -> bool {
    cfg!(any(debug_assertions, feature = "checked"))
}

/// Panic with `msg` if checks are enabled and `cond` does not hold.
#[inline(always)]
#[track_caller]
pub fn ensure(cond: bool, msg: &str) {
    if enabled() && !cond {
        panic!("contract violation: {msg}");
    }
}
