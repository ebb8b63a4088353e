//! Coarse, CI-friendly exit codes.

/// Run completed with a `pass` decision.
pub const SUCCESS: i32 = 0;
/// Run completed with a `warn` or `fail` decision.
pub const GATE_FAILURE: i32 = 1;
/// Profile/config error; the run never started.
pub const CONFIG_ERROR: i32 = 2;
