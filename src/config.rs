//! Runtime configuration.
//!
//! ```ignore
//! let runtime = Runtime::with_config(RuntimeConfig {
//!     missing_keys: MissingKeyPolicy::Ignore,
//!     ..Default::default()
//! });
//! ```

/// What to do when a list child has no key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingKeyPolicy {
    /// Log through `tracing::warn!` and report a [`crate::Warning`].
    #[default]
    Warn,
    /// Match by position silently.
    Ignore,
}

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub missing_keys: MissingKeyPolicy,
    /// Upper bound on flushes performed by `Runtime::run_until_idle`.
    pub max_flush_cycles: usize,
    /// Skip re-rendering a reused component whose props are equal and
    /// which has no pending update. Capturing closures always re-render.
    pub memoize_props: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            missing_keys: MissingKeyPolicy::Warn,
            max_flush_cycles: 64,
            memoize_props: true,
        }
    }
}
