//! Analysis-wide configuration, built once by the CLI and passed by
//! reference into every component (no ambient globals).

use std::collections::HashSet;
use std::path::PathBuf;

/// How a [`crate::algebra::Scalar`] is represented and combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarMode {
    /// `(numerator, denominator)` rational pair; multiply/divide combine
    /// numerators and denominators without ever simplifying (the solver
    /// handles equality up to integer arithmetic).
    Rational,
    /// A single integer base-10 exponent; multiply/divide become add/sub.
    PowerOfTen,
}

impl Default for ScalarMode {
    fn default() -> Self {
        ScalarMode::Rational
    }
}

/// Configuration threaded through every component.
#[derive(Clone, Debug)]
pub struct AnalysisConfig {
    /// Scalar representation (§4.1).
    pub scalar_mode: ScalarMode,
    /// If false, `Unit` omits the scalar field entirely (pure dimension
    /// checking; `get_scalar` then returns the multiplicative identity).
    pub enable_scalar_prefixes: bool,
    /// Basenames of source files the walker must not analyze.
    pub ignore_files: HashSet<String>,
    /// Directory used for on-disk per-TU memoization; `None` disables the
    /// on-disk cache (in-memory caching within one run still applies).
    pub cache_dir: Option<PathBuf>,
    /// Run forever, gated by `SIGHUP`/`SIGTERM`, instead of exiting after
    /// one pass.
    pub run_as_daemon: bool,
}

impl AnalysisConfig {
    /// A config with every default off: rational scalars, scalar prefixes
    /// enabled, no ignored files, no cache, single run.
    pub fn new() -> Self {
        Self {
            scalar_mode: ScalarMode::Rational,
            enable_scalar_prefixes: true,
            ignore_files: HashSet::new(),
            cache_dir: None,
            run_as_daemon: false,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::new()
    }
}
