use serde::Serialize;

/// Per-request options of `Loader::use_modules`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UseOptions {
    /// Complete without yielding to the scheduler first.
    /// `None` falls back to `LoaderConfig::sync_by_default`.
    pub sync: Option<bool>,
}

impl UseOptions {
    pub fn sync() -> Self {
        Self { sync: Some(true) }
    }

    pub fn deferred() -> Self {
        Self { sync: Some(false) }
    }
}

/// Snapshot of a loader's tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoaderStats {
    /// Routing table size (one task per looked-up name).
    pub tasks: usize,
    /// Modules with a registered definition.
    pub registered: usize,
    pub settled: usize,
    pub failed: usize,
    /// Requirement edges currently resolving.
    pub live_edges: usize,
    pub strategies: usize,
}
