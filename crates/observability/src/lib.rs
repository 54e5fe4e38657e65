//! Process-wide tracing/logging setup shared by the binaries.

/// Tracing configuration (filters, layers).
pub mod tracing;

/// Initialize logging with `info` as the default level.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info");
}

/// Initialize logging; `RUST_LOG` wins over `default_level` when set.
pub fn init_with_default(default_level: &str) {
    tracing::init(default_level);
}
