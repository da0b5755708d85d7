//! Shared numeric constants for the gizmo crate.

// ── Orientation ─────────────────────────────────────────────────

/// Squared cross-product length below which a helper vector is treated as
/// parallel to a handle axis.
pub const PARALLEL_EPSILON: f64 = 1e-6;

// ── Ray casting ─────────────────────────────────────────────────

/// Denominator magnitude below which a ray is treated as parallel to a plane
/// or line.
pub const RAY_EPSILON: f64 = 1e-9;

/// |det| below which a transform is treated as singular.
pub const SINGULAR_EPSILON: f64 = 1e-12;

/// Normalized depth of the first pointer-ray sample.
pub const DEFAULT_NEAR_DEPTH: f64 = 0.0;

/// Normalized depth of the second pointer-ray sample.
pub const DEFAULT_MID_DEPTH: f64 = 0.5;

// ── Events ──────────────────────────────────────────────────────

/// Per-subscriber event queue capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

// ── Scene ───────────────────────────────────────────────────────

/// Upper bound on parent-chain walks; guards against cyclic hierarchies.
pub const MAX_HIERARCHY_DEPTH: usize = 1024;
