//! Per-directory run order.
//!
//! Files whose lowercase name mentions a setup-like concern run first
//! (priority class 0); everything else follows (class 1). Within a class,
//! names are sorted lexically. The order is a pure function of the name set.

use std::cmp::Ordering;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Priority class for configuration / setup / installation scripts.
pub const PRIORITY_SETUP: u8 = 0;

/// Priority class for every other script.
pub const PRIORITY_ORDINARY: u8 = 1;

/// Substrings that mark a file name as setup-like.
pub const SETUP_MARKERS: &[&str] = &["config", "setup", "install", "env"];

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Compute the priority class for a file name.
pub fn priority_class(file_name: &str) -> u8 {
    let lower = file_name.to_lowercase();
    if SETUP_MARKERS.iter().any(|marker| lower.contains(marker)) {
        PRIORITY_SETUP
    } else {
        PRIORITY_ORDINARY
    }
}

/// Compare two file names by `(priority class, name)`.
pub fn run_order(a: &str, b: &str) -> Ordering {
    (priority_class(a), a).cmp(&(priority_class(b), b))
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
