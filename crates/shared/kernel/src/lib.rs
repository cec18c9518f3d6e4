//! Kernel utilities shared across slices.
//!
//! * [`config::load_config`] layers a TOML file with `TOPO__*` environment overrides.
//! * [`readiness`] holds the observable configuration cell and the startup gate waiting on it.
//! * [`condition::ConditionBuilder`] turns a raw filter body into a typed
//!   [`Condition`](topo_domain::models::Condition).
//! * [`backbone::Backbone`] registers the instance, receives pushed configuration and hands
//!   out the storage handle.
//! * `server` (feature) carries the axum state, the response envelope and the request
//!   context extractor.
//!
//! ## ID generation
//! Use `safe_nanoid!` for URL-safe, unambiguous IDs:
//! ```rust
//! # use topo_kernel::safe_nanoid;
//! let id = safe_nanoid!();
//! assert_eq!(id.len(), 12);
//! ```
pub mod backbone;
pub mod condition;
pub mod config;
pub mod context;
pub mod readiness;
#[cfg(feature = "server")]
pub mod server;

// Alphabet excludes visually ambiguous characters (I, O, l, 0, 1).
pub const SAFE_ALPHABET: &[char; 55] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

pub use nanoid::nanoid;
pub use topo_domain as domain;

/// Generates an unambiguous `NanoID` (no visually confusing characters).
#[macro_export]
macro_rules! safe_nanoid {
    () => {
        $crate::nanoid!(12, $crate::SAFE_ALPHABET)
    };
    ($size:expr) => {
        $crate::nanoid!($size, $crate::SAFE_ALPHABET)
    };
}
