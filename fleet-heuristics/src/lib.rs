//! Small, dependency-light toolkit shared by the fleet scheduling crates.
//!
//! Mirrors the shape of a typical metaheuristics support crate: a generic
//! error type for fallible solver code, a seeded random source for
//! reproducible stochastic search, a couple of iterator helpers, and a
//! callback-based logger used to report progress without pulling a logging
//! framework into the core's public API.

pub mod logging;
pub mod random;
pub mod timing;
pub mod utils;

/// Common re-exports for crates consuming this toolkit.
pub mod prelude {
    pub use crate::logging::InfoLogger;
    pub use crate::{Float, GenericError, GenericResult};
}

/// Floating point type used throughout the scheduling core.
pub type Float = f64;

/// A generic, thread-safe error type for fallible heuristic/solver code that
/// does not need a structured error enum of its own.
pub type GenericError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Shorthand for `Result<T, GenericError>`.
pub type GenericResult<T> = Result<T, GenericError>;

/// Returns the short (unqualified) name of a type, used in `Debug` impls.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
