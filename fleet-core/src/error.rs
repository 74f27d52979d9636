//! Error taxonomy for the scheduling core.
//!
//! Only programming errors (precondition violations, invariant breaks) are
//! fatal. Every other recoverable condition — solver timeouts, routing
//! unavailability, capacity mismatches, budget exhaustion — degrades to a
//! labeled result or history entry rather than propagating as an `Err`.
//! These enums exist for the narrow set of conditions that truly cannot be
//! worked around.

use thiserror::Error;

/// Errors from the chain-building / matching solver.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// The solver exceeded its time budget before finding any feasible
    /// solution at all (not merely before finding an optimal one).
    #[error("solver exceeded its time budget")]
    Timeout,
    /// The input graph has no feasible solution under the given constraints.
    #[error("no feasible chain cover exists for this input")]
    Infeasible,
    /// The solver encountered an internal invariant violation.
    #[error("solver crashed: {0}")]
    Crashed(String),
}

/// Errors from the travel-time oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The oracle could not be reached and fallback estimation is disabled.
    #[error("travel-time oracle unavailable and fallback is disabled")]
    Unavailable,
    /// The oracle's rate limit was exceeded and no permit became available
    /// within the configured wait.
    #[error("travel-time oracle rate limit exceeded")]
    RateLimited,
    /// The underlying HTTP transport failed.
    #[error("travel-time oracle transport error: {0}")]
    Transport(String),
}

/// Fatal, precondition-violation errors from the pipeline orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No active vehicle profiles are available at all (distinct from a
    /// per-bus capacity mismatch, which is recoverable).
    #[error("fleet registry has no active vehicle profiles")]
    EmptyFleet,
    /// The pipeline configuration itself is self-contradictory (e.g. a
    /// negative `max_iterations`).
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),
    /// A route failed an invariant the ingester is required to enforce
    /// (exactly one of arrival/departure set, at least one stop). Surfacing
    /// this here (rather than panicking) lets a host application report it
    /// without crashing the whole run.
    #[error("route {route_id} violates a core invariant: {reason}")]
    InvalidRoute { route_id: String, reason: String },
}
