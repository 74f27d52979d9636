//! School-bus fleet scheduling optimization core.
//!
//! Turns a day's worth of bus routes into minimum-bus chains via bipartite
//! matching, refines them with local search and large neighborhood search,
//! optionally hybridizes with a QUBO refiner on conflict-heavy routes, then
//! validates and assigns a fleet of vehicle profiles to the result.
//!
//! [`pipeline::run_pipeline`] is the top-level entry point; everything else
//! is exposed for callers that want to drive individual stages directly.

pub mod blocks;
pub mod chain_builder;
pub mod config;
pub mod error;
pub mod fleet_assign;
pub mod geometry;
pub mod lns;
pub mod local_search;
pub mod matching;
pub mod merger;
pub mod ml_ranker;
pub mod model;
pub mod oracle;
pub mod pipeline;
pub mod qubo;
pub mod scoring;
pub mod validator;

pub use pipeline::run_pipeline;

/// Common imports for callers embedding this crate.
pub mod prelude {
    pub use crate::config::{FullConfig, Objective, PipelineConfig};
    pub use crate::error::{OracleError, PipelineError, SolverError};
    pub use crate::model::{
        AssignedVehicle, Block, BusSchedule, Job, PipelineResult, Route, SolverStatus, Stop, ValidationReport,
        VehicleProfile, VehicleRegistry, Weekday,
    };
    pub use crate::oracle::{TravelTimeOracle, TravelTimeProvider};
    pub use crate::pipeline::run_pipeline;
    pub use fleet_heuristics::prelude::*;
}
