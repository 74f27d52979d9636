//! JSON file I/O for the CLI: routes, vehicle registry, config overrides,
//! and the final pipeline result.

use crate::error::CliError;
use fleet_core::config::FullConfig;
use fleet_core::model::{Route, VehicleProfile, VehicleRegistry};
use std::path::{Path, PathBuf};

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let body = std::fs::read(path).map_err(|source| CliError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_slice(&body).map_err(|source| CliError::Parse { path: path.to_path_buf(), source })
}

pub fn load_routes(path: &Path) -> Result<Vec<Route>, CliError> {
    read_json(path)
}

/// Loads vehicle profiles and wraps them in a [`VehicleRegistry`], which
/// rejects duplicate plates/codes at construction. Returns an empty
/// registry (every bus comes out virtual) when `path` is `None`.
pub fn load_vehicle_registry(path: Option<&PathBuf>) -> Result<VehicleRegistry, CliError> {
    let profiles: Vec<VehicleProfile> = match path {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    VehicleRegistry::new(profiles).map_err(CliError::from)
}

pub fn load_config(path: Option<&PathBuf>) -> Result<FullConfig, CliError> {
    match path {
        Some(path) => read_json(path),
        None => Ok(FullConfig::default()),
    }
}

pub fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let body = serde_json::to_vec_pretty(value).expect("pipeline result is always serializable");
    std::fs::write(path, body).map_err(|source| CliError::Write { path: path.to_path_buf(), source })
}
