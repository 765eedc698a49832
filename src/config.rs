//! Run configuration, loadable from a JSON file.
//!
//! Every field has a default, so an empty object `{}` is a valid
//! configuration and partially specified files only override what they name.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Default name of the truss description searched for on disk.
pub const DEFAULT_SPEC_FILE_NAME: &str = "especificacoes.txt";

/// Axial rigidity given to members when the input does not specify one.
pub const DEFAULT_RIGIDITY: f64 = 5000.0;

/// Top-level configuration for a calculator run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// File name searched for when the input is a directory.
    pub spec_file_name: String,
    /// Directory receiving the SVG diagrams.
    pub output_dir: PathBuf,
    /// Whether diagrams are written at all.
    pub write_plots: bool,
    /// Model construction settings.
    pub model: ModelConfig,
    /// Linear solver settings.
    pub solver: SolverSettings,
    /// Diagram layout settings.
    pub plot: PlotConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            spec_file_name: DEFAULT_SPEC_FILE_NAME.to_owned(),
            output_dir: PathBuf::from("../out"),
            write_plots: true,
            model: ModelConfig::default(),
            solver: SolverSettings::default(),
            plot: PlotConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or is not valid JSON.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Settings used when building a [`Model`](crate::Model) from parsed input.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// EA applied to every member unless the input overrides it.
    pub default_rigidity: f64,
    /// Two vertices closer than this on both axes are the same joint.
    pub coordinate_tolerance: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default_rigidity: DEFAULT_RIGIDITY,
            coordinate_tolerance: 1.0e-9,
        }
    }
}

/// Settings for the direct stiffness solve and its refinement loop.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Upper bound on refinement passes after the initial solve.
    pub max_iterations: usize,
    /// Relative residual below which refinement stops.
    pub tolerance: f64,
    /// Smallest accepted ratio between the extreme pivots of the factorisation.
    pub pivot_tolerance: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1.0e-12,
            pivot_tolerance: 1.0e-12,
        }
    }
}

/// Layout of the SVG diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Image width in pixels.
    pub width: f64,
    /// Image height in pixels.
    pub height: f64,
    /// Blank border around the drawing, in pixels.
    pub margin: f64,
    /// Largest drawn displacement as a fraction of the model extent.
    pub displacement_scale_fraction: f64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            margin: 60.0,
            displacement_scale_fraction: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config: AppConfig = serde_json::from_str("{}").expect("valid json");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.spec_file_name, "especificacoes.txt");
        assert_eq!(config.solver.max_iterations, 10_000);
    }

    #[test]
    fn nested_fields_override_selectively() {
        let config: AppConfig = serde_json::from_str(
            r#"{ "write_plots": false, "solver": { "max_iterations": 3 }, "model": { "default_rigidity": 2.0e8 } }"#,
        )
        .expect("valid json");
        assert!(!config.write_plots);
        assert_eq!(config.solver.max_iterations, 3);
        assert_eq!(config.solver.tolerance, SolverSettings::default().tolerance);
        assert_eq!(config.model.default_rigidity, 2.0e8);
        assert_eq!(config.plot, PlotConfig::default());
    }

    #[test]
    fn missing_file_is_reported() {
        let error = AppConfig::from_path("/nonexistent/trusscalc.json").expect_err("missing file");
        assert!(matches!(error, ConfigError::Io { .. }));
    }
}
