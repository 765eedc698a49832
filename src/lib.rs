#![warn(clippy::all)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod errors;
pub mod geometry;
pub mod input;
pub mod locate;
pub mod model;
pub mod plot;
pub mod report;
pub mod truss;

pub use config::{AppConfig, ModelConfig, PlotConfig, SolverSettings};
pub use errors::{
    AnalysisError, ConfigError, Error, MemberPropertyError, ModelError, ParseError, PlotError,
    TrussEditError,
};
pub use geometry::{displacement, force, point, Displacement, Force, Point};
pub use input::{parse_spec, Material, TrussSpec, Vertex};
pub use locate::{find_file, resolve_input};
pub use model::{Model, ModelMember};
pub use plot::{render_all, render_diagram, Canvas, Diagram};
pub use report::{format_fixed, member_lines, reaction_lines, render, Summary};
pub use truss::{SolveStats, Support, Truss};

/// Read, build and solve the description at `path`.
///
/// # Errors
///
/// Returns [`Error`] for unreadable or malformed input, invalid models and failed analyses.
pub fn analyse_file(path: impl AsRef<std::path::Path>, config: &AppConfig) -> Result<Model, Error> {
    let spec = TrussSpec::from_path(path)?;
    let mut model = spec.build(&config.model)?;
    model.solve(&config.solver)?;
    Ok(model)
}
