//! Text and JSON rendering of analysis results.

use serde::Serialize;

use crate::errors::AnalysisError;
use crate::geometry::{Displacement, Force, Point};
use crate::model::Model;
use crate::truss::{SolveStats, Support};

/// Solver noise below this magnitude is dropped before rounding, so mirror-image
/// results print the same digits.
const NOISE_SCALE: f64 = 1.0e9;

/// Round to one decimal place and print, folding negative zero into `0.0`.
///
/// Ties round to even, as `{:.1}` does.
///
/// # Examples
/// ```
/// use trusscalc::format_fixed;
///
/// assert_eq!(format_fixed(-0.04), "0.0");
/// assert_eq!(format_fixed(12.345), "12.3");
/// assert_eq!(format_fixed(1.25), "1.2");
/// ```
#[must_use]
pub fn format_fixed(value: f64) -> String {
    let cleaned = (value * NOISE_SCALE).round() / NOISE_SCALE;
    let text = format!("{cleaned:.1}");
    if text == "-0.0" {
        "0.0".to_owned()
    } else {
        text
    }
}

/// One `Fx; Fy` line per supported vertex, in input order.
///
/// # Errors
///
/// Returns [`AnalysisError::NotEvaluated`] when the model has not been solved.
pub fn reaction_lines(model: &Model) -> Result<Vec<String>, AnalysisError> {
    model.truss().ensure_evaluated()?;
    Ok(model
        .supported_vertices()
        .iter()
        .filter_map(|&vertex| model.joint(vertex))
        .filter_map(|joint| model.truss().joint_reaction(joint))
        .map(|reaction| format!("{}; {}", format_fixed(reaction.x), format_fixed(reaction.y)))
        .collect())
}

/// One `Fx; Fy; N` line per member, in creation order.
///
/// # Errors
///
/// Returns [`AnalysisError::NotEvaluated`] when the model has not been solved.
pub fn member_lines(model: &Model) -> Result<Vec<String>, AnalysisError> {
    model.truss().ensure_evaluated()?;
    let mut lines = Vec::with_capacity(model.members().len());
    for member in model.members() {
        let (Some(components), Some(axial_force)) = (
            model.truss().member_force_components(member.index),
            model.truss().member_axial_force(member.index),
        ) else {
            continue;
        };
        lines.push(format!(
            "{}; {}; {}",
            format_fixed(components.x),
            format_fixed(components.y),
            format_fixed(axial_force)
        ));
    }
    Ok(lines)
}

/// Reaction lines followed by member lines, each terminated by a newline.
///
/// # Errors
///
/// Returns [`AnalysisError::NotEvaluated`] when the model has not been solved.
pub fn render(model: &Model) -> Result<String, AnalysisError> {
    let mut output = String::new();
    for line in reaction_lines(model)?
        .into_iter()
        .chain(member_lines(model)?)
    {
        output.push_str(&line);
        output.push('\n');
    }
    Ok(output)
}

/// Results for one input vertex.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeSummary {
    /// Label from the input.
    pub label: String,
    /// Position of the joint.
    pub position: Point,
    /// Support at the joint.
    pub support: Support,
    /// Applied load.
    pub load: Force,
    /// Solved displacement.
    pub displacement: Displacement,
    /// Support reaction; zero along free axes.
    pub reaction: Force,
}

/// Results for one member.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemberSummary {
    /// Label built from the end vertex labels.
    pub label: String,
    /// Start vertex label.
    pub start: String,
    /// End vertex label.
    pub end: String,
    /// Orientation in radians.
    pub angle: f64,
    /// Axial force; tension is positive.
    pub axial_force: f64,
    /// Global components of the axial force.
    pub components: Force,
}

/// Serializable snapshot of a solved model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    /// Vertices that take part in the structure, in input order.
    pub nodes: Vec<NodeSummary>,
    /// Members in creation order.
    pub members: Vec<MemberSummary>,
    /// Solver diagnostics.
    pub solver: Option<SolveStats>,
}

impl Summary {
    /// Collect the results of a solved model.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NotEvaluated`] when the model has not been solved.
    pub fn from_model(model: &Model) -> Result<Self, AnalysisError> {
        model.truss().ensure_evaluated()?;
        let truss = model.truss();
        let nodes = (0..model.vertex_count())
            .filter_map(|vertex| {
                let joint = model.joint(vertex)?;
                Some(NodeSummary {
                    label: model.label(vertex)?.to_owned(),
                    position: truss.joint_position(joint)?,
                    support: truss.joint_support(joint)?,
                    load: truss.joint_load(joint)?,
                    displacement: truss.joint_displacement(joint)?,
                    reaction: truss.joint_reaction(joint)?,
                })
            })
            .collect();
        let members = model
            .members()
            .iter()
            .filter_map(|member| {
                Some(MemberSummary {
                    label: model.member_label(member),
                    start: model.label(member.start)?.to_owned(),
                    end: model.label(member.end)?.to_owned(),
                    angle: truss.member_angle(member.index)?,
                    axial_force: truss.member_axial_force(member.index)?,
                    components: truss.member_force_components(member.index)?,
                })
            })
            .collect();
        Ok(Self {
            nodes,
            members,
            solver: truss.last_solve_stats(),
        })
    }

    /// Pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns the [`serde_json::Error`] raised during serialisation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, SolverSettings};
    use crate::input::parse_spec;

    const TRIANGLE: &str = "3; 3
A; 0; 0
B; 4; 0
C; 2; 2
0; 1; 1
1; 0; 1
1; 1; 0
0; 0
0; 0
0; -10
P
Y
L
";

    fn solved_triangle() -> Model {
        let mut model = parse_spec(TRIANGLE)
            .expect("valid description")
            .build(&ModelConfig::default())
            .expect("valid model");
        model
            .solve(&SolverSettings::default())
            .expect("analysis succeeds");
        model
    }

    #[test]
    fn fixed_formatting_rounds_and_drops_negative_zero() {
        assert_eq!(format_fixed(0.0), "0.0");
        assert_eq!(format_fixed(-0.0), "0.0");
        assert_eq!(format_fixed(-1.0e-10), "0.0");
        assert_eq!(format_fixed(-7.0710678), "-7.1");
        assert_eq!(format_fixed(1234.56), "1234.6");
        assert_eq!(format_fixed(-0.04), "0.0");
    }

    #[test]
    fn fixed_formatting_does_not_round_up_below_ties() {
        assert_eq!(format_fixed(0.35), "0.3");
        assert_eq!(format_fixed(1.25), "1.2");
        assert_eq!(format_fixed(1.25 + 1.0e-13), format_fixed(1.25 - 1.0e-13));
    }

    #[test]
    fn mirror_supports_print_identical_reactions() {
        let text = TRIANGLE.replace("0; -10", "0; -2.5");
        let mut model = parse_spec(&text)
            .expect("valid description")
            .build(&ModelConfig::default())
            .expect("valid model");
        model
            .solve(&SolverSettings::default())
            .expect("analysis succeeds");

        let reactions = reaction_lines(&model).expect("model solved");
        assert_eq!(reactions, vec!["0.0; 1.2", "0.0; 1.2"]);
    }

    #[test]
    fn renders_reactions_then_members() {
        let report = render(&solved_triangle()).expect("model solved");
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(
            lines,
            vec![
                "0.0; 5.0",
                "0.0; 5.0",
                "5.0; 0.0; 5.0",
                "-5.0; -5.0; -7.1",
                "5.0; -5.0; -7.1",
            ]
        );
        assert!(report.ends_with('\n'));
    }

    #[test]
    fn unsolved_model_is_rejected() {
        let model = parse_spec(TRIANGLE)
            .expect("valid description")
            .build(&ModelConfig::default())
            .expect("valid model");
        assert_eq!(render(&model), Err(AnalysisError::NotEvaluated));
        assert_eq!(
            Summary::from_model(&model),
            Err(AnalysisError::NotEvaluated)
        );
    }

    #[test]
    fn summary_serialises_to_json() {
        let summary = Summary::from_model(&solved_triangle()).expect("model solved");
        assert_eq!(summary.nodes.len(), 3);
        assert_eq!(summary.members[1].label, "AC");
        assert!(summary.solver.is_some_and(|stats| stats.converged));

        let json: serde_json::Value =
            serde_json::from_str(&summary.to_json().expect("serialisable")).expect("valid json");
        assert_eq!(json["nodes"][0]["support"], "Pinned");
        assert_eq!(json["members"][0]["start"], "A");
    }
}
