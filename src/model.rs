//! Solvable truss model built from a parsed description.
//!
//! The model keeps the link between the vertices of the input file and the
//! joints and members of the [`Truss`], so results can be reported in the
//! order the user wrote them.

use log::{debug, warn};
use petgraph::graph::{EdgeIndex, NodeIndex};

use crate::config::{ModelConfig, SolverSettings};
use crate::errors::{AnalysisError, ModelError};
use crate::input::TrussSpec;
use crate::truss::{SolveStats, Truss};

/// A member together with the input vertices it connects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelMember {
    /// Member in the underlying truss.
    pub index: EdgeIndex,
    /// Start vertex in input order.
    pub start: usize,
    /// End vertex in input order.
    pub end: usize,
}

/// A truss plus the bookkeeping that maps it back to the input file.
///
/// The truss is only lent out read-only. Removing joints or members would
/// shift petgraph indices under the vertex and member maps held here.
#[derive(Debug)]
pub struct Model {
    truss: Truss,
    labels: Vec<String>,
    joints: Vec<Option<NodeIndex>>,
    members: Vec<ModelMember>,
    supported: Vec<usize>,
}

impl TrussSpec {
    /// Build the structural model described by this specification.
    ///
    /// Vertices sharing coordinates become one joint. Vertices without members are
    /// skipped, unless they carry a load or support, which is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when the description connects no nodes, leaves a loaded or
    /// supported node unconnected, or gives an incomplete or invalid material.
    pub fn build(&self, config: &ModelConfig) -> Result<Model, ModelError> {
        if self.connections.is_empty() {
            return Err(ModelError::NoMembers);
        }
        let tolerance = config.coordinate_tolerance;
        let mut truss = Truss::new();

        for (index, vertex) in self.vertices.iter().enumerate() {
            if self.is_connected(index) && truss.find_joint(vertex.position, tolerance).is_none() {
                truss.add_joint(vertex.position);
            }
        }

        let mut joints = Vec::with_capacity(self.vertices.len());
        for (index, vertex) in self.vertices.iter().enumerate() {
            let joint = truss.find_joint(vertex.position, tolerance);
            if joint.is_none() {
                if !self.loads[index].is_zero() || !self.supports[index].is_free() {
                    return Err(ModelError::IsolatedNode {
                        label: vertex.label.clone(),
                    });
                }
                warn!("node {} is not connected to any member; skipping", vertex.label);
            }
            joints.push(joint);
        }

        let mut members = Vec::with_capacity(self.connections.len());
        for &(start, end) in &self.connections {
            if let (Some(a), Some(b)) = (joints[start], joints[end]) {
                let index = truss.add_member(a, b)?;
                members.push(ModelMember { index, start, end });
            }
        }
        if self.declared_elements != members.len() {
            warn!(
                "header declares {} elements but the connectivity matrix defines {}",
                self.declared_elements,
                members.len()
            );
        }
        truss.set_rigidity_for_all(self.material.rigidity_or(config.default_rigidity)?)?;

        let mut supported: Vec<usize> = Vec::new();
        for (index, joint) in joints.iter().enumerate() {
            let Some(joint) = *joint else { continue };
            if !self.loads[index].is_zero() {
                truss.add_load(joint, self.loads[index])?;
            }
            let support = self.supports[index];
            if !support.is_free() {
                truss.set_support(joint, support)?;
                if supported.iter().all(|&other| joints[other] != Some(joint)) {
                    supported.push(index);
                }
            }
        }

        debug!(
            "built model with {} joints, {} members and {} supports",
            truss.joint_count(),
            truss.member_count(),
            supported.len()
        );
        Ok(Model {
            truss,
            labels: self.vertices.iter().map(|v| v.label.clone()).collect(),
            joints,
            members,
            supported,
        })
    }
}

impl Model {
    /// Solve the underlying truss.
    ///
    /// # Errors
    ///
    /// Propagates [`AnalysisError`] from [`Truss::evaluate`].
    pub fn solve(&mut self, settings: &SolverSettings) -> Result<SolveStats, AnalysisError> {
        self.truss.evaluate(settings)
    }

    /// The underlying structural model.
    #[must_use]
    pub fn truss(&self) -> &Truss {
        &self.truss
    }

    /// Members in the order the connectivity matrix created them.
    #[must_use]
    pub fn members(&self) -> &[ModelMember] {
        &self.members
    }

    /// Vertices with a non-free support, in input order.
    #[must_use]
    pub fn supported_vertices(&self) -> &[usize] {
        &self.supported
    }

    /// Number of vertices in the input.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.labels.len()
    }

    /// Label of a vertex.
    #[must_use]
    pub fn label(&self, vertex: usize) -> Option<&str> {
        self.labels.get(vertex).map(String::as_str)
    }

    /// Joint a vertex was mapped to, if it takes part in the structure.
    #[must_use]
    pub fn joint(&self, vertex: usize) -> Option<NodeIndex> {
        self.joints.get(vertex).copied().flatten()
    }

    /// Label of the first vertex mapped to `joint`.
    #[must_use]
    pub fn joint_label(&self, joint: NodeIndex) -> Option<&str> {
        let vertex = self.joints.iter().position(|&j| j == Some(joint))?;
        self.label(vertex)
    }

    /// Human readable name of a member, built from its vertex labels.
    #[must_use]
    pub fn member_label(&self, member: &ModelMember) -> String {
        format!(
            "{}{}",
            self.label(member.start).unwrap_or("?"),
            self.label(member.end).unwrap_or("?")
        )
    }
}
