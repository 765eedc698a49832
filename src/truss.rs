//! Core data structures and the direct stiffness solver for planar trusses.

use std::collections::HashMap;

use log::{debug, warn};
use nalgebra::{DMatrix, DVector, SMatrix, SVector};
use petgraph::graph::{EdgeIndex, Graph, NodeIndex};
use serde::Serialize;

use crate::config::SolverSettings;
use crate::errors::{AnalysisError, MemberPropertyError, TrussEditError};
use crate::geometry::{Displacement, Force, Point};

/// Translational degrees of freedom carried by every joint.
const DOF_PER_JOINT: usize = 2;

/// Restraint imposed on a joint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Support {
    /// No restraint.
    #[default]
    Free,
    /// Both translations restrained.
    Pinned,
    /// Translation along X restrained; the joint may slide along Y.
    RollerX,
    /// Translation along Y restrained; the joint may slide along X.
    RollerY,
}

impl Support {
    /// Restrained state of the X and Y translations respectively.
    #[must_use]
    pub const fn restraints(self) -> [bool; 2] {
        match self {
            Support::Free => [false, false],
            Support::Pinned => [true, true],
            Support::RollerX => [true, false],
            Support::RollerY => [false, true],
        }
    }

    /// Whether the joint is unrestrained.
    #[must_use]
    pub const fn is_free(self) -> bool {
        matches!(self, Support::Free)
    }
}

/// Internal representation of a truss joint.
#[derive(Clone, Debug)]
struct Joint {
    /// Position of the joint.
    position: Point,
    /// Restraint applied to the joint.
    support: Support,
    /// External load applied to the joint.
    load: Force,
    /// Solved displacement of the joint.
    displacement: Displacement,
    /// Solved support reaction; zero on free axes.
    reaction: Force,
}

impl Joint {
    /// Create a joint with the supplied position and default state.
    fn new(position: Point) -> Self {
        Self {
            position,
            support: Support::Free,
            load: Force::default(),
            displacement: Displacement::default(),
            reaction: Force::default(),
        }
    }
}

/// Internal representation of a truss member.
#[derive(Clone, Debug)]
struct Member {
    /// Axial rigidity EA.
    rigidity: Option<f64>,
    /// Axial force after analysis; tension is positive.
    axial_force: f64,
    /// Axial strain after analysis.
    strain: f64,
}

impl Member {
    /// Create a member with no assigned rigidity.
    fn new() -> Self {
        Self {
            rigidity: None,
            axial_force: 0.0,
            strain: 0.0,
        }
    }

    /// Reset solved quantities.
    fn clear_results(&mut self) {
        self.axial_force = 0.0;
        self.strain = 0.0;
    }
}

/// Diagnostics from the most recent linear solve.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SolveStats {
    /// Number of free degrees of freedom in the reduced system.
    pub free_dofs: usize,
    /// Refinement passes performed after the initial solve.
    pub iterations: usize,
    /// Euclidean norm of the final residual `F - K u` over the free DOFs.
    pub residual: f64,
    /// Whether the residual met the configured tolerance.
    pub converged: bool,
}

/// Container for a pin-jointed planar truss model.
#[derive(Debug, Default)]
pub struct Truss {
    /// Underlying graph storage for joints and members.
    graph: Graph<Joint, Member>,
    /// Indicates whether the cached analysis results are current.
    analysis_valid: bool,
    /// Diagnostics of the last successful solve.
    stats: Option<SolveStats>,
}

impl Truss {
    /// Create an empty truss.
    ///
    /// # Examples
    /// ```
    /// use trusscalc::Truss;
    ///
    /// let truss = Truss::new();
    /// assert_eq!(truss.joint_count(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            analysis_valid: false,
            stats: None,
        }
    }

    /// Return the number of joints in the truss.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Return the number of members in the truss.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Iterate over every joint index.
    pub fn joints(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Iterate over every member index in creation order.
    pub fn members(&self) -> impl Iterator<Item = EdgeIndex> + '_ {
        self.graph.edge_indices()
    }

    /// Whether the stored results correspond to the current configuration.
    #[must_use]
    pub fn is_evaluated(&self) -> bool {
        self.analysis_valid
    }

    /// Fail with [`AnalysisError::NotEvaluated`] unless results are current.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::NotEvaluated`] when [`Truss::evaluate`] has not
    /// succeeded since the last edit.
    pub fn ensure_evaluated(&self) -> Result<(), AnalysisError> {
        if self.analysis_valid {
            Ok(())
        } else {
            Err(AnalysisError::NotEvaluated)
        }
    }

    /// Add a new joint to the truss.
    ///
    /// # Examples
    /// ```
    /// use trusscalc::{point, Truss};
    ///
    /// let mut truss = Truss::new();
    /// let joint = truss.add_joint(point(0.0, 0.0));
    /// assert_eq!(truss.joint_count(), 1);
    /// assert_eq!(joint.index(), 0);
    /// ```
    pub fn add_joint(&mut self, position: Point) -> NodeIndex {
        self.invalidate();
        self.graph.add_node(Joint::new(position))
    }

    /// Find the first joint located at `position`, within `tolerance` on each axis.
    #[must_use]
    pub fn find_joint(&self, position: Point, tolerance: f64) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&node| self.graph[node].position.approx_eq(position, tolerance))
    }

    /// Update the position of an existing joint.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownJoint`] when `joint` is not part of this truss.
    pub fn move_joint(&mut self, joint: NodeIndex, position: Point) -> Result<(), TrussEditError> {
        self.joint_mut(joint)?.position = position;
        Ok(())
    }

    /// Remove a joint and all connected members from the truss.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownJoint`] when `joint` is not part of this truss.
    pub fn remove_joint(&mut self, joint: NodeIndex) -> Result<(), TrussEditError> {
        if self.graph.node_weight(joint).is_none() {
            return Err(TrussEditError::UnknownJoint(joint));
        }
        self.invalidate();
        self.graph
            .remove_node(joint)
            .map(|_| ())
            .ok_or(TrussEditError::UnknownJoint(joint))
    }

    /// Connect two joints with a new member.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownJoint`] when either end is not part of this truss.
    pub fn add_member(
        &mut self,
        start: NodeIndex,
        end: NodeIndex,
    ) -> Result<EdgeIndex, TrussEditError> {
        for joint in [start, end] {
            if self.graph.node_weight(joint).is_none() {
                return Err(TrussEditError::UnknownJoint(joint));
            }
        }
        self.invalidate();
        Ok(self.graph.add_edge(start, end, Member::new()))
    }

    /// Remove a member from the truss.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownMember`] when `member` is not part of this truss.
    pub fn remove_member(&mut self, member: EdgeIndex) -> Result<(), TrussEditError> {
        if self.graph.edge_weight(member).is_none() {
            return Err(TrussEditError::UnknownMember(member));
        }
        self.invalidate();
        self.graph
            .remove_edge(member)
            .map(|_| ())
            .ok_or(TrussEditError::UnknownMember(member))
    }

    /// Set the restraint for a joint.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownJoint`] when `joint` is not part of this truss.
    pub fn set_support(&mut self, joint: NodeIndex, support: Support) -> Result<(), TrussEditError> {
        self.joint_mut(joint)?.support = support;
        Ok(())
    }

    /// Replace the point load applied to a joint.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownJoint`] when `joint` is not part of this truss.
    pub fn set_load(&mut self, joint: NodeIndex, load: Force) -> Result<(), TrussEditError> {
        self.joint_mut(joint)?.load = load;
        Ok(())
    }

    /// Add a point load on top of whatever the joint already carries.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownJoint`] when `joint` is not part of this truss.
    pub fn add_load(&mut self, joint: NodeIndex, load: Force) -> Result<(), TrussEditError> {
        let node = self.joint_mut(joint)?;
        node.load = node.load + load;
        Ok(())
    }

    /// Set the axial rigidity EA of a member.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::UnknownMember`] when `member` is not part of this truss and
    /// [`TrussEditError::InvalidMemberProperties`] when `rigidity` is not strictly positive
    /// and finite.
    ///
    /// # Examples
    /// ```
    /// use trusscalc::{point, Truss, TrussEditError};
    ///
    /// let mut truss = Truss::new();
    /// let a = truss.add_joint(point(0.0, 0.0));
    /// let b = truss.add_joint(point(1.0, 0.0));
    /// let member = truss.add_member(a, b).unwrap();
    ///
    /// let error = truss
    ///     .set_member_rigidity(member, 0.0)
    ///     .expect_err("invalid rigidity rejected");
    /// assert!(matches!(error, TrussEditError::InvalidMemberProperties(_)));
    /// ```
    pub fn set_member_rigidity(
        &mut self,
        member: EdgeIndex,
        rigidity: f64,
    ) -> Result<(), TrussEditError> {
        if self.graph.edge_weight(member).is_none() {
            return Err(TrussEditError::UnknownMember(member));
        }
        validate_rigidity(member, rigidity).map_err(TrussEditError::InvalidMemberProperties)?;
        self.invalidate();
        if let Some(edge) = self.graph.edge_weight_mut(member) {
            edge.rigidity = Some(rigidity);
        }
        Ok(())
    }

    /// Set the axial rigidity EA of every member.
    ///
    /// # Errors
    ///
    /// Returns [`TrussEditError::InvalidMemberProperties`] when `rigidity` is not strictly
    /// positive and finite.
    pub fn set_rigidity_for_all(&mut self, rigidity: f64) -> Result<(), TrussEditError> {
        let members: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        for member in members {
            self.set_member_rigidity(member, rigidity)?;
        }
        Ok(())
    }

    /// Position of a joint.
    #[must_use]
    pub fn joint_position(&self, joint: NodeIndex) -> Option<Point> {
        self.graph.node_weight(joint).map(|joint| joint.position)
    }

    /// Restraint of a joint.
    #[must_use]
    pub fn joint_support(&self, joint: NodeIndex) -> Option<Support> {
        self.graph.node_weight(joint).map(|joint| joint.support)
    }

    /// Load applied to a joint.
    #[must_use]
    pub fn joint_load(&self, joint: NodeIndex) -> Option<Force> {
        self.graph.node_weight(joint).map(|joint| joint.load)
    }

    /// Retrieve the displacement of a joint after analysis.
    #[must_use]
    pub fn joint_displacement(&self, joint: NodeIndex) -> Option<Displacement> {
        self.graph
            .node_weight(joint)
            .map(|joint| joint.displacement)
    }

    /// Retrieve the support reaction at a joint after analysis.
    ///
    /// The reaction is the force the support exerts on the truss; it is zero
    /// along unrestrained axes.
    #[must_use]
    pub fn joint_reaction(&self, joint: NodeIndex) -> Option<Force> {
        self.graph.node_weight(joint).map(|joint| joint.reaction)
    }

    /// Start and end joints of a member.
    #[must_use]
    pub fn member_endpoints(&self, member: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(member)
    }

    /// Distance between the two ends of a member.
    #[must_use]
    pub fn member_length(&self, member: EdgeIndex) -> Option<f64> {
        let (start, end) = self.graph.edge_endpoints(member)?;
        Some(self.graph[start].position.distance_to(self.graph[end].position))
    }

    /// Orientation of a member from its start to its end joint, in radians.
    #[must_use]
    pub fn member_angle(&self, member: EdgeIndex) -> Option<f64> {
        let (start, end) = self.graph.edge_endpoints(member)?;
        let delta = self.graph[end].position.to_vector() - self.graph[start].position.to_vector();
        Some(delta.y.atan2(delta.x))
    }

    /// Axial rigidity assigned to a member.
    #[must_use]
    pub fn member_rigidity(&self, member: EdgeIndex) -> Option<f64> {
        self.graph.edge_weight(member).and_then(|member| member.rigidity)
    }

    /// Retrieve the axial force in a member after analysis; tension is positive.
    #[must_use]
    pub fn member_axial_force(&self, member: EdgeIndex) -> Option<f64> {
        self.graph
            .edge_weight(member)
            .map(|member| member.axial_force)
    }

    /// Retrieve the axial strain of a member after analysis.
    #[must_use]
    pub fn member_strain(&self, member: EdgeIndex) -> Option<f64> {
        self.graph.edge_weight(member).map(|member| member.strain)
    }

    /// Global X and Y components of a member's axial force, `N cos α` and `N sin α`.
    #[must_use]
    pub fn member_force_components(&self, member: EdgeIndex) -> Option<Force> {
        let axial_force = self.member_axial_force(member)?;
        let angle = self.member_angle(member)?;
        Some(Force::new(axial_force * angle.cos(), axial_force * angle.sin()))
    }

    /// Lower-left and upper-right corners enclosing every joint.
    #[must_use]
    pub fn bounding_box(&self) -> Option<(Point, Point)> {
        let mut positions = self.graph.node_weights().map(|joint| joint.position);
        let first = positions.next()?;
        Some(positions.fold((first, first), |(min, max), p| {
            (
                Point::new(min.x.min(p.x), min.y.min(p.y)),
                Point::new(max.x.max(p.x), max.y.max(p.y)),
            )
        }))
    }

    /// Diagnostics from the last successful evaluation.
    #[must_use]
    pub fn last_solve_stats(&self) -> Option<SolveStats> {
        self.stats
    }

    /// Analyse the truss under the configured loads.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError`] when the structure cannot be solved because of
    /// invalid member properties or insufficient constraints.
    pub fn evaluate(&mut self, settings: &SolverSettings) -> Result<SolveStats, AnalysisError> {
        if let (true, Some(stats)) = (self.analysis_valid, self.stats) {
            return Ok(stats);
        }
        let index_map = self.node_index_map();
        let stiffness = self.build_stiffness_matrix(&index_map)?;
        let load = self.build_load_vector(&index_map);
        let free_dofs = self.collect_free_dofs(&index_map);
        debug!(
            "assembled {0}x{0} stiffness matrix with {1} free degrees of freedom",
            stiffness.nrows(),
            free_dofs.len()
        );
        let (displacements, stats) =
            Self::solve_displacements(&stiffness, &load, &free_dofs, settings)?;
        self.store_joint_results(&index_map, &stiffness, &load, &displacements);
        self.update_member_forces(&index_map, &displacements);
        self.analysis_valid = true;
        self.stats = Some(stats);
        Ok(stats)
    }

    /// Borrow a joint for editing, invalidating any cached results.
    fn joint_mut(&mut self, joint: NodeIndex) -> Result<&mut Joint, TrussEditError> {
        if self.graph.node_weight(joint).is_none() {
            return Err(TrussEditError::UnknownJoint(joint));
        }
        self.invalidate();
        self.graph
            .node_weight_mut(joint)
            .ok_or(TrussEditError::UnknownJoint(joint))
    }

    /// Reset cached analysis results when the topology or properties change.
    fn invalidate(&mut self) {
        if self.analysis_valid {
            for joint in self.graph.node_weights_mut() {
                joint.displacement = Displacement::default();
                joint.reaction = Force::default();
            }
            for member in self.graph.edge_weights_mut() {
                member.clear_results();
            }
            self.analysis_valid = false;
            self.stats = None;
        }
    }

    /// Construct a mapping from graph indices to contiguous joint numbers.
    fn node_index_map(&self) -> HashMap<NodeIndex, usize> {
        self.graph
            .node_indices()
            .enumerate()
            .map(|(idx, node)| (node, idx))
            .collect()
    }

    /// Length, unit direction and EA/L of a member, validating its properties.
    fn member_geometry(&self, edge: EdgeIndex) -> Result<(f64, [f64; 2], f64), AnalysisError> {
        let (start, end) = self
            .graph
            .edge_endpoints(edge)
            .ok_or(AnalysisError::MissingProperties(edge))?;
        let rigidity = self.graph[edge]
            .rigidity
            .ok_or(AnalysisError::MissingProperties(edge))?;
        validate_rigidity(edge, rigidity).map_err(|source| {
            AnalysisError::InvalidMemberProperties {
                member: edge,
                source,
            }
        })?;
        let delta = self.graph[end].position.to_vector() - self.graph[start].position.to_vector();
        let length = delta.norm();
        if length == 0.0 {
            return Err(AnalysisError::ZeroLengthMember(edge));
        }
        let direction = delta / length;
        Ok((length, [direction.x, direction.y], rigidity / length))
    }

    /// Global DOF numbers of a member's four translations.
    fn dof_map(&self, edge: EdgeIndex, index_map: &HashMap<NodeIndex, usize>) -> Option<[usize; 4]> {
        let (start, end) = self.graph.edge_endpoints(edge)?;
        let start_idx = index_map[&start] * DOF_PER_JOINT;
        let end_idx = index_map[&end] * DOF_PER_JOINT;
        Some([start_idx, start_idx + 1, end_idx, end_idx + 1])
    }

    /// Assemble the global stiffness matrix for the current configuration.
    fn build_stiffness_matrix(
        &self,
        index_map: &HashMap<NodeIndex, usize>,
    ) -> Result<DMatrix<f64>, AnalysisError> {
        let dof = self.joint_count() * DOF_PER_JOINT;
        let mut matrix = DMatrix::zeros(dof, dof);
        for edge in self.graph.edge_indices() {
            let (_, [c, s], ea_over_l) = self.member_geometry(edge)?;
            let transform = SVector::<f64, 4>::new(c, s, -c, -s);
            let local: SMatrix<f64, 4, 4> = ea_over_l * transform * transform.transpose();
            let dof_map = self
                .dof_map(edge, index_map)
                .ok_or(AnalysisError::MissingProperties(edge))?;

            for (row_local, global_row) in dof_map.iter().enumerate() {
                for (col_local, global_col) in dof_map.iter().enumerate() {
                    matrix[(*global_row, *global_col)] += local[(row_local, col_local)];
                }
            }
        }
        Ok(matrix)
    }

    /// Assemble the global nodal load vector.
    fn build_load_vector(&self, index_map: &HashMap<NodeIndex, usize>) -> DVector<f64> {
        let dof = self.joint_count() * DOF_PER_JOINT;
        let mut load = DVector::zeros(dof);
        for node in self.graph.node_indices() {
            let joint = &self.graph[node];
            let base = index_map[&node] * DOF_PER_JOINT;
            load[base] = joint.load.x;
            load[base + 1] = joint.load.y;
        }
        load
    }

    /// Determine the indices corresponding to unconstrained degrees of freedom.
    fn collect_free_dofs(&self, index_map: &HashMap<NodeIndex, usize>) -> Vec<usize> {
        let mut free = Vec::new();
        for node in self.graph.node_indices() {
            let restraints = self.graph[node].support.restraints();
            let base = index_map[&node] * DOF_PER_JOINT;
            for (axis, restrained) in restraints.iter().enumerate() {
                if !restrained {
                    free.push(base + axis);
                }
            }
        }
        free
    }

    /// Solve for joint displacements using the reduced stiffness matrix, then
    /// refine the solution against its residual.
    fn solve_displacements(
        stiffness: &DMatrix<f64>,
        load: &DVector<f64>,
        free_dofs: &[usize],
        settings: &SolverSettings,
    ) -> Result<(DVector<f64>, SolveStats), AnalysisError> {
        let mut displacements = DVector::zeros(load.len());
        let free_len = free_dofs.len();
        if free_len == 0 {
            let stats = SolveStats {
                free_dofs: 0,
                iterations: 0,
                residual: 0.0,
                converged: true,
            };
            return Ok((displacements, stats));
        }
        let mut k_ff = DMatrix::zeros(free_len, free_len);
        let mut f_f = DVector::zeros(free_len);
        for (row_idx, &row) in free_dofs.iter().enumerate() {
            f_f[row_idx] = load[row];
            for (col_idx, &col) in free_dofs.iter().enumerate() {
                k_ff[(row_idx, col_idx)] = stiffness[(row, col)];
            }
        }

        let lu = k_ff.clone().lu();
        let pivots = lu.u().diagonal();
        let largest = pivots.amax();
        if largest == 0.0 || pivots.amin() <= settings.pivot_tolerance * largest {
            return Err(AnalysisError::SingularStiffness);
        }
        let mut solution = lu.solve(&f_f).ok_or(AnalysisError::SingularStiffness)?;

        let target = settings.tolerance * f_f.norm().max(1.0);
        let mut residual = (&f_f - &k_ff * &solution).norm();
        let mut iterations = 0;
        while residual > target && iterations < settings.max_iterations {
            let correction = lu
                .solve(&(&f_f - &k_ff * &solution))
                .ok_or(AnalysisError::SingularStiffness)?;
            let candidate = &solution + correction;
            let candidate_residual = (&f_f - &k_ff * &candidate).norm();
            iterations += 1;
            if candidate_residual >= residual {
                break;
            }
            solution = candidate;
            residual = candidate_residual;
        }
        if solution.iter().any(|value| !value.is_finite()) {
            return Err(AnalysisError::SingularStiffness);
        }
        let converged = residual <= target;
        if converged {
            debug!("solved after {iterations} refinement passes (residual {residual:e})");
        } else {
            warn!("refinement stopped after {iterations} passes with residual {residual:e}");
        }

        for (idx, &dof) in free_dofs.iter().enumerate() {
            displacements[dof] = solution[idx];
        }
        let stats = SolveStats {
            free_dofs: free_len,
            iterations,
            residual,
            converged,
        };
        Ok((displacements, stats))
    }

    /// Persist solved displacements and support reactions back to the graph.
    fn store_joint_results(
        &mut self,
        index_map: &HashMap<NodeIndex, usize>,
        stiffness: &DMatrix<f64>,
        load: &DVector<f64>,
        displacements: &DVector<f64>,
    ) {
        let internal = stiffness * displacements;
        for (node, &idx) in index_map {
            let base = idx * DOF_PER_JOINT;
            let joint = &mut self.graph[*node];
            let [restrained_x, restrained_y] = joint.support.restraints();
            joint.displacement = Displacement::new(displacements[base], displacements[base + 1]);
            joint.reaction = Force::new(
                if restrained_x { internal[base] - load[base] } else { 0.0 },
                if restrained_y { internal[base + 1] - load[base + 1] } else { 0.0 },
            );
        }
    }

    /// Compute member axial forces and strains.
    fn update_member_forces(
        &mut self,
        index_map: &HashMap<NodeIndex, usize>,
        displacements: &DVector<f64>,
    ) {
        let edges: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        for edge in edges {
            let (Ok((length, [c, s], ea_over_l)), Some(dofs)) =
                (self.member_geometry(edge), self.dof_map(edge, index_map))
            else {
                self.graph[edge].clear_results();
                continue;
            };
            let elongation = c * (displacements[dofs[2]] - displacements[dofs[0]])
                + s * (displacements[dofs[3]] - displacements[dofs[1]]);
            let member = &mut self.graph[edge];
            member.axial_force = ea_over_l * elongation;
            member.strain = elongation / length;
        }
    }
}

/// Reject axial rigidities that cannot describe a real bar.
fn validate_rigidity(member: EdgeIndex, rigidity: f64) -> Result<(), MemberPropertyError> {
    if rigidity > 0.0 && rigidity.is_finite() {
        Ok(())
    } else {
        Err(MemberPropertyError::NonPositiveRigidity { member, rigidity })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::geometry::{force, point};

    /// Symmetric triangle: pinned at A, roller at B, downward load at the apex.
    fn triangle(load: f64) -> (Truss, [NodeIndex; 3], [EdgeIndex; 3]) {
        let mut truss = Truss::new();
        let a = truss.add_joint(point(0.0, 0.0));
        let b = truss.add_joint(point(4.0, 0.0));
        let c = truss.add_joint(point(2.0, 2.0));
        let ab = truss.add_member(a, b).expect("joints exist");
        let ac = truss.add_member(a, c).expect("joints exist");
        let bc = truss.add_member(b, c).expect("joints exist");
        truss.set_rigidity_for_all(5_000.0).expect("valid rigidity");
        truss.set_support(a, Support::Pinned).expect("support applied");
        truss.set_support(b, Support::RollerY).expect("support applied");
        truss.set_load(c, force(0.0, -load)).expect("load applied");
        (truss, [a, b, c], [ab, ac, bc])
    }

    #[test]
    fn joint_mutators_return_error_for_unknown_indices() {
        let mut truss = Truss::new();
        let stale_joint = truss.add_joint(point(0.0, 0.0));
        truss
            .remove_joint(stale_joint)
            .expect("initial joint removal succeeds");

        let mut other = Truss::new();
        let foreign_joint = other.add_joint(point(1.0, 0.0));

        for joint in [stale_joint, foreign_joint] {
            let move_error = truss
                .move_joint(joint, point(2.0, 0.0))
                .expect_err("unknown joint rejected");
            assert_eq!(move_error, TrussEditError::UnknownJoint(joint));

            let support_error = truss
                .set_support(joint, Support::Pinned)
                .expect_err("unknown joint rejected");
            assert_eq!(support_error, TrussEditError::UnknownJoint(joint));

            let load_error = truss
                .set_load(joint, force(0.0, 0.0))
                .expect_err("unknown joint rejected");
            assert_eq!(load_error, TrussEditError::UnknownJoint(joint));

            let member_error = truss
                .add_member(joint, joint)
                .expect_err("unknown joint rejected");
            assert_eq!(member_error, TrussEditError::UnknownJoint(joint));
        }

        let stale_remove_error = truss
            .remove_joint(stale_joint)
            .expect_err("stale joint rejected");
        assert_eq!(
            stale_remove_error,
            TrussEditError::UnknownJoint(stale_joint)
        );
    }

    #[test]
    fn member_mutators_return_error_for_unknown_indices() {
        let mut truss = Truss::new();
        let a = truss.add_joint(point(0.0, 0.0));
        let b = truss.add_joint(point(1.0, 0.0));
        let stale_member = truss.add_member(a, b).expect("joints exist");
        truss
            .remove_member(stale_member)
            .expect("initial member removal succeeds");

        let rigidity_error = truss
            .set_member_rigidity(stale_member, 5_000.0)
            .expect_err("unknown member rejected");
        assert_eq!(rigidity_error, TrussEditError::UnknownMember(stale_member));

        let remove_error = truss
            .remove_member(stale_member)
            .expect_err("unknown member rejected");
        assert_eq!(remove_error, TrussEditError::UnknownMember(stale_member));
    }

    #[test]
    fn invalid_rigidity_is_rejected() {
        let mut truss = Truss::new();
        let a = truss.add_joint(point(0.0, 0.0));
        let b = truss.add_joint(point(1.0, 0.0));
        let member = truss.add_member(a, b).expect("joints exist");

        for rigidity in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let error = truss
                .set_member_rigidity(member, rigidity)
                .expect_err("bad rigidity rejected");
            assert!(matches!(
                error,
                TrussEditError::InvalidMemberProperties(
                    MemberPropertyError::NonPositiveRigidity { .. }
                )
            ));
        }
    }

    #[test]
    fn analysis_requires_member_properties() {
        let mut truss = Truss::new();
        let a = truss.add_joint(point(0.0, 0.0));
        let b = truss.add_joint(point(1.0, 0.0));
        let member = truss.add_member(a, b).expect("joints exist");

        let error = truss
            .evaluate(&SolverSettings::default())
            .expect_err("missing properties detected");
        assert_eq!(error, AnalysisError::MissingProperties(member));
    }

    #[test]
    fn zero_length_member_is_rejected() {
        let mut truss = Truss::new();
        let a = truss.add_joint(point(0.0, 0.0));
        let b = truss.add_joint(point(0.0, 0.0));
        let member = truss.add_member(a, b).expect("joints exist");
        truss
            .set_member_rigidity(member, 5_000.0)
            .expect("rigidity accepted");

        let error = truss
            .evaluate(&SolverSettings::default())
            .expect_err("zero length detected");
        assert_eq!(error, AnalysisError::ZeroLengthMember(member));
    }

    #[test]
    fn axial_bar_matches_closed_form_displacement() {
        let mut truss = Truss::new();
        let support = truss.add_joint(point(0.0, 0.0));
        let free = truss.add_joint(point(2.0, 0.0));
        truss.set_support(support, Support::Pinned).expect("support applied");
        truss.set_support(free, Support::RollerY).expect("support applied");
        truss.set_load(free, force(10.0, 0.0)).expect("load applied");
        let member = truss.add_member(support, free).expect("joints exist");
        truss
            .set_member_rigidity(member, 5_000.0)
            .expect("rigidity accepted");

        let stats = truss
            .evaluate(&SolverSettings::default())
            .expect("analysis succeeds");
        assert_eq!(stats.free_dofs, 1);
        assert!(stats.converged);

        let displacement = truss.joint_displacement(free).expect("joint exists");
        assert_relative_eq!(displacement.x, 10.0 * 2.0 / 5_000.0, epsilon = 1.0e-12);
        assert_relative_eq!(displacement.y, 0.0, epsilon = 1.0e-12);

        let axial_force = truss.member_axial_force(member).expect("member exists");
        assert_relative_eq!(axial_force, 10.0, epsilon = 1.0e-9);
        let strain = truss.member_strain(member).expect("member exists");
        assert_relative_eq!(strain, 10.0 / 5_000.0, epsilon = 1.0e-12);

        let reaction = truss.joint_reaction(support).expect("joint exists");
        assert_relative_eq!(reaction.x, -10.0, epsilon = 1.0e-9);
        assert_relative_eq!(reaction.y, 0.0, epsilon = 1.0e-9);
    }

    #[test]
    fn triangle_matches_method_of_joints() {
        let (mut truss, [a, b, c], [ab, ac, bc]) = triangle(10.0);
        truss
            .evaluate(&SolverSettings::default())
            .expect("analysis succeeds");

        let half_root_two = 10.0 / 2.0_f64.sqrt();
        assert_relative_eq!(truss.member_axial_force(ab).unwrap(), 5.0, epsilon = 1.0e-9);
        assert_relative_eq!(
            truss.member_axial_force(ac).unwrap(),
            -half_root_two,
            epsilon = 1.0e-9
        );
        assert_relative_eq!(
            truss.member_axial_force(bc).unwrap(),
            -half_root_two,
            epsilon = 1.0e-9
        );

        let reaction_a = truss.joint_reaction(a).unwrap();
        let reaction_b = truss.joint_reaction(b).unwrap();
        assert_relative_eq!(reaction_a.x, 0.0, epsilon = 1.0e-9);
        assert_relative_eq!(reaction_a.y, 5.0, epsilon = 1.0e-9);
        assert_relative_eq!(reaction_b.x, 0.0, epsilon = 1.0e-12);
        assert_relative_eq!(reaction_b.y, 5.0, epsilon = 1.0e-9);
        assert_eq!(truss.joint_reaction(c), Some(Force::default()));

        let apex = truss.joint_displacement(c).unwrap();
        assert!(apex.y < 0.0);
    }

    #[test]
    fn roller_along_x_carries_horizontal_reaction() {
        let mut truss = Truss::new();
        let a = truss.add_joint(point(0.0, 0.0));
        let b = truss.add_joint(point(0.0, 4.0));
        let c = truss.add_joint(point(2.0, 2.0));
        truss.add_member(a, b).expect("joints exist");
        truss.add_member(a, c).expect("joints exist");
        truss.add_member(b, c).expect("joints exist");
        truss.set_rigidity_for_all(5_000.0).expect("valid rigidity");
        truss.set_support(a, Support::Pinned).expect("support applied");
        truss.set_support(b, Support::RollerX).expect("support applied");
        truss.set_load(c, force(0.0, -10.0)).expect("load applied");

        let stats = truss
            .evaluate(&SolverSettings::default())
            .expect("analysis succeeds");
        assert_eq!(stats.free_dofs, 3);

        let reaction_a = truss.joint_reaction(a).unwrap();
        let reaction_b = truss.joint_reaction(b).unwrap();
        assert_relative_eq!(reaction_a.x, 5.0, epsilon = 1.0e-9);
        assert_relative_eq!(reaction_a.y, 10.0, epsilon = 1.0e-9);
        assert_relative_eq!(reaction_b.x, -5.0, epsilon = 1.0e-9);
        assert_eq!(reaction_b.y, 0.0);
        assert_relative_eq!(truss.joint_displacement(b).unwrap().x, 0.0);
    }

    #[test]
    fn exhausted_refinement_keeps_the_solution() {
        let (mut truss, _, [ab, ..]) = triangle(10.0);
        let settings = SolverSettings {
            max_iterations: 0,
            tolerance: 0.0,
            ..SolverSettings::default()
        };

        let stats = truss.evaluate(&settings).expect("analysis succeeds");
        assert_eq!(stats.iterations, 0);
        assert!(!stats.converged);
        assert!(truss.is_evaluated());
        assert_relative_eq!(truss.member_axial_force(ab).unwrap(), 5.0, epsilon = 1.0e-9);
    }

    #[test]
    fn force_components_follow_member_orientation() {
        let (mut truss, _, [ab, ac, _]) = triangle(10.0);
        truss
            .evaluate(&SolverSettings::default())
            .expect("analysis succeeds");

        assert_relative_eq!(truss.member_angle(ab).unwrap(), 0.0);
        assert_relative_eq!(
            truss.member_angle(ac).unwrap(),
            std::f64::consts::FRAC_PI_4,
            epsilon = 1.0e-12
        );
        let components = truss.member_force_components(ac).unwrap();
        assert_relative_eq!(components.x, -5.0, epsilon = 1.0e-9);
        assert_relative_eq!(components.y, -5.0, epsilon = 1.0e-9);
    }

    #[test]
    fn mechanism_is_reported_as_singular() {
        let mut truss = Truss::new();
        let a = truss.add_joint(point(0.0, 0.0));
        let b = truss.add_joint(point(1.0, 0.0));
        let member = truss.add_member(a, b).expect("joints exist");
        truss
            .set_member_rigidity(member, 5_000.0)
            .expect("rigidity accepted");
        truss.set_support(a, Support::RollerY).expect("support applied");
        truss.set_load(b, force(0.0, -1.0)).expect("load applied");

        let error = truss
            .evaluate(&SolverSettings::default())
            .expect_err("unstable truss rejected");
        assert_eq!(error, AnalysisError::SingularStiffness);
        assert!(!truss.is_evaluated());
    }

    #[test]
    fn edits_invalidate_results() {
        let (mut truss, [_, _, c], [ab, ..]) = triangle(10.0);
        truss
            .evaluate(&SolverSettings::default())
            .expect("analysis succeeds");
        assert!(truss.ensure_evaluated().is_ok());
        assert!(truss.last_solve_stats().is_some());

        truss.add_load(c, force(0.0, -10.0)).expect("load applied");
        assert_eq!(truss.ensure_evaluated(), Err(AnalysisError::NotEvaluated));
        assert_eq!(truss.member_axial_force(ab), Some(0.0));
        assert_eq!(truss.joint_load(c), Some(force(0.0, -20.0)));

        truss
            .evaluate(&SolverSettings::default())
            .expect("analysis succeeds");
        assert_relative_eq!(truss.member_axial_force(ab).unwrap(), 10.0, epsilon = 1.0e-9);
    }

    #[test]
    fn joints_are_found_by_position() {
        let (truss, [a, b, c], _) = triangle(1.0);
        assert_eq!(truss.find_joint(point(0.0, 0.0), 1.0e-9), Some(a));
        assert_eq!(truss.find_joint(point(4.0, 1.0e-12), 1.0e-9), Some(b));
        assert_eq!(truss.find_joint(point(2.0, 2.0), 1.0e-9), Some(c));
        assert_eq!(truss.find_joint(point(1.0, 1.0), 1.0e-9), None);
        assert_eq!(
            truss.bounding_box(),
            Some((point(0.0, 0.0), point(4.0, 2.0)))
        );
    }

    #[test]
    fn supports_restrain_expected_axes() {
        assert_eq!(Support::Free.restraints(), [false, false]);
        assert_eq!(Support::Pinned.restraints(), [true, true]);
        assert_eq!(Support::RollerX.restraints(), [true, false]);
        assert_eq!(Support::RollerY.restraints(), [false, true]);
        assert!(Support::Free.is_free());
        assert!(!Support::RollerX.is_free());
    }
}
