//! Error types produced while reading, editing, analysing or plotting trusses.

use std::path::PathBuf;

use petgraph::graph::{EdgeIndex, NodeIndex};
use thiserror::Error;

/// Error returned when a truss analysis fails.
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    /// Returned when a member has no axial rigidity assigned.
    #[error("member {0:?} is missing its axial rigidity")]
    MissingProperties(EdgeIndex),
    /// Returned when a member spans zero distance.
    #[error("member {0:?} has zero length")]
    ZeroLengthMember(EdgeIndex),
    /// Returned when the supplied properties for a member are not physically meaningful.
    #[error("member {member:?} has invalid properties: {source}")]
    InvalidMemberProperties {
        /// Identifier of the offending member.
        member: EdgeIndex,
        /// Description of the invalid property.
        #[source]
        source: MemberPropertyError,
    },
    /// Returned when the stiffness matrix cannot be inverted.
    #[error("stiffness matrix is singular; check supports and connectivity")]
    SingularStiffness,
    /// Returned when results are requested before a successful evaluation.
    #[error("the truss has not been evaluated")]
    NotEvaluated,
}

/// Error returned when updating the properties of a truss member.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum MemberPropertyError {
    /// Returned when the axial rigidity is zero, negative or not finite.
    #[error("axial rigidity must be positive and finite (received {rigidity})")]
    NonPositiveRigidity {
        /// Identifier of the affected member.
        member: EdgeIndex,
        /// Rejected axial rigidity.
        rigidity: f64,
    },
}

/// Error returned when editing a [`Truss`](crate::Truss) with invalid indices.
///
/// # Examples
///
/// ```
/// use petgraph::graph::EdgeIndex;
/// use trusscalc::{Truss, TrussEditError};
///
/// let mut truss = Truss::new();
/// let invalid_member = EdgeIndex::new(42);
/// let error = truss
///     .set_member_rigidity(invalid_member, 5000.0)
///     .expect_err("unknown member is rejected");
/// assert_eq!(error, TrussEditError::UnknownMember(invalid_member));
/// ```
#[derive(Debug, Error, PartialEq)]
pub enum TrussEditError {
    /// Returned when a joint cannot be found in the truss.
    #[error("joint {0:?} does not exist in this truss")]
    UnknownJoint(NodeIndex),
    /// Returned when a member cannot be found in the truss.
    #[error("member {0:?} does not exist in this truss")]
    UnknownMember(EdgeIndex),
    /// Returned when the supplied member properties are invalid.
    #[error("{0}")]
    InvalidMemberProperties(MemberPropertyError),
}

/// Error returned while reading the plain-text truss description.
///
/// Line numbers are 1-based and refer to the physical line in the file.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    /// The file ended before the named section was complete.
    #[error("line {line}: unexpected end of input while reading {section}")]
    UnexpectedEof {
        /// Line that was expected to exist.
        line: usize,
        /// Section being read.
        section: &'static str,
    },
    /// A line carried the wrong number of `;`-separated fields.
    #[error("line {line}: expected {expected} fields, found {found}")]
    FieldCount {
        /// Offending line.
        line: usize,
        /// Number of fields the section requires.
        expected: usize,
        /// Number of fields present.
        found: usize,
    },
    /// A field could not be read as a number.
    #[error("line {line}: `{value}` is not a valid number")]
    InvalidNumber {
        /// Offending line.
        line: usize,
        /// Raw field text.
        value: String,
    },
    /// An adjacency entry other than `0` or `1`.
    #[error("line {line}: connectivity entries must be 0 or 1, found `{value}`")]
    InvalidConnectivity {
        /// Offending line.
        line: usize,
        /// Raw field text.
        value: String,
    },
    /// A trailing material line used a key that is not understood.
    #[error("line {line}: unknown material key `{key}`")]
    UnknownMaterialKey {
        /// Offending line.
        line: usize,
        /// Key as written.
        key: String,
    },
    /// The header declared no nodes.
    #[error("the truss description declares no nodes")]
    EmptyModel,
}

/// Error returned while turning a parsed description into a solvable model.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    /// A node with a load or support is not connected to any member.
    #[error("node {label} carries a load or support but is not connected to any member")]
    IsolatedNode {
        /// Label of the node as written in the input.
        label: String,
    },
    /// Only one of `E` and `A` was supplied.
    #[error("material needs both E and A when EA is not given")]
    IncompleteMaterial,
    /// The description does not contain a single member.
    #[error("the truss description does not connect any nodes")]
    NoMembers,
    /// Editing the underlying truss failed.
    #[error(transparent)]
    Edit(#[from] TrussEditError),
}

/// Error returned when writing diagrams.
#[derive(Debug, Error)]
pub enum PlotError {
    /// The output directory or a diagram file could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The model has not been solved yet.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Error returned when loading the JSON configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid JSON for [`AppConfig`](crate::AppConfig).
    #[error("invalid configuration {path}: {source}")]
    Json {
        /// Path being read.
        path: PathBuf,
        /// Underlying deserialisation failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Crate-level error covering every stage of the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading a file from disk failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// See [`ParseError`].
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// See [`ModelError`].
    #[error(transparent)]
    Model(#[from] ModelError),
    /// See [`AnalysisError`].
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    /// See [`PlotError`].
    #[error(transparent)]
    Plot(#[from] PlotError),
    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),
}
