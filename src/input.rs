//! Reader for the plain-text truss description.
//!
//! The file is line oriented with `;`-separated fields:
//!
//! ```text
//! 3; 3            <- node count; element count
//! A; 0; 0         <- one `label; x; y` line per node
//! B; 4; 0
//! C; 2; 2
//! 0; 1; 1         <- adjacency matrix, one row per node
//! 1; 0; 1
//! 1; 1; 0
//! 0; 0            <- one `Fx; Fy` line per node
//! 0; 0
//! 0; -10
//! P               <- one support code per node: P, X, Y or anything else for free
//! Y
//! L
//! EA; 5000        <- optional material lines
//! ```
//!
//! Only the upper triangle of the adjacency matrix creates members.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::{debug, warn};

use crate::errors::{Error, ModelError, ParseError};
use crate::geometry::{Force, Point};
use crate::truss::Support;

/// A node as declared in the input.
#[derive(Clone, Debug, PartialEq)]
pub struct Vertex {
    /// Label from the first field of the node line.
    pub label: String,
    /// Declared position.
    pub position: Point,
}

/// Material lines found after the support section.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Material {
    /// Axial rigidity given directly as `EA`.
    pub rigidity: Option<f64>,
    /// Young's modulus given as `E`.
    pub elastic_modulus: Option<f64>,
    /// Cross-sectional area given as `A`.
    pub area: Option<f64>,
}

impl Material {
    /// Axial rigidity to assign to every member.
    ///
    /// `EA` wins over `E` and `A`; with neither, `default` is used.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::IncompleteMaterial`] when only one of `E` and `A` is present.
    pub fn rigidity_or(&self, default: f64) -> Result<f64, ModelError> {
        match (self.rigidity, self.elastic_modulus, self.area) {
            (Some(rigidity), _, _) => Ok(rigidity),
            (None, Some(elastic_modulus), Some(area)) => Ok(elastic_modulus * area),
            (None, None, None) => Ok(default),
            _ => Err(ModelError::IncompleteMaterial),
        }
    }
}

/// Parsed contents of a truss description, before any model is built.
#[derive(Clone, Debug, PartialEq)]
pub struct TrussSpec {
    /// Nodes in input order.
    pub vertices: Vec<Vertex>,
    /// Element count declared in the header.
    pub declared_elements: usize,
    /// Connected vertex pairs `(i, j)` with `i < j`, in row-major order.
    pub connections: Vec<(usize, usize)>,
    /// Load per vertex.
    pub loads: Vec<Force>,
    /// Support per vertex.
    pub supports: Vec<Support>,
    /// Optional material properties.
    pub material: Material,
}

impl TrussSpec {
    /// Read and parse a description from disk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and [`Error::Parse`] when its
    /// contents are malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(parse_spec(&text)?)
    }

    /// Number of declared nodes.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Whether vertex `index` appears in at least one connection.
    #[must_use]
    pub fn is_connected(&self, index: usize) -> bool {
        self.connections
            .iter()
            .any(|&(i, j)| i == index || j == index)
    }
}

impl FromStr for TrussSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_spec(s)
    }
}

/// Parse a truss description held in memory.
///
/// # Errors
///
/// Returns [`ParseError`] describing the first malformed line.
///
/// # Examples
/// ```
/// let spec = trusscalc::parse_spec("2; 1\nA; 0; 0\nB; 1; 0\n0; 1\n1; 0\n0; 0\n5; 0\nP\nY\n")
///     .expect("valid description");
/// assert_eq!(spec.connections, vec![(0, 1)]);
/// ```
pub fn parse_spec(text: &str) -> Result<TrussSpec, ParseError> {
    let mut lines = LineCursor::new(text);

    let header_line = lines.expect_line("header")?;
    let header = fields_exact(header_line, 2)?;
    let node_count = parse_count(header_line.number, header[0])?;
    let declared_elements = parse_count(header_line.number, header[1])?;
    if node_count == 0 {
        return Err(ParseError::EmptyModel);
    }

    let mut vertices = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        let line = lines.expect_line("nodes")?;
        let fields = fields_exact(line, 3)?;
        vertices.push(Vertex {
            label: fields[0].to_owned(),
            position: Point::new(
                parse_number(line.number, fields[1])?,
                parse_number(line.number, fields[2])?,
            ),
        });
    }

    let mut adjacency = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        let line = lines.expect_line("connectivity")?;
        let row = fields_exact(line, node_count)?
            .into_iter()
            .map(|field| parse_connection(line.number, field))
            .collect::<Result<Vec<bool>, ParseError>>()?;
        adjacency.push(row);
    }
    let connections = upper_triangle(&adjacency);

    let mut loads = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        let line = lines.expect_line("loads")?;
        let fields = fields_exact(line, 2)?;
        loads.push(Force::new(
            parse_number(line.number, fields[0])?,
            parse_number(line.number, fields[1])?,
        ));
    }

    let mut supports = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        let line = lines.expect_line("supports")?;
        supports.push(parse_support(line.number, line.text));
    }

    let material = parse_material(&mut lines)?;

    debug!(
        "parsed {} nodes, {} connections ({} declared)",
        vertices.len(),
        connections.len(),
        declared_elements
    );
    Ok(TrussSpec {
        vertices,
        declared_elements,
        connections,
        loads,
        supports,
        material,
    })
}

/// A physical line with its 1-based number.
#[derive(Clone, Copy, Debug)]
struct Line<'a> {
    number: usize,
    text: &'a str,
}

/// Sequential reader over the lines of the input.
struct LineCursor<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    last: usize,
}

impl<'a> LineCursor<'a> {
    /// Cursor positioned before the first line.
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            last: 0,
        }
    }

    /// Next line, or an EOF error naming the section being read.
    fn expect_line(&mut self, section: &'static str) -> Result<Line<'a>, ParseError> {
        self.next_line().ok_or(ParseError::UnexpectedEof {
            line: self.last + 1,
            section,
        })
    }

    /// Next trimmed line, if any.
    fn next_line(&mut self) -> Option<Line<'a>> {
        let (index, text) = self.lines.next()?;
        self.last = index + 1;
        Some(Line {
            number: index + 1,
            text: text.trim(),
        })
    }
}

/// Split a line on `;`, tolerating one trailing separator.
fn fields(text: &str) -> Vec<&str> {
    let mut fields: Vec<&str> = text.split(';').map(str::trim).collect();
    if fields.len() > 1 && fields.last() == Some(&"") {
        fields.pop();
    }
    fields
}

/// Fields of `line`, which must number exactly `expected`.
fn fields_exact(line: Line<'_>, expected: usize) -> Result<Vec<&str>, ParseError> {
    let fields = fields(line.text);
    if fields.len() == expected {
        Ok(fields)
    } else {
        Err(ParseError::FieldCount {
            line: line.number,
            expected,
            found: fields.len(),
        })
    }
}

/// Parse a finite real number.
fn parse_number(line: usize, field: &str) -> Result<f64, ParseError> {
    field
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber {
            line,
            value: field.to_owned(),
        })
}

/// Parse a non-negative count.
fn parse_count(line: usize, field: &str) -> Result<usize, ParseError> {
    field.parse::<usize>().map_err(|_| ParseError::InvalidNumber {
        line,
        value: field.to_owned(),
    })
}

/// Parse one adjacency matrix entry.
fn parse_connection(line: usize, field: &str) -> Result<bool, ParseError> {
    match field {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(ParseError::InvalidConnectivity {
            line,
            value: field.to_owned(),
        }),
    }
}

/// Map a support code to a [`Support`]. Codes are case-sensitive and anything
/// unknown leaves the node free.
fn parse_support(line: usize, code: &str) -> Support {
    match code {
        "P" => Support::Pinned,
        "X" => Support::RollerX,
        "Y" => Support::RollerY,
        "p" | "x" | "y" => {
            warn!("line {line}: support code '{code}' is lowercase; node left free");
            Support::Free
        }
        _ => Support::Free,
    }
}

/// Collect `(i, j)` pairs with `j > i`, warning about entries that are not mirrored.
fn upper_triangle(adjacency: &[Vec<bool>]) -> Vec<(usize, usize)> {
    let mut connections = Vec::new();
    for (i, row) in adjacency.iter().enumerate() {
        if row[i] {
            warn!("node {} is connected to itself; ignoring", i + 1);
        }
        for j in (i + 1)..row.len() {
            if row[j] {
                connections.push((i, j));
            } else if adjacency[j][i] {
                warn!(
                    "connectivity between nodes {} and {} is only given below the diagonal; ignoring",
                    i + 1,
                    j + 1
                );
            }
        }
    }
    connections
}

/// Read the optional `key; value` material lines up to the end of input.
fn parse_material(lines: &mut LineCursor<'_>) -> Result<Material, ParseError> {
    let mut material = Material::default();
    while let Some(line) = lines.next_line() {
        if line.text.is_empty() {
            continue;
        }
        let fields = fields_exact(line, 2)?;
        let value = parse_number(line.number, fields[1])?;
        match fields[0].to_ascii_uppercase().as_str() {
            "EA" => material.rigidity = Some(value),
            "E" => material.elastic_modulus = Some(value),
            "A" => material.area = Some(value),
            _ => {
                return Err(ParseError::UnknownMaterialKey {
                    line: line.number,
                    key: fields[0].to_owned(),
                })
            }
        }
    }
    Ok(material)
}
