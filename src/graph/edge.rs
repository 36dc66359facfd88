use std::path::PathBuf;

use serde::Serialize;

/// The closed set of dependency kinds between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    UseImport,
    TypeReference,
    FunctionCall,
    MethodCall,
    TraitImpl,
    TraitBound,
    FieldType,
    ReturnType,
    ParameterType,
}

/// A source location contributing to an edge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
}

/// A typed, counted, located edge.
///
/// Edges are deduplicated on `(from, to, kind)`: a repeated occurrence
/// increments `count` and appends a location, so `count` always equals
/// `locations.len()`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: DependencyKind,
    pub count: usize,
    pub locations: Vec<Location>,
}
