use std::path::PathBuf;

use serde::Serialize;

/// The kind of a dependency-graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A workspace crate root (workspace mode only).
    Crate,
    Module,
    Struct,
    Enum,
    Trait,
    Function,
    Impl,
}

/// One declaration in the dependency graph.
///
/// Nodes reference each other only through id strings: `parent` and
/// `children` name other keys of the owning node map, never the nodes
/// themselves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Qualified path — the primary key of the graph.
    pub id: String,
    /// Short (unqualified) name.
    pub name: String,
    /// Qualified path (same as `id`).
    pub path: String,
    pub kind: NodeKind,
    /// Id of the enclosing node; `None` only for the root.
    pub parent: Option<String>,
    pub file: PathBuf,
    pub line: usize,
    /// Ids of enclosed nodes, in source order.
    pub children: Vec<String>,
}

impl GraphNode {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: NodeKind,
        parent: Option<String>,
        file: PathBuf,
        line: usize,
    ) -> Self {
        let id = id.into();
        Self {
            path: id.clone(),
            id,
            name: name.into(),
            kind,
            parent,
            file,
            line,
            children: Vec::new(),
        }
    }
}
