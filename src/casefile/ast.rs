//! Abstract Syntax Tree types for case files.

use std::collections::HashMap;

/// Complete AST representation of a parsed case file.
#[derive(Debug, Clone, Default)]
pub struct CaseAst {
    /// Circuit options from `.set` lines (keys lowercased)
    pub options: HashMap<String, String>,
    /// Bus declarations in file order
    pub buses: Vec<BusRecord>,
    /// Element records in file order
    pub elements: Vec<ElementRecord>,
}

impl CaseAst {
    /// Create a new empty case AST.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A `.bus` declaration.
#[derive(Debug, Clone)]
pub struct BusRecord {
    /// Lowercased bus name
    pub name: String,
    /// Raw parameter values (keys lowercased)
    pub params: HashMap<String, String>,
    /// Source line number for error reporting
    pub line: usize,
}

/// An element record, `type.name key=value ...`.
#[derive(Debug, Clone)]
pub struct ElementRecord {
    /// Lowercased element identifier
    pub identifier: String,
    /// Raw property values (keys lowercased)
    pub properties: HashMap<String, String>,
    /// Source line number for error reporting
    pub line: usize,
}
