//! Case-file adapter for the property oracle.
//!
//! A case file is a line-oriented text dump of a solved circuit: the
//! elements with the properties the classifier queries, the declared buses
//! with their observed voltages, and a few circuit options. It lets the
//! topology pipeline run without a live simulation engine.
//!
//! # Grammar Overview
//!
//! ```text
//! casefile   = { line }
//! line       = comment | set | bus | element | empty
//! comment    = ('#' | '!') { any_char }
//! set        = ".set" { pair }
//! bus        = ".bus" name { pair }
//! element    = type "." name { pair }
//! pair       = key "=" value
//! value      = word | '"' text '"' | '[' text ']' | '(' text ')'
//! ```
//!
//! # Bus Parameters
//!
//! | Key | Meaning |
//! |-----|---------|
//! | kvbase | Nameplate voltage base (kV) |
//! | nodes | Node numbers, e.g. `[1, 2, 3]` |
//! | vmag | Voltage magnitude per node (V), same order as `nodes` |
//!
//! # Example
//!
//! ```text
//! .set name=demo voltagebases=[13.2, 0.48]
//! .bus a kvbase=13.2 nodes=[1,2,3] vmag=[13200, 13200, 13200]
//!
//! vsource.source bus1=a basekv=13.2
//! line.l1 bus1=a bus2=b length=1.5 units=km
//! line.sw1 bus1=b bus2=c switch=true
//! recloser.r1 monitoredobj=line.l1 switchedobj=line.l1
//! ```

mod ast;
mod lexer;
mod parser;

pub use ast::*;
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;

use std::collections::HashMap;

use crate::error::Result;
use crate::oracle::{numeric_values, BusVoltages, PropertyOracle};

/// Parse a case-file string into an AST.
pub fn parse(input: &str) -> Result<CaseAst> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse()
}

/// Parse a case file from disk.
pub fn parse_file(path: &std::path::Path) -> Result<CaseAst> {
    let content =
        std::fs::read_to_string(path).map_err(|e| crate::error::TopologyError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
    parse(&content)
}

/// A parsed case file, queryable as a [`PropertyOracle`].
#[derive(Debug, Clone)]
pub struct CaseFile {
    ast: CaseAst,
    element_index: HashMap<String, usize>,
    bus_index: HashMap<String, usize>,
}

impl CaseFile {
    /// Wrap a parsed AST.
    pub fn new(ast: CaseAst) -> Self {
        let element_index = ast
            .elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.identifier.clone(), i))
            .collect();
        let bus_index = ast
            .buses
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        Self {
            ast,
            element_index,
            bus_index,
        }
    }

    /// Parse case-file text.
    pub fn parse_str(input: &str) -> Result<Self> {
        parse(input).map(Self::new)
    }

    /// Read and parse a case file.
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        parse_file(path).map(Self::new)
    }

    /// The underlying AST.
    pub fn ast(&self) -> &CaseAst {
        &self.ast
    }
}

impl PropertyOracle for CaseFile {
    fn all_elements(&self) -> Result<Vec<String>> {
        Ok(self
            .ast
            .elements
            .iter()
            .map(|e| e.identifier.clone())
            .collect())
    }

    fn all_buses(&self) -> Result<Vec<String>> {
        Ok(self.ast.buses.iter().map(|b| b.name.clone()).collect())
    }

    fn property(&self, element: &str, property: &str) -> Option<String> {
        let idx = self.element_index.get(&element.to_lowercase())?;
        self.ast.elements[*idx]
            .properties
            .get(&property.to_lowercase())
            .cloned()
    }

    fn option(&self, name: &str) -> Option<String> {
        self.ast.options.get(&name.to_lowercase()).cloned()
    }

    fn bus_voltages(&self, bus: &str) -> Option<BusVoltages> {
        let record = &self.ast.buses[*self.bus_index.get(&bus.to_lowercase())?];
        let numbers = |key: &str| {
            record
                .params
                .get(key)
                .and_then(|raw| numeric_values(raw))
                .unwrap_or_default()
        };

        let kv_base = numbers("kvbase").first().copied().unwrap_or(0.0);
        let magnitudes = numbers("vmag");
        let mut nodes: Vec<u32> = numbers("nodes")
            .into_iter()
            .filter(|n| *n >= 0.0)
            .map(|n| n as u32)
            .collect();
        if nodes.is_empty() {
            nodes = (1..=magnitudes.len() as u32).collect();
        }

        Some(BusVoltages {
            kv_base,
            nodes,
            magnitudes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASE: &str = "\
.set name=demo voltagebases=[13.2, 0.48]
.bus A kvbase=13.2 nodes=[1, 2, 3] vmag=[13200, 13100, 13000]
.bus b kvbase=13.2
Line.L1 bus1=a bus2=b length=1.5 units=km
";

    #[test]
    fn test_case_file_oracle_queries() {
        let case = CaseFile::parse_str(CASE).unwrap();
        assert_eq!(case.all_elements().unwrap(), vec!["line.l1"]);
        assert_eq!(case.all_buses().unwrap(), vec!["a", "b"]);
        assert_eq!(case.property("line.l1", "Length"), Some("1.5".to_string()));
        assert_eq!(case.property("line.l1", "switch"), None);
        assert_eq!(case.property("line.missing", "length"), None);
        assert_eq!(case.option("voltagebases"), Some("[13.2, 0.48]".to_string()));
    }

    #[test]
    fn test_case_file_bus_voltages() {
        let case = CaseFile::parse_str(CASE).unwrap();
        let a = case.bus_voltages("a").unwrap();
        assert_eq!(a.kv_base, 13.2);
        assert_eq!(a.nodes, vec![1, 2, 3]);
        assert_eq!(a.magnitudes, vec![13200.0, 13100.0, 13000.0]);

        let b = case.bus_voltages("b").unwrap();
        assert!(b.magnitudes.is_empty());
        assert!(case.bus_voltages("zz").is_none());
    }
}
