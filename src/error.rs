//! Error types for feeder topology analysis.
//!
//! This module provides a unified error type [`TopologyError`] that covers
//! case-file parsing, element classification and oracle failures. Only
//! [`TopologyError::Oracle`] and the case-file variants are fatal to a run;
//! the classification variants are logged and attached to the element they
//! concern.

use thiserror::Error;

/// Result type alias using [`TopologyError`].
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Unified error type for all topology operations.
#[derive(Error, Debug)]
pub enum TopologyError {
    // ============ Case File Errors ============
    /// Error during lexical analysis
    #[error("Lexer error at line {line}, column {column}: {message}")]
    LexerError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Malformed case-file statement
    #[error("Syntax error at line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    /// Error reading a case file
    #[error("Failed to read case file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ============ Classification Errors ============
    /// Element identifier is not `type.name`
    #[error("Malformed element identifier '{identifier}': expected exactly two dot-separated parts")]
    FormatError { identifier: String },

    /// Numeric property could not be decoded
    #[error("Cannot parse property '{property}' of '{element}' (value: {value:?})")]
    ParseError {
        element: String,
        property: String,
        value: String,
    },

    /// A terminal references a bus that was never declared
    #[error("Element '{element}' references undeclared bus '{bus}'")]
    InconsistentTopology { element: String, bus: String },

    /// A protection device acts on an element that cannot be traversed
    #[error("Protection device '{device}' acts on unresolved object '{object}'")]
    UnresolvedDevice { device: String, object: String },

    /// Line length unit is not in the conversion table
    #[error("Line '{line}' has unsupported length unit '{unit}'")]
    UnsupportedUnit { line: String, unit: String },

    // ============ Oracle Errors ============
    /// The property oracle could not enumerate elements or buses
    #[error("Property oracle failure: {message}")]
    Oracle { message: String },

    // ============ Output Errors ============
    /// Report could not be serialized
    #[error("Failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TopologyError {
    /// Create a lexer error
    pub fn lexer(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::LexerError {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a case-file syntax error
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::SyntaxError {
            line,
            message: message.into(),
        }
    }

    /// Create a property parse error
    pub fn parse(
        element: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::ParseError {
            element: element.into(),
            property: property.into(),
            value: value.into(),
        }
    }

    /// Create an oracle failure
    pub fn oracle(message: impl Into<String>) -> Self {
        Self::Oracle {
            message: message.into(),
        }
    }
}
