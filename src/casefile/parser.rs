//! Parser for case files.

use std::collections::{HashMap, HashSet};

use super::ast::*;
use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{Result, TopologyError};

/// Parser for case files.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser with the given lexer.
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parse the entire case file.
    pub fn parse(&mut self) -> Result<CaseAst> {
        let mut ast = CaseAst::new();
        let mut seen_elements = HashSet::new();
        let mut seen_buses = HashSet::new();

        while self.current.kind != TokenKind::Eof {
            match self.current.kind {
                TokenKind::Newline => {
                    self.advance()?;
                    continue;
                }
                TokenKind::Directive => self.parse_directive(&mut ast, &mut seen_buses)?,
                TokenKind::Word => {
                    let element = self.parse_element()?;
                    if !seen_elements.insert(element.identifier.clone()) {
                        return Err(TopologyError::syntax(
                            element.line,
                            format!("duplicate element '{}'", element.identifier),
                        ));
                    }
                    ast.elements.push(element);
                }
                _ => {
                    return Err(TopologyError::syntax(
                        self.current.line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }

            // Statement must end the line
            match self.current.kind {
                TokenKind::Newline => self.advance()?,
                TokenKind::Eof => {}
                _ => {
                    return Err(TopologyError::syntax(
                        self.current.line,
                        format!("unexpected token: {:?}", self.current.text),
                    ));
                }
            }
        }

        Ok(ast)
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token> {
        if self.current.kind == kind {
            let tok = self.current.clone();
            self.advance()?;
            Ok(tok)
        } else {
            Err(TopologyError::syntax(
                self.current.line,
                format!("expected {:?}, got {:?}", kind, self.current.kind),
            ))
        }
    }

    fn parse_directive(&mut self, ast: &mut CaseAst, seen_buses: &mut HashSet<String>) -> Result<()> {
        let directive = self.current.text.to_lowercase();
        let line = self.current.line;
        self.advance()?;

        match directive.as_str() {
            ".set" => {
                let options = self.parse_pairs()?;
                ast.options.extend(options);
            }
            ".bus" => {
                let name = self.expect(TokenKind::Word)?.text.to_lowercase();
                if !seen_buses.insert(name.clone()) {
                    return Err(TopologyError::syntax(line, format!("duplicate bus '{}'", name)));
                }
                let params = self.parse_pairs()?;
                ast.buses.push(BusRecord { name, params, line });
            }
            _ => {
                return Err(TopologyError::syntax(
                    line,
                    format!("unknown directive: {}", directive),
                ));
            }
        }

        Ok(())
    }

    fn parse_element(&mut self) -> Result<ElementRecord> {
        let head = self.expect(TokenKind::Word)?;
        let properties = self.parse_pairs()?;
        Ok(ElementRecord {
            identifier: head.text.to_lowercase(),
            properties,
            line: head.line,
        })
    }

    /// Parse `key=value` pairs until the end of the line.
    fn parse_pairs(&mut self) -> Result<HashMap<String, String>> {
        let mut pairs = HashMap::new();

        while self.current.kind != TokenKind::Newline && self.current.kind != TokenKind::Eof {
            let key = self.expect(TokenKind::Word)?;
            self.expect(TokenKind::Equals)?;
            let value = match self.current.kind {
                TokenKind::Word | TokenKind::Group => {
                    let text = self.current.text.clone();
                    self.advance()?;
                    text
                }
                _ => {
                    return Err(TopologyError::syntax(
                        key.line,
                        format!("missing value for '{}'", key.text),
                    ));
                }
            };
            pairs.insert(key.text.to_lowercase(), value);
        }

        Ok(pairs)
    }
}
