//! Lexer (tokenizer) for case files.

use crate::error::{Result, TopologyError};

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The token's text (quotes and brackets of grouped values removed)
    pub text: String,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

/// Token types in a case file.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A bare word: element identifier, bus name, key or value
    Word,
    /// A quoted or bracketed value, may contain whitespace
    Group,
    /// A directive (starts with '.')
    Directive,
    /// Equals sign '='
    Equals,
    /// Newline
    Newline,
    /// End of file
    Eof,
}

/// Lexer for tokenizing case-file input.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Get the next token.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let column = self.column;
        let token = |kind: TokenKind, text: String| Token {
            kind,
            text,
            line,
            column,
        };

        let ch = match self.chars.peek().copied() {
            Some(ch) => ch,
            None => return Ok(token(TokenKind::Eof, String::new())),
        };

        match ch {
            '\n' => {
                self.advance();
                Ok(token(TokenKind::Newline, "\n".to_string()))
            }
            '=' => {
                self.advance();
                Ok(token(TokenKind::Equals, "=".to_string()))
            }
            '"' | '\'' => {
                self.advance();
                let text = self.read_until(ch, line, column)?;
                Ok(token(TokenKind::Group, text))
            }
            '[' | '(' => {
                // Brackets stay in the value; the oracle decodes lists itself
                let close = if ch == '[' { ']' } else { ')' };
                self.advance();
                let inner = self.read_until(close, line, column)?;
                Ok(token(TokenKind::Group, format!("{}{}{}", ch, inner, close)))
            }
            _ => {
                let text = self.read_word();
                let is_directive = text.len() > 1
                    && text.starts_with('.')
                    && text[1..].starts_with(|c: char| c.is_alphabetic());
                if is_directive {
                    Ok(token(TokenKind::Directive, text))
                } else {
                    Ok(token(TokenKind::Word, text))
                }
            }
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() && ch != '\n' {
                self.advance();
            } else if ch == '#' || ch == '!' {
                // Skip comment until end of line
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_word(&mut self) -> String {
        let mut text = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || matches!(ch, '=' | '"' | '\'' | '#' | '!' | '[' | '(') {
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }

    fn read_until(&mut self, close: char, line: usize, column: usize) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.chars.peek().copied() {
                Some(ch) if ch == close => {
                    self.advance();
                    return Ok(text);
                }
                Some('\n') | None => {
                    return Err(TopologyError::lexer(
                        line,
                        column,
                        format!("unterminated value, expected '{}'", close),
                    ));
                }
                Some(ch) => {
                    text.push(ch);
                    self.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(input);
        let mut kinds = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            let done = tok.kind == TokenKind::Eof;
            kinds.push(tok.kind);
            if done {
                return kinds;
            }
        }
    }

    #[test]
    fn test_lexer_element_line() {
        let input = "line.l1 bus1=a.1.2.3 length=1.5";
        let mut lexer = Lexer::new(input);

        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.kind, TokenKind::Word);
        assert_eq!(tok.text, "line.l1");

        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.text, "bus1");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Equals);

        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.text, "a.1.2.3");
        assert_eq!(tok.column, 14);
    }

    #[test]
    fn test_lexer_directive_and_groups() {
        let input = ".set voltagebases=[115, 13.2] name=\"feeder one\"";
        let mut lexer = Lexer::new(input);

        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.kind, TokenKind::Directive);
        assert_eq!(tok.text, ".set");

        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.kind, TokenKind::Group);
        assert_eq!(tok.text, "[115, 13.2]");

        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.text, "feeder one");
    }

    #[test]
    fn test_lexer_comments_and_lines() {
        let input = "# header\nload.a bus1=x ! trailing\n";
        assert_eq!(
            kinds(input),
            vec![
                TokenKind::Newline,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Equals,
                TokenKind::Word,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_leading_dot_number_is_word() {
        let mut lexer = Lexer::new(".5");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Word);
    }

    #[test]
    fn test_lexer_unterminated_group() {
        let mut lexer = Lexer::new("kvs=[1, 2\n");
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        assert!(lexer.next_token().is_err());
    }
}
