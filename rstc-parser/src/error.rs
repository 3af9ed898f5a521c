use crate::lexer::TokenKind;
use std::fmt;

/// Errors that can occur during parsing.
///
/// Almost nothing in the parser is fatal: speculative rule matches roll
/// back, unterminated constructs degrade to plain text. The variants here
/// are internal-consistency violations that abort the current document.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// No inline rule matched a token. Unreachable while the catch-all
    /// text rule is registered; reaching it means the rule set is broken.
    #[error("no inline rule matched token {kind:?} at offset {offset}")]
    NoRuleMatched { kind: TokenKind, offset: usize },

    /// A block construct referenced content that was never opened.
    #[error("at line {line}: {message}")]
    InvalidStructure { line: usize, message: String },
}

impl ParseError {
    fn offset(&self) -> Option<usize> {
        match self {
            ParseError::NoRuleMatched { offset, .. } => Some(*offset),
            ParseError::InvalidStructure { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Display context for better error messages
pub struct ErrorContext<'a> {
    pub source: &'a str,
    pub error: &'a ParseError,
}

impl<'a> ErrorContext<'a> {
    pub fn new(source: &'a str, error: &'a ParseError) -> Self {
        Self { source, error }
    }

    /// Get the source line containing the error
    pub fn source_line(&self) -> Option<&'a str> {
        let start = self.error.offset()?.min(self.source.len());

        let line_start = self.source[..start]
            .rfind('\n')
            .map(|pos| pos + 1)
            .unwrap_or(0);
        let line_end = self.source[start..]
            .find('\n')
            .map(|pos| start + pos)
            .unwrap_or(self.source.len());

        Some(&self.source[line_start..line_end])
    }

    /// Get line and column numbers (1-indexed)
    pub fn line_col(&self) -> Option<(usize, usize)> {
        let start = self.error.offset()?.min(self.source.len());

        let line = self.source[..start].matches('\n').count() + 1;
        let line_start = self.source[..start]
            .rfind('\n')
            .map(|pos| pos + 1)
            .unwrap_or(0);
        Some((line, start - line_start + 1))
    }
}

impl<'a> fmt::Display for ErrorContext<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line_col() {
            Some((line, col)) => {
                writeln!(f, "Error at line {}, column {}:", line, col)?;
            }
            None => writeln!(f, "Error:")?,
        }
        writeln!(f, "  {}", self.error)?;
        if let Some(source_line) = self.source_line() {
            writeln!(f)?;
            writeln!(f, "  {}", source_line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context_line_col() {
        let source = "first line\nsecond line";
        let error = ParseError::NoRuleMatched {
            kind: TokenKind::Word,
            offset: 11,
        };
        let ctx = ErrorContext::new(source, &error);
        assert_eq!(ctx.line_col(), Some((2, 1)));
        assert_eq!(ctx.source_line(), Some("second line"));
    }
}
