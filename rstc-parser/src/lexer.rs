//! Inline lexer for reStructuredText spans.
//!
//! Tokenization runs in two stages: a longest-match scan over an ordered
//! pattern list (logos), then a classification pass that resolves the
//! ambiguous word-like matches into hyperlinks, emails, reference markers
//! or plain words. The classification order is load-bearing: an email
//! containing a scheme-like substring, or a word ending in underscore that
//! is not a reference, must not be misclassified.

use logos::Logos;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Raw tokens produced by the first scan. Word-like matches are still
/// ambiguous at this point and are resolved by [`classify_word`].
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum RawToken {
    #[regex(r"\\.")]
    Escape,

    #[token("``")]
    LiteralDelim,

    #[token("`")]
    Backtick,

    #[token("**")]
    DoubleAsterisk,

    #[token("*")]
    Asterisk,

    #[token("|")]
    Pipe,

    #[token("[")]
    BracketOpen,

    #[token("]")]
    BracketClose,

    #[token("<")]
    AngleOpen,

    #[token(">")]
    AngleClose,

    #[token("_`")]
    InternalRefStart,

    #[token("__")]
    AnonymousEnd,

    #[token("_")]
    Underscore,

    #[token(":")]
    Colon,

    #[token("#")]
    Hash,

    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    // Maximal word-like run: may turn out to be a hyperlink, an email, a
    // named/anonymous reference or a plain word. Colons, slashes and '@'
    // stay inside the run so URLs and addresses arrive as one token.
    #[regex(r"[A-Za-z0-9](?:[A-Za-z0-9._+:/@?&=%~#_-]*[A-Za-z0-9/=-])?_{0,2}")]
    WordLike,

    // Any other single character falls through to plain text
    #[regex(r".", priority = 1)]
    Other,
}

/// Classified token kinds: the closed set the inline rules dispatch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Word,
    Whitespace,
    Escape,
    LiteralDelim,
    Backtick,
    DoubleAsterisk,
    Asterisk,
    Pipe,
    BracketOpen,
    BracketClose,
    AngleOpen,
    AngleClose,
    InternalRefStart,
    AnonymousEnd,
    Underscore,
    Colon,
    Hash,
    Hyperlink,
    Email,
    NamedReference,
    AnonymousReference,
}

/// A classified token with its source text and byte offset. The offset is
/// what makes transactional rollback possible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            position,
        }
    }
}

static HYPERLINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:https?|ftp)://\S+$").expect("hyperlink pattern"));

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern")
});

static REF_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("reference pattern"));

/// Whether `name` is a valid reference/footnote/citation name
pub(crate) fn is_reference_name(name: &str) -> bool {
    REF_NAME_RE.is_match(name)
}

/// Resolve an ambiguous word-like match.
///
/// Evaluated in fixed priority order: scheme-qualified hyperlink, then
/// email, then anonymous reference (`word__`), then named reference
/// (`word_`), then plain word.
fn classify_word(text: &str) -> TokenKind {
    if HYPERLINK_RE.is_match(text) {
        return TokenKind::Hyperlink;
    }
    if EMAIL_RE.is_match(text) {
        return TokenKind::Email;
    }
    if let Some(body) = text.strip_suffix("__") {
        if REF_NAME_RE.is_match(body) {
            return TokenKind::AnonymousReference;
        }
    }
    if let Some(body) = text.strip_suffix('_') {
        if !body.ends_with('_') && REF_NAME_RE.is_match(body) {
            return TokenKind::NamedReference;
        }
    }
    TokenKind::Word
}

/// Tokenize an inline span into classified tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut lex = RawToken::lexer(text);
    let mut tokens = Vec::new();

    while let Some(result) = lex.next() {
        let position = lex.span().start;
        let value = lex.slice();
        let kind = match result {
            Ok(RawToken::Escape) => TokenKind::Escape,
            Ok(RawToken::LiteralDelim) => TokenKind::LiteralDelim,
            Ok(RawToken::Backtick) => TokenKind::Backtick,
            Ok(RawToken::DoubleAsterisk) => TokenKind::DoubleAsterisk,
            Ok(RawToken::Asterisk) => TokenKind::Asterisk,
            Ok(RawToken::Pipe) => TokenKind::Pipe,
            Ok(RawToken::BracketOpen) => TokenKind::BracketOpen,
            Ok(RawToken::BracketClose) => TokenKind::BracketClose,
            Ok(RawToken::AngleOpen) => TokenKind::AngleOpen,
            Ok(RawToken::AngleClose) => TokenKind::AngleClose,
            Ok(RawToken::InternalRefStart) => TokenKind::InternalRefStart,
            Ok(RawToken::AnonymousEnd) => TokenKind::AnonymousEnd,
            Ok(RawToken::Underscore) => TokenKind::Underscore,
            Ok(RawToken::Colon) => TokenKind::Colon,
            Ok(RawToken::Hash) => TokenKind::Hash,
            Ok(RawToken::Whitespace) => TokenKind::Whitespace,
            Ok(RawToken::WordLike) => classify_word(value),
            // Unmatched input degrades to a word token rather than failing
            Ok(RawToken::Other) | Err(()) => TokenKind::Word,
        };
        tokens.push(Token::new(kind, value, position));
    }

    tokens
}

/// Cursor over a token buffer with a two-token lookahead window.
///
/// Rules that match speculatively save [`TokenStream::position`] before
/// consuming and call [`TokenStream::reset`] on failure; resetting restores
/// the full lookahead window, so a failed match is a pure no-op on stream
/// state.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<Token>,
    cur: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, cur: 0 }
    }

    /// The token under the cursor
    pub fn current(&self) -> Option<&Token> {
        self.tokens.get(self.cur)
    }

    /// One token of lookahead past the cursor
    pub fn lookahead(&self) -> Option<&Token> {
        self.tokens.get(self.cur + 1)
    }

    /// Consume and return the current token
    pub fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cur).cloned();
        if token.is_some() {
            self.cur += 1;
        }
        token
    }

    /// Checkpoint for rollback
    pub fn position(&self) -> usize {
        self.cur
    }

    /// Restore a previously observed position, re-establishing the
    /// lookahead window
    pub fn reset(&mut self, position: usize) {
        self.cur = position.min(self.tokens.len());
    }

    pub fn is_eof(&self) -> bool {
        self.cur >= self.tokens.len()
    }
}
