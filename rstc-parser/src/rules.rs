//! Inline markup rules.
//!
//! Each rule claims a token kind, speculatively consumes tokens and either
//! commits to a node or rolls the stream back to its pre-attempt position.
//! The rule set is a closed enum evaluated through a single
//! `applies`/`apply`/`priority` interface and stored in a priority-sorted
//! vector built once at parser construction.

use crate::inline::InlineContext;
use crate::lexer::{is_reference_name, Token, TokenKind, TokenStream};
use crate::nodes::{FootnoteKey, InlineNode, LinkKind};

/// The closed set of inline rules, highest priority first:
/// escapes and literals pre-empt everything inside their delimiters;
/// footnote/citation/role markers; phrase references (which may embed a
/// URL); emphasis/strong/variable delimiters; standalone hyperlinks and
/// emails (lower, because the same text might also be a reference); and
/// the plain-text catch-all at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineRule {
    Escape,
    Literal,
    Footnote,
    Citation,
    TextRole,
    InternalReference,
    PhraseReference,
    DefaultTextRole,
    Strong,
    Emphasis,
    Variable,
    StandaloneHyperlink,
    StandaloneEmail,
    NamedReference,
    AnonymousReference,
    Text,
}

impl InlineRule {
    /// The full rule set in registration order. Ties in priority are broken
    /// by this order.
    pub fn all() -> Vec<InlineRule> {
        vec![
            InlineRule::Escape,
            InlineRule::Literal,
            InlineRule::Footnote,
            InlineRule::Citation,
            InlineRule::TextRole,
            InlineRule::InternalReference,
            InlineRule::PhraseReference,
            InlineRule::DefaultTextRole,
            InlineRule::Strong,
            InlineRule::Emphasis,
            InlineRule::Variable,
            InlineRule::StandaloneHyperlink,
            InlineRule::StandaloneEmail,
            InlineRule::NamedReference,
            InlineRule::AnonymousReference,
            InlineRule::Text,
        ]
    }

    pub fn priority(self) -> i32 {
        match self {
            InlineRule::Escape => 1000,
            InlineRule::Literal => 950,
            InlineRule::Footnote => 800,
            InlineRule::Citation => 790,
            InlineRule::TextRole => 780,
            InlineRule::InternalReference => 760,
            InlineRule::PhraseReference => 700,
            InlineRule::DefaultTextRole => 650,
            InlineRule::Strong => 610,
            InlineRule::Emphasis => 600,
            InlineRule::Variable => 590,
            InlineRule::StandaloneHyperlink => 400,
            InlineRule::StandaloneEmail => 390,
            InlineRule::NamedReference => 380,
            InlineRule::AnonymousReference => 370,
            InlineRule::Text => 0,
        }
    }

    /// Whether the parser may claim this rule for a token kind after a
    /// successful match, skipping the full rule-set scan on later tokens of
    /// the same kind. Only rules that are the sole non-catch-all matcher
    /// for their kind and never roll back qualify; the catch-all text rule
    /// must not be cached or it would shadow speculative rules.
    pub fn cacheable(self) -> bool {
        matches!(
            self,
            InlineRule::Escape
                | InlineRule::StandaloneHyperlink
                | InlineRule::StandaloneEmail
                | InlineRule::NamedReference
                | InlineRule::AnonymousReference
        )
    }

    pub fn applies(self, token: &Token) -> bool {
        match self {
            InlineRule::Escape => token.kind == TokenKind::Escape,
            InlineRule::Literal => token.kind == TokenKind::LiteralDelim,
            InlineRule::Footnote | InlineRule::Citation => token.kind == TokenKind::BracketOpen,
            InlineRule::TextRole => token.kind == TokenKind::Colon,
            InlineRule::InternalReference => token.kind == TokenKind::InternalRefStart,
            InlineRule::PhraseReference | InlineRule::DefaultTextRole => {
                token.kind == TokenKind::Backtick
            }
            InlineRule::Strong => token.kind == TokenKind::DoubleAsterisk,
            InlineRule::Emphasis => token.kind == TokenKind::Asterisk,
            InlineRule::Variable => token.kind == TokenKind::Pipe,
            InlineRule::StandaloneHyperlink => token.kind == TokenKind::Hyperlink,
            InlineRule::StandaloneEmail => token.kind == TokenKind::Email,
            InlineRule::NamedReference => token.kind == TokenKind::NamedReference,
            InlineRule::AnonymousReference => token.kind == TokenKind::AnonymousReference,
            InlineRule::Text => true,
        }
    }

    /// Attempt the rule. Returns `None` only after restoring the stream to
    /// its pre-attempt position (transactional rollback).
    pub fn apply(self, ctx: &InlineContext, stream: &mut TokenStream) -> Option<InlineNode> {
        match self {
            InlineRule::Escape => escape(stream),
            InlineRule::Literal => literal(stream),
            InlineRule::Footnote => footnote(stream),
            InlineRule::Citation => citation(stream),
            InlineRule::TextRole => text_role(stream),
            InlineRule::InternalReference => internal_reference(stream),
            InlineRule::PhraseReference => phrase_reference(stream),
            InlineRule::DefaultTextRole => default_text_role(ctx, stream),
            InlineRule::Strong => delimited(stream, TokenKind::DoubleAsterisk, |value| {
                InlineNode::Strong { value }
            }),
            InlineRule::Emphasis => delimited(stream, TokenKind::Asterisk, |value| {
                InlineNode::Emphasis { value }
            }),
            InlineRule::Variable => variable(stream),
            InlineRule::StandaloneHyperlink => {
                let token = stream.advance()?;
                Some(InlineNode::HyperLink {
                    value: token.value.clone(),
                    url: token.value,
                    kind: LinkKind::External,
                })
            }
            InlineRule::StandaloneEmail => {
                let token = stream.advance()?;
                Some(InlineNode::HyperLink {
                    url: format!("mailto:{}", token.value),
                    value: token.value,
                    kind: LinkKind::Email,
                })
            }
            InlineRule::NamedReference => {
                let token = stream.advance()?;
                let target = token.value.trim_end_matches('_').to_string();
                Some(InlineNode::HyperLink {
                    value: target.clone(),
                    url: target,
                    kind: LinkKind::Named,
                })
            }
            InlineRule::AnonymousReference => {
                let token = stream.advance()?;
                let target = token.value.trim_end_matches('_').to_string();
                Some(InlineNode::HyperLink {
                    value: target.clone(),
                    url: target,
                    kind: LinkKind::Anonymous,
                })
            }
            InlineRule::Text => {
                let token = stream.advance()?;
                Some(InlineNode::PlainText { value: token.value })
            }
        }
    }
}

/// Accumulate token text until a terminator kind, consuming it. Returns
/// `None` if the stream is exhausted first; the caller rolls back.
fn consume_until(stream: &mut TokenStream, terminator: TokenKind) -> Option<String> {
    let mut text = String::new();
    loop {
        let token = stream.current()?.clone();
        stream.advance();
        if token.kind == terminator {
            return Some(text);
        }
        text.push_str(&token.value);
    }
}

fn escape(stream: &mut TokenStream) -> Option<InlineNode> {
    let token = stream.advance()?;
    // the character after the backslash, taken literally
    Some(InlineNode::PlainText {
        value: token.value[1..].to_string(),
    })
}

fn literal(stream: &mut TokenStream) -> Option<InlineNode> {
    let start = stream.position();
    stream.advance();
    match consume_until(stream, TokenKind::LiteralDelim) {
        Some(value) if !value.is_empty() => Some(InlineNode::Literal { value }),
        _ => {
            stream.reset(start);
            None
        }
    }
}

fn footnote(stream: &mut TokenStream) -> Option<InlineNode> {
    let start = stream.position();
    stream.advance();
    let inner = match consume_until(stream, TokenKind::BracketClose) {
        Some(inner) => inner,
        None => {
            stream.reset(start);
            return None;
        }
    };
    if stream.current().map(|t| t.kind) != Some(TokenKind::Underscore) {
        stream.reset(start);
        return None;
    }

    // classification order: anonymous, then name pattern, then integer
    let key = if inner == "#" {
        FootnoteKey::Anonymous
    } else if let Some(name) = inner.strip_prefix('#') {
        if !is_reference_name(name) {
            stream.reset(start);
            return None;
        }
        FootnoteKey::Named(name.to_string())
    } else {
        match inner.parse::<u32>() {
            Ok(number) if number > 0 => FootnoteKey::Numbered(number),
            _ => {
                stream.reset(start);
                return None;
            }
        }
    };

    stream.advance();
    Some(InlineNode::Footnote { key })
}

fn citation(stream: &mut TokenStream) -> Option<InlineNode> {
    let start = stream.position();
    stream.advance();
    let inner = match consume_until(stream, TokenKind::BracketClose) {
        Some(inner) => inner,
        None => {
            stream.reset(start);
            return None;
        }
    };
    let is_citation_name =
        is_reference_name(&inner) && inner.parse::<u32>().is_err() && !inner.starts_with('#');
    if !is_citation_name || stream.current().map(|t| t.kind) != Some(TokenKind::Underscore) {
        stream.reset(start);
        return None;
    }
    stream.advance();
    Some(InlineNode::Citation { name: inner })
}

fn text_role(stream: &mut TokenStream) -> Option<InlineNode> {
    let start = stream.position();
    stream.advance();
    let role = match stream.current() {
        Some(t) if t.kind == TokenKind::Word => t.value.clone(),
        _ => {
            stream.reset(start);
            return None;
        }
    };
    stream.advance();
    if stream.current().map(|t| t.kind) != Some(TokenKind::Colon) {
        stream.reset(start);
        return None;
    }
    stream.advance();
    if stream.current().map(|t| t.kind) != Some(TokenKind::Backtick) {
        stream.reset(start);
        return None;
    }
    stream.advance();
    match consume_until(stream, TokenKind::Backtick) {
        Some(content) => Some(InlineNode::TextRole { role, content }),
        None => {
            stream.reset(start);
            None
        }
    }
}

fn internal_reference(stream: &mut TokenStream) -> Option<InlineNode> {
    let start = stream.position();
    stream.advance();
    match consume_until(stream, TokenKind::Backtick) {
        Some(name) if !name.trim().is_empty() => Some(InlineNode::InternalTarget {
            name: name.trim().to_string(),
        }),
        _ => {
            stream.reset(start);
            None
        }
    }
}

fn phrase_reference(stream: &mut TokenStream) -> Option<InlineNode> {
    let start = stream.position();
    stream.advance();

    let mut text = String::new();
    let mut url: Option<String> = None;
    loop {
        let token = match stream.current() {
            Some(t) => t.clone(),
            None => {
                stream.reset(start);
                return None;
            }
        };
        match token.kind {
            TokenKind::Backtick => {
                stream.advance();
                break;
            }
            TokenKind::AngleOpen => {
                let angle_start = stream.position();
                stream.advance();
                match embedded_url(stream) {
                    Some(target) => url = Some(target),
                    None => {
                        // unterminated embedded URL: the whole attempt rolls
                        // back and '<' re-emits as literal text
                        stream.reset(angle_start);
                        stream.advance();
                        text.push('<');
                    }
                }
            }
            _ => {
                text.push_str(&token.value);
                stream.advance();
            }
        }
    }

    let kind = match stream.current().map(|t| t.kind) {
        Some(TokenKind::Underscore) => LinkKind::Named,
        Some(TokenKind::AnonymousEnd) => LinkKind::Anonymous,
        _ => {
            stream.reset(start);
            return None;
        }
    };
    stream.advance();

    let value = text.trim().to_string();
    if value.is_empty() && url.is_none() {
        stream.reset(start);
        return None;
    }
    let (value, url) = match url {
        Some(target) => {
            let value = if value.is_empty() {
                target.clone()
            } else {
                value
            };
            (value, target)
        }
        None => (value.clone(), value),
    };
    Some(InlineNode::HyperLink { value, url, kind })
}

/// Collect an embedded URL up to the closing `>`. Fails without consuming
/// judgment if the phrase's closing backtick or the end of input arrives
/// first; the caller resets to the `<`.
fn embedded_url(stream: &mut TokenStream) -> Option<String> {
    let mut url = String::new();
    loop {
        let token = stream.current()?.clone();
        match token.kind {
            TokenKind::AngleClose => {
                stream.advance();
                if url.is_empty() {
                    return None;
                }
                return Some(url);
            }
            TokenKind::Backtick => return None,
            _ => {
                url.push_str(&token.value);
                stream.advance();
            }
        }
    }
}

fn default_text_role(ctx: &InlineContext, stream: &mut TokenStream) -> Option<InlineNode> {
    let start = stream.position();
    stream.advance();
    match consume_until(stream, TokenKind::Backtick) {
        Some(content) if !content.is_empty() => Some(InlineNode::TextRole {
            role: ctx.default_role.clone(),
            content,
        }),
        _ => {
            stream.reset(start);
            None
        }
    }
}

fn delimited(
    stream: &mut TokenStream,
    terminator: TokenKind,
    build: impl FnOnce(String) -> InlineNode,
) -> Option<InlineNode> {
    let start = stream.position();
    stream.advance();
    match consume_until(stream, terminator) {
        // emphasis/strong content may not begin or end with whitespace
        Some(value) if !value.is_empty() && value.trim() == value => Some(build(value)),
        _ => {
            stream.reset(start);
            None
        }
    }
}

fn variable(stream: &mut TokenStream) -> Option<InlineNode> {
    let start = stream.position();
    stream.advance();
    match consume_until(stream, TokenKind::Pipe) {
        Some(name) if !name.trim().is_empty() && !name.contains(char::is_whitespace) => {
            Some(InlineNode::Variable { name })
        }
        _ => {
            stream.reset(start);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn stream(text: &str) -> TokenStream {
        TokenStream::new(tokenize(text))
    }

    #[test]
    fn test_rule_order_is_descending_priority() {
        let rules = InlineRule::all();
        for pair in rules.windows(2) {
            assert!(pair[0].priority() >= pair[1].priority());
        }
    }

    #[test]
    fn test_rollback_restores_position() {
        // unterminated literal: apply must be a pure no-op on stream state
        let mut s = stream("``end is missing");
        let before = s.position();
        assert!(InlineRule::Literal.apply(&InlineContext::default(), &mut s).is_none());
        assert_eq!(s.position(), before);
    }

    #[test]
    fn test_literal() {
        let mut s = stream("``x + y``");
        let node = InlineRule::Literal
            .apply(&InlineContext::default(), &mut s)
            .expect("literal should match");
        assert_eq!(
            node,
            InlineNode::Literal {
                value: "x + y".to_string()
            }
        );
        assert!(s.is_eof());
    }

    #[test]
    fn test_footnote_keys() {
        let ctx = InlineContext::default();
        let mut s = stream("[#]_");
        assert_eq!(
            InlineRule::Footnote.apply(&ctx, &mut s),
            Some(InlineNode::Footnote {
                key: FootnoteKey::Anonymous
            })
        );

        let mut s = stream("[#note]_");
        assert_eq!(
            InlineRule::Footnote.apply(&ctx, &mut s),
            Some(InlineNode::Footnote {
                key: FootnoteKey::Named("note".to_string())
            })
        );

        let mut s = stream("[3]_");
        assert_eq!(
            InlineRule::Footnote.apply(&ctx, &mut s),
            Some(InlineNode::Footnote {
                key: FootnoteKey::Numbered(3)
            })
        );
    }

    #[test]
    fn test_citation_rejects_numeric_key() {
        let ctx = InlineContext::default();
        let mut s = stream("[3]_");
        assert!(InlineRule::Citation.apply(&ctx, &mut s).is_none());
        let mut s = stream("[watzlawick]_");
        assert_eq!(
            InlineRule::Citation.apply(&ctx, &mut s),
            Some(InlineNode::Citation {
                name: "watzlawick".to_string()
            })
        );
    }

    #[test]
    fn test_phrase_reference_with_embedded_url() {
        let ctx = InlineContext::default();
        let mut s = stream("`myref<https://test.com>`_");
        assert_eq!(
            InlineRule::PhraseReference.apply(&ctx, &mut s),
            Some(InlineNode::HyperLink {
                value: "myref".to_string(),
                url: "https://test.com".to_string(),
                kind: LinkKind::Named,
            })
        );
    }

    #[test]
    fn test_phrase_reference_unterminated_embedded_url() {
        // missing '>': the embedded-URL attempt rolls back, '<' becomes text
        let ctx = InlineContext::default();
        let mut s = stream("`see <https://test.com`_");
        let node = InlineRule::PhraseReference.apply(&ctx, &mut s);
        match node {
            Some(InlineNode::HyperLink { value, .. }) => {
                assert_eq!(value, "see <https://test.com");
            }
            other => panic!("expected hyperlink, got {other:?}"),
        }
    }

    #[test]
    fn test_phrase_reference_requires_marker() {
        let ctx = InlineContext::default();
        let mut s = stream("`simple`");
        let before = s.position();
        assert!(InlineRule::PhraseReference.apply(&ctx, &mut s).is_none());
        assert_eq!(s.position(), before);
    }

    #[test]
    fn test_text_role() {
        let ctx = InlineContext::default();
        let mut s = stream(":math:`a + b`");
        assert_eq!(
            InlineRule::TextRole.apply(&ctx, &mut s),
            Some(InlineNode::TextRole {
                role: "math".to_string(),
                content: "a + b".to_string()
            })
        );
    }

    #[test]
    fn test_internal_reference() {
        let ctx = InlineContext::default();
        let mut s = stream("_`target name`");
        assert_eq!(
            InlineRule::InternalReference.apply(&ctx, &mut s),
            Some(InlineNode::InternalTarget {
                name: "target name".to_string()
            })
        );
    }

    #[test]
    fn test_variable_rejects_spaces() {
        let ctx = InlineContext::default();
        let mut s = stream("|not a var|");
        assert!(InlineRule::Variable.apply(&ctx, &mut s).is_none());
        let mut s = stream("|version|");
        assert_eq!(
            InlineRule::Variable.apply(&ctx, &mut s),
            Some(InlineNode::Variable {
                name: "version".to_string()
            })
        );
    }
}
