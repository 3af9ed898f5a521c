//! The inline parser: drives the lexer and rule set over a span.
//!
//! Dispatch per token: first consult the per-token-kind rule cache (a pure
//! optimization), then scan the full rule list in descending priority
//! order. A rule returning `None` has already rolled the stream back, so
//! the scan simply continues with the next rule. Adjacent plain-text nodes
//! are merged before returning.

use crate::error::{ParseError, Result};
use crate::lexer::{tokenize, Token, TokenKind, TokenStream};
use crate::nodes::{merge_plain_text, InlineNode};
use crate::rules::InlineRule;
use rstc_types::DocPath;
use std::collections::HashMap;

/// Per-span parsing context handed to every rule
#[derive(Debug, Clone)]
pub struct InlineContext {
    /// Document being parsed, for diagnostics
    pub path: Option<DocPath>,
    /// Role applied to bare interpreted text (`` `like this` ``)
    pub default_role: String,
}

impl Default for InlineContext {
    fn default() -> Self {
        Self {
            path: None,
            default_role: "title-reference".to_string(),
        }
    }
}

/// Parser over inline spans.
///
/// The rule set is immutable configuration, sorted once by descending
/// priority with registration order breaking ties. The cache maps a token
/// kind to the index of a cacheable rule that already matched for it.
pub struct InlineParser {
    rules: Vec<InlineRule>,
    cache: HashMap<TokenKind, usize>,
}

impl InlineParser {
    pub fn new() -> Self {
        Self::with_rules(InlineRule::all())
    }

    pub fn with_rules(mut rules: Vec<InlineRule>) -> Self {
        // stable sort: equal priorities keep registration order
        rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority()));
        Self {
            rules,
            cache: HashMap::new(),
        }
    }

    /// Parse one span into a flat node list
    pub fn parse(&mut self, span: &str, ctx: &InlineContext) -> Result<Vec<InlineNode>> {
        let mut stream = TokenStream::new(tokenize(span));
        let mut nodes = Vec::new();
        while let Some(token) = stream.current().cloned() {
            nodes.push(self.dispatch(&token, ctx, &mut stream)?);
        }
        Ok(merge_plain_text(nodes))
    }

    /// Parse one span into a single compound node
    pub fn parse_compound(&mut self, span: &str, ctx: &InlineContext) -> Result<InlineNode> {
        Ok(InlineNode::Compound {
            children: self.parse(span, ctx)?,
        })
    }

    fn dispatch(
        &mut self,
        token: &Token,
        ctx: &InlineContext,
        stream: &mut TokenStream,
    ) -> Result<InlineNode> {
        if let Some(&cached) = self.cache.get(&token.kind) {
            let rule = self.rules[cached];
            if rule.applies(token) {
                if let Some(node) = rule.apply(ctx, stream) {
                    return Ok(node);
                }
            }
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if !rule.applies(token) {
                continue;
            }
            if let Some(node) = rule.apply(ctx, stream) {
                if rule.cacheable() {
                    self.cache.insert(token.kind, index);
                }
                return Ok(node);
            }
        }

        // unreachable while the catch-all text rule is registered
        Err(ParseError::NoRuleMatched {
            kind: token.kind,
            offset: token.position,
        })
    }
}

impl Default for InlineParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{FootnoteKey, LinkKind};

    fn parse(span: &str) -> Vec<InlineNode> {
        InlineParser::new()
            .parse(span, &InlineContext::default())
            .expect("parse should not fail")
    }

    #[test]
    fn test_plain_text_merges_to_one_node() {
        assert_eq!(parse("Lorem Ipsum"), vec![InlineNode::text("Lorem Ipsum")]);
    }

    #[test]
    fn test_unterminated_literal_round_trips() {
        let input = "``end is missing";
        assert_eq!(parse(input), vec![InlineNode::text(input)]);
    }

    #[test]
    fn test_named_reference_classification() {
        assert_eq!(
            parse("myref_"),
            vec![InlineNode::HyperLink {
                value: "myref".to_string(),
                url: "myref".to_string(),
                kind: LinkKind::Named,
            }]
        );
    }

    #[test]
    fn test_anonymous_reference_classification() {
        assert_eq!(
            parse("myref__"),
            vec![InlineNode::HyperLink {
                value: "myref".to_string(),
                url: "myref".to_string(),
                kind: LinkKind::Anonymous,
            }]
        );
    }

    #[test]
    fn test_phrase_reference_with_url() {
        assert_eq!(
            parse("`myref<https://test.com>`_"),
            vec![InlineNode::HyperLink {
                value: "myref".to_string(),
                url: "https://test.com".to_string(),
                kind: LinkKind::Named,
            }]
        );
    }

    #[test]
    fn test_bare_backticks_fall_through_to_default_role() {
        // the phrase rule rolls back (no trailing marker), the default
        // text-role rule claims the same tokens
        assert_eq!(
            parse("`simple`"),
            vec![InlineNode::TextRole {
                role: "title-reference".to_string(),
                content: "simple".to_string(),
            }]
        );
    }

    #[test]
    fn test_emphasis_and_strong() {
        assert_eq!(
            parse("*em* and **bold**"),
            vec![
                InlineNode::Emphasis {
                    value: "em".to_string()
                },
                InlineNode::text(" and "),
                InlineNode::Strong {
                    value: "bold".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_unterminated_emphasis_degrades() {
        assert_eq!(parse("*oops"), vec![InlineNode::text("*oops")]);
    }

    #[test]
    fn test_escape_pre_empts_emphasis() {
        assert_eq!(parse(r"\*not em\*"), vec![InlineNode::text("*not em*")]);
    }

    #[test]
    fn test_standalone_hyperlink() {
        assert_eq!(
            parse("https://test.com"),
            vec![InlineNode::HyperLink {
                value: "https://test.com".to_string(),
                url: "https://test.com".to_string(),
                kind: LinkKind::External,
            }]
        );
    }

    #[test]
    fn test_email_becomes_mailto() {
        assert_eq!(
            parse("user@example.org"),
            vec![InlineNode::HyperLink {
                value: "user@example.org".to_string(),
                url: "mailto:user@example.org".to_string(),
                kind: LinkKind::Email,
            }]
        );
    }

    #[test]
    fn test_footnote_and_citation_in_text() {
        assert_eq!(
            parse("see [#]_ and [source]_"),
            vec![
                InlineNode::text("see "),
                InlineNode::Footnote {
                    key: FootnoteKey::Anonymous
                },
                InlineNode::text(" and "),
                InlineNode::Citation {
                    name: "source".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_cache_does_not_change_results() {
        let ctx = InlineContext::default();
        let mut cached = InlineParser::new();
        // warm the cache with a span containing cacheable token kinds
        cached
            .parse("first myref_ and https://a.com", &ctx)
            .expect("warm-up parse");
        let warm = cached
            .parse("again otherref_ and https://b.com", &ctx)
            .expect("cached parse");
        let cold = InlineParser::new()
            .parse("again otherref_ and https://b.com", &ctx)
            .expect("cold parse");
        assert_eq!(warm, cold);
    }

    #[test]
    fn test_literal_protects_markup() {
        assert_eq!(
            parse("``*raw*``"),
            vec![InlineNode::Literal {
                value: "*raw*".to_string()
            }]
        );
    }
}
