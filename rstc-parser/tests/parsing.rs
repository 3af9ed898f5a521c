//! Integration tests for the parsing engine: lexer, inline rules and the
//! block substrate working together on realistic input.

use rstc_parser::{
    BlockNode, BlockParser, InlineContext, InlineNode, InlineParser, LinkKind, TokenKind,
};
use rstc_types::DocPath;

fn parse_span(span: &str) -> Vec<InlineNode> {
    InlineParser::new()
        .parse(span, &InlineContext::default())
        .expect("span should parse")
}

#[test]
fn test_mixed_span() {
    let nodes = parse_span("Read *this* and ``that``, then see docs_.");
    assert_eq!(
        nodes,
        vec![
            InlineNode::text("Read "),
            InlineNode::Emphasis {
                value: "this".to_string()
            },
            InlineNode::text(" and "),
            InlineNode::Literal {
                value: "that".to_string()
            },
            InlineNode::text(", then see "),
            InlineNode::HyperLink {
                value: "docs".to_string(),
                url: "docs".to_string(),
                kind: LinkKind::Named,
            },
            InlineNode::text("."),
        ]
    );
}

#[test]
fn test_unterminated_constructs_degrade_without_loss() {
    for input in ["``end is missing", "*oops", "|unclosed", "`no marker"] {
        let nodes = parse_span(input);
        let rendered: String = nodes
            .iter()
            .map(|n| match n {
                InlineNode::PlainText { value } => value.clone(),
                other => panic!("expected plain text for {input:?}, got {other:?}"),
            })
            .collect();
        assert_eq!(rendered, input);
    }
}

#[test]
fn test_reference_classification_matrix() {
    assert_eq!(
        parse_span("myref_"),
        vec![InlineNode::HyperLink {
            value: "myref".to_string(),
            url: "myref".to_string(),
            kind: LinkKind::Named,
        }]
    );
    assert_eq!(
        parse_span("myref__"),
        vec![InlineNode::HyperLink {
            value: "myref".to_string(),
            url: "myref".to_string(),
            kind: LinkKind::Anonymous,
        }]
    );
    assert_eq!(
        parse_span("`myref<https://test.com>`_"),
        vec![InlineNode::HyperLink {
            value: "myref".to_string(),
            url: "https://test.com".to_string(),
            kind: LinkKind::Named,
        }]
    );
}

#[test]
fn test_lexer_priority_order_is_load_bearing() {
    // an email whose local part looks like a scheme stays an email
    let tokens = rstc_parser::tokenize("ftp.admin@example.org");
    assert_eq!(tokens[0].kind, TokenKind::Email);

    // a word ending in underscore that is no valid reference stays a word
    let tokens = rstc_parser::tokenize("foo.bar_");
    assert_eq!(tokens[0].kind, TokenKind::Word);
}

#[test]
fn test_full_document() {
    let source = "\
Welcome
=======

.. _intro:

Introduction
------------

This paragraph references `the docs <https://docs.example.org>`_ and
a local target docs_.

.. _docs: https://example.org/docs

.. toctree::
   :maxdepth: 1

   page2

Details
-------

Numbers like [1]_ and citations like [knuth]_ work::

    literal content here

.. [1] The first footnote.
.. [knuth] The Art of Computer Programming.
";
    let doc = BlockParser::new()
        .parse_document(DocPath::new("index"), source)
        .expect("document should parse");

    assert_eq!(doc.title(), Some("Welcome".to_string()));
    assert_eq!(
        doc.link_targets.get("docs"),
        Some(&"https://example.org/docs".to_string())
    );

    let blocks = doc.walk_blocks();
    assert!(blocks
        .iter()
        .any(|b| matches!(b, BlockNode::Toctree(t) if t.max_depth == Some(1))));
    assert!(blocks
        .iter()
        .any(|b| matches!(b, BlockNode::Anchor { name } if name == "intro")));
    assert!(blocks
        .iter()
        .any(|b| matches!(b, BlockNode::LiteralBlock { value } if value == "literal content here")));
    assert!(blocks
        .iter()
        .any(|b| matches!(b, BlockNode::Citation { name, .. } if name == "knuth")));
}

#[test]
fn test_document_round_trips_through_serde() {
    let source = "Title\n=====\n\nBody with *markup* and a link_.\n";
    let doc = BlockParser::new()
        .parse_document(DocPath::new("index"), source)
        .expect("document should parse");
    let json = serde_json::to_string(&doc).expect("serialize");
    let back: rstc_parser::DocumentNode = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(doc, back);
}
