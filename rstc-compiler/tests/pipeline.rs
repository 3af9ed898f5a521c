//! Integration tests for the full pass pipeline, sequential and parallel.

use rstc_compiler::{compile, CompilationContext, CompilerConfig, SequentialCompiler};
use rstc_parser::{BlockNode, BlockParser, DocumentNode};
use rstc_types::{DocPath, EntryChild};

fn parse(path: &str, source: &str) -> DocumentNode {
    BlockParser::new()
        .parse_document(DocPath::new(path), source)
        .expect("parse")
}

fn two_document_project() -> Vec<DocumentNode> {
    let index = parse(
        "index",
        "Welcome\n=======\n\n.. toctree::\n   :maxdepth: 2\n\n   page2\n",
    );
    let page2 = parse("page2", "Page Two\n========\n\nContent here.\n");
    vec![index, page2]
}

#[test]
fn test_end_to_end_toctree_scenario() {
    let mut ctx = CompilationContext::new(CompilerConfig::sequential());
    let docs = compile(two_document_project(), &mut ctx).expect("compile");

    // index's entry has exactly one child pointing at page2
    let index = ctx.project.entry(&DocPath::new("index")).expect("index entry");
    assert_eq!(index.children.len(), 1);
    assert_eq!(
        index.children[0],
        EntryChild::Document(DocPath::new("page2"))
    );

    // page2's entry has index as parent
    let page2 = ctx.project.entry(&DocPath::new("page2")).expect("page2 entry");
    assert_eq!(page2.parent, Some(DocPath::new("index")));

    // the toctree was replaced by a resolved menu
    let menus: Vec<_> = docs[0]
        .walk_blocks()
        .into_iter()
        .filter(|b| matches!(b, BlockNode::Menu(_)))
        .collect();
    assert_eq!(menus.len(), 1);
    let BlockNode::Menu(menu) = menus[0] else {
        unreachable!()
    };
    assert_eq!(menu.entries.len(), 1);
    assert_eq!(menu.entries[0].title, "Page Two");

    // documents are rebound to the canonical entries
    assert_eq!(
        docs[0].entry.as_ref().map(|e| e.children.len()),
        Some(1)
    );
}

fn cross_referencing_project(count: usize) -> Vec<DocumentNode> {
    let mut sources = Vec::new();
    let mut toctree = String::from("Index\n=====\n\n.. toctree::\n\n");
    for i in 1..count {
        toctree.push_str(&format!("   page{i}\n"));
    }
    sources.push(("index".to_string(), toctree));
    for i in 1..count {
        let next = (i % (count - 1)) + 1;
        let source = format!(
            "Page {i}\n=======\n\n.. _sec-{i}:\n\nSection {i}\n----------\n\nSee sec-{next}_ and the root doc index_.\n"
        );
        sources.push((format!("page{i}"), source));
    }
    sources
        .into_iter()
        .map(|(path, source)| parse(&path, &source))
        .collect()
}

#[test]
fn test_parallel_and_sequential_outputs_are_identical() {
    let docs = cross_referencing_project(13);

    let mut seq_ctx = CompilationContext::new(CompilerConfig::sequential());
    let seq_docs = SequentialCompiler::new()
        .compile(docs.clone(), &mut seq_ctx)
        .expect("sequential compile");

    let parallel_config = CompilerConfig {
        parallel_enabled: true,
        worker_count: Some(3),
        parallel_threshold: 2,
        ..CompilerConfig::default()
    };
    let mut par_ctx = CompilationContext::new(parallel_config);
    let par_docs = compile(docs, &mut par_ctx).expect("parallel compile");

    assert_eq!(seq_docs, par_docs);

    let seq_snapshot = seq_ctx.project.snapshot();
    let par_snapshot = par_ctx.project.snapshot();
    assert_eq!(seq_snapshot.entries, par_snapshot.entries);
    assert_eq!(seq_snapshot.child_edges, par_snapshot.child_edges);
    assert_eq!(seq_snapshot.link_targets, par_snapshot.link_targets);
    assert_eq!(seq_snapshot.citations, par_snapshot.citations);
}

#[test]
fn test_below_threshold_uses_sequential_and_matches() {
    let docs = two_document_project();

    let mut auto_ctx = CompilationContext::new(CompilerConfig::default());
    let auto_docs = compile(docs.clone(), &mut auto_ctx).expect("compile");

    let mut seq_ctx = CompilationContext::new(CompilerConfig::sequential());
    let seq_docs = SequentialCompiler::new()
        .compile(docs, &mut seq_ctx)
        .expect("sequential compile");

    assert_eq!(auto_docs, seq_docs);
}

#[test]
fn test_cross_document_reference_resolution() {
    let index = parse(
        "index",
        "Index\n=====\n\n.. toctree::\n\n   page2\n\nSee details_.\n",
    );
    let page2 = parse(
        "page2",
        "Page Two\n========\n\n.. _details:\n\nDetails\n-------\n\nThe details.\n",
    );
    let mut ctx = CompilationContext::new(CompilerConfig::sequential());
    let docs = compile(vec![index, page2], &mut ctx).expect("compile");

    // the reference in index resolved to page2's section anchor
    let resolved = docs[0].walk_blocks().into_iter().any(|b| match b {
        BlockNode::Paragraph { inline } => inline.iter().any(|n| {
            matches!(
                n,
                rstc_parser::InlineNode::HyperLink { url, .. } if url == "page2#details"
            )
        }),
        _ => false,
    });
    assert!(resolved, "expected details_ to resolve to page2#details");
    assert!(ctx
        .diagnostics
        .iter()
        .all(|d| d.code != "ref.unresolved"));
}

#[test]
fn test_unresolved_reference_warns_but_compiles() {
    let index = parse("index", "Index\n=====\n\nSee missing_.\n");
    let mut ctx = CompilationContext::new(CompilerConfig::sequential());
    let docs = compile(vec![index], &mut ctx).expect("compile");
    assert_eq!(docs.len(), 1);
    assert!(ctx.diagnostics.iter().any(|d| d.code == "ref.unresolved"));
}

#[test]
fn test_orphan_document_warns() {
    let docs = vec![
        parse("index", "Index\n=====\n"),
        parse("stray", "Stray\n=====\n"),
    ];
    let mut ctx = CompilationContext::new(CompilerConfig::sequential());
    compile(docs, &mut ctx).expect("compile");
    assert!(ctx
        .diagnostics
        .iter()
        .any(|d| d.code == "document.orphan" && d.path == Some(DocPath::new("stray"))));
}

fn outline(entry: &rstc_parser::MenuEntry) -> String {
    if entry.children.is_empty() {
        return entry.title.clone();
    }
    let children: Vec<String> = entry.children.iter().map(outline).collect();
    format!("{} > {}", entry.title, children.join(", "))
}

#[test]
fn test_navigation_outline() {
    let index = parse(
        "index",
        "Index\n=====\n\n.. toctree::\n\n   page2\n   page3\n",
    );
    let page2 = parse("page2", "Page Two\n========\n");
    let page3 = parse("page3", "Page Three\n==========\n");
    let mut ctx = CompilationContext::new(CompilerConfig::sequential());
    let docs = compile(vec![index, page2, page3], &mut ctx).expect("compile");

    let nav = docs[1].nav_menu.as_ref().expect("navigation menu");
    insta::assert_snapshot!(outline(&nav.entries[0]), @"Index > Page Two, Page Three");
}

#[test]
fn test_document_order_preserved_after_parallel_run() {
    let docs = cross_referencing_project(13);
    let order: Vec<String> = docs.iter().map(|d| d.path.to_string()).collect();

    let config = CompilerConfig {
        parallel_enabled: true,
        worker_count: Some(4),
        parallel_threshold: 2,
        ..CompilerConfig::default()
    };
    let mut ctx = CompilationContext::new(config);
    let compiled = compile(docs, &mut ctx).expect("compile");
    let result_order: Vec<String> = compiled.iter().map(|d| d.path.to_string()).collect();
    assert_eq!(order, result_order);
}
