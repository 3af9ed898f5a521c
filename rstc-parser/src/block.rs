//! Block-level parser: sections, paragraphs, explicit markup, directives.
//!
//! Line-oriented with lookahead and pushback; inline spans inside blocks
//! are handed to the backtracking inline parser.

use crate::document::{BlockNode, DocumentNode, SectionNode, TocTreeEntry, TocTreeNode};
use crate::error::Result;
use crate::inline::{InlineContext, InlineParser};
use crate::lines::{indent_of, is_blank, LineIterator};
use once_cell::sync::Lazy;
use regex::Regex;
use rstc_types::DocPath;

/// Adornment characters accepted for section underlines
const ADORNMENT_CHARS: &str = "=-~^\"'+*#:._";

static TARGET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\.\. _([^:]+):\s*(.*)$").expect("target pattern"));

static BRACKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\.\. \[([^\]]+)\]\s*(.*)$").expect("bracket pattern"));

static DIRECTIVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\.\. ([A-Za-z][A-Za-z0-9_-]*)::\s*(.*)$").expect("directive pattern"));

static SUBSTITUTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\.\. \|([^|]+)\| replace::\s*(.*)$").expect("substitution pattern"));

static OPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:([A-Za-z-]+):\s*(.*)$").expect("option pattern"));

static ENTRY_WITH_TARGET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s*<([^>]+)>$").expect("entry pattern"));

/// Returns the adornment character if the line is a section underline
fn adornment_char(line: &str) -> Option<char> {
    let trimmed = line.trim_end();
    if trimmed.len() < 2 {
        return None;
    }
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    if !ADORNMENT_CHARS.contains(first) {
        return None;
    }
    chars.all(|c| c == first).then_some(first)
}

/// Accumulates the section tree while blocks stream in
struct TreeBuilder {
    top: Vec<BlockNode>,
    stack: Vec<SectionNode>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            top: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn push_block(&mut self, block: BlockNode) {
        match self.stack.last_mut() {
            Some(section) => section.children.push(block),
            None => self.top.push(block),
        }
    }

    /// Close all open sections at or below `level`
    fn close_to(&mut self, level: usize) {
        while self.stack.last().is_some_and(|s| s.level >= level) {
            if let Some(section) = self.stack.pop() {
                self.push_block(BlockNode::Section(section));
            }
        }
    }

    fn open_section(&mut self, section: SectionNode) {
        self.close_to(section.level);
        self.stack.push(section);
    }

    fn finish(mut self) -> Vec<BlockNode> {
        self.close_to(1);
        self.top
    }
}

/// Parser producing one [`DocumentNode`] per source file
pub struct BlockParser {
    inline: InlineParser,
}

impl BlockParser {
    pub fn new() -> Self {
        Self {
            inline: InlineParser::new(),
        }
    }

    pub fn parse_document(&mut self, path: DocPath, source: &str) -> Result<DocumentNode> {
        let mut doc = DocumentNode::new(path.clone(), source);
        let ctx = InlineContext {
            path: Some(path),
            ..InlineContext::default()
        };
        let mut lines = LineIterator::new(source);
        let mut builder = TreeBuilder::new();
        // adornment order of first use defines the section hierarchy
        let mut adornments: Vec<char> = Vec::new();

        while let Some(line) = lines.next_line() {
            if is_blank(line) {
                continue;
            }

            if line.starts_with(".. ") || line == ".." {
                self.parse_explicit(line, &mut lines, &mut doc, &mut builder, &ctx)?;
                continue;
            }

            // section: a title line followed by an adornment at least as long
            if indent_of(line) == 0 {
                if let Some(next) = lines.peek() {
                    if let Some(ch) = adornment_char(next) {
                        if next.trim_end().len() >= line.trim_end().len() {
                            lines.next_line();
                            let level = match adornments.iter().position(|&a| a == ch) {
                                Some(index) => index + 1,
                                None => {
                                    adornments.push(ch);
                                    adornments.len()
                                }
                            };
                            let title = self.inline.parse(line.trim(), &ctx)?;
                            builder.open_section(SectionNode {
                                level,
                                title,
                                names: Vec::new(),
                                children: Vec::new(),
                            });
                            continue;
                        }
                    }
                }
            }

            self.parse_paragraph(line, &mut lines, &mut builder, &ctx)?;
        }

        doc.children = builder.finish();
        Ok(doc)
    }

    fn parse_explicit(
        &mut self,
        line: &str,
        lines: &mut LineIterator<'_>,
        doc: &mut DocumentNode,
        builder: &mut TreeBuilder,
        ctx: &InlineContext,
    ) -> Result<()> {
        if let Some(caps) = SUBSTITUTION_RE.captures(line) {
            let name = caps[1].trim().to_string();
            let replacement = self.inline.parse(caps[2].trim(), ctx)?;
            doc.substitutions.insert(name, replacement);
            return Ok(());
        }

        if let Some(caps) = DIRECTIVE_RE.captures(line) {
            let directive = caps[1].to_lowercase();
            if directive == "toctree" {
                let toctree = parse_toctree(lines);
                builder.push_block(BlockNode::Toctree(toctree));
            } else {
                // other directives are outside this parser's scope
                tracing::debug!(directive = %directive, "skipping unsupported directive");
                consume_indented(lines);
            }
            return Ok(());
        }

        if let Some(caps) = TARGET_RE.captures(line) {
            let name = caps[1].trim().to_string();
            let url = caps[2].trim().to_string();
            if url.is_empty() {
                builder.push_block(BlockNode::Anchor { name });
            } else {
                doc.link_targets.insert(name.clone(), url.clone());
                builder.push_block(BlockNode::LinkTarget { name, url });
            }
            return Ok(());
        }

        if let Some(caps) = BRACKET_RE.captures(line) {
            let key = caps[1].to_string();
            let mut body = caps[2].trim().to_string();
            // indented continuation lines belong to the definition
            while let Some(next) = lines.peek() {
                if is_blank(next) || indent_of(next) == 0 {
                    break;
                }
                body.push(' ');
                body.push_str(next.trim());
                lines.next_line();
            }
            let content = self.inline.parse(&body, ctx)?;
            let block = if key == "#" {
                BlockNode::FootnoteDef {
                    name: None,
                    number: None,
                    content,
                }
            } else if let Some(name) = key.strip_prefix('#') {
                BlockNode::FootnoteDef {
                    name: Some(name.to_string()),
                    number: None,
                    content,
                }
            } else if let Ok(number) = key.parse::<u32>() {
                BlockNode::FootnoteDef {
                    name: None,
                    number: Some(number),
                    content,
                }
            } else {
                BlockNode::Citation { name: key, content }
            };
            builder.push_block(block);
            return Ok(());
        }

        // anything else is a comment
        consume_indented(lines);
        Ok(())
    }

    fn parse_paragraph(
        &mut self,
        first: &str,
        lines: &mut LineIterator<'_>,
        builder: &mut TreeBuilder,
        ctx: &InlineContext,
    ) -> Result<()> {
        let mut text = first.trim().to_string();
        while let Some(next) = lines.peek() {
            if is_blank(next) {
                break;
            }
            // stop before a line that opens a section
            if lines.peek_at(1).and_then(adornment_char).is_some() {
                break;
            }
            if next.starts_with(".. ") {
                break;
            }
            text.push(' ');
            text.push_str(next.trim());
            lines.next_line();
        }

        if let Some(stripped) = text.strip_suffix("::") {
            let lead = stripped.trim_end();
            if !lead.is_empty() {
                let inline = self.inline.parse(&format!("{lead}:"), ctx)?;
                builder.push_block(BlockNode::Paragraph { inline });
            }
            if let Some(value) = parse_literal_block(lines) {
                builder.push_block(BlockNode::LiteralBlock { value });
            }
            return Ok(());
        }

        let inline = self.inline.parse(&text, ctx)?;
        builder.push_block(BlockNode::Paragraph { inline });
        Ok(())
    }
}

impl Default for BlockParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Consume an indented continuation block (comments, skipped directives)
fn consume_indented(lines: &mut LineIterator<'_>) {
    while let Some(line) = lines.peek() {
        if !is_blank(line) && indent_of(line) == 0 {
            break;
        }
        if is_blank(line) {
            // a blank line only continues the block if indented content follows
            match lines.peek_at(1) {
                Some(after) if !is_blank(after) && indent_of(after) > 0 => {}
                _ => break,
            }
        }
        lines.next_line();
    }
}

fn parse_toctree(lines: &mut LineIterator<'_>) -> TocTreeNode {
    let mut max_depth = None;
    let mut entries = Vec::new();

    while let Some(line) = lines.peek() {
        if is_blank(line) {
            match lines.peek_at(1) {
                Some(after) if !is_blank(after) && indent_of(after) > 0 => {
                    lines.next_line();
                    continue;
                }
                _ => break,
            }
        }
        if indent_of(line) == 0 {
            break;
        }
        let trimmed = line.trim().to_string();
        lines.next_line();

        if let Some(caps) = OPTION_RE.captures(&trimmed) {
            if &caps[1] == "maxdepth" {
                max_depth = caps[2].trim().parse().ok();
            }
            continue;
        }
        entries.push(parse_toctree_entry(&trimmed));
    }

    TocTreeNode { entries, max_depth }
}

fn parse_toctree_entry(entry: &str) -> TocTreeEntry {
    if let Some(caps) = ENTRY_WITH_TARGET_RE.captures(entry) {
        let title = caps[1].trim().to_string();
        let target = caps[2].trim().to_string();
        if target.starts_with("http://") || target.starts_with("https://") {
            return TocTreeEntry::External { url: target, title };
        }
        return TocTreeEntry::Document(DocPath::new(target));
    }
    if entry.starts_with("http://") || entry.starts_with("https://") {
        return TocTreeEntry::External {
            url: entry.to_string(),
            title: entry.to_string(),
        };
    }
    TocTreeEntry::Document(DocPath::new(entry))
}

/// Collect the indented literal block that follows a `::` marker
fn parse_literal_block(lines: &mut LineIterator<'_>) -> Option<String> {
    while let Some(line) = lines.peek() {
        if is_blank(line) {
            lines.next_line();
        } else {
            break;
        }
    }

    let mut collected: Vec<String> = Vec::new();
    while let Some(line) = lines.peek() {
        if is_blank(line) {
            collected.push(String::new());
            lines.next_line();
            continue;
        }
        if indent_of(line) == 0 {
            break;
        }
        collected.push(line.to_string());
        lines.next_line();
    }

    // trim trailing blanks, dedent by the smallest shared indent
    while collected.last().is_some_and(|l| l.is_empty()) {
        collected.pop();
    }
    if collected.is_empty() {
        return None;
    }
    let dedent = collected
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    let value = collected
        .iter()
        .map(|l| if l.is_empty() { "" } else { &l[dedent..] })
        .collect::<Vec<_>>()
        .join("\n");
    Some(value)
}
