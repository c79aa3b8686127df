//! Maps the element tree onto the document schema.

use std::sync::LazyLock;

use regex::Regex;

use super::tree::{Dom, Element};
use super::{ParseOptions, ParseWarning, UnknownTagPolicy, Warnings};
use crate::model::node::normalize_inline;
use crate::model::{Align, Attrs, Block, BlockKind, Document, Mark, MarkSet, Node, TableGrid, TextNode};

static TEXT_ALIGN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*text-align\s*:\s*([a-z]+)").expect("valid text-align pattern")
});

static COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|;)\s*color\s*:\s*([^;]+)").expect("valid color pattern")
});

/// A whitespace run that includes a line break, tab or form feed.
static BREAKING_WS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ \t\n\r\x0C]*[\t\n\r\x0C][ \t\n\r\x0C]*").expect("valid whitespace pattern")
});

/// Block-level elements outside the schema. Unwrapping them still ends the
/// surrounding paragraph.
const UNKNOWN_BLOCKS: &[&str] = &[
    "address", "article", "aside", "center", "dd", "details", "dl", "dt", "fieldset", "figcaption",
    "figure", "footer", "form", "header", "main", "nav", "section", "summary", "div",
];

enum Role {
    Paragraph,
    Heading(u8),
    List(BlockKind),
    ListItem,
    Blockquote,
    Pre,
    Table,
    TablePart,
    Rule,
    Image,
    Break,
    Mark(Mark),
    Link,
    Span,
    Transparent,
    /// Silently skipped with its content.
    Ignored,
    /// Skipped with its content, and reported.
    Dropped,
    UnknownBlock,
    UnknownInline,
}

impl Role {
    fn of(e: &Element) -> Role {
        match e.name.as_str() {
            "p" => Role::Paragraph,
            h @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6") => Role::Heading(h.as_bytes()[1] - b'0'),
            "ul" => Role::List(BlockKind::BulletList),
            "ol" => Role::List(BlockKind::OrderedList),
            "li" => Role::ListItem,
            "blockquote" => Role::Blockquote,
            "pre" => Role::Pre,
            "table" => Role::Table,
            "thead" | "tbody" | "tfoot" | "tr" | "td" | "th" => Role::TablePart,
            "hr" => Role::Rule,
            "img" => Role::Image,
            "br" => Role::Break,
            "strong" | "b" => Role::Mark(Mark::Bold),
            "em" | "i" => Role::Mark(Mark::Italic),
            "u" => Role::Mark(Mark::Underline),
            "s" | "strike" | "del" => Role::Mark(Mark::Strike),
            "code" => Role::Mark(Mark::Code),
            "a" => Role::Link,
            "span" => Role::Span,
            "html" | "body" => Role::Transparent,
            "head" | "title" | "meta" | "link" | "base" | "colgroup" | "col" | "caption" => {
                Role::Ignored
            }
            "script" | "style" | "template" | "textarea" => Role::Dropped,
            name if UNKNOWN_BLOCKS.contains(&name) => Role::UnknownBlock,
            _ => Role::UnknownInline,
        }
    }

    fn is_inline(&self) -> bool {
        matches!(
            self,
            Role::Break | Role::Mark(_) | Role::Link | Role::Span | Role::UnknownInline
        )
    }
}

/// Inline content collected for one textblock. Blocks met inside inline
/// content are lifted out and split the textblock around them.
enum Item {
    Text { raw: String, marks: MarkSet },
    Break,
    Block(Block),
}

fn is_whitespace(text: &str) -> bool {
    text.bytes()
        .all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0C))
}

fn trim_breaking_start(text: &str) -> &str {
    match BREAKING_WS.find(text) {
        Some(m) if m.start() == 0 => &text[m.end()..],
        _ => text,
    }
}

fn trim_breaking_end(text: &str) -> &str {
    match BREAKING_WS.find_iter(text).last() {
        Some(m) if m.end() == text.len() => &text[..m.start()],
        _ => text,
    }
}

/// Turns collected items into canonical inline nodes, applying the
/// whitespace rules and decoding entities.
fn finish_inline(mut items: Vec<Item>) -> Vec<Node> {
    // trim at the start of the block and after each hard break
    let mut at_line_start = true;
    for item in items.iter_mut() {
        match item {
            Item::Break => at_line_start = true,
            Item::Text { raw, .. } if at_line_start => {
                *raw = trim_breaking_start(raw).to_string();
                at_line_start = raw.is_empty();
            }
            _ => at_line_start = false,
        }
    }
    for item in items.iter_mut().rev() {
        match item {
            Item::Text { raw, .. } => {
                *raw = trim_breaking_end(raw).to_string();
                if !raw.is_empty() {
                    break;
                }
            }
            _ => break,
        }
    }

    let mut nodes = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Item::Break => nodes.push(Node::hard_break()),
            Item::Text { raw, marks } => {
                let collapsed = BREAKING_WS.replace_all(&raw, " ");
                let text = html_escape::decode_html_entities(&collapsed).replace(['\r', '\n'], " ");
                nodes.push(Node::Text(TextNode { text, marks }));
            }
            Item::Block(_) => {}
        }
    }
    normalize_inline(nodes)
}

fn align_of(e: &Element) -> Option<Align> {
    let style = e.attr("style")?;
    TEXT_ALIGN
        .captures(style)
        .and_then(|c| Align::parse(&c[1]))
}

fn color_of(e: &Element) -> Option<Mark> {
    let style = e.attr("style")?;
    let value = COLOR.captures(style)?[1].trim().to_string();
    let mark = Mark::color(value);
    mark.validate().ok().map(|_| mark)
}

fn language_of(pre: &Element) -> Option<String> {
    let code = pre.children.iter().find_map(|c| match c {
        Dom::Element(e) if e.name == "code" => Some(e),
        _ => None,
    });
    [code, Some(pre)].into_iter().flatten().find_map(|e| {
        e.attr("class")?
            .split_whitespace()
            .find_map(|class| class.strip_prefix("language-"))
            .filter(|lang| !lang.is_empty())
            .map(str::to_string)
    })
}

fn code_text(nodes: &[Dom], out: &mut String) {
    for node in nodes {
        match node {
            Dom::Text(raw) => out.push_str(&html_escape::decode_html_entities(raw)),
            Dom::Element(e) if e.name == "br" => out.push('\n'),
            Dom::Element(e) => code_text(&e.children, out),
        }
    }
}

fn span_attr(e: &Element, key: &str) -> u32 {
    e.attr(key)
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(1)
        .max(1)
}

fn has_textblock(block: &Block) -> bool {
    block.is_textblock() || block.blocks().any(has_textblock)
}

struct Parser<'a> {
    options: &'a ParseOptions,
    warnings: &'a mut Warnings,
}

pub fn to_document(dom: &[Dom], options: &ParseOptions, warnings: &mut Warnings) -> Document {
    let mut parser = Parser { options, warnings };
    let mut blocks = parser.blocks(dom);
    if !blocks.iter().any(has_textblock) {
        blocks.push(Block::paragraph(Vec::new()));
    }
    match Document::from_blocks(blocks) {
        Ok(doc) => doc,
        Err(e) => {
            parser.warnings.push(ParseWarning::Repaired {
                reason: format!("discarded content the schema rejects: {e}"),
            });
            Document::new()
        }
    }
}

impl Parser<'_> {
    /// Parses content of a node that holds blocks. Loose inline content
    /// becomes paragraphs.
    fn blocks(&mut self, nodes: &[Dom]) -> Vec<Block> {
        let mut out = Vec::new();
        let mut pending = Vec::new();
        for node in nodes {
            match node {
                Dom::Text(raw) => {
                    if pending.is_empty() && is_whitespace(raw) {
                        continue;
                    }
                    pending.push(Item::Text {
                        raw: raw.clone(),
                        marks: MarkSet::new(),
                    });
                }
                Dom::Element(e) => {
                    let role = Role::of(e);
                    if role.is_inline() {
                        self.inline_element(e, role, &MarkSet::new(), &mut pending);
                    } else {
                        self.flush(&mut pending, &mut out);
                        self.block_element(e, role, &mut out);
                    }
                }
            }
        }
        self.flush(&mut pending, &mut out);
        out
    }

    /// Like [`Parser::blocks`], never empty.
    fn container(&mut self, nodes: &[Dom]) -> Vec<Node> {
        let mut blocks = self.blocks(nodes);
        if blocks.is_empty() {
            blocks.push(Block::paragraph(Vec::new()));
        }
        blocks.into_iter().map(Node::Block).collect()
    }

    fn flush(&mut self, pending: &mut Vec<Item>, out: &mut Vec<Block>) {
        while matches!(pending.last(), Some(Item::Text { raw, .. }) if is_whitespace(raw)) {
            pending.pop();
        }
        if pending.is_empty() {
            return;
        }
        let items = std::mem::take(pending);
        split_textblock(BlockKind::Paragraph, &Attrs::default(), items, false, out);
    }

    fn block_element(&mut self, e: &Element, role: Role, out: &mut Vec<Block>) {
        match role {
            Role::Paragraph => {
                let attrs = Attrs {
                    align: align_of(e),
                    ..Attrs::default()
                };
                self.textblock(BlockKind::Paragraph, attrs, e, out);
            }
            Role::Heading(level) => {
                let attrs = Attrs {
                    align: align_of(e),
                    ..Attrs::heading(level)
                };
                self.textblock(BlockKind::Heading, attrs, e, out);
            }
            Role::List(kind) => out.extend(self.list(e, kind)),
            Role::ListItem => {
                self.warnings.push(ParseWarning::Repaired {
                    reason: "<li> outside a list wrapped in <ul>".into(),
                });
                let item = self.list_item(&e.children);
                out.push(Block::wrap(BlockKind::BulletList, vec![item]));
            }
            Role::Blockquote => {
                let children = self.container(&e.children);
                out.push(Block::new(BlockKind::Blockquote, Attrs::default(), children));
            }
            Role::Pre => {
                let mut text = String::new();
                code_text(&e.children, &mut text);
                let text = text.replace("\r\n", "\n");
                let children = if text.is_empty() {
                    Vec::new()
                } else {
                    vec![Node::text(text)]
                };
                out.push(Block::new(
                    BlockKind::CodeBlock,
                    Attrs::code(language_of(e)),
                    children,
                ));
            }
            Role::Table => out.extend(self.table(e)),
            Role::TablePart => {
                self.warnings.push(ParseWarning::Repaired {
                    reason: format!("<{}> outside a table unwrapped", e.name),
                });
                out.extend(self.blocks(&e.children));
            }
            Role::Rule => out.push(Block::leaf(BlockKind::HorizontalRule, Attrs::default())),
            Role::Image => out.extend(self.image(e)),
            Role::Transparent => out.extend(self.blocks(&e.children)),
            Role::Ignored => {}
            Role::Dropped => self.dropped(e),
            Role::UnknownBlock => {
                if self.unknown(e) {
                    out.extend(self.blocks(&e.children));
                }
            }
            inline => {
                let mut items = Vec::new();
                self.inline_element(e, inline, &MarkSet::new(), &mut items);
                self.flush(&mut items, out);
            }
        }
    }

    fn dropped(&mut self, e: &Element) {
        self.warnings.push(ParseWarning::DroppedContent {
            tag: e.name.clone(),
        });
    }

    /// Reports an unknown element and returns whether to keep its content.
    fn unknown(&mut self, e: &Element) -> bool {
        match self.options.unknown_tags {
            UnknownTagPolicy::Unwrap => {
                self.warnings.push(ParseWarning::UnknownTag {
                    tag: e.name.clone(),
                });
                true
            }
            UnknownTagPolicy::Drop => {
                self.dropped(e);
                false
            }
        }
    }

    fn textblock(&mut self, kind: BlockKind, attrs: Attrs, e: &Element, out: &mut Vec<Block>) {
        let mut items = Vec::new();
        self.inline_children(&e.children, &MarkSet::new(), &mut items);
        split_textblock(kind, &attrs, items, true, out);
    }

    fn inline_children(&mut self, nodes: &[Dom], marks: &MarkSet, out: &mut Vec<Item>) {
        for node in nodes {
            match node {
                Dom::Text(raw) => out.push(Item::Text {
                    raw: raw.clone(),
                    marks: marks.clone(),
                }),
                Dom::Element(e) => self.inline_element(e, Role::of(e), marks, out),
            }
        }
    }

    fn inline_element(&mut self, e: &Element, role: Role, marks: &MarkSet, out: &mut Vec<Item>) {
        let with = |mark: Option<Mark>| {
            let mut inner = marks.clone();
            if let Some(mark) = mark
                && inner.allows(mark.kind())
            {
                inner.add(mark);
            }
            inner
        };
        match role {
            Role::Mark(mark) => self.inline_children(&e.children, &with(Some(mark)), out),
            Role::Link => {
                let href = e
                    .attr("href")
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(Mark::link);
                self.inline_children(&e.children, &with(href), out);
            }
            Role::Span => self.inline_children(&e.children, &with(color_of(e)), out),
            Role::Break => out.push(Item::Break),
            Role::UnknownInline => {
                if self.unknown(e) {
                    self.inline_children(&e.children, marks, out);
                }
            }
            Role::Image => out.extend(self.image(e).map(Item::Block)),
            Role::Ignored => {}
            Role::Dropped => self.dropped(e),
            block => {
                if !matches!(block, Role::UnknownBlock) {
                    self.warnings.push(ParseWarning::Repaired {
                        reason: format!("<{}> moved out of inline content", e.name),
                    });
                }
                let mut blocks = Vec::new();
                self.block_element(e, block, &mut blocks);
                out.extend(blocks.into_iter().map(Item::Block));
            }
        }
    }

    fn image(&mut self, e: &Element) -> Option<Block> {
        let Some(src) = e.attr("src").map(str::trim).filter(|s| !s.is_empty()) else {
            self.dropped(e);
            return None;
        };
        let attrs = Attrs {
            alt: e.attr("alt").map(str::to_string),
            title: e.attr("title").map(str::to_string),
            ..Attrs::image(src)
        };
        Some(Block::leaf(BlockKind::Image, attrs))
    }

    fn list(&mut self, e: &Element, kind: BlockKind) -> Option<Block> {
        let mut items = Vec::new();
        let mut stray: Vec<Dom> = Vec::new();
        for child in &e.children {
            match child {
                Dom::Element(li) if li.name == "li" => {
                    self.wrap_stray(&mut stray, &mut items);
                    items.push(self.list_item(&li.children));
                }
                Dom::Text(raw) if stray.is_empty() && is_whitespace(raw) => {}
                other => stray.push(other.clone()),
            }
        }
        self.wrap_stray(&mut stray, &mut items);
        if items.is_empty() {
            self.dropped(e);
            return None;
        }
        let start = match kind {
            BlockKind::OrderedList => e.attr("start").and_then(|s| s.trim().parse::<u32>().ok()),
            _ => None,
        };
        let attrs = Attrs {
            start,
            ..Attrs::default()
        };
        Some(Block::new(
            kind,
            attrs,
            items.into_iter().map(Node::Block).collect(),
        ))
    }

    fn wrap_stray(&mut self, stray: &mut Vec<Dom>, items: &mut Vec<Block>) {
        while matches!(stray.last(), Some(Dom::Text(raw)) if is_whitespace(raw)) {
            stray.pop();
        }
        if stray.is_empty() {
            return;
        }
        self.warnings.push(ParseWarning::Repaired {
            reason: "list content outside <li> wrapped in an item".into(),
        });
        let nodes = std::mem::take(stray);
        items.push(self.list_item(&nodes));
    }

    fn list_item(&mut self, nodes: &[Dom]) -> Block {
        let children = self.container(nodes);
        Block::new(BlockKind::ListItem, Attrs::default(), children)
    }

    fn table(&mut self, e: &Element) -> Option<Block> {
        let mut rows = Vec::new();
        self.table_rows(&e.children, &mut rows);
        if rows.is_empty() {
            self.dropped(e);
            return None;
        }
        let table = Block::new(
            BlockKind::Table,
            Attrs::default(),
            rows.into_iter().map(Node::Block).collect(),
        );
        let (grid, repaired) = TableGrid::repair(&table);
        if grid.width == 0 {
            self.warnings.push(ParseWarning::Repaired {
                reason: "table without cells dropped".into(),
            });
            return None;
        }
        if repaired {
            self.warnings.push(ParseWarning::Repaired {
                reason: "table padded to a rectangular grid".into(),
            });
        }
        Some(grid.into_table(Attrs::default()))
    }

    fn table_rows(&mut self, nodes: &[Dom], rows: &mut Vec<Block>) {
        for node in nodes {
            match node {
                Dom::Text(raw) if is_whitespace(raw) => {}
                Dom::Element(e) => match e.name.as_str() {
                    "tr" => rows.push(self.table_row(e)),
                    "thead" | "tbody" | "tfoot" => self.table_rows(&e.children, rows),
                    "caption" | "colgroup" | "col" => {}
                    _ => self.dropped(e),
                },
                Dom::Text(_) => self.warnings.push(ParseWarning::DroppedContent {
                    tag: "table".into(),
                }),
            }
        }
    }

    fn table_row(&mut self, tr: &Element) -> Block {
        let mut cells = Vec::new();
        for node in &tr.children {
            match node {
                Dom::Text(raw) if is_whitespace(raw) => {}
                Dom::Element(e) if e.name == "td" || e.name == "th" => {
                    let kind = if e.name == "th" {
                        BlockKind::TableHeader
                    } else {
                        BlockKind::TableCell
                    };
                    let attrs = Attrs::span(span_attr(e, "colspan"), span_attr(e, "rowspan"));
                    let children = self.container(&e.children);
                    cells.push(Node::Block(Block::new(kind, attrs, children)));
                }
                Dom::Element(e) => self.dropped(e),
                Dom::Text(_) => self.warnings.push(ParseWarning::DroppedContent {
                    tag: "tr".into(),
                }),
            }
        }
        Block::new(BlockKind::TableRow, Attrs::default(), cells)
    }
}

/// Emits textblocks of `kind` for the runs of inline items between lifted
/// blocks. With `keep_empty`, an element with no content at all still
/// yields one empty textblock.
fn split_textblock(
    kind: BlockKind,
    attrs: &Attrs,
    items: Vec<Item>,
    keep_empty: bool,
    out: &mut Vec<Block>,
) {
    let lifted = items.iter().any(|i| matches!(i, Item::Block(_)));
    let mut segment = Vec::new();
    let emit = |segment: Vec<Item>, out: &mut Vec<Block>| {
        let nodes = finish_inline(segment);
        if !nodes.is_empty() || (keep_empty && !lifted) {
            out.push(Block::new(kind, attrs.clone(), nodes));
        }
    };
    for item in items {
        match item {
            Item::Block(block) => {
                emit(std::mem::take(&mut segment), out);
                out.push(block);
            }
            other => segment.push(other),
        }
    }
    emit(segment, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::{ParseOutcome, parse};
    use crate::tests::*;
    use pretty_assertions::assert_eq;

    fn lenient(input: &str) -> ParseOutcome {
        parse(input, &ParseOptions::default())
    }

    #[test]
    fn nested_marks_accumulate() {
        let outcome = lenient("<p><strong>a<em>b</em></strong></p>");
        assert_eq!(
            outcome.document,
            doc(vec![para(vec![
                Node::marked("a", [Mark::Bold]),
                Node::marked("b", [Mark::Bold, Mark::Italic]),
            ])])
        );
    }

    #[test]
    fn code_mark_excludes_formatting() {
        let outcome = lenient("<p><code><b>x</b></code><b><code>y</code></b></p>");
        assert_eq!(
            outcome.document,
            doc(vec![para(vec![Node::marked("xy", [Mark::Code])])])
        );
    }

    #[test]
    fn link_and_color() {
        let outcome = lenient(
            r#"<p><a href="https://a.example" target="_blank">x</a><span style="font-size: 2em; color: #958DF1">y</span></p>"#,
        );
        assert_eq!(
            outcome.document,
            doc(vec![para(vec![
                Node::marked("x", [Mark::link("https://a.example")]),
                Node::marked("y", [Mark::color("#958DF1")]),
            ])])
        );
    }

    #[test]
    fn invalid_color_and_background_are_ignored() {
        let outcome = lenient(
            r#"<p><span style="color: expression(x)">a</span><span style="background-color: red">b</span></p>"#,
        );
        assert_eq!(outcome.document, doc(vec![p("ab")]));
    }

    #[test]
    fn hard_breaks_trim_following_newline() {
        let outcome = lenient("<p>a<br>\n  b</p>");
        assert_eq!(
            outcome.document,
            doc(vec![para(vec![
                Node::text("a"),
                Node::hard_break(),
                Node::text("b"),
            ])])
        );
    }

    #[test]
    fn code_block_keeps_whitespace() {
        let outcome = lenient("<pre><code>  a &lt; b\n\tc</code></pre>");
        assert_eq!(
            outcome.document,
            doc(vec![code("  a < b\n\tc")])
        );
    }

    #[test]
    fn ordered_list_start_and_nesting() {
        let outcome = lenient(r#"<ol start="3"><li><p>a</p><ul><li>b</li></ul></li></ol>"#);
        let mut list = ol(vec![li(vec![p("a"), ul(vec![li(vec![p("b")])])])]);
        list.attrs.start = Some(3);
        assert_eq!(outcome.document, doc(vec![list]));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn stray_list_content_is_wrapped() {
        let outcome = lenient("<ul><li>a</li>b</ul>");
        assert_eq!(
            outcome.document,
            doc(vec![ul(vec![li(vec![p("a")]), li(vec![p("b")])])])
        );
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn table_without_cells_is_dropped() {
        let outcome = lenient("<table><tr></tr></table><p>x</p>");
        assert_eq!(outcome.document, doc(vec![p("x")]));
        assert!(matches!(
            outcome.warnings.as_slice(),
            [ParseWarning::Repaired { .. }]
        ));
    }

    #[test]
    fn table_spans_and_headers() {
        let outcome = lenient(
            "<table><thead><tr><th colspan=\"2\">h</th></tr></thead>\
             <tbody><tr><td>a</td><td>b</td></tr></tbody></table><p>after</p>",
        );
        let doc = outcome.document;
        let table = doc.block(&[0]).unwrap();
        let grid = TableGrid::from_table(table).unwrap();
        assert_eq!((grid.width, grid.height), (2, 2));
        assert!(grid.row_is_header(0));
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn blockquote_with_loose_text() {
        let outcome = lenient("<blockquote>quoted</blockquote>");
        assert_eq!(outcome.document, doc(vec![quote(vec![p("quoted")])]));
    }

    #[test]
    fn image_attributes() {
        let outcome = lenient(r#"<img src="a.png" alt="A" title="T"><img alt="no source">"#);
        let mut image = img("a.png");
        image.attrs.alt = Some("A".into());
        image.attrs.title = Some("T".into());
        assert_eq!(outcome.document, doc(vec![image, p("")]));
        assert_eq!(
            outcome.warnings,
            vec![ParseWarning::DroppedContent { tag: "img".into() }]
        );
    }

    #[test]
    fn encoded_newline_outside_code_becomes_space() {
        let outcome = lenient("<p>a&#10;b</p>");
        assert_eq!(outcome.document, doc(vec![p("a b")]));
    }
}
