use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::model::{Attrs, Block, BlockKind, Document, Mark, Node};

pub fn write_document(doc: &Document) -> String {
    let mut out = String::new();
    for block in doc.root().blocks() {
        write_block(block, &mut out);
    }
    out
}

fn attr(out: &mut String, key: &str, value: &str) {
    out.push(' ');
    out.push_str(key);
    out.push_str("=\"");
    out.push_str(&encode_double_quoted_attribute(value));
    out.push('"');
}

fn align_attr(out: &mut String, attrs: &Attrs) {
    if let Some(align) = attrs.align {
        attr(out, "style", &format!("text-align: {}", align.as_str()));
    }
}

fn write_children(block: &Block, out: &mut String) {
    for child in block.blocks() {
        write_block(child, out);
    }
}

fn write_block(block: &Block, out: &mut String) {
    match block.kind {
        BlockKind::Doc => write_children(block, out),
        BlockKind::Paragraph => {
            out.push_str("<p");
            align_attr(out, &block.attrs);
            out.push('>');
            write_inline(&block.children, out);
            out.push_str("</p>");
        }
        BlockKind::Heading => {
            let level = block.attrs.level.unwrap_or(1);
            out.push_str(&format!("<h{level}"));
            align_attr(out, &block.attrs);
            out.push('>');
            write_inline(&block.children, out);
            out.push_str(&format!("</h{level}>"));
        }
        BlockKind::CodeBlock => {
            out.push_str("<pre><code");
            if let Some(language) = &block.attrs.language {
                attr(out, "class", &format!("language-{language}"));
            }
            out.push('>');
            out.push_str(&encode_text(&block.text()));
            out.push_str("</code></pre>");
        }
        BlockKind::BulletList => {
            out.push_str("<ul>");
            write_children(block, out);
            out.push_str("</ul>");
        }
        BlockKind::OrderedList => {
            out.push_str("<ol");
            if let Some(start) = block.attrs.start {
                attr(out, "start", &start.to_string());
            }
            out.push('>');
            write_children(block, out);
            out.push_str("</ol>");
        }
        BlockKind::ListItem => {
            out.push_str("<li>");
            write_children(block, out);
            out.push_str("</li>");
        }
        BlockKind::Blockquote => {
            out.push_str("<blockquote>");
            write_children(block, out);
            out.push_str("</blockquote>");
        }
        BlockKind::Table => {
            out.push_str("<table><tbody>");
            write_children(block, out);
            out.push_str("</tbody></table>");
        }
        BlockKind::TableRow => {
            out.push_str("<tr>");
            write_children(block, out);
            out.push_str("</tr>");
        }
        BlockKind::TableCell | BlockKind::TableHeader => {
            let tag = if block.kind == BlockKind::TableHeader {
                "th"
            } else {
                "td"
            };
            out.push('<');
            out.push_str(tag);
            if let Some(colspan) = block.attrs.colspan {
                attr(out, "colspan", &colspan.to_string());
            }
            if let Some(rowspan) = block.attrs.rowspan {
                attr(out, "rowspan", &rowspan.to_string());
            }
            out.push('>');
            write_children(block, out);
            out.push_str(&format!("</{tag}>"));
        }
        BlockKind::HorizontalRule => out.push_str("<hr>"),
        BlockKind::Image => {
            out.push_str("<img");
            for (key, value) in [
                ("src", &block.attrs.src),
                ("alt", &block.attrs.alt),
                ("title", &block.attrs.title),
            ] {
                if let Some(value) = value {
                    attr(out, key, value);
                }
            }
            out.push('>');
        }
        BlockKind::HardBreak => out.push_str("<br>"),
    }
}

fn open_mark(mark: &Mark, out: &mut String) {
    match mark {
        Mark::Link { href } => {
            out.push_str(r#"<a target="_blank" rel="noopener noreferrer nofollow""#);
            attr(out, "href", href);
            out.push('>');
        }
        Mark::Bold => out.push_str("<strong>"),
        Mark::Italic => out.push_str("<em>"),
        Mark::Underline => out.push_str("<u>"),
        Mark::Strike => out.push_str("<s>"),
        Mark::Color { value } => {
            out.push_str("<span");
            attr(out, "style", &format!("color: {value}"));
            out.push('>');
        }
        Mark::Code => out.push_str("<code>"),
    }
}

fn close_mark(mark: &Mark, out: &mut String) {
    out.push_str(match mark {
        Mark::Link { .. } => "</a>",
        Mark::Bold => "</strong>",
        Mark::Italic => "</em>",
        Mark::Underline => "</u>",
        Mark::Strike => "</s>",
        Mark::Color { .. } => "</span>",
        Mark::Code => "</code>",
    });
}

/// Writes inline content, keeping a mark element open across adjacent runs
/// that share it. Hard breaks leave the open marks alone.
fn write_inline(nodes: &[Node], out: &mut String) {
    let mut open: Vec<&Mark> = Vec::new();
    for node in nodes {
        match node {
            Node::Text(text) => {
                let wanted: Vec<&Mark> = text.marks.iter().collect();
                let keep = open
                    .iter()
                    .zip(&wanted)
                    .take_while(|(a, b)| a == b)
                    .count();
                while open.len() > keep {
                    if let Some(mark) = open.pop() {
                        close_mark(mark, out);
                    }
                }
                for mark in &wanted[keep..] {
                    open_mark(mark, out);
                    open.push(mark);
                }
                // a raw tab would collapse to a space on the way back in
                out.push_str(&encode_text(&text.text).replace('\t', "&#9;"));
            }
            Node::Block(block) => write_block(block, out),
        }
    }
    while let Some(mark) = open.pop() {
        close_mark(mark, out);
    }
}
