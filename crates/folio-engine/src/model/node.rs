use serde::{Deserialize, Serialize};

use super::attrs::Attrs;
use super::mark::{Mark, MarkKind, MarkSet};

/// Closed set of block node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Doc,
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    Blockquote,
    CodeBlock,
    Table,
    TableRow,
    TableCell,
    TableHeader,
    HorizontalRule,
    HardBreak,
    Image,
}

impl BlockKind {
    pub fn name(self) -> &'static str {
        match self {
            BlockKind::Doc => "doc",
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading => "heading",
            BlockKind::BulletList => "bulletList",
            BlockKind::OrderedList => "orderedList",
            BlockKind::ListItem => "listItem",
            BlockKind::Blockquote => "blockquote",
            BlockKind::CodeBlock => "codeBlock",
            BlockKind::Table => "table",
            BlockKind::TableRow => "tableRow",
            BlockKind::TableCell => "tableCell",
            BlockKind::TableHeader => "tableHeader",
            BlockKind::HorizontalRule => "horizontalRule",
            BlockKind::HardBreak => "hardBreak",
            BlockKind::Image => "image",
        }
    }

    /// Holds inline content (text and hard breaks).
    pub fn is_textblock(self) -> bool {
        matches!(
            self,
            BlockKind::Paragraph | BlockKind::Heading | BlockKind::CodeBlock
        )
    }

    pub fn is_inline(self) -> bool {
        self == BlockKind::HardBreak
    }

    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            BlockKind::HorizontalRule | BlockKind::HardBreak | BlockKind::Image
        )
    }

    pub fn is_list(self) -> bool {
        matches!(self, BlockKind::BulletList | BlockKind::OrderedList)
    }

    pub fn is_cell(self) -> bool {
        matches!(self, BlockKind::TableCell | BlockKind::TableHeader)
    }

    /// Containers whose content expression is `block+`.
    pub fn holds_blocks(self) -> bool {
        matches!(
            self,
            BlockKind::Doc
                | BlockKind::Blockquote
                | BlockKind::ListItem
                | BlockKind::TableCell
                | BlockKind::TableHeader
        )
    }

    /// Kinds allowed as children of a `block+` container.
    pub fn is_block_content(self) -> bool {
        matches!(
            self,
            BlockKind::Paragraph
                | BlockKind::Heading
                | BlockKind::CodeBlock
                | BlockKind::BulletList
                | BlockKind::OrderedList
                | BlockKind::Blockquote
                | BlockKind::Table
                | BlockKind::HorizontalRule
                | BlockKind::Image
        )
    }
}

/// A run of text sharing one mark set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default, skip_serializing_if = "MarkSet::is_empty")]
    pub marks: MarkSet,
}

impl TextNode {
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn split_at(&self, offset: usize) -> (TextNode, TextNode) {
        let byte = char_to_byte(&self.text, offset);
        let (a, b) = self.text.split_at(byte);
        (
            TextNode {
                text: a.to_string(),
                marks: self.marks.clone(),
            },
            TextNode {
                text: b.to_string(),
                marks: self.marks.clone(),
            },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum Node {
    Text(TextNode),
    Block(Block),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Node {
        Node::Text(TextNode {
            text: text.into(),
            marks: MarkSet::new(),
        })
    }

    pub fn marked(text: impl Into<String>, marks: impl IntoIterator<Item = Mark>) -> Node {
        Node::Text(TextNode {
            text: text.into(),
            marks: marks.into_iter().collect(),
        })
    }

    pub fn hard_break() -> Node {
        Node::Block(Block::leaf(BlockKind::HardBreak, Attrs::default()))
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Node::Block(b) => Some(b),
            Node::Text(_) => None,
        }
    }

    pub fn as_block_mut(&mut self) -> Option<&mut Block> {
        match self {
            Node::Block(b) => Some(b),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextNode> {
        match self {
            Node::Text(t) => Some(t),
            Node::Block(_) => None,
        }
    }

    pub fn kind(&self) -> Option<BlockKind> {
        self.as_block().map(|b| b.kind)
    }

    /// Width of the node inside a textblock's offset space.
    pub fn inline_len(&self) -> usize {
        match self {
            Node::Text(t) => t.len(),
            Node::Block(b) if b.kind.is_inline() => 1,
            Node::Block(_) => 0,
        }
    }
}

impl From<Block> for Node {
    fn from(block: Block) -> Self {
        Node::Block(block)
    }
}

impl Block {
    pub fn new(kind: BlockKind, attrs: Attrs, children: Vec<Node>) -> Self {
        Block {
            kind,
            attrs: attrs.normalized(),
            children,
        }
    }

    pub fn leaf(kind: BlockKind, attrs: Attrs) -> Self {
        Block::new(kind, attrs, Vec::new())
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Block::new(BlockKind::Paragraph, Attrs::default(), children)
    }

    pub fn heading(level: u8, children: Vec<Node>) -> Self {
        Block::new(BlockKind::Heading, Attrs::heading(level), children)
    }

    pub fn wrap(kind: BlockKind, children: Vec<Block>) -> Self {
        Block::new(
            kind,
            Attrs::default(),
            children.into_iter().map(Node::Block).collect(),
        )
    }

    pub fn is_textblock(&self) -> bool {
        self.kind.is_textblock()
    }

    pub fn child_block(&self, index: usize) -> Option<&Block> {
        self.children.get(index).and_then(Node::as_block)
    }

    /// Iterates child blocks, skipping text. Used on containers only.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.children.iter().filter_map(Node::as_block)
    }

    /// Follows `path` down through child blocks.
    pub fn descendant(&self, path: &[usize]) -> Option<&Block> {
        let mut block = self;
        for &i in path {
            block = block.child_block(i)?;
        }
        Some(block)
    }

    pub fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut Block> {
        let mut block = self;
        for &i in path {
            block = block.children.get_mut(i)?.as_block_mut()?;
        }
        Some(block)
    }

    /// Paths of all textblocks below this block, in document order.
    pub fn textblock_paths(&self) -> Vec<Vec<usize>> {
        fn walk(block: &Block, path: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
            if block.is_textblock() {
                out.push(path.clone());
                return;
            }
            for (i, child) in block.children.iter().enumerate() {
                if let Node::Block(b) = child {
                    path.push(i);
                    walk(b, path, out);
                    path.pop();
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut Vec::new(), &mut out);
        out
    }

    /// Character length of a textblock's inline content.
    pub fn inline_len(&self) -> usize {
        inline_len(&self.children)
    }

    /// Plain text of a textblock, hard breaks rendered as `\n`.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(&t.text),
                Node::Block(b) if b.kind.is_inline() => out.push('\n'),
                Node::Block(_) => {}
            }
        }
        out
    }

    pub fn slice_inline(&self, from: usize, to: usize) -> Vec<Node> {
        slice_inline(&self.children, from, to)
    }

    /// Replaces the inline range `from..to` with `nodes`.
    pub fn replace_inline(&mut self, from: usize, to: usize, nodes: Vec<Node>) {
        let (before, rest) = split_inline(&self.children, from);
        let (_, after) = split_inline(&rest, to - from);
        let mut children = before;
        children.extend(nodes);
        children.extend(after);
        self.children = normalize_inline(children);
    }

    /// Applies `f` to the marks of every text run in `from..to`.
    pub fn map_marks(&mut self, from: usize, to: usize, mut f: impl FnMut(&mut MarkSet)) {
        let (before, rest) = split_inline(&self.children, from);
        let (mut middle, after) = split_inline(&rest, to - from);
        for node in &mut middle {
            if let Node::Text(t) = node {
                f(&mut t.marks);
            }
        }
        let mut children = before;
        children.extend(middle);
        children.extend(after);
        self.children = normalize_inline(children);
    }

    /// Marks a character typed at `offset` would inherit.
    ///
    /// Inside a run that run's marks apply. At a boundary the run before wins,
    /// minus non-inclusive marks the run after does not share.
    pub fn marks_at(&self, offset: usize) -> MarkSet {
        let mut pos = 0;
        let mut before: Option<&Node> = None;
        let mut after: Option<&Node> = None;
        for node in &self.children {
            let len = node.inline_len();
            if pos < offset
                && offset < pos + len
                && let Node::Text(t) = node
            {
                return t.marks.clone();
            }
            if pos + len == offset && len > 0 {
                before = Some(node);
            }
            if pos == offset && after.is_none() && len > 0 {
                after = Some(node);
            }
            pos += len;
        }
        fn marks_of(n: Option<&Node>) -> Option<&MarkSet> {
            match n {
                Some(Node::Text(t)) => Some(&t.marks),
                _ => None,
            }
        }
        let (main, other) = match before {
            Some(_) => (marks_of(before), marks_of(after)),
            None => (marks_of(after), None),
        };
        let Some(main) = main else {
            return MarkSet::new();
        };
        main.iter()
            .filter(|m| m.kind().is_inclusive() || other.is_some_and(|o| o.contains(m)))
            .cloned()
            .collect()
    }

    /// Text runs overlapping `from..to`, clipped to it.
    pub fn runs(&self, from: usize, to: usize) -> Vec<(usize, usize, &MarkSet)> {
        let mut out = Vec::new();
        let mut pos = 0;
        for node in &self.children {
            let len = node.inline_len();
            if let Node::Text(t) = node {
                let start = pos.max(from);
                let end = (pos + len).min(to);
                if start < end {
                    out.push((start, end, &t.marks));
                }
            }
            pos += len;
        }
        out
    }

    /// The contiguous range around `offset` whose text carries `mark`.
    pub fn mark_extent(&self, offset: usize, mark: &Mark) -> Option<(usize, usize)> {
        let mut spans = Vec::new();
        let mut pos = 0;
        for node in &self.children {
            let len = node.inline_len();
            let has = matches!(node, Node::Text(t) if t.marks.contains(mark));
            spans.push((pos, pos + len, has));
            pos += len;
        }
        let hit = spans
            .iter()
            .position(|&(s, e, has)| has && s <= offset && offset <= e)?;
        let mut first = hit;
        while first > 0 && spans[first - 1].2 {
            first -= 1;
        }
        let mut last = hit;
        while last + 1 < spans.len() && spans[last + 1].2 {
            last += 1;
        }
        Some((spans[first].0, spans[last].1))
    }

    /// Marks of a kind present anywhere in `from..to`.
    pub fn has_mark_kind(&self, from: usize, to: usize, kind: MarkKind) -> bool {
        self.runs(from, to)
            .iter()
            .any(|(_, _, marks)| marks.has_kind(kind))
    }
}

pub fn inline_len(nodes: &[Node]) -> usize {
    nodes.iter().map(Node::inline_len).sum()
}

/// Splits inline content at a character offset.
pub fn split_inline(nodes: &[Node], offset: usize) -> (Vec<Node>, Vec<Node>) {
    let mut before = Vec::new();
    let mut after = Vec::new();
    let mut pos = 0;
    for node in nodes {
        let len = node.inline_len();
        if pos + len <= offset {
            before.push(node.clone());
        } else if pos >= offset {
            after.push(node.clone());
        } else if let Node::Text(t) = node {
            let (a, b) = t.split_at(offset - pos);
            before.push(Node::Text(a));
            after.push(Node::Text(b));
        }
        pos += len;
    }
    (before, after)
}

pub fn slice_inline(nodes: &[Node], from: usize, to: usize) -> Vec<Node> {
    let (_, rest) = split_inline(nodes, from);
    let (middle, _) = split_inline(&rest, to.saturating_sub(from));
    middle
}

/// Canonical inline form: no empty text, adjacent runs with equal marks merged.
pub fn normalize_inline(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(t) if t.is_empty() => {}
            Node::Text(t) => {
                if let Some(Node::Text(prev)) = out.last_mut()
                    && prev.marks == t.marks
                {
                    prev.text.push_str(&t.text);
                    continue;
                }
                out.push(Node::Text(t));
            }
            other => out.push(other),
        }
    }
    out
}

/// Converts inline content moving between a code block and a rich textblock.
///
/// Into code, marks are dropped and hard breaks become newlines. Out of code,
/// newlines become hard breaks.
pub fn coerce_inline(nodes: Vec<Node>, into_code: bool) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Block(b) if b.kind.is_inline() && into_code => out.push(Node::text("\n")),
            Node::Text(t) if into_code => out.push(Node::text(t.text)),
            Node::Text(t) if t.text.contains('\n') => {
                for (i, piece) in t.text.split('\n').enumerate() {
                    if i > 0 {
                        out.push(Node::hard_break());
                    }
                    out.push(Node::Text(TextNode {
                        text: piece.to_string(),
                        marks: t.marks.clone(),
                    }));
                }
            }
            other => out.push(other),
        }
    }
    normalize_inline(out)
}

pub(crate) fn char_to_byte(s: &str, offset: usize) -> usize {
    s.char_indices()
        .nth(offset)
        .map(|(byte, _)| byte)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Block {
        Block::paragraph(vec![
            Node::text("ab"),
            Node::marked("cd", [Mark::Bold]),
            Node::hard_break(),
            Node::text("éf"),
        ])
    }

    #[test]
    fn inline_len_counts_chars_and_breaks() {
        assert_eq!(sample().inline_len(), 7);
    }

    #[test]
    fn split_inside_text_run() {
        let (a, b) = split_inline(&sample().children, 3);
        assert_eq!(
            a,
            vec![Node::text("ab"), Node::marked("c", [Mark::Bold])]
        );
        assert_eq!(inline_len(&b), 4);
    }

    #[test]
    fn split_multibyte_text() {
        let (a, b) = split_inline(&[Node::text("héllo")], 2);
        assert_eq!(a, vec![Node::text("hé")]);
        assert_eq!(b, vec![Node::text("llo")]);
    }

    #[test]
    fn replace_inline_merges_runs() {
        let mut block = sample();
        block.replace_inline(2, 5, vec![Node::text("X")]);
        assert_eq!(block.children, vec![Node::text("abXéf")]);
    }

    #[test]
    fn map_marks_only_touches_range() {
        let mut block = Block::paragraph(vec![Node::text("hello")]);
        block.map_marks(1, 3, |m| {
            m.add(Mark::Italic);
        });
        assert_eq!(
            block.children,
            vec![
                Node::text("h"),
                Node::marked("el", [Mark::Italic]),
                Node::text("lo"),
            ]
        );
    }

    #[test]
    fn marks_at_prefers_run_before() {
        let block = sample();
        assert!(block.marks_at(4).has_kind(MarkKind::Bold));
        assert!(!block.marks_at(2).has_kind(MarkKind::Bold));
        assert!(block.marks_at(3).has_kind(MarkKind::Bold));
    }

    #[test]
    fn marks_at_start_uses_following_run() {
        let block = Block::paragraph(vec![Node::marked("x", [Mark::Italic])]);
        assert!(block.marks_at(0).has_kind(MarkKind::Italic));
    }

    #[test]
    fn link_does_not_extend_past_its_end() {
        let block = Block::paragraph(vec![
            Node::marked("site", [Mark::link("https://example.com"), Mark::Bold]),
            Node::text(" after"),
        ]);
        let marks = block.marks_at(4);
        assert!(marks.has_kind(MarkKind::Bold));
        assert!(!marks.has_kind(MarkKind::Link));
        assert!(block.marks_at(2).has_kind(MarkKind::Link));
    }

    #[test]
    fn mark_extent_spans_adjacent_runs() {
        let link = Mark::link("https://example.com");
        let block = Block::paragraph(vec![
            Node::text("go "),
            Node::marked("to", [link.clone()]),
            Node::marked("day", [link.clone(), Mark::Bold]),
            Node::text("!"),
        ]);
        assert_eq!(block.mark_extent(4, &link), Some((3, 8)));
        assert_eq!(block.mark_extent(0, &link), None);
    }

    #[test]
    fn runs_are_clipped() {
        let block = sample();
        let runs: Vec<_> = block.runs(1, 6).iter().map(|r| (r.0, r.1)).collect();
        assert_eq!(runs, vec![(1, 2), (2, 4), (5, 6)]);
    }

    #[test]
    fn coerce_into_code_and_back() {
        let code = coerce_inline(sample().children, true);
        assert_eq!(code, vec![Node::text("abcd\néf")]);

        let rich = coerce_inline(code, false);
        assert_eq!(
            rich,
            vec![Node::text("abcd"), Node::hard_break(), Node::text("éf")]
        );
    }

    #[test]
    fn textblock_paths_in_document_order() {
        let doc = Block::wrap(
            BlockKind::Doc,
            vec![
                Block::paragraph(vec![]),
                Block::wrap(
                    BlockKind::BulletList,
                    vec![Block::wrap(
                        BlockKind::ListItem,
                        vec![Block::paragraph(vec![]), Block::heading(2, vec![])],
                    )],
                ),
                Block::leaf(BlockKind::HorizontalRule, Attrs::default()),
            ],
        );
        assert_eq!(
            doc.textblock_paths(),
            vec![vec![0], vec![1, 0, 0], vec![1, 0, 1]]
        );
    }
}
