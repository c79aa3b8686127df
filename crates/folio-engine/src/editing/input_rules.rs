//! Rewrites that follow typed text: typographic replacements and link
//! detection. Each returns a transaction against the state the typing left,
//! or `None` when nothing applies.

use std::sync::LazyLock;

use regex::Regex;

use super::state::EditorState;
use super::step::Step;
use super::transaction::{Draft, EditKind, Transaction};
use crate::model::{Block, BlockKind, Mark, MarkKind, Node, Position, Selection, TextNode};

/// Which rules run after `insertText`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRules {
    pub typography: bool,
    pub autolink: bool,
}

impl Default for InputRules {
    fn default() -> Self {
        InputRules {
            typography: true,
            autolink: true,
        }
    }
}

struct TextRule {
    /// Anchored at the cursor. Group 1, when present, is the part replaced.
    pattern: Regex,
    replacement: &'static str,
}

/// First match wins.
static TYPOGRAPHY: LazyLock<Vec<TextRule>> = LazyLock::new(|| {
    [
        (r"--$", "\u{2014}"),
        (r"\.\.\.$", "\u{2026}"),
        (r#"(?:^|[\s{\[(<'"\x{2018}\x{201C}])(")$"#, "\u{201C}"),
        (r#""$"#, "\u{201D}"),
        (r#"(?:^|[\s{\[(<'"\x{2018}\x{201C}])(')$"#, "\u{2018}"),
        (r"'$", "\u{2019}"),
        (r"<-$", "\u{2190}"),
        (r"->$", "\u{2192}"),
        (r"\(c\)$", "\u{00A9}"),
        (r"\(tm\)$", "\u{2122}"),
        (r"\(sm\)$", "\u{2120}"),
        (r"\(r\)$", "\u{00AE}"),
        (r"(?:^|\s)(1/2)\s$", "\u{00BD}"),
        (r"\+/-$", "\u{00B1}"),
        (r"!=$", "\u{2260}"),
        (r"<<$", "\u{00AB}"),
        (r">>$", "\u{00BB}"),
        (r"\d+\s?([*x])\s?\d+$", "\u{00D7}"),
        (r"\^2$", "\u{00B2}"),
        (r"\^3$", "\u{00B3}"),
        (r"(?:^|\s)(1/4)\s$", "\u{00BC}"),
        (r"(?:^|\s)(3/4)\s$", "\u{00BE}"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| TextRule {
        pattern: Regex::new(pattern).expect("typography patterns are valid"),
        replacement,
    })
    .collect()
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:https?://[^\s/$.?#][^\s]*|www\.[^\s.]+\.[^\s]+)$").expect("url pattern is valid")
});

/// Placeholder for inline leaves such as hard breaks.
const LEAF: char = '\u{FFFC}';

/// The textblock at a collapsed cursor, unless it is a code block.
fn prose_block(state: &EditorState) -> Option<(&Block, &Position)> {
    if !state.selection.is_collapsed() {
        return None;
    }
    let head = &state.selection.head;
    let block = state.doc.textblock(&head.path)?;
    (block.kind != BlockKind::CodeBlock).then_some((block, head))
}

/// Characters of `block` before `offset`, one per inline position.
fn chars_before(block: &Block, offset: usize) -> Vec<char> {
    let mut out = Vec::new();
    for child in &block.children {
        match child {
            Node::Text(t) => out.extend(t.text.chars()),
            Node::Block(b) if b.kind.is_inline() => out.push(LEAF),
            Node::Block(_) => {}
        }
    }
    out.truncate(offset);
    out
}

fn touches(block: &Block, from: usize, to: usize, kind: MarkKind) -> bool {
    block
        .runs(from, to)
        .iter()
        .any(|(_, _, marks)| marks.has_kind(kind))
}

/// Replaces the typed sequence ending at the cursor (`--`, `...`, quotes,
/// arrows, `(c)` and the like) with its typographic character.
pub fn typography(state: &EditorState, typed: &str) -> Option<Transaction> {
    if typed.is_empty() || typed.contains('\n') {
        return None;
    }
    let (block, head) = prose_block(state)?;
    let before: String = chars_before(block, head.offset).into_iter().collect();

    let (rule, range) = TYPOGRAPHY.iter().find_map(|rule| {
        let caps = rule.pattern.captures(&before)?;
        let m = caps.get(1).or_else(|| caps.get(0))?;
        Some((rule, m.range()))
    })?;
    let from = before[..range.start].chars().count();
    let matched = &before[range];
    let to = from + matched.chars().count();
    if touches(block, from, to, MarkKind::Code) {
        return None;
    }

    let marks = block
        .runs(from, from + 1)
        .first()
        .map(|(_, _, marks)| (*marks).clone())
        .unwrap_or_default();
    let path = head.path.clone();
    let mut draft = Draft::new(&state.doc);
    draft
        .push(Step::DeleteText {
            from: Position::new(path.clone(), from),
            to: Position::new(path.clone(), to),
        })
        .ok()?;
    draft
        .push(Step::InsertText {
            at: Position::new(path.clone(), from),
            nodes: vec![Node::Text(TextNode {
                text: rule.replacement.to_string(),
                marks,
            })],
        })
        .ok()?;
    log::trace!("typography: {matched:?} -> {}", rule.replacement);

    let cursor = head.offset - (to - from) + rule.replacement.chars().count();
    Some(draft.finish(
        Selection::cursor(Position::new(path, cursor)),
        None,
        EditKind::Structural,
    ))
}

/// Links the word before typed whitespace when it looks like a URL.
/// `www.` addresses get an `http://` href.
pub fn autolink(state: &EditorState, typed: &str) -> Option<Transaction> {
    if !typed.ends_with(|c: char| c.is_whitespace()) {
        return None;
    }
    let (block, head) = prose_block(state)?;
    let chars = chars_before(block, head.offset);

    let mut end = chars.len();
    while end > 0 && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    while end > 0 && matches!(chars[end - 1], '.' | ',' | ';' | ':' | '!' | '?') {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && !chars[start - 1].is_whitespace() && chars[start - 1] != LEAF {
        start -= 1;
    }
    if start == end {
        return None;
    }
    let word: String = chars[start..end].iter().collect();
    if !URL.is_match(&word) {
        return None;
    }
    if touches(block, start, end, MarkKind::Link) || touches(block, start, end, MarkKind::Code) {
        return None;
    }

    let href = if word.to_ascii_lowercase().starts_with("www.") {
        format!("http://{word}")
    } else {
        word
    };
    let path = head.path.clone();
    let mut draft = Draft::new(&state.doc);
    draft
        .push(Step::SetMark {
            from: Position::new(path.clone(), start),
            to: Position::new(path, end),
            mark: Mark::link(href),
        })
        .ok()?;
    Some(draft.finish(state.selection.clone(), None, EditKind::Typing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use crate::tests::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn typed_at_end(text: &str) -> EditorState {
        let len = text.chars().count();
        cursor_state(vec![p(text)], &[0], len)
    }

    fn replaced(text: &str) -> Option<String> {
        let last = text.chars().last()?.to_string();
        let state = typed_at_end(text);
        let tr = typography(&state, &last)?;
        Some(state.apply(&tr).unwrap().doc.text())
    }

    #[rstest]
    #[case("a--", "a\u{2014}")]
    #[case("wait...", "wait\u{2026}")]
    #[case("say \"", "say \u{201C}")]
    #[case("\u{201C}hi\"", "\u{201C}hi\u{201D}")]
    #[case("it'", "it\u{2019}")]
    #[case("'", "\u{2018}")]
    #[case("a->", "a\u{2192}")]
    #[case("<-", "\u{2190}")]
    #[case("(c)", "\u{00A9}")]
    #[case("(tm)", "\u{2122}")]
    #[case("+/-", "\u{00B1}")]
    #[case("a !=", "a \u{2260}")]
    #[case("<<", "\u{00AB}")]
    #[case("2x3", "2\u{00D7}3")]
    #[case("x^2", "x\u{00B2}")]
    #[case("take 1/2 ", "take \u{00BD} ")]
    fn replaces_typed_sequences(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(replaced(text).as_deref(), Some(expected));
    }

    #[rstest]
    #[case("a-")]
    #[case("..")]
    #[case("1/2")]
    #[case("plain")]
    fn leaves_other_text_alone(#[case] text: &str) {
        assert_eq!(replaced(text), None);
    }

    #[test]
    fn replacement_keeps_marks_and_moves_cursor() {
        let state = cursor_state(
            vec![para(vec![Node::text("a "), Node::marked("--", [Mark::Bold])])],
            &[0],
            4,
        );
        let next = state.apply(&typography(&state, "-").unwrap()).unwrap();
        assert_eq!(
            next.doc,
            doc(vec![para(vec![
                Node::text("a "),
                Node::marked("\u{2014}", [Mark::Bold])
            ])])
        );
        assert_eq!(next.selection, Selection::cursor(at(&[0], 3)));
    }

    #[test]
    fn code_is_never_rewritten() {
        let block = cursor_state(vec![code("a--")], &[0], 3);
        assert!(typography(&block, "-").is_none());

        let inline = cursor_state(
            vec![para(vec![Node::marked("a--", [Mark::Code])])],
            &[0],
            3,
        );
        assert!(typography(&inline, "-").is_none());
    }

    #[test]
    fn links_url_before_typed_space() {
        let state = typed_at_end("see https://example.com/a. ");
        let next = state.apply(&autolink(&state, " ").unwrap()).unwrap();
        assert_eq!(
            next.doc,
            doc(vec![para(vec![
                Node::text("see "),
                Node::marked("https://example.com/a", [Mark::link("https://example.com/a")]),
                Node::text(". "),
            ])])
        );
        assert_eq!(next.selection, state.selection);
    }

    #[test]
    fn www_addresses_get_a_scheme() {
        let state = typed_at_end("www.example.org ");
        let next = state.apply(&autolink(&state, " ").unwrap()).unwrap();
        assert_eq!(
            next.doc,
            doc(vec![para(vec![
                Node::marked("www.example.org", [Mark::link("http://www.example.org")]),
                Node::text(" "),
            ])])
        );
    }

    #[rstest]
    #[case("example ")]
    #[case("e.g. ")]
    #[case("https://example.com")]
    fn non_urls_are_not_linked(#[case] text: &str) {
        let state = typed_at_end(text);
        let last = text.chars().last().unwrap().to_string();
        assert!(autolink(&state, &last).is_none());
    }

    #[test]
    fn existing_links_are_kept() {
        let state = cursor_state(
            vec![para(vec![
                Node::marked("https://a.example", [Mark::link("https://b.example")]),
                Node::text(" "),
            ])],
            &[0],
            18,
        );
        assert!(autolink(&state, " ").is_none());
    }
}
