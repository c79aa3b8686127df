use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{EditError, Result};

static COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(#[0-9a-fA-F]{3}|#[0-9a-fA-F]{6}|rgba?\(\s*\d{1,3}\s*,\s*\d{1,3}\s*,\s*\d{1,3}\s*(,\s*(0|1|0?\.\d+)\s*)?\))$")
        .expect("color pattern is valid")
});

/// Kind of an inline mark, without its parameters.
///
/// Declaration order is the nesting order used when marks are serialized:
/// links wrap everything, code sits innermost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkKind {
    Link,
    Bold,
    Italic,
    Underline,
    Strike,
    Color,
    Code,
}

impl MarkKind {
    pub const ALL: [MarkKind; 7] = [
        MarkKind::Link,
        MarkKind::Bold,
        MarkKind::Italic,
        MarkKind::Underline,
        MarkKind::Strike,
        MarkKind::Color,
        MarkKind::Code,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MarkKind::Link => "link",
            MarkKind::Bold => "bold",
            MarkKind::Italic => "italic",
            MarkKind::Underline => "underline",
            MarkKind::Strike => "strike",
            MarkKind::Color => "color",
            MarkKind::Code => "code",
        }
    }

    /// Whether a run carrying `self` refuses `other`.
    ///
    /// Inline code excludes every visual formatting mark. Links combine with anything.
    pub fn excludes(self, other: MarkKind) -> bool {
        match self {
            MarkKind::Code => !matches!(other, MarkKind::Code | MarkKind::Link),
            _ => false,
        }
    }

    /// Inclusive marks extend to text typed at their end boundary.
    pub fn is_inclusive(self) -> bool {
        !matches!(self, MarkKind::Link)
    }
}

/// Inline formatting attached to a text run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Link { href: String },
    Bold,
    Italic,
    Underline,
    Strike,
    Color { value: String },
    Code,
}

impl Mark {
    pub fn link(href: impl Into<String>) -> Self {
        Mark::Link { href: href.into() }
    }

    pub fn color(value: impl Into<String>) -> Self {
        Mark::Color {
            value: value.into(),
        }
    }

    pub fn kind(&self) -> MarkKind {
        match self {
            Mark::Link { .. } => MarkKind::Link,
            Mark::Bold => MarkKind::Bold,
            Mark::Italic => MarkKind::Italic,
            Mark::Underline => MarkKind::Underline,
            Mark::Strike => MarkKind::Strike,
            Mark::Color { .. } => MarkKind::Color,
            Mark::Code => MarkKind::Code,
        }
    }

    /// Checks the mark's parameters.
    pub fn validate(&self) -> Result<()> {
        match self {
            Mark::Link { href } if href.trim().is_empty() => {
                Err(EditError::schema(&[], "link mark needs a non-empty href"))
            }
            Mark::Color { value } if !is_valid_color(value) => Err(EditError::schema(
                &[],
                format!("unsupported color value {value:?}"),
            )),
            _ => Ok(()),
        }
    }
}

pub fn is_valid_color(value: &str) -> bool {
    COLOR.is_match(value.trim())
}

/// The set of marks carried by one text run.
///
/// Holds at most one mark per [`MarkKind`] and iterates in serialization order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkSet(BTreeSet<Mark>);

impl MarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mark> {
        self.0.iter()
    }

    pub fn contains(&self, mark: &Mark) -> bool {
        self.0.contains(mark)
    }

    pub fn has_kind(&self, kind: MarkKind) -> bool {
        self.0.iter().any(|m| m.kind() == kind)
    }

    pub fn get(&self, kind: MarkKind) -> Option<&Mark> {
        self.0.iter().find(|m| m.kind() == kind)
    }

    /// Whether a mark of `kind` may be added to this set.
    pub fn allows(&self, kind: MarkKind) -> bool {
        !self
            .0
            .iter()
            .any(|m| m.kind() != kind && m.kind().excludes(kind))
    }

    /// Adds `mark`, replacing any mark of the same kind and dropping marks it
    /// excludes. Returns `false` (and leaves the set alone) when an existing
    /// mark excludes it.
    pub fn add(&mut self, mark: Mark) -> bool {
        let kind = mark.kind();
        if !self.allows(kind) {
            return false;
        }
        self.0
            .retain(|m| m.kind() != kind && !kind.excludes(m.kind()));
        self.0.insert(mark);
        true
    }

    /// Removes the mark of `kind`, returning whether one was present.
    pub fn remove(&mut self, kind: MarkKind) -> bool {
        let before = self.0.len();
        self.0.retain(|m| m.kind() != kind);
        before != self.0.len()
    }

    pub fn with(mut self, mark: Mark) -> Self {
        self.add(mark);
        self
    }

    /// Marks that continue onto text typed at the end of a run carrying them.
    pub fn inclusive(&self) -> MarkSet {
        MarkSet(
            self.0
                .iter()
                .filter(|m| m.kind().is_inclusive())
                .cloned()
                .collect(),
        )
    }
}

impl FromIterator<Mark> for MarkSet {
    fn from_iter<T: IntoIterator<Item = Mark>>(iter: T) -> Self {
        let mut set = MarkSet::new();
        for mark in iter {
            set.add(mark);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn adding_same_kind_replaces_params() {
        let mut set = MarkSet::new().with(Mark::link("https://a.example"));
        assert!(set.add(Mark::link("https://b.example")));

        assert_eq!(set.len(), 1);
        assert!(set.contains(&Mark::link("https://b.example")));
    }

    #[test]
    fn link_keeps_other_marks() {
        let set = MarkSet::new()
            .with(Mark::Bold)
            .with(Mark::Italic)
            .with(Mark::link("https://example.com"));

        assert_eq!(set.len(), 3);
    }

    #[test]
    fn code_strips_formatting_but_keeps_link() {
        let mut set = MarkSet::new()
            .with(Mark::Bold)
            .with(Mark::color("#ff0000"))
            .with(Mark::link("https://example.com"));
        assert!(set.add(Mark::Code));

        let kinds: Vec<_> = set.iter().map(Mark::kind).collect();
        assert_eq!(kinds, vec![MarkKind::Link, MarkKind::Code]);
    }

    #[test]
    fn code_refuses_bold() {
        let mut set = MarkSet::new().with(Mark::Code);
        assert!(!set.add(Mark::Bold));
        assert!(!set.has_kind(MarkKind::Bold));
        assert!(!set.allows(MarkKind::Italic));
        assert!(set.allows(MarkKind::Link));
    }

    #[test]
    fn iteration_follows_nesting_order() {
        let set: MarkSet = [Mark::Code, Mark::Bold, Mark::link("x")]
            .into_iter()
            .collect();
        // code excludes bold, so bold is dropped when code is added first
        let kinds: Vec<_> = set.iter().map(Mark::kind).collect();
        assert_eq!(kinds, vec![MarkKind::Link, MarkKind::Code]);

        let set: MarkSet = [Mark::Underline, Mark::Bold, Mark::Italic]
            .into_iter()
            .collect();
        let kinds: Vec<_> = set.iter().map(Mark::kind).collect();
        assert_eq!(
            kinds,
            vec![MarkKind::Bold, MarkKind::Italic, MarkKind::Underline]
        );
    }

    #[test]
    fn inclusive_drops_links() {
        let set = MarkSet::new().with(Mark::Bold).with(Mark::link("x"));
        let inclusive = set.inclusive();
        assert!(inclusive.has_kind(MarkKind::Bold));
        assert!(!inclusive.has_kind(MarkKind::Link));
    }

    #[rstest]
    #[case("#fff", true)]
    #[case("#FF00aa", true)]
    #[case("rgb(1, 2, 3)", true)]
    #[case("rgba(10,20,30,0.5)", true)]
    #[case("#ff00", false)]
    #[case("red; background: url(x)", false)]
    #[case("", false)]
    fn color_validation(#[case] value: &str, #[case] valid: bool) {
        assert_eq!(Mark::color(value).validate().is_ok(), valid);
    }

    #[test]
    fn empty_link_is_rejected() {
        assert!(matches!(
            Mark::link("  ").validate(),
            Err(EditError::SchemaViolation { .. })
        ));
    }
}
