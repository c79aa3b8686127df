use serde::{Deserialize, Serialize};

/// Horizontal alignment of a paragraph or heading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl Align {
    pub fn as_str(self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
            Align::Justify => "justify",
        }
    }

    pub fn parse(value: &str) -> Option<Align> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Align::Left),
            "center" => Some(Align::Center),
            "right" | "end" => Some(Align::Right),
            "justify" => Some(Align::Justify),
            _ => None,
        }
    }
}

/// Attributes of a block node. Which fields are meaningful depends on the
/// node kind; the schema rejects attributes on kinds that don't take them.
///
/// Defaults are stored as `None` so that equal documents compare equal no
/// matter how they were built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colspan: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rowspan: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u32>,
}

impl Attrs {
    pub fn heading(level: u8) -> Self {
        Attrs {
            level: Some(level),
            ..Default::default()
        }
    }

    pub fn image(src: impl Into<String>) -> Self {
        Attrs {
            src: Some(src.into()),
            ..Default::default()
        }
    }

    pub fn code(language: Option<String>) -> Self {
        Attrs {
            language,
            ..Default::default()
        }
    }

    pub fn span(colspan: u32, rowspan: u32) -> Self {
        Attrs {
            colspan: Some(colspan),
            rowspan: Some(rowspan),
            ..Default::default()
        }
        .normalized()
    }

    pub fn is_empty(&self) -> bool {
        *self == Attrs::default()
    }

    pub fn col_span(&self) -> u32 {
        self.colspan.unwrap_or(1)
    }

    pub fn row_span(&self) -> u32 {
        self.rowspan.unwrap_or(1)
    }

    /// Drops values that equal the implied default.
    pub fn normalized(mut self) -> Self {
        if self.align == Some(Align::Left) {
            self.align = None;
        }
        if self.colspan == Some(1) {
            self.colspan = None;
        }
        if self.rowspan == Some(1) {
            self.rowspan = None;
        }
        if self.start == Some(1) {
            self.start = None;
        }
        if self.language.as_deref().is_some_and(|l| l.trim().is_empty()) {
            self.language = None;
        }
        self
    }

    /// True when every field set in `pattern` has the same value here.
    pub fn matches(&self, pattern: &Attrs) -> bool {
        fn field<T: PartialEq>(have: &Option<T>, want: &Option<T>) -> bool {
            want.is_none() || have == want
        }
        field(&self.level, &pattern.level)
            && (pattern.align.is_none()
                || self.align.unwrap_or_default() == pattern.align.unwrap_or_default())
            && field(&self.src, &pattern.src)
            && field(&self.alt, &pattern.alt)
            && field(&self.title, &pattern.title)
            && (pattern.colspan.is_none() || self.col_span() == pattern.col_span())
            && (pattern.rowspan.is_none() || self.row_span() == pattern.row_span())
            && field(&self.language, &pattern.language)
            && field(&self.start, &pattern.start)
    }
}
