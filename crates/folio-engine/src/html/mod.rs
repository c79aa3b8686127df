//! HTML codec.
//!
//! Documents serialize to the HTML subset a tiptap editor emits from
//! `getHTML()`: `<p>`, `<h1>`..`<h6>`, `<ul>`/`<ol>`/`<li>`, `<blockquote>`,
//! `<pre><code>`, `<table>`, `<hr>`, `<img>`, `<br>` and the inline marks
//! `<strong>`, `<em>`, `<u>`, `<s>`, `<code>`, `<a href>` and
//! `<span style="color: ...">`.
//!
//! Parsing is lenient. Malformed input never fails; it yields the best
//! document that can be recovered plus a list of [`ParseWarning`]s:
//!
//! - unknown elements are unwrapped (content kept) or, with
//!   [`UnknownTagPolicy::Drop`], removed together with their content;
//! - unknown block-level elements (`div`, `section`, ...) also end the
//!   current paragraph;
//! - `script`, `style`, `template`, `head` and `title` content is dropped;
//! - unclosed elements close at the end of their parent, stray end tags are
//!   ignored;
//! - ragged tables are padded to a rectangle.
//!
//! Whitespace inside text is kept as written, except that runs containing a
//! line break or tab collapse to one space and are trimmed at textblock
//! edges. Presentational attributes (`class`, `target`, `rel`, table widths)
//! are not kept.

mod cursor;
mod lexer;
mod parser;
mod tree;
mod writer;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EditError, Result};
use crate::model::Document;

pub use writer::write_document;

/// What lenient parsing does with elements outside the supported subset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTagPolicy {
    /// Drop the tag, keep its content.
    #[default]
    Unwrap,
    /// Drop the tag and its content.
    Drop,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub unknown_tags: UnknownTagPolicy,
}

/// A recovery made while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "warning", rename_all = "camelCase")]
pub enum ParseWarning {
    UnknownTag { tag: String },
    DroppedContent { tag: String },
    UnclosedTag { tag: String },
    StrayEndTag { tag: String },
    MalformedMarkup { offset: usize, reason: String },
    Repaired { reason: String },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::UnknownTag { tag } => write!(f, "unknown element <{tag}> unwrapped"),
            ParseWarning::DroppedContent { tag } => write!(f, "content of <{tag}> dropped"),
            ParseWarning::UnclosedTag { tag } => write!(f, "<{tag}> was never closed"),
            ParseWarning::StrayEndTag { tag } => write!(f, "stray </{tag}> ignored"),
            ParseWarning::MalformedMarkup { offset, reason } => {
                write!(f, "malformed markup at byte {offset}: {reason}")
            }
            ParseWarning::Repaired { reason } => write!(f, "repaired: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub document: Document,
    pub warnings: Vec<ParseWarning>,
}

/// Collects warnings, logging each as it is raised.
#[derive(Debug, Default)]
pub(crate) struct Warnings(Vec<ParseWarning>);

impl Warnings {
    pub fn push(&mut self, warning: ParseWarning) {
        log::warn!("html: {warning}");
        self.0.push(warning);
    }

    pub fn into_vec(self) -> Vec<ParseWarning> {
        self.0
    }
}

/// Lenient parse. Never fails.
pub fn parse(input: &str, options: &ParseOptions) -> ParseOutcome {
    let mut warnings = Warnings::default();
    let tokens = lexer::tokenize(input, &mut warnings);
    let dom = tree::build(tokens, &mut warnings);
    let document = parser::to_document(&dom, options, &mut warnings);
    ParseOutcome {
        document,
        warnings: warnings.into_vec(),
    }
}

/// Parse that rejects any input needing recovery.
pub fn parse_strict(input: &str, options: &ParseOptions) -> Result<Document> {
    let outcome = parse(input, options);
    if outcome.warnings.is_empty() {
        return Ok(outcome.document);
    }
    let reasons: Vec<String> = outcome.warnings.iter().map(ToString::to_string).collect();
    Err(EditError::Deserialization(reasons.join("; ")))
}
