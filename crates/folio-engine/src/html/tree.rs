//! Builds an element tree from tokens, closing what the markup leaves open.

use super::lexer::Token;
use super::{ParseWarning, Warnings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dom {
    Element(Element),
    /// Raw text, entities still encoded.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Dom>,
}

impl Element {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose end tag may be left out without a warning.
const OPTIONAL_END: &[&str] = &[
    "p", "li", "td", "th", "tr", "thead", "tbody", "tfoot", "colgroup", "html", "head", "body",
    "option",
];

/// Elements that close an open `<p>` when they start.
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre",
    "section", "table", "ul",
];

pub fn build(tokens: Vec<Token>, warnings: &mut Warnings) -> Vec<Dom> {
    let mut builder = TreeBuilder {
        root: Vec::new(),
        open: Vec::new(),
    };
    for token in tokens {
        match token {
            Token::Text(text) => builder.append(Dom::Text(text)),
            Token::Start {
                name,
                attrs,
                self_closing,
            } => builder.start(name, attrs, self_closing),
            Token::End { name } => builder.end(&name, warnings),
        }
    }
    while let Some(element) = builder.open.pop() {
        if !OPTIONAL_END.contains(&element.name.as_str()) {
            warnings.push(ParseWarning::UnclosedTag {
                tag: element.name.clone(),
            });
        }
        builder.append(Dom::Element(element));
    }
    builder.root
}

struct TreeBuilder {
    root: Vec<Dom>,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn append(&mut self, node: Dom) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.root.push(node),
        }
    }

    fn current(&self) -> Option<&str> {
        self.open.last().map(|e| e.name.as_str())
    }

    /// Closes the innermost open element.
    fn close(&mut self) {
        if let Some(element) = self.open.pop() {
            self.append(Dom::Element(element));
        }
    }

    /// Closes elements up to and including the nearest `name` when one is
    /// open below any of the `boundary` elements.
    fn close_implied(&mut self, name: &str, boundary: &[&str]) {
        let Some(at) = self
            .open
            .iter()
            .rposition(|e| e.name == name || boundary.contains(&e.name.as_str()))
        else {
            return;
        };
        if self.open[at].name != name {
            return;
        }
        while self.open.len() > at {
            self.close();
        }
    }

    fn start(&mut self, name: String, attrs: Vec<(String, String)>, self_closing: bool) {
        if CLOSES_PARAGRAPH.contains(&name.as_str()) && self.current() == Some("p") {
            self.close();
        }
        match name.as_str() {
            "li" => self.close_implied("li", &["ul", "ol"]),
            "td" | "th" => {
                self.close_implied("td", &["tr", "table"]);
                self.close_implied("th", &["tr", "table"]);
            }
            "tr" => self.close_implied("tr", &["table"]),
            _ => {}
        }

        let element = Element {
            name,
            attrs,
            children: Vec::new(),
        };
        if self_closing || VOID.contains(&element.name.as_str()) {
            self.append(Dom::Element(element));
        } else {
            self.open.push(element);
        }
    }

    fn end(&mut self, name: &str, warnings: &mut Warnings) {
        if VOID.contains(&name) {
            return;
        }
        let Some(at) = self.open.iter().rposition(|e| e.name == name) else {
            warnings.push(ParseWarning::StrayEndTag {
                tag: name.to_string(),
            });
            return;
        };
        while self.open.len() > at + 1 {
            if let Some(inner) = self.current()
                && !OPTIONAL_END.contains(&inner)
            {
                warnings.push(ParseWarning::UnclosedTag {
                    tag: inner.to_string(),
                });
            }
            self.close();
        }
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn tree(input: &str) -> (Vec<Dom>, Vec<ParseWarning>) {
        let mut warnings = Warnings::default();
        let tokens = tokenize(input, &mut warnings);
        let dom = build(tokens, &mut warnings);
        (dom, warnings.into_vec())
    }

    /// Compact rendering of a tree for assertions.
    fn shape(nodes: &[Dom]) -> String {
        nodes
            .iter()
            .map(|n| match n {
                Dom::Text(t) => format!("{t:?}"),
                Dom::Element(e) => format!("{}({})", e.name, shape(&e.children)),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn nests_elements() {
        let (dom, warnings) = tree("<p>a<strong>b</strong></p><hr>");
        assert_eq!(shape(&dom), r#"p("a" strong("b")) hr()"#);
        assert!(warnings.is_empty());
    }

    #[test]
    fn implied_end_tags() {
        let (dom, warnings) = tree("<ul><li>a<li>b</ul><p>x<p>y");
        assert_eq!(
            shape(&dom),
            r#"ul(li("a") li("b")) p("x") p("y")"#
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn table_cells_close_each_other() {
        let (dom, _) = tree("<table><tr><td>a<td>b<tr><th>c</table>");
        assert_eq!(
            shape(&dom),
            r#"table(tr(td("a") td("b")) tr(th("c")))"#
        );
    }

    #[test]
    fn block_start_closes_paragraph() {
        let (dom, _) = tree("<p>a<div>b</div>");
        assert_eq!(shape(&dom), r#"p("a") div("b")"#);
    }

    #[test]
    fn mismatched_end_tags() {
        let (dom, warnings) = tree("<em><b>x</em>y</b>");
        assert_eq!(shape(&dom), r#"em(b("x")) "y""#);
        assert_eq!(
            warnings,
            vec![
                ParseWarning::UnclosedTag { tag: "b".into() },
                ParseWarning::StrayEndTag { tag: "b".into() },
            ]
        );
    }

    #[test]
    fn attr_lookup() {
        let (dom, _) = tree(r#"<a href="x" title="t">"#);
        let Dom::Element(a) = &dom[0] else {
            panic!("expected element");
        };
        assert_eq!(a.attr("href"), Some("x"));
        assert_eq!(a.attr("rel"), None);
    }
}
