use super::cursor::Cursor;
use super::{ParseWarning, Warnings};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Start {
        name: String,
        /// Attribute values have entities decoded.
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    End {
        name: String,
    },
    /// Raw text, entities still encoded.
    Text(String),
}

/// Elements whose content is read verbatim up to their end tag.
const RAW_TEXT: &[&str] = &["script", "style", "textarea", "title", "template"];

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':' || b == b'_'
}

fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Text(prev)) = tokens.last_mut() {
        prev.push_str(text);
    } else {
        tokens.push(Token::Text(text.to_string()));
    }
}

pub fn tokenize(input: &str, warnings: &mut Warnings) -> Vec<Token> {
    let mut cur = Cursor::new(input);
    let mut tokens = Vec::new();

    while !cur.eof() {
        let start = cur.pos();
        if cur.peek() != Some(b'<') {
            cur.take_while(|b| b != b'<');
            push_text(&mut tokens, cur.slice(start));
            continue;
        }

        if cur.starts_with("<!--") {
            cur.bump_n(4);
            if cur.take_until("-->").is_none() {
                warnings.push(ParseWarning::MalformedMarkup {
                    offset: start,
                    reason: "unterminated comment".into(),
                });
                cur.skip_to_end();
            }
            continue;
        }

        if matches!(cur.peek_at(1), Some(b'!' | b'?')) {
            cur.bump_n(2);
            if cur.take_until(">").is_none() {
                warnings.push(ParseWarning::MalformedMarkup {
                    offset: start,
                    reason: "unterminated declaration".into(),
                });
                cur.skip_to_end();
            }
            continue;
        }

        let closing = cur.peek_at(1) == Some(b'/');
        let name_at = if closing { 2 } else { 1 };
        if !cur.peek_at(name_at).is_some_and(|b| b.is_ascii_alphabetic()) {
            // a lone `<` is text
            cur.bump();
            push_text(&mut tokens, "<");
            continue;
        }

        match read_tag(&mut cur, closing) {
            Some(token) => {
                let raw = match &token {
                    Token::Start {
                        name,
                        self_closing: false,
                        ..
                    } if RAW_TEXT.contains(&name.as_str()) => Some(name.clone()),
                    _ => None,
                };
                tokens.push(token);
                if let Some(name) = raw {
                    read_raw_text(&mut cur, &name, &mut tokens, warnings);
                }
            }
            None => {
                warnings.push(ParseWarning::MalformedMarkup {
                    offset: start,
                    reason: "tag is never closed with `>`".into(),
                });
                cur.skip_to_end();
                push_text(&mut tokens, &input[start..]);
            }
        }
    }
    tokens
}

/// Reads one tag after its `<`, or `None` when input ends inside it.
fn read_tag(cur: &mut Cursor<'_>, closing: bool) -> Option<Token> {
    cur.bump_n(if closing { 2 } else { 1 });
    let name = cur.take_while(is_name_byte).to_ascii_lowercase();

    if closing {
        cur.take_until(">")?;
        return Some(Token::End { name });
    }

    let mut attrs = Vec::new();
    loop {
        cur.skip_whitespace();
        match cur.peek()? {
            b'>' => {
                cur.bump();
                return Some(Token::Start {
                    name,
                    attrs,
                    self_closing: false,
                });
            }
            b'/' if cur.peek_at(1) == Some(b'>') => {
                cur.bump_n(2);
                return Some(Token::Start {
                    name,
                    attrs,
                    self_closing: true,
                });
            }
            b'/' => {
                cur.bump();
            }
            _ => {
                let key = cur
                    .take_while(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/'))
                    .to_ascii_lowercase();
                if key.is_empty() {
                    // stray `=` or quote
                    cur.bump();
                    continue;
                }
                cur.skip_whitespace();
                let value = if cur.peek()? == b'=' {
                    cur.bump();
                    cur.skip_whitespace();
                    read_value(cur)?
                } else {
                    String::new()
                };
                if !attrs.iter().any(|(k, _)| *k == key) {
                    attrs.push((key, value));
                }
            }
        }
    }
}

fn read_value(cur: &mut Cursor<'_>) -> Option<String> {
    let raw = match cur.peek()? {
        quote @ (b'"' | b'\'') => {
            cur.bump();
            let delim = if quote == b'"' { "\"" } else { "'" };
            cur.take_until(delim)?
        }
        _ => cur.take_while(|b| !b.is_ascii_whitespace() && b != b'>'),
    };
    Some(html_escape::decode_html_entities(raw).into_owned())
}

fn read_raw_text(cur: &mut Cursor<'_>, name: &str, tokens: &mut Vec<Token>, warnings: &mut Warnings) {
    let end_tag = format!("</{name}");
    match cur.take_until_ignore_case(&end_tag) {
        Some(content) => {
            push_text(tokens, content);
            if cur.take_until(">").is_none() {
                cur.skip_to_end();
            }
        }
        None => {
            warnings.push(ParseWarning::UnclosedTag {
                tag: name.to_string(),
            });
            push_text(tokens, cur.rest());
            cur.skip_to_end();
        }
    }
    tokens.push(Token::End {
        name: name.to_string(),
    });
}
