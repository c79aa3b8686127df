/// Byte cursor over markup input.
///
/// Every delimiter the lexer stops on is ASCII, so slices taken between
/// cursor positions always fall on char boundaries.
#[derive(Clone)]
pub struct Cursor<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn pos(&self) -> usize {
        self.i
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.s.as_bytes().get(self.i).copied()
    }

    /// Byte `n` positions ahead of the cursor.
    pub fn peek_at(&self, n: usize) -> Option<u8> {
        self.s.as_bytes().get(self.i + n).copied()
    }

    pub fn starts_with(&self, pat: &str) -> bool {
        self.rest().starts_with(pat)
    }

    pub fn starts_with_ignore_case(&self, pat: &str) -> bool {
        self.rest()
            .as_bytes()
            .get(..pat.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(pat.as_bytes()))
    }

    pub fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.i += 1;
        Some(b)
    }

    pub fn bump_n(&mut self, n: usize) {
        self.i = (self.i + n).min(self.s.len());
    }

    pub fn rest(&self) -> &'a str {
        &self.s[self.i..]
    }

    pub fn slice(&self, from: usize) -> &'a str {
        &self.s[from..self.i]
    }

    /// Consumes bytes while `pred` holds and returns them.
    pub fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.i;
        while self.peek().is_some_and(&pred) {
            self.i += 1;
        }
        &self.s[start..self.i]
    }

    pub fn skip_whitespace(&mut self) {
        self.take_while(|b| b.is_ascii_whitespace());
    }

    /// Advances past the next occurrence of `pat`, returning the text before
    /// it. Returns `None` without moving when `pat` does not occur.
    pub fn take_until(&mut self, pat: &str) -> Option<&'a str> {
        let found = self.rest().find(pat)?;
        let taken = &self.rest()[..found];
        self.i += found + pat.len();
        Some(taken)
    }

    /// Like [`Cursor::take_until`] with an ASCII case-insensitive match.
    pub fn take_until_ignore_case(&mut self, pat: &str) -> Option<&'a str> {
        let rest = self.rest();
        let found = (0..rest.len())
            .find(|&at| {
                rest.as_bytes()
                    .get(at..at + pat.len())
                    .is_some_and(|w| w.eq_ignore_ascii_case(pat.as_bytes()))
            })?;
        let taken = &rest[..found];
        self.i += found + pat.len();
        Some(taken)
    }

    pub fn skip_to_end(&mut self) {
        self.i = self.s.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_basics() {
        let mut cur = Cursor::new("<p>");
        assert_eq!(cur.pos(), 0);
        assert_eq!(cur.peek(), Some(b'<'));
        assert_eq!(cur.peek_at(1), Some(b'p'));
        assert_eq!(cur.bump(), Some(b'<'));
        assert_eq!(cur.rest(), "p>");
    }

    #[test]
    fn take_while_stops_at_delimiter() {
        let mut cur = Cursor::new("strong class=x>");
        assert_eq!(cur.take_while(|b| b.is_ascii_alphanumeric()), "strong");
        cur.skip_whitespace();
        assert_eq!(cur.rest(), "class=x>");
    }

    #[test]
    fn take_until_consumes_pattern() {
        let mut cur = Cursor::new("a comment -->after");
        assert_eq!(cur.take_until("-->"), Some("a comment "));
        assert_eq!(cur.rest(), "after");
        assert_eq!(cur.take_until("-->"), None);
        assert_eq!(cur.rest(), "after");
    }

    #[test]
    fn case_insensitive_matching() {
        let mut cur = Cursor::new("alert(1)</SCRIPT>tail");
        assert!(!cur.starts_with_ignore_case("</script>"));
        assert_eq!(cur.take_until_ignore_case("</script>"), Some("alert(1)"));
        assert_eq!(cur.rest(), "tail");
    }

    #[test]
    fn bump_at_eof_returns_none() {
        let mut cur = Cursor::new("x");
        assert_eq!(cur.bump(), Some(b'x'));
        assert!(cur.eof());
        assert_eq!(cur.bump(), None);
        cur.bump_n(3);
        assert_eq!(cur.pos(), 1);
    }

    #[test]
    fn multibyte_text_slices_cleanly() {
        let mut cur = Cursor::new("héllo<b>");
        let start = cur.pos();
        cur.take_while(|b| b != b'<');
        assert_eq!(cur.slice(start), "héllo");
    }
}
