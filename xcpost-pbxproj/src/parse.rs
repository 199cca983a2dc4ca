//! OpenStep property list parser.
//!
//! Accepts the subset Xcode writes: `{ key = value; }` dictionaries, `( a, b, )` arrays,
//! quoted and bare strings, `<hex>` data, and `//` / `/* */` comments anywhere whitespace
//! is allowed.

use crate::error::ParseError;
use crate::value::{Dict, Value};

/// Parse a whole document. Trailing content after the top-level value is an error.
pub fn parse_value(text: &str) -> Result<Value, ParseError> {
    let mut p = Parser::new(text);
    p.skip_trivia()?;
    let value = p.value()?;
    p.skip_trivia()?;
    if let Some(c) = p.peek() {
        return Err(p.error(format!("unexpected `{c}` after end of document")));
    }
    Ok(value)
}

/// Characters allowed in an unquoted string.
pub(crate) fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.' | '-' | '+')
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn expect(&mut self, want: char) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if c == want => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected `{want}`, found `{c}`"))),
            None => Err(self.error(format!("expected `{want}`, found end of input"))),
        }
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            let rest = self.rest();
            if rest.starts_with("//") {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else if rest.starts_with("/*") {
                let (line, column) = (self.line, self.column);
                self.bump();
                self.bump();
                loop {
                    if self.rest().starts_with("*/") {
                        self.bump();
                        self.bump();
                        break;
                    }
                    if self.bump().is_none() {
                        return Err(ParseError {
                            line,
                            column,
                            message: "unterminated comment".to_string(),
                        });
                    }
                }
            } else if self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            } else {
                return Ok(());
            }
        }
    }

    fn value(&mut self) -> Result<Value, ParseError> {
        match self.peek() {
            Some('{') => self.dict().map(Value::Dict),
            Some('(') => self.array().map(Value::Array),
            Some('<') => self.data().map(Value::Data),
            Some('"') | Some('\'') => self.quoted().map(Value::String),
            Some(c) if is_bare_char(c) => Ok(Value::String(self.bare())),
            Some(c) => Err(self.error(format!("unexpected `{c}`"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn key(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some('"') | Some('\'') => self.quoted(),
            Some(c) if is_bare_char(c) => Ok(self.bare()),
            Some(c) => Err(self.error(format!("expected a key, found `{c}`"))),
            None => Err(self.error("expected a key, found end of input")),
        }
    }

    fn dict(&mut self) -> Result<Dict, ParseError> {
        self.expect('{')?;
        let mut dict = Dict::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some('}') {
                self.bump();
                return Ok(dict);
            }
            let key = self.key()?;
            self.skip_trivia()?;
            self.expect('=')?;
            self.skip_trivia()?;
            let value = self.value()?;
            self.skip_trivia()?;
            self.expect(';')?;
            dict.insert(key, value);
        }
    }

    fn array(&mut self) -> Result<Vec<Value>, ParseError> {
        self.expect('(')?;
        let mut items = Vec::new();
        loop {
            self.skip_trivia()?;
            if self.peek() == Some(')') {
                self.bump();
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_trivia()?;
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {}
                Some(c) => return Err(self.error(format!("expected `,` or `)`, found `{c}`"))),
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn data(&mut self) -> Result<String, ParseError> {
        self.expect('<')?;
        let mut hex = String::new();
        loop {
            match self.bump() {
                Some('>') => return Ok(hex),
                Some(c) if c.is_ascii_hexdigit() => hex.push(c),
                Some(c) if c.is_whitespace() => {}
                Some(c) => return Err(self.error(format!("invalid character `{c}` in data"))),
                None => return Err(self.error("unterminated data")),
            }
        }
    }

    fn bare(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_bare_char) {
            // A comment opener ends a bare string.
            if self.rest().starts_with("//") || self.rest().starts_with("/*") {
                break;
            }
            self.bump();
        }
        self.src[start..self.pos].to_string()
    }

    fn quoted(&mut self) -> Result<String, ParseError> {
        let (line, column) = (self.line, self.column);
        let quote = self.bump().unwrap_or('"');
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(ParseError {
                    line,
                    column,
                    message: "unterminated string".to_string(),
                });
            };
            match c {
                c if c == quote => return Ok(out),
                '\\' => out.push(self.escape()?),
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> Result<char, ParseError> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('a') => Ok('\u{07}'),
            Some('b') => Ok('\u{08}'),
            Some('f') => Ok('\u{0C}'),
            Some('v') => Ok('\u{0B}'),
            Some('U') => {
                let mut code = 0u32;
                for _ in 0..4 {
                    let digit = self
                        .bump()
                        .and_then(|c| c.to_digit(16))
                        .ok_or_else(|| self.error("invalid \\U escape"))?;
                    code = code * 16 + digit;
                }
                char::from_u32(code).ok_or_else(|| self.error("invalid \\U code point"))
            }
            Some(c) => Ok(c),
            None => Err(self.error("unterminated escape")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_structures_and_comments() {
        let text = r#"// !$*UTF8*$!
{
    archiveVersion = 1;
    /* inline comment */
    list = (a, "b c", /* skipped */ d, );
    nested = { key = <0a 0B>; };
}"#;
        let v = parse_value(text).unwrap();
        let root = v.as_dict().unwrap();
        assert_eq!(root.get_str("archiveVersion"), Some("1"));

        let list = root.get("list").and_then(Value::as_array).unwrap();
        let items: Vec<_> = list.iter().filter_map(Value::as_str).collect();
        assert_eq!(items, vec!["a", "b c", "d"]);

        let nested = root.get("nested").and_then(Value::as_dict).unwrap();
        assert_eq!(nested.get("key"), Some(&Value::Data("0a0B".to_string())));
    }

    #[test]
    fn decodes_escapes() {
        let v = parse_value(r#""a\"b\\c\nd\U00e9""#).unwrap();
        assert_eq!(v.as_str(), Some("a\"b\\c\nd\u{e9}"));
    }

    #[test]
    fn bare_string_stops_at_comment() {
        let v = parse_value("{ path = a/b/* note */; }").unwrap();
        assert_eq!(v.as_dict().unwrap().get_str("path"), Some("a/b"));
    }

    #[test]
    fn reports_missing_semicolon_position() {
        let err = parse_value("{\n  a = b\n}").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.column, 1);
        assert!(err.message.contains("expected `;`"));
    }

    #[test]
    fn rejects_unterminated_string() {
        let err = parse_value("{ a = \"oops; }").unwrap_err();
        assert_eq!(err.message, "unterminated string");
        assert_eq!((err.line, err.column), (1, 7));
    }

    #[test]
    fn rejects_trailing_content() {
        let err = parse_value("{ } }").unwrap_err();
        assert!(err.message.contains("after end of document"));
    }

    #[test]
    fn rejects_empty_input() {
        let err = parse_value("   // only a comment\n").unwrap_err();
        assert_eq!(err.message, "unexpected end of input");
    }
}
