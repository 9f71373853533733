//! String filter parser
//!
//! Accepts the usual parenthesized prefix syntax:
//!
//! ```text
//! (&(objectclass=person)(|(uid=jdoe)(mail=j*@example.com))(!(ou=ex)))
//! ```
//!
//! Values use `\XX` hex escapes for `*`, `(`, `)` and `\`. A bare assertion
//! without surrounding parentheses is accepted as a single simple filter.

use super::ast::{Ava, ExtensibleAssertion, Filter, FilterKind, SubstringAssertion};
use super::errors::{FilterError, FilterResult};

/// Parses a filter string.
pub fn parse(input: &str) -> FilterResult<Filter> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FilterError::parse(0, "empty filter"));
    }
    if !trimmed.starts_with('(') {
        return parse_item(trimmed, 0);
    }

    let mut parser = Parser {
        input: trimmed,
        pos: 0,
    };
    let filter = parser.filter()?;
    parser.skip_whitespace();
    if parser.pos != trimmed.len() {
        return Err(FilterError::parse(parser.pos, "trailing characters after filter"));
    }
    Ok(filter)
}

impl std::str::FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, c: u8) -> FilterResult<()> {
        if self.peek() == Some(c) {
            self.pos += 1;
            Ok(())
        } else {
            Err(FilterError::parse(
                self.pos,
                format!("expected '{}'", c as char),
            ))
        }
    }

    fn filter(&mut self) -> FilterResult<Filter> {
        self.skip_whitespace();
        self.expect(b'(')?;
        self.skip_whitespace();
        let filter = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                Filter::and(self.filter_list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                Filter::or(self.filter_list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                let child = self.filter()?;
                self.skip_whitespace();
                Filter::not(child)
            }
            Some(_) => {
                let start = self.pos;
                let end = self.item_end()?;
                self.pos = end;
                parse_item(&self.input[start..end], start)?
            }
            None => return Err(FilterError::parse(self.pos, "unexpected end of filter")),
        };
        self.expect(b')')?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> FilterResult<Vec<Filter>> {
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'(') => children.push(self.filter()?),
                Some(b')') => return Ok(children),
                Some(_) => return Err(FilterError::parse(self.pos, "expected '(' or ')'")),
                None => return Err(FilterError::parse(self.pos, "unterminated filter list")),
            }
        }
    }

    /// Byte offset of the closing parenthesis of a simple item.
    fn item_end(&self) -> FilterResult<usize> {
        let bytes = self.input.as_bytes();
        let mut i = self.pos;
        while i < bytes.len() {
            match bytes[i] {
                b')' => return Ok(i),
                b'(' => return Err(FilterError::parse(i, "unescaped '(' in value")),
                _ => i += 1,
            }
        }
        Err(FilterError::parse(i, "missing ')'"))
    }
}

/// Parses `attr<op>value` where op is one of `=`, `~=`, `>=`, `<=`, `:=`.
fn parse_item(item: &str, offset: usize) -> FilterResult<Filter> {
    let eq = item
        .find('=')
        .ok_or_else(|| FilterError::parse(offset, "missing '=' in assertion"))?;
    let (lhs, raw_value) = (&item[..eq], &item[eq + 1..]);

    let (attr, kind_marker) = match lhs.as_bytes().last() {
        Some(b'~') => (&lhs[..lhs.len() - 1], Some('~')),
        Some(b'>') => (&lhs[..lhs.len() - 1], Some('>')),
        Some(b'<') => (&lhs[..lhs.len() - 1], Some('<')),
        Some(b':') => (&lhs[..lhs.len() - 1], Some(':')),
        _ => (lhs, None),
    };
    let attr = attr.trim();

    if kind_marker == Some(':') {
        return parse_extensible(attr, raw_value, offset);
    }

    validate_attr(attr, offset)?;
    let kind = match kind_marker {
        Some('~') => FilterKind::Approx(ava(attr, raw_value, offset)?),
        Some('>') => FilterKind::Ge(ava(attr, raw_value, offset)?),
        Some('<') => FilterKind::Le(ava(attr, raw_value, offset)?),
        _ if raw_value == "*" => FilterKind::Present(attr.to_string()),
        _ if raw_value.contains('*') => FilterKind::Substrings(substrings(attr, raw_value, offset)?),
        _ => FilterKind::Equality(ava(attr, raw_value, offset)?),
    };
    Ok(Filter::new(kind))
}

fn validate_attr(attr: &str, offset: usize) -> FilterResult<()> {
    if attr.is_empty() {
        return Err(FilterError::parse(offset, "missing attribute type"));
    }
    if let Some(bad) = attr
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | ';' | '.' | '_')))
    {
        return Err(FilterError::parse(
            offset,
            format!("invalid character '{}' in attribute type", bad),
        ));
    }
    Ok(())
}

fn ava(attr: &str, raw_value: &str, offset: usize) -> FilterResult<Ava> {
    Ok(Ava {
        attr: attr.to_string(),
        value: unescape(raw_value, offset)?,
    })
}

fn substrings(attr: &str, raw_value: &str, offset: usize) -> FilterResult<SubstringAssertion> {
    let pieces: Vec<&str> = raw_value.split('*').collect();
    let last = pieces.len() - 1;
    let mut sub = SubstringAssertion {
        attr: attr.to_string(),
        ..Default::default()
    };
    for (i, piece) in pieces.iter().enumerate() {
        if piece.is_empty() {
            continue;
        }
        let value = unescape(piece, offset)?;
        if i == 0 {
            sub.initial = Some(value);
        } else if i == last {
            sub.final_ = Some(value);
        } else {
            sub.any.push(value);
        }
    }
    Ok(sub)
}

/// `[attr][:dn][:rule]:=value`
fn parse_extensible(lhs: &str, raw_value: &str, offset: usize) -> FilterResult<Filter> {
    let mut parts = lhs.split(':');
    let attr = parts.next().unwrap_or_default().trim();
    let mut dn_attrs = false;
    let mut rule = None;
    for part in parts {
        if part.eq_ignore_ascii_case("dn") && rule.is_none() {
            dn_attrs = true;
        } else if !part.is_empty() && rule.is_none() {
            rule = Some(part.to_string());
        } else {
            return Err(FilterError::parse(offset, "malformed extensible match"));
        }
    }

    let attr = if attr.is_empty() {
        None
    } else {
        validate_attr(attr, offset)?;
        Some(attr.to_string())
    };
    if attr.is_none() && rule.is_none() {
        return Err(FilterError::parse(
            offset,
            "extensible match needs an attribute type or a matching rule",
        ));
    }

    Ok(Filter::extensible(ExtensibleAssertion {
        attr,
        rule,
        value: unescape(raw_value, offset)?,
        dn_attrs,
    }))
}

/// Decodes `\XX` hex escapes. A backslash before a non-hex character is
/// taken literally.
fn unescape(raw: &str, offset: usize) -> FilterResult<String> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let hex = bytes.get(i + 1..i + 3).and_then(|h| {
                std::str::from_utf8(h)
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
            });
            match hex {
                Some(b) => {
                    out.push(b);
                    i += 3;
                }
                None if i + 1 < bytes.len() => {
                    out.push(bytes[i + 1]);
                    i += 2;
                }
                None => return Err(FilterError::parse(offset + i, "dangling escape")),
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| FilterError::parse(offset, "escaped value is not UTF-8"))
}
