// ai
//! 🐍 Literal parser — reads the stringified lists the forms frontend likes to hand us.
//!
//! 🎬 Somewhere, a multi-select widget wrote `"['Arabic', 'Somali']"` into a text field.
//! Not JSON. Not CSV. A Python list literal, single quotes and all. This module reads that
//! dialect (lists, tuples, sets, dicts, quoted strings, numbers, `True`/`False`/`None`)
//! and refuses everything else with a [`ParseError`].
//!
//! 🧠 Knowledge graph:
//! - Used by: `transforms::value::normalize` (string branch)
//! - Output: [`Literal`], whose `to_str` mimics `str()` so joined lists read naturally
//! - Failure is expected and cheap: free-text answers fail here and take the fallback path

use crate::errors::ParseError;

/// 🪆 Deepest container nesting we follow before calling it free text.
const MAX_DEPTH: usize = 100;

/// 🧱 A parsed literal value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
    List(Vec<Literal>),
    Tuple(Vec<Literal>),
    Set(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
    Str(String),
    /// 🔢 canonical decimal digits, sign included. Big ints stay exact this way.
    Int(String),
    Float(f64),
    Bool(bool),
    None,
}

/// 🔍 Parse one literal. Leading spaces/tabs are ignored; anything after the value is an error.
pub(crate) fn parse(input: &str) -> Result<Literal, ParseError> {
    let mut parser = Parser {
        src: input.trim_start_matches(|c: char| c == ' ' || c == '\t'),
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_ws();
    if parser.pos != parser.src.len() {
        return parser.fail("unexpected trailing input");
    }
    Ok(value)
}

impl Literal {
    /// 🗣️ What `str()` would print.
    pub(crate) fn to_str(&self) -> String {
        match self {
            Literal::Str(s) => s.clone(),
            other => other.repr(),
        }
    }

    /// 🪞 What `repr()` would print.
    pub(crate) fn repr(&self) -> String {
        match self {
            Literal::List(items) => format!("[{}]", join_repr(items)),
            Literal::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Literal::Tuple(items) => format!("({})", join_repr(items)),
            Literal::Set(items) if items.is_empty() => "set()".to_string(),
            Literal::Set(items) => format!("{{{}}}", join_repr(items)),
            Literal::Dict(pairs) => {
                let rendered: Vec<String> = pairs
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            Literal::Str(s) => quote_repr(s),
            Literal::Int(digits) => digits.clone(),
            Literal::Float(f) => float_repr(*f),
            Literal::Bool(true) => "True".to_string(),
            Literal::Bool(false) => "False".to_string(),
            Literal::None => "None".to_string(),
        }
    }
}

fn join_repr(items: &[Literal]) -> String {
    items.iter().map(Literal::repr).collect::<Vec<_>>().join(", ")
}

/// 🪞 Quote a string the way `repr()` does: single quotes unless that would need escaping.
pub(crate) fn quote_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

/// 🔢 Float formatting that keeps the trailing `.0` on integral values (`2.0`, not `2`).
pub(crate) fn float_repr(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        format!("{sign}inf")
    } else if f != 0.0 && (f.abs() >= 1e16 || f.abs() < 1e-4) {
        scientific_repr(f)
    } else if f.fract() == 0.0 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// 🔬 `1e+20`, `1.5e-05`: signed exponent, at least two digits.
fn scientific_repr(f: f64) -> String {
    let rendered = format!("{f:e}");
    match rendered.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => rendered,
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn fail<T>(&self, reason: &'static str) -> Result<T, ParseError> {
        Err(ParseError::Literal {
            position: self.pos,
            reason,
        })
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\n' | '\r')) {
            self.pos += 1;
        }
    }

    fn value(&mut self) -> Result<Literal, ParseError> {
        self.skip_ws();
        match self.peek() {
            Some(open @ ('[' | '(' | '{')) => self.container(open),
            Some('\'' | '"') => self.strings(),
            Some('+' | '-') => self.signed_number(),
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(false),
            Some(c) if c.is_alphabetic() || c == '_' => self.keyword(),
            Some(_) => self.fail("unexpected character"),
            None => self.fail("unexpected end of input"),
        }
    }

    fn container(&mut self, open: char) -> Result<Literal, ParseError> {
        if self.depth >= MAX_DEPTH {
            return self.fail("too deeply nested");
        }
        self.depth += 1;
        let parsed = match open {
            '[' => {
                self.pos += 1;
                self.sequence(']').map(Literal::List)
            }
            '(' => self.paren(),
            _ => self.brace(),
        };
        self.depth -= 1;
        parsed
    }

    /// 📋 Comma-separated values up to `close`, trailing comma allowed.
    fn sequence(&mut self, close: char) -> Result<Vec<Literal>, ParseError> {
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat(close) {
                return Ok(items);
            }
            return self.fail("expected ',' or closing bracket");
        }
    }

    /// 🫧 `()` is an empty tuple, `(x)` is just `x`, `(x,)` and `(x, y)` are tuples.
    fn paren(&mut self) -> Result<Literal, ParseError> {
        self.pos += 1;
        self.skip_ws();
        if self.eat(')') {
            return Ok(Literal::Tuple(Vec::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        if self.eat(')') {
            return Ok(first);
        }
        if !self.eat(',') {
            return self.fail("expected ',' or ')'");
        }
        let mut items = vec![first];
        items.extend(self.sequence(')')?);
        Ok(Literal::Tuple(items))
    }

    /// 📚 `{}` is an empty dict; after the first element a `:` means dict, anything else set.
    fn brace(&mut self) -> Result<Literal, ParseError> {
        self.pos += 1;
        self.skip_ws();
        if self.eat('}') {
            return Ok(Literal::Dict(Vec::new()));
        }
        let first = self.value()?;
        self.skip_ws();
        if !self.eat(':') {
            if self.eat('}') {
                return Ok(Literal::Set(vec![first]));
            }
            if !self.eat(',') {
                return self.fail("expected ',' or '}'");
            }
            let mut items = vec![first];
            items.extend(self.sequence('}')?);
            return Ok(Literal::Set(items));
        }

        let mut pairs = vec![(first, self.value()?)];
        loop {
            self.skip_ws();
            if self.eat('}') {
                return Ok(Literal::Dict(pairs));
            }
            if !self.eat(',') {
                return self.fail("expected ',' or '}'");
            }
            self.skip_ws();
            if self.eat('}') {
                return Ok(Literal::Dict(pairs));
            }
            let key = self.value()?;
            self.skip_ws();
            if !self.eat(':') {
                return self.fail("expected ':' in dict");
            }
            pairs.push((key, self.value()?));
        }
    }

    /// 🔗 One string literal, or several adjacent ones glued together (`'a' "b"` → `ab`).
    fn strings(&mut self) -> Result<Literal, ParseError> {
        let mut text = self.string()?;
        loop {
            let checkpoint = self.pos;
            self.skip_ws();
            if matches!(self.peek(), Some('\'' | '"')) {
                text.push_str(&self.string()?);
            } else {
                self.pos = checkpoint;
                return Ok(Literal::Str(text));
            }
        }
    }

    fn string(&mut self) -> Result<String, ParseError> {
        let Some(quote) = self.bump() else {
            return self.fail("expected a quote");
        };
        let triple: String = std::iter::repeat_n(quote, 3).collect();
        let is_triple = self.src[self.pos..].starts_with(&triple[..2]);
        if is_triple {
            self.pos += 2;
        }

        let mut text = String::new();
        loop {
            if is_triple && self.src[self.pos..].starts_with(&triple) {
                self.pos += 3;
                return Ok(text);
            }
            match self.bump() {
                None => return self.fail("unterminated string"),
                Some(c) if c == quote && !is_triple => return Ok(text),
                Some('\n') if !is_triple => return self.fail("newline in string"),
                Some('\\') => self.escape(&mut text)?,
                Some(c) => text.push(c),
            }
        }
    }

    fn escape(&mut self, text: &mut String) -> Result<(), ParseError> {
        let decoded = match self.bump() {
            None => return self.fail("dangling backslash"),
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('0') => '\0',
            // 🧵 backslash-newline is a line continuation: contributes nothing
            Some('\n') => return Ok(()),
            Some(c @ ('\\' | '\'' | '"')) => c,
            Some('x') => return self.hex_escape(2, text),
            Some('u') => return self.hex_escape(4, text),
            Some('U') => return self.hex_escape(8, text),
            // 🤷 unknown escapes keep their backslash, same as the real thing
            Some(other) => {
                text.push('\\');
                other
            }
        };
        text.push(decoded);
        Ok(())
    }

    fn hex_escape(&mut self, width: usize, text: &mut String) -> Result<(), ParseError> {
        let Some(hex) = self.src.get(self.pos..self.pos + width) else {
            return self.fail("truncated escape");
        };
        let decoded = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        match decoded {
            Some(c) => {
                self.pos += width;
                text.push(c);
                Ok(())
            }
            None => self.fail("invalid escape"),
        }
    }

    fn signed_number(&mut self) -> Result<Literal, ParseError> {
        // 🔁 `--1` is legal and equals 1. don't ask.
        let mut negative = false;
        while let Some(sign @ ('+' | '-')) = self.peek() {
            self.pos += 1;
            negative ^= sign == '-';
            self.skip_ws();
        }
        match self.peek() {
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(negative),
            _ => self.fail("sign must precede a number"),
        }
    }

    fn number(&mut self, negative: bool) -> Result<Literal, ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '.')
            || (matches!(self.peek(), Some('+' | '-'))
                && matches!(self.src[..self.pos].chars().last(), Some('e' | 'E')))
        {
            self.pos += 1;
        }
        let token = &self.src[start..self.pos];
        if !underscores_are_valid(token) {
            return self.fail("misplaced underscore in number");
        }
        let cleaned = token.replace('_', "");

        if cleaned.bytes().all(|b| b.is_ascii_digit()) {
            let trimmed = cleaned.trim_start_matches('0');
            if trimmed.len() != cleaned.len() && !trimmed.is_empty() {
                return self.fail("leading zeros in decimal integer");
            }
            let digits = if trimmed.is_empty() { "0" } else { trimmed };
            let literal = Literal::Int(digits.to_string());
            return Ok(if negative { negate(literal) } else { literal });
        }

        let looks_like_float = cleaned
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'));
        match cleaned.parse::<f64>() {
            Ok(f) if looks_like_float && f.is_finite() => {
                Ok(Literal::Float(if negative { -f } else { f }))
            }
            _ => self.fail("not a number"),
        }
    }

    fn keyword(&mut self) -> Result<Literal, ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "True" => Ok(Literal::Bool(true)),
            "False" => Ok(Literal::Bool(false)),
            "None" => Ok(Literal::None),
            _ => {
                self.pos = start;
                self.fail("names are not literals")
            }
        }
    }
}

fn negate(literal: Literal) -> Literal {
    match literal {
        Literal::Int(digits) if digits == "0" => Literal::Int(digits),
        Literal::Int(digits) => match digits.strip_prefix('-') {
            Some(positive) => Literal::Int(positive.to_string()),
            None => Literal::Int(format!("-{digits}")),
        },
        Literal::Float(f) => Literal::Float(-f),
        other => other,
    }
}

fn underscores_are_valid(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.iter().enumerate().all(|(i, b)| {
        *b != b'_'
            || (i > 0
                && i + 1 < bytes.len()
                && bytes[i - 1].is_ascii_digit()
                && bytes[i + 1].is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(items: &[&str]) -> Literal {
        Literal::List(items.iter().map(|s| Literal::Str(s.to_string())).collect())
    }

    #[test]
    fn the_one_where_a_stringified_list_is_just_a_list() {
        assert_eq!(parse("['Arabic', 'Somali']"), Ok(strs(&["Arabic", "Somali"])));
        assert_eq!(parse("[\"Tigrinya\",]"), Ok(strs(&["Tigrinya"])));
        assert_eq!(parse("  []"), Ok(Literal::List(vec![])));
    }

    #[test]
    fn the_one_where_scalars_parse_but_are_not_lists() {
        assert_eq!(parse("42"), Ok(Literal::Int("42".into())));
        assert_eq!(parse("-1_000"), Ok(Literal::Int("-1000".into())));
        assert_eq!(parse("2.50"), Ok(Literal::Float(2.5)));
        assert_eq!(parse("None"), Ok(Literal::None));
        assert_eq!(parse("'quoted'"), Ok(Literal::Str("quoted".into())));
        assert_eq!(parse("(7)"), Ok(Literal::Int("7".into())));
    }

    #[test]
    fn the_one_where_free_text_is_rejected() {
        assert!(parse("Hello world").is_err());
        assert!(parse("").is_err());
        assert!(parse("['unterminated").is_err());
        assert!(parse("[1, 2] and more").is_err());
        assert!(parse("007").is_err());
        assert!(parse("1__0").is_err());
    }

    #[test]
    fn the_one_where_containers_nest_and_render_like_repr() {
        let parsed = parse("[1, 'two', [3.0, None], {'k': True}, (4,), {5}]")
            .expect("💀 nested literal should parse");
        let Literal::List(items) = parsed else {
            panic!("💀 expected a list");
        };
        let rendered: Vec<String> = items.iter().map(Literal::to_str).collect();
        assert_eq!(
            rendered,
            vec!["1", "two", "[3.0, None]", "{'k': True}", "(4,)", "{5}"]
        );
    }

    #[test]
    fn the_one_where_adjacent_strings_hold_hands() {
        assert_eq!(parse("'ab' \"cd\""), Ok(Literal::Str("abcd".into())));
        assert_eq!(parse("'''tri'ple'''"), Ok(Literal::Str("tri'ple".into())));
        assert_eq!(parse(r"'tab\there'"), Ok(Literal::Str("tab\there".into())));
    }

    #[test]
    fn the_one_where_repr_picks_the_quote_that_needs_no_escaping() {
        assert_eq!(quote_repr("plain"), "'plain'");
        assert_eq!(quote_repr("Peter's"), "\"Peter's\"");
        assert_eq!(float_repr(3.0), "3.0");
        assert_eq!(float_repr(0.25), "0.25");
    }

    #[test]
    fn the_one_where_huge_and_tiny_floats_switch_to_exponents() {
        assert_eq!(float_repr(1e20), "1e+20");
        assert_eq!(float_repr(1e16), "1e+16");
        assert_eq!(float_repr(1e-5), "1e-05");
        assert_eq!(float_repr(-1.5e-7), "-1.5e-07");
        assert_eq!(float_repr(1e15), "1000000000000000.0");
        assert_eq!(float_repr(0.0001), "0.0001");
        assert_eq!(float_repr(0.0), "0.0");
    }

    #[test]
    fn the_one_where_nesting_has_a_ceiling() {
        let shallow = format!("{}1{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse(&shallow).is_ok());

        let deep = format!("{}1{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(matches!(
            parse(&deep),
            Err(ParseError::Literal { reason: "too deeply nested", .. })
        ));
        assert!(parse(&"({".repeat(20_000)).is_err());
    }

    #[test]
    fn the_one_where_a_wall_of_signs_is_still_just_a_number() {
        assert_eq!(parse("--1"), Ok(Literal::Int("1".into())));
        assert_eq!(parse("- + -2.5"), Ok(Literal::Float(2.5)));
        assert_eq!(parse(&format!("{}7", "-".repeat(20_001))), Ok(Literal::Int("-7".into())));
        assert!(parse(&"-".repeat(20_000)).is_err());
    }
}
