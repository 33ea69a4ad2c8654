//! Lexical rules for plain scalars (YAML 1.2 core schema, plus timestamps).
//!
//! The node builder uses [`resolve_plain`] to decide the intrinsic [`ScalarKind`]
//! of every untagged plain scalar. The numeric parsers are used wherever a
//! literal must be turned into a value (`Node::get_value`, the node deserializer).

use crate::node::ScalarKind;

/// Parse a YAML 1.1 boolean from a &str (handles the "Norway problem").
///
/// Accepted TRUE literals (case-insensitive): "y", "yes", "true", "on"
/// Accepted FALSE literals (case-insensitive): "n", "no", "false", "off"
pub(crate) fn parse_yaml11_bool(s: &str) -> Option<bool> {
    let t = s.trim();
    if t.eq_ignore_ascii_case("true")
        || t.eq_ignore_ascii_case("yes")
        || t.eq_ignore_ascii_case("y")
        || t.eq_ignore_ascii_case("on")
    {
        Some(true)
    } else if t.eq_ignore_ascii_case("false")
        || t.eq_ignore_ascii_case("no")
        || t.eq_ignore_ascii_case("n")
        || t.eq_ignore_ascii_case("off")
    {
        Some(false)
    } else {
        None
    }
}

/// Parse a YAML 1.2 core boolean (`true`, `True`, `TRUE` and the `false` forms).
pub(crate) fn parse_yaml12_bool(s: &str) -> Option<bool> {
    match s {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

pub(crate) fn is_null_literal(s: &str) -> bool {
    matches!(s, "" | "~" | "null" | "Null" | "NULL")
}

fn parse_digits_u128(digits: &str, radix: u32) -> Option<u128> {
    let mut val: u128 = 0;
    let mut saw = false;
    for b in digits.as_bytes() {
        let d = match *b {
            b'_' => continue,
            b'0'..=b'9' => (b - b'0') as u32,
            b'a'..=b'f' => 10 + (b - b'a') as u32,
            b'A'..=b'F' => 10 + (b - b'A') as u32,
            _ => return None,
        };
        if d >= radix {
            return None;
        }
        val = val.checked_mul(radix as u128)?;
        val = val.checked_add(d as u128)?;
        saw = true;
    }
    if saw { Some(val) } else { None }
}

/// Split an integer literal into sign, radix and digits.
fn split_int(s: &str) -> (bool, u32, &str) {
    let t = s.trim();
    let (neg, rest) = match t.strip_prefix('+') {
        Some(r) => (false, r),
        None => match t.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, t),
        },
    };

    if let Some(r) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        (neg, 16, r)
    } else if let Some(r) = rest.strip_prefix("0o").or_else(|| rest.strip_prefix("0O")) {
        (neg, 8, r)
    } else if let Some(r) = rest.strip_prefix("0b").or_else(|| rest.strip_prefix("0B")) {
        (neg, 2, r)
    } else {
        (neg, 10, rest)
    }
}

/// Whether `s` is written as an integer, regardless of its magnitude.
pub(crate) fn is_int_literal(s: &str) -> bool {
    let (_, radix, digits) = split_int(s);
    !digits.starts_with('_')
        && digits.bytes().any(|b| b != b'_')
        && digits
            .chars()
            .all(|c| c == '_' || c.to_digit(radix).is_some())
}

/// Parse an integer literal: optional sign, then decimal, `0x`, `0o` or `0b` digits.
///
/// Returns:
/// - `Some(value)` when the literal is a valid integer that fits into `i128`.
/// - `None` otherwise.
pub(crate) fn parse_int(s: &str) -> Option<i128> {
    let (neg, radix, digits) = split_int(s);
    if digits.starts_with('_') {
        return None;
    }

    let mag = parse_digits_u128(digits, radix)?;
    if neg {
        if mag == (i128::MAX as u128) + 1 {
            return Some(i128::MIN);
        }
        let mag: i128 = mag.try_into().ok()?;
        mag.checked_neg()
    } else {
        mag.try_into().ok()
    }
}

/// Whether `s` has the lexical shape of a YAML 1.2 float.
///
/// Accepts `[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?` and the
/// `.inf` / `.nan` spellings. Plain integers are not floats.
pub(crate) fn is_float_literal(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    if matches!(
        lower.as_str(),
        ".nan" | ".inf" | "+.inf" | "-.inf"
    ) {
        return true;
    }
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;
    let mut frac_digits = 0;
    let mut saw_dot = false;
    if i < bytes.len() && bytes[i] == b'.' {
        saw_dot = true;
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }
    if int_digits == 0 && frac_digits == 0 {
        return false;
    }
    let mut saw_exp = false;
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        saw_exp = true;
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }
    i == bytes.len() && (saw_dot || saw_exp)
}

/// Parse a YAML 1.2 float literal, including `.nan` and `.inf`.
pub(crate) fn parse_float(s: &str) -> Option<f64> {
    let t = s.trim();
    let lower = t.to_ascii_lowercase();
    match lower.as_str() {
        ".nan" | "+.nan" | "-.nan" => Some(f64::NAN),
        ".inf" | "+.inf" => Some(f64::INFINITY),
        "-.inf" => Some(f64::NEG_INFINITY),
        _ if is_float_literal(t) || parse_int(t).is_some() => t.replace('_', "").parse::<f64>().ok(),
        _ => None,
    }
}

/// Cursor over ASCII digits used by the timestamp matcher.
struct Digits<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Digits<'_> {
    fn take(&mut self, min: usize, max: usize) -> bool {
        let start = self.pos;
        while self.pos < self.bytes.len() && self.pos - start < max && self.bytes[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        self.pos - start >= min
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.bytes.get(self.pos) == Some(&b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn done(&self) -> bool {
        self.pos == self.bytes.len()
    }
}

/// Whether `s` is a YAML timestamp: `2001-12-14`, `2001-12-14t21:59:43.10-05:00`,
/// `2001-12-14 21:59:43.10 -5` or `2001-12-15T02:59:43.1Z`.
pub(crate) fn is_timestamp_literal(s: &str) -> bool {
    let mut c = Digits { bytes: s.as_bytes(), pos: 0 };
    if !(c.take(4, 4) && c.eat(b'-')) {
        return false;
    }
    // A date-only timestamp needs exactly two digits for month and day.
    let month_start = c.pos;
    if !(c.take(1, 2) && c.eat(b'-')) {
        return false;
    }
    let month_len = c.pos - month_start - 1;
    let day_start = c.pos;
    if !c.take(1, 2) {
        return false;
    }
    let day_len = c.pos - day_start;
    if c.done() {
        return month_len == 2 && day_len == 2;
    }

    if !(c.eat(b'T') || c.eat(b't')) {
        let mut spaces = 0;
        while c.eat(b' ') || c.eat(b'\t') {
            spaces += 1;
        }
        if spaces == 0 {
            return false;
        }
    }
    if !(c.take(1, 2) && c.eat(b':') && c.take(2, 2) && c.eat(b':') && c.take(2, 2)) {
        return false;
    }
    if c.eat(b'.') {
        c.take(0, usize::MAX);
    }
    while c.eat(b' ') || c.eat(b'\t') {}
    if c.done() {
        return true;
    }
    if c.eat(b'Z') {
        return c.done();
    }
    if !(c.eat(b'+') || c.eat(b'-')) {
        return false;
    }
    if !c.take(1, 2) {
        return false;
    }
    if c.eat(b':') && !c.take(2, 2) {
        return false;
    }
    c.done()
}

/// Decide the intrinsic kind of an untagged plain scalar.
///
/// Arguments:
/// - `literal`: the scalar text as written.
/// - `yaml11_booleans`: also accept `yes`/`no`/`on`/`off`/`y`/`n` as booleans.
///
/// Called by:
/// - The node builder for every plain, untagged scalar.
pub(crate) fn resolve_plain(literal: &str, yaml11_booleans: bool) -> ScalarKind {
    if is_null_literal(literal) {
        return ScalarKind::Null;
    }
    let is_bool = if yaml11_booleans {
        parse_yaml11_bool(literal).is_some() && literal == literal.trim()
    } else {
        parse_yaml12_bool(literal).is_some()
    };
    if is_bool {
        return ScalarKind::Bool;
    }
    if looks_like_int(literal) && is_int_literal(literal) {
        return ScalarKind::Int;
    }
    if is_float_literal(literal) {
        return ScalarKind::Float;
    }
    if is_timestamp_literal(literal) {
        return ScalarKind::Timestamp;
    }
    ScalarKind::Str
}

/// Core schema integer shapes: `[-+]?[0-9]+`, `0o[0-7]+`, `0x[0-9a-fA-F]+`, and `0b`/underscore forms.
fn looks_like_int(s: &str) -> bool {
    let rest = s.strip_prefix(['+', '-']).unwrap_or(s);
    match rest.as_bytes() {
        [] => false,
        [b'0', b'x' | b'X' | b'o' | b'O' | b'b' | b'B', tail @ ..] => !tail.is_empty(),
        [first, ..] => first.is_ascii_digit(),
    }
}
