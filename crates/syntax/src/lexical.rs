//! Token-level decoding of string and number literals.

use crate::node::text;
use serde_json::Value;
use tree_sitter::Node;

/// Largest integer an IEEE double represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Decoded value of a `string` node.
pub(crate) fn string_value(node: Node<'_>, source: &str) -> Option<String> {
    let raw = text(node, source);
    let mut chars = raw.chars();
    let open = chars.next()?;
    let inner = chars.as_str().strip_suffix(open)?;
    Some(unescape(inner))
}

/// Resolve escape sequences of a single- or double-quoted string body.
pub fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut pending_high: Option<u32> = None;
    let mut chars = inner.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            flush_surrogate(&mut out, &mut pending_high);
            out.push(c);
            continue;
        }
        let Some(escaped) = chars.next() else {
            break;
        };
        let simple = match escaped {
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            'v' => Some('\u{b}'),
            '0' if !chars.peek().is_some_and(char::is_ascii_digit) => Some('\0'),
            'x' => {
                let code = take_hex(&mut chars, 2);
                code.and_then(char::from_u32)
            }
            'u' => {
                let code = if chars.peek() == Some(&'{') {
                    chars.next();
                    let digits: String = chars.by_ref().take_while(|c| *c != '}').collect();
                    u32::from_str_radix(&digits, 16).ok()
                } else {
                    take_hex(&mut chars, 4)
                };
                if let Some(code) = code {
                    push_code_unit(&mut out, &mut pending_high, code);
                }
                continue;
            }
            // line continuation
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                continue;
            }
            '\n' | '\u{2028}' | '\u{2029}' => continue,
            other => Some(other),
        };
        flush_surrogate(&mut out, &mut pending_high);
        if let Some(ch) = simple {
            out.push(ch);
        }
    }
    flush_surrogate(&mut out, &mut pending_high);
    out
}

fn take_hex(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, count: usize) -> Option<u32> {
    let digits: String = chars.by_ref().take(count).collect();
    if digits.len() != count {
        return None;
    }
    u32::from_str_radix(&digits, 16).ok()
}

fn push_code_unit(out: &mut String, pending_high: &mut Option<u32>, code: u32) {
    match code {
        0xD800..=0xDBFF => {
            flush_surrogate(out, pending_high);
            *pending_high = Some(code);
        }
        0xDC00..=0xDFFF => match pending_high.take() {
            Some(high) => {
                let combined = 0x10000 + ((high - 0xD800) << 10) + (code - 0xDC00);
                out.push(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            None => out.push(char::REPLACEMENT_CHARACTER),
        },
        _ => {
            flush_surrogate(out, pending_high);
            out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
    }
}

fn flush_surrogate(out: &mut String, pending_high: &mut Option<u32>) {
    if pending_high.take().is_some() {
        out.push(char::REPLACEMENT_CHARACTER);
    }
}

/// Numeric value of a number token: decimal, exponent, hex/octal/binary,
/// numeric separators and BigInt suffixes.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();
    let cleaned = cleaned.strip_suffix('n').unwrap_or(&cleaned);

    let radix = |digits: &str, radix: u32| u64::from_str_radix(digits, radix).ok().map(|v| v as f64);
    if let Some(hex) = cleaned.strip_prefix("0x") {
        return radix(hex, 16);
    }
    if let Some(oct) = cleaned.strip_prefix("0o") {
        return radix(oct, 8);
    }
    if let Some(bin) = cleaned.strip_prefix("0b") {
        return radix(bin, 2);
    }
    // legacy octal: 0755
    if cleaned.len() > 1
        && cleaned.starts_with('0')
        && cleaned.chars().all(|c| ('0'..='7').contains(&c))
    {
        return radix(&cleaned[1..], 8);
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// JSON form of a number: integral values stay integers.
pub fn number_to_json(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < MAX_SAFE_INTEGER {
        Value::from(value as i64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Property-name spelling of a numeric key (`1e3` names the key `"1000"`).
pub(crate) fn number_key(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < MAX_SAFE_INTEGER {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unescapes_common_sequences() {
        assert_eq!(unescape(r#"a\nb\t\"c\""#), "a\nb\t\"c\"");
        assert_eq!(unescape(r"\x41B\u{43}"), "ABC");
        assert_eq!(unescape(r"it\'s"), "it's");
        assert_eq!(unescape("line\\\ncontinued"), "linecontinued");
    }

    #[test]
    fn combines_surrogate_pairs() {
        assert_eq!(unescape(r"\uD83D\uDE00"), "\u{1F600}");
        assert_eq!(unescape(r"\uD83Dx"), "\u{FFFD}x");
    }

    #[test]
    fn parses_number_spellings() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number("1e3"), Some(1000.0));
        assert_eq!(parse_number(".5"), Some(0.5));
        assert_eq!(parse_number("0xff"), Some(255.0));
        assert_eq!(parse_number("0b101"), Some(5.0));
        assert_eq!(parse_number("1_000"), Some(1000.0));
        assert_eq!(parse_number("10n"), Some(10.0));
        assert_eq!(parse_number("017"), Some(15.0));
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn integral_numbers_stay_integers() {
        assert_eq!(number_to_json(3.0), Value::from(3));
        assert_eq!(number_to_json(0.25), serde_json::json!(0.25));
        assert_eq!(number_key(1000.0), "1000");
    }
}
