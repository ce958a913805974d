//! Text normalization and locale-tolerant number parsing.
//!
//! Alerts arrive with decorative punctuation, mixed dash characters and
//! ambiguous thousands/decimal separators. Everything downstream works on the
//! output of [`normalize_for_search`]; display code keeps the original text.

use once_cell::sync::Lazy;
use regex::Regex;

const EN_DASH: char = '\u{2013}';
const EM_DASH: char = '\u{2014}';
const ARROW: char = '\u{2192}';

static K_SUFFIX_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([+-]?\d+(?:[.,]\d+)?)\s*k\s*$").unwrap());

/// Contiguous digit runs are the first alternative on purpose: "3886" must
/// never be carved into "388" + "6" by the grouped-thousands branch.
static NUMBER_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[+-]?\d+(?:[.,]\d+)?k?|[+-]?\d{1,3}(?:[ \u{00A0}.,]\d{3})+(?:[.,]\d+)?k?")
        .unwrap()
});

fn strip_emoji_tags(s: &str) -> String {
    // '@' survives: it doubles as an entry-price hint ("@3814.5").
    s.chars()
        .map(|c| match c {
            ':' | '•' | '*' | '|' => ' ',
            other => other,
        })
        .collect()
}

fn normalize_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical matching form: decorative punctuation stripped, every range
/// separator spelled "-", whitespace collapsed. Case is preserved here because
/// the uppercase-"BE" breakeven check needs it; extraction lowercases later.
pub fn normalize_for_search(text: &str) -> String {
    let mut s = text.replace('\t', " ");
    s = strip_emoji_tags(&s);
    s = s
        .replace(EN_DASH, "-")
        .replace(EM_DASH, "-")
        .replace(ARROW, "-");
    for kw in [" a ", " hasta ", " to ", " and "] {
        s = s.replace(kw, " - ");
    }
    normalize_spaces(&s)
}

/// Parses one numeric token. The decimal separator is whichever of "," or "."
/// appears rightmost; the other one is stripped as a thousands separator. A
/// trailing "k" multiplies by 1000. A token without any digit fails.
pub fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim().to_lowercase();
    if let Some(caps) = K_SUFFIX_RX.captures(&raw) {
        return parse_number(caps.get(1).unwrap().as_str()).map(|v| v * 1000.0);
    }

    let mut s: String = raw
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{a0}')
        .collect();
    if !s.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let last_dot = s.rfind('.');
    let last_comma = s.rfind(',');
    match (last_dot, last_comma) {
        (Some(d), Some(c)) if d > c => s.retain(|ch| ch != ','),
        (Some(_), Some(_)) => {
            s.retain(|ch| ch != '.');
            s = s.replace(',', ".");
        }
        (None, Some(_)) => s = s.replace(',', "."),
        _ => {}
    }

    // apostrophe group separators (1'234, 1’234), only when digit-preceded
    let mut cleaned = String::with_capacity(s.len());
    let mut prev_digit = false;
    for ch in s.chars() {
        if (ch == '\'' || ch == '’') && prev_digit {
            continue;
        }
        prev_digit = ch.is_ascii_digit();
        cleaned.push(ch);
    }

    cleaned.parse::<f64>().ok()
}

/// Scans free text for numeric tokens. A candidate flanked by an ASCII letter
/// on either side is rejected wholly ("TP1" must not yield 1, "es35" must not
/// yield 35).
pub fn find_numbers(s: &str) -> Vec<f64> {
    let bytes = s.as_bytes();
    let mut out = Vec::new();
    for m in NUMBER_RX.find_iter(s) {
        let before_ok = m.start() == 0 || !bytes[m.start() - 1].is_ascii_alphabetic();
        let after_ok = m.end() >= bytes.len() || !bytes[m.end()].is_ascii_alphabetic();
        if !before_ok || !after_ok {
            continue;
        }
        if let Some(v) = parse_number(m.as_str()) {
            out.push(v);
        }
    }
    out
}

/// Clamp `pos` down to the nearest char boundary so keyword windows can slice
/// text that contains multi-byte characters.
pub(crate) fn floor_char_boundary(s: &str, mut pos: usize) -> usize {
    if pos >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_separator_is_rightmost_of_comma_and_dot() {
        assert_eq!(parse_number("3.814,5"), Some(3814.5));
        assert_eq!(parse_number("3,814.5"), Some(3814.5));
        assert_eq!(parse_number("3814.5"), Some(3814.5));
    }

    #[test]
    fn comma_alone_is_a_decimal_separator() {
        assert_eq!(parse_number("1,0805"), Some(1.0805));
    }

    #[test]
    fn k_suffix_multiplies_by_thousand() {
        assert_eq!(parse_number("4k"), Some(4000.0));
        assert_eq!(parse_number("2.5k"), Some(2500.0));
    }

    #[test]
    fn token_without_digits_fails() {
        assert_eq!(parse_number("breakeven"), None);
        assert_eq!(parse_number("k"), None);
    }

    #[test]
    fn apostrophe_thousands_are_stripped() {
        assert_eq!(parse_number("1'234.5"), Some(1234.5));
        assert_eq!(parse_number("1’234"), Some(1234.0));
    }

    #[test]
    fn contiguous_digits_are_not_split() {
        assert_eq!(find_numbers("SL 3886"), vec![3886.0]);
        assert_eq!(find_numbers("3886"), vec![3886.0]);
    }

    #[test]
    fn letter_flanked_candidates_are_rejected() {
        assert!(find_numbers("TP1").is_empty());
        assert!(find_numbers("es35").is_empty());
        assert_eq!(find_numbers("TP1 18010"), vec![18010.0]);
    }

    #[test]
    fn separators_canonicalized_for_search() {
        assert_eq!(
            normalize_for_search("zone 2390\u{2013}2384"),
            "zone 2390-2384"
        );
        assert_eq!(normalize_for_search("100 to 200"), "100 - 200");
        assert_eq!(normalize_for_search("entry: @3814"), "entry @3814");
    }

    #[test]
    fn number_lists_are_scanned_in_order() {
        assert_eq!(
            find_numbers("TP 3820, 3825, 3830"),
            vec![3820.0, 3825.0, 3830.0]
        );
    }
}
