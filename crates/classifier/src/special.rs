//! Detection of position-management actions that bypass the general
//! extraction pipeline. Fixed priority: partial close, close all, move SL,
//! breakeven.
//!
//! All detectors take the raw message text: range-separator canonicalization
//! rewrites " to "/" a " into "-", which would break the move-SL and
//! breakeven phrasings, and the uppercase-"BE" check needs original casing.

use common::models::TradeAction;

use crate::lexicon::Lexicon;
use crate::text;

pub fn has_partial_close(lex: &Lexicon, text: &str) -> bool {
    lex.partial_close.is_match(text)
}

pub fn has_close_all(lex: &Lexicon, text: &str) -> bool {
    lex.close_all.is_match(text)
}

/// Matches "move SL to <level>" phrasings and extracts the new stop level.
/// Breakeven phrasings are left for [`has_breakeven`] so "move SL to BE"
/// never reads as a numeric move; "stoplosses" (plural) targets every open
/// position.
pub fn detect_move_sl(lex: &Lexicon, text: &str) -> Option<(TradeAction, f64)> {
    let lowered = text.to_lowercase();
    if lex
        .move_sl_excludes
        .iter()
        .any(|phrase| lowered.contains(phrase))
    {
        return None;
    }
    if has_breakeven(lex, text) {
        return None;
    }

    let action = if lex.stoplosses_plural.is_match(text) {
        TradeAction::MoveSlAll
    } else {
        TradeAction::MoveSl
    };

    for rx in &lex.move_sl {
        if let Some(caps) = rx.captures(text) {
            if let Some(level) = text::parse_number(caps.get(1).unwrap().as_str()) {
                return Some((action, level));
            }
        }
    }
    None
}

/// Breakeven is signalled three ways: explicit breakeven vocabulary, a
/// standalone uppercase "BE"/"B.E.", or a move-SL-to-entry phrasing. The
/// uppercase check guards against the verb "to be" and its inflections.
pub fn has_breakeven(lex: &Lexicon, text: &str) -> bool {
    for m in lex.be_upper.find_iter(text) {
        if standalone_uppercase_be(text, m.start(), m.end()) {
            return true;
        }
    }
    lex.breakeven_words.is_match(text) || lex.move_to_entry.is_match(text)
}

fn standalone_uppercase_be(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    // flanked by a lowercase letter -> part of a word like "toBE"/"BEst"
    if start > 0 && bytes[start - 1].is_ascii_lowercase() {
        return false;
    }
    if end < bytes.len() && bytes[end].is_ascii_lowercase() {
        return false;
    }

    // "BEEN" / "BEING"
    let after = &text[end..];
    let after_upper = after
        .chars()
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    if after_upper.starts_with("EN") || after_upper.starts_with("ING") {
        return false;
    }

    // "TO BE" / "WILL BE" in any case
    let before = &text[..start];
    let tail: String = before
        .chars()
        .rev()
        .take(10)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let tail = tail.to_ascii_lowercase();
    let trimmed = tail.trim_end();
    if trimmed.ends_with("to") || trimmed.ends_with("will") {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex() -> Lexicon {
        Lexicon::default()
    }

    #[test]
    fn partial_close_keywords() {
        let lex = lex();
        assert!(has_partial_close(&lex, "take partials here"));
        assert!(has_partial_close(&lex, "cerrar parciales ya mismo"));
        assert!(has_partial_close(&lex, "asegurando profits"));
        assert!(!has_partial_close(&lex, "buy gold now"));
    }

    #[test]
    fn close_all_keywords() {
        let lex = lex();
        assert!(has_close_all(&lex, "close all positions"));
        assert!(has_close_all(&lex, "cerrar todo"));
        assert!(has_close_all(&lex, "cerrar ya"));
        assert!(has_close_all(&lex, "trade closed"));
        assert!(!has_close_all(&lex, "close"));
        assert!(!has_close_all(&lex, "cerrar"));
    }

    #[test]
    fn move_sl_extracts_the_new_level() {
        let lex = lex();
        assert_eq!(
            detect_move_sl(&lex, "move my SL to 1850"),
            Some((TradeAction::MoveSl, 1850.0))
        );
    }

    #[test]
    fn plural_stoplosses_target_all_positions() {
        let lex = lex();
        assert_eq!(
            detect_move_sl(&lex, "temporarily shifting the stoplosses to 1850.5"),
            Some((TradeAction::MoveSlAll, 1850.5))
        );
    }

    #[test]
    fn move_sl_defers_to_breakeven_phrasings() {
        let lex = lex();
        assert_eq!(detect_move_sl(&lex, "move SL to breakeven"), None);
        assert_eq!(detect_move_sl(&lex, "sl back to entry now"), None);
    }

    #[test]
    fn spanish_move_sl_verbs() {
        let lex = lex();
        assert_eq!(
            detect_move_sl(&lex, "subir el stop loss a 1920"),
            Some((TradeAction::MoveSl, 1920.0))
        );
    }

    #[test]
    fn uppercase_be_is_breakeven() {
        let lex = lex();
        assert!(has_breakeven(&lex, "SL a BE"));
        assert!(has_breakeven(&lex, "B.E. now"));
    }

    #[test]
    fn verb_to_be_is_not_breakeven() {
        let lex = lex();
        assert!(!has_breakeven(&lex, "this will BE great"));
        assert!(!has_breakeven(&lex, "gold has BEEN strong"));
        assert!(!has_breakeven(&lex, "price is BEING tested"));
        assert!(!has_breakeven(&lex, "it has to BE today"));
    }

    #[test]
    fn move_to_entry_phrasings_are_breakeven() {
        let lex = lex();
        assert!(has_breakeven(&lex, "move sl to entry"));
        assert!(has_breakeven(&lex, "stop loss to zero"));
        assert!(has_breakeven(&lex, "llevar el sl a entrada"));
    }
}
