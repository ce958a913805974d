//! SL/TP and entry extraction over normalized, lowercased text.

use common::models::Entry;

use crate::lexicon::Lexicon;
use crate::text;

/// How far past a keyword the numeric search reaches.
const KEYWORD_WINDOW: usize = 120;

fn numbers_after_keyword(text_l: &str, keyword: &regex::Regex, window: usize) -> Vec<f64> {
    let mut nums = Vec::new();
    for m in keyword.find_iter(text_l) {
        let start = m.end();
        let end = text::floor_char_boundary(text_l, start + window);
        nums.extend(text::find_numbers(&text_l[start..end]));
    }
    nums
}

pub fn extract_sl(text_l: &str, lex: &Lexicon) -> Option<f64> {
    numbers_after_keyword(text_l, &lex.sl, KEYWORD_WINDOW)
        .into_iter()
        .next()
}

pub fn extract_tps(text_l: &str, lex: &Lexicon) -> Vec<f64> {
    let mut tps = numbers_after_keyword(text_l, &lex.tp, KEYWORD_WINDOW);
    if tps.is_empty() {
        // An explicitly open target carries no numeric TPs.
        if lex.open_target.is_match(text_l) {
            return Vec::new();
        }
        tps = text::find_numbers(text_l);
    }
    if !lex.has_tp_keyword(text_l) {
        return Vec::new();
    }

    let mut seen: Vec<f64> = Vec::new();
    for v in tps {
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    clean_tp_ordinals(seen)
}

/// Drops small integers (1, 2, 3, …) used as TP ordinal labels once values
/// that look like prices (>= 10 or fractional) are present.
fn clean_tp_ordinals(tps: Vec<f64>) -> Vec<f64> {
    fn price_like(x: f64) -> bool {
        x >= 10.0 || (x - x.trunc()).abs() > 1e-9
    }
    if !tps.iter().copied().any(price_like) {
        return tps;
    }
    tps.into_iter().filter(|&x| price_like(x)).collect()
}

/// Entry candidates with fixed precedence: (a) explicit entry keywords and
/// (c) explicit two-number ranges are collected together (ranges win in
/// consolidation); (d) zone phrasings only apply when neither produced a
/// candidate, and (b) the "BUY/SELL <number>" fallback only when nothing
/// else matched at all.
pub fn entry_candidates(text_l: &str, lex: &Lexicon) -> Vec<Entry> {
    let mut cands: Vec<Entry> = Vec::new();

    for caps in lex.entry_hint.captures_iter(text_l) {
        if let Some(v) = text::parse_number(caps.get(1).unwrap().as_str()) {
            cands.push(Entry::Price(v));
        }
    }

    for caps in lex.range_pair.captures_iter(text_l) {
        let a = text::parse_number(caps.get(1).unwrap().as_str());
        let b = text::parse_number(caps.get(2).unwrap().as_str());
        if let (Some(a), Some(b)) = (a, b) {
            if a != b {
                cands.push(Entry::Range {
                    low: a.min(b),
                    high: a.max(b),
                });
            }
        }
    }

    // (d) zone/area/POI with one or two nearby numbers
    if cands.is_empty() {
        if let Some(m) = lex.zone.find(text_l) {
            let end = text::floor_char_boundary(text_l, m.end() + KEYWORD_WINDOW);
            let nums = text::find_numbers(&text_l[m.end()..end]);
            match nums.len() {
                0 => {}
                1 => cands.push(Entry::Price(nums[0])),
                _ => cands.push(Entry::Range {
                    low: nums[0].min(nums[1]),
                    high: nums[0].max(nums[1]),
                }),
            }
        }
    }

    // (b) "BUY/SELL [LIMIT|STOP] <number>", unless the number is a lot size
    if cands.is_empty() {
        for caps in lex.fallback_entry.captures_iter(text_l) {
            let m = caps.get(2).unwrap();
            let Some(v) = text::parse_number(m.as_str()) else {
                continue;
            };
            let tail_end = text::floor_char_boundary(text_l, m.end() + 8);
            if lex.lot_tail.is_match(&text_l[m.end()..tail_end]) {
                continue;
            }
            cands.push(Entry::Price(v));
        }
    }

    cands
}

/// Collapses candidates into one Entry. Identical candidates dedup first, so
/// a zone phrase restating an explicit range does not read as "multiple";
/// genuinely different ranges (or prices) stay unresolved.
pub fn consolidate_entry(cands: Vec<Entry>) -> Entry {
    let mut ranges: Vec<(f64, f64)> = Vec::new();
    let mut prices: Vec<f64> = Vec::new();
    for cand in cands {
        match cand {
            Entry::Range { low, high } => {
                if !ranges.contains(&(low, high)) {
                    ranges.push((low, high));
                }
            }
            Entry::Price(p) => {
                if !prices.contains(&p) {
                    prices.push(p);
                }
            }
            _ => {}
        }
    }

    if !ranges.is_empty() {
        if ranges.len() == 1 {
            let (low, high) = ranges[0];
            return Entry::Range { low, high };
        }
        return Entry::Multiple(ranges.into_iter().flat_map(|(lo, hi)| [lo, hi]).collect());
    }
    match prices.len() {
        0 => Entry::NotFound,
        1 => Entry::Price(prices[0]),
        _ => Entry::Multiple(prices),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex() -> Lexicon {
        Lexicon::default()
    }

    #[test]
    fn sl_takes_the_first_number_in_its_window() {
        let lex = lex();
        assert_eq!(extract_sl("sl 3809.5 tp 3820", &lex), Some(3809.5));
        assert_eq!(extract_sl("stop loss at 18240", &lex), Some(18240.0));
        assert_eq!(extract_sl("no stop here", &lex), None);
    }

    #[test]
    fn tp_collects_deduped_numbers_after_each_keyword() {
        let lex = lex();
        assert_eq!(
            extract_tps("sl 3809 tp 3820, 3825, 3830", &lex),
            vec![3820.0, 3825.0, 3830.0]
        );
        assert_eq!(
            extract_tps("tp1 18010 tp2 17960", &lex),
            vec![18010.0, 17960.0]
        );
    }

    #[test]
    fn ordinal_labels_are_dropped_when_prices_exist() {
        assert_eq!(
            clean_tp_ordinals(vec![1.0, 2.0, 3820.0, 3825.0]),
            vec![3820.0, 3825.0]
        );
        assert_eq!(clean_tp_ordinals(vec![1.0, 2.0]), vec![1.0, 2.0]);
    }

    #[test]
    fn open_targets_yield_no_numeric_tps() {
        let lex = lex();
        assert!(extract_tps("buy gold tp open runner", &lex).is_empty());
    }

    #[test]
    fn without_a_tp_keyword_there_are_no_tps() {
        let lex = lex();
        assert!(extract_tps("buy 3814 sl 3800", &lex).is_empty());
    }

    #[test]
    fn explicit_entry_keyword_wins() {
        let lex = lex();
        let cands = entry_candidates("entry 3814.5 sl 3809", &lex);
        assert_eq!(consolidate_entry(cands), Entry::Price(3814.5));
    }

    #[test]
    fn buy_fallback_applies_only_without_other_candidates() {
        let lex = lex();
        let cands = entry_candidates("buy 4125 sl 4100 tp 4150", &lex);
        assert_eq!(consolidate_entry(cands), Entry::Price(4125.0));
    }

    #[test]
    fn lot_sizes_are_not_entries() {
        let lex = lex();
        let cands = entry_candidates("buy 2 lots of gold", &lex);
        assert_eq!(consolidate_entry(cands), Entry::NotFound);
    }

    #[test]
    fn zone_restating_a_range_is_still_one_range() {
        let lex = lex();
        let cands = entry_candidates("zone 2390-2384", &lex);
        assert_eq!(
            consolidate_entry(cands),
            Entry::Range {
                low: 2384.0,
                high: 2390.0
            }
        );
    }

    #[test]
    fn an_explicit_range_beats_the_zone_phrase() {
        let lex = lex();
        let cands = entry_candidates("sell area 18115 - 18090 sl 18240 tp1 18010", &lex);
        assert_eq!(
            consolidate_entry(cands),
            Entry::Range {
                low: 18090.0,
                high: 18115.0
            }
        );
    }

    #[test]
    fn zone_without_a_range_uses_the_two_nearby_numbers() {
        let lex = lex();
        let cands = entry_candidates("sell zone around 2390 then 2384", &lex);
        assert_eq!(
            consolidate_entry(cands),
            Entry::Range {
                low: 2384.0,
                high: 2390.0
            }
        );
    }

    #[test]
    fn different_ranges_stay_unresolved() {
        let lex = lex();
        let cands = entry_candidates("buy 1.0805-1.0795 or maybe 1.0750-1.0740", &lex);
        assert!(matches!(consolidate_entry(cands), Entry::Multiple(_)));
    }
}
