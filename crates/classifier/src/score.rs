//! Direction/action resolution, scale repair, TP-side filtering, the
//! consistency invariant and the binary score.

use common::models::{Classification, Direction, Entry, ExtractedSignal, TradeAction};

use crate::lexicon::Lexicon;

pub fn explicit_direction(text_l: &str, lex: &Lexicon) -> Option<Direction> {
    if lex.buy.is_match(text_l) {
        return Some(Direction::Buy);
    }
    if lex.sell.is_match(text_l) {
        return Some(Direction::Sell);
    }
    None
}

/// Direction implied by the geometry of SL vs TPs: every TP above the SL
/// reads long, every TP below reads short, a mix decides nothing.
pub fn implicit_direction(sl: Option<f64>, tps: &[f64]) -> Option<Direction> {
    let sl = sl?;
    if tps.is_empty() {
        return None;
    }
    let above = tps.iter().filter(|&&tp| tp > sl).count();
    let below = tps.iter().filter(|&&tp| tp < sl).count();
    if above > 0 && below == 0 {
        Some(Direction::Buy)
    } else if below > 0 && above == 0 {
        Some(Direction::Sell)
    } else {
        None
    }
}

/// LIMIT/STOP wording refines the action even before the direction resolves;
/// otherwise the direction decides between plain BUY and SELL.
pub fn detect_action(text_l: &str, lex: &Lexicon, direction: Option<Direction>) -> Option<TradeAction> {
    if lex.buy_limit.is_match(text_l) {
        return Some(TradeAction::BuyLimit);
    }
    if lex.buy_stop.is_match(text_l) {
        return Some(TradeAction::BuyStop);
    }
    if lex.sell_limit.is_match(text_l) {
        return Some(TradeAction::SellLimit);
    }
    if lex.sell_stop.is_match(text_l) {
        return Some(TradeAction::SellStop);
    }
    match direction {
        Some(Direction::Buy) => Some(TradeAction::Buy),
        Some(Direction::Sell) => Some(TradeAction::Sell),
        _ => None,
    }
}

/// A range fills conservatively: the low bound for BUY-class actions, the
/// high bound for SELL-class. A scalar price is used as-is.
pub fn resolve_entry(entry: &Entry, action: Option<TradeAction>) -> Option<f64> {
    match entry {
        Entry::Price(p) => Some(*p),
        Entry::Range { low, high } => {
            let action = action?;
            if action.is_buy_side() {
                Some(*low)
            } else if action.is_sell_side() {
                Some(*high)
            } else {
                None
            }
        }
        _ => None,
    }
}

pub fn check_consistency(
    direction: Direction,
    entry: Option<f64>,
    sl: Option<f64>,
    tps: &[f64],
) -> Option<bool> {
    let entry = entry?;
    let sl = sl?;
    if tps.is_empty() {
        return None;
    }
    match direction {
        Direction::Buy => Some(sl < entry && tps.iter().any(|&tp| tp > entry)),
        Direction::Sell => Some(tps.iter().any(|&tp| tp < entry) && entry < sl),
        Direction::Indeterminate => None,
    }
}

fn digits(x: f64) -> usize {
    (x.abs().trunc() as i64).to_string().len()
}

/// Digit-count mode over the group, first-seen wins ties.
fn majority_digits(lens: &[usize]) -> usize {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for &len in lens {
        match counts.iter_mut().find(|(l, _)| *l == len) {
            Some((_, c)) => *c += 1,
            None => counts.push((len, 1)),
        }
    }
    counts
        .iter()
        .copied()
        .max_by_key(|&(_, c)| c)
        .map(|(l, _)| l)
        .unwrap_or(0)
}

/// The ±1-digit scale repair. Either the entry alone or the whole SL+TP group
/// may be off by one order of magnitude (a dropped or doubled digit); the
/// correction is kept only when it makes the consistency invariant hold, and
/// is never applied to any other deviation pattern.
pub fn normalize_scale(
    direction: Direction,
    entry: Option<f64>,
    sl: Option<f64>,
    tps: &[f64],
) -> (Option<f64>, Option<f64>, Vec<f64>, Option<String>) {
    let unchanged = (entry, sl, tps.to_vec(), None);
    let (Some(entry_v), Some(sl_v)) = (entry, sl) else {
        return unchanged;
    };
    if tps.is_empty() || direction == Direction::Indeterminate {
        return unchanged;
    }

    let mut nums = vec![entry_v, sl_v];
    nums.extend_from_slice(tps);
    let lens: Vec<usize> = nums.iter().map(|&v| digits(v)).collect();
    let major = majority_digits(&lens);

    let deviated: Vec<usize> = lens
        .iter()
        .enumerate()
        .filter(|&(_, &len)| len.abs_diff(major) == 1)
        .map(|(i, _)| i)
        .collect();
    if deviated.is_empty() {
        return unchanged;
    }

    let accepts = |e: f64, s: f64, t: &[f64]| {
        check_consistency(direction, Some(e), Some(s), t) == Some(true)
    };

    // entry alone is the minority
    if deviated == [0] {
        let factor = if lens[0] < major { 10.0 } else { 0.1 };
        let fixed = entry_v * factor;
        if accepts(fixed, sl_v, tps) {
            let note = format!(
                "scale repair: entry {} ({} -> {} digits)",
                if factor == 10.0 { "x10" } else { "/10" },
                lens[0],
                major
            );
            return (Some(fixed), sl, tps.to_vec(), Some(note));
        }
        return unchanged;
    }

    // the whole SL+TP group is the minority
    if (1..nums.len()).all(|i| deviated.contains(&i)) {
        let factor = if lens[1] < major { 10.0 } else { 0.1 };
        let fixed_sl = sl_v * factor;
        let fixed_tps: Vec<f64> = tps.iter().map(|tp| tp * factor).collect();
        if accepts(entry_v, fixed_sl, &fixed_tps) {
            let note = format!(
                "scale repair: SL/TP {} ({} -> {} digits)",
                if factor == 10.0 { "x10" } else { "/10" },
                lens[1],
                major
            );
            return (entry, Some(fixed_sl), fixed_tps, Some(note));
        }
        return unchanged;
    }

    unchanged
}

/// Discards TPs on the wrong side of the resolved entry. A wrong-side FIRST
/// TP is a hard defect, reported separately so the caller can force the
/// consistency flag to false.
pub fn filter_tps(
    direction: Direction,
    entry: Option<f64>,
    tps: Vec<f64>,
) -> (Vec<f64>, Option<bool>) {
    let Some(entry) = entry else {
        return (tps, None);
    };
    if direction == Direction::Indeterminate || tps.is_empty() {
        return (tps, None);
    }
    let ok = |tp: f64| match direction {
        Direction::Buy => tp > entry,
        Direction::Sell => tp < entry,
        Direction::Indeterminate => true,
    };
    let first_ok = ok(tps[0]);
    let kept = tps.into_iter().filter(|&tp| ok(tp)).collect();
    (kept, Some(first_ok))
}

/// Binary score. Special actions carry their own minimal requirements; the
/// general case needs the full field set and a non-failing consistency check.
pub fn decide_score(signal: &ExtractedSignal) -> u8 {
    if signal.classification != Classification::Valid {
        return 0;
    }
    match signal.action {
        Some(TradeAction::PartialClose)
        | Some(TradeAction::CloseAll)
        | Some(TradeAction::Breakeven) => return 10,
        Some(TradeAction::MoveSl) | Some(TradeAction::MoveSlAll) => {
            return if signal.sl.is_some() { 10 } else { 0 };
        }
        _ => {}
    }
    let complete = signal.action.is_some()
        && signal.resolved_entry.is_some()
        && signal.sl.is_some()
        && !signal.take_profits.is_empty()
        && signal.consistency != Some(false);
    if complete { 10 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implicit_direction_follows_tp_side() {
        assert_eq!(
            implicit_direction(Some(65500.0), &[72000.0]),
            Some(Direction::Buy)
        );
        assert_eq!(
            implicit_direction(Some(18240.0), &[18010.0, 17960.0]),
            Some(Direction::Sell)
        );
        assert_eq!(implicit_direction(Some(100.0), &[90.0, 110.0]), None);
        assert_eq!(implicit_direction(None, &[100.0]), None);
    }

    #[test]
    fn range_resolves_to_the_conservative_bound() {
        let range = Entry::Range {
            low: 2384.0,
            high: 2390.0,
        };
        assert_eq!(resolve_entry(&range, Some(TradeAction::Buy)), Some(2384.0));
        assert_eq!(resolve_entry(&range, Some(TradeAction::Sell)), Some(2390.0));
        assert_eq!(
            resolve_entry(&range, Some(TradeAction::SellLimit)),
            Some(2390.0)
        );
        assert_eq!(resolve_entry(&range, None), None);
    }

    #[test]
    fn consistency_invariant_by_side() {
        assert_eq!(
            check_consistency(Direction::Buy, Some(3814.5), Some(3809.5), &[3820.0]),
            Some(true)
        );
        assert_eq!(
            check_consistency(Direction::Sell, Some(2390.0), Some(2400.0), &[2380.0]),
            Some(true)
        );
        assert_eq!(
            check_consistency(Direction::Buy, Some(3814.5), Some(3820.0), &[3825.0]),
            Some(false)
        );
        assert_eq!(
            check_consistency(Direction::Buy, None, Some(3809.5), &[3820.0]),
            None
        );
    }

    #[test]
    fn entry_scale_repair_only_when_it_restores_consistency() {
        // 193.5 against a 4-digit SL/TP group: x10 makes the invariant hold
        let (entry, sl, tps, note) =
            normalize_scale(Direction::Buy, Some(193.5), Some(1920.0), &[1945.0]);
        assert_eq!(entry, Some(1935.0));
        assert_eq!(sl, Some(1920.0));
        assert_eq!(tps, vec![1945.0]);
        assert!(note.is_some());

        // same deviation, but the repair would still be inconsistent: untouched
        let (entry, _, _, note) =
            normalize_scale(Direction::Buy, Some(193.5), Some(1960.0), &[1945.0]);
        assert_eq!(entry, Some(193.5));
        assert!(note.is_none());
    }

    #[test]
    fn group_scale_repair_multiplies_sl_and_tps_together() {
        let (entry, sl, tps, note) =
            normalize_scale(Direction::Buy, Some(19350.0), Some(1920.0), &[1945.0, 19600.0]);
        // mixed deviation pattern: left untouched
        assert_eq!(entry, Some(19350.0));
        assert_eq!(sl, Some(1920.0));
        assert_eq!(tps, vec![1945.0, 19600.0]);
        assert!(note.is_none());
    }

    #[test]
    fn two_digit_deviations_are_never_touched() {
        let (entry, _, _, note) =
            normalize_scale(Direction::Buy, Some(19.35), Some(1920.0), &[1945.0]);
        assert_eq!(entry, Some(19.35));
        assert!(note.is_none());
    }

    #[test]
    fn wrong_side_tps_are_dropped() {
        let (kept, first_ok) =
            filter_tps(Direction::Buy, Some(3814.5), vec![3820.0, 3800.0, 3825.0]);
        assert_eq!(kept, vec![3820.0, 3825.0]);
        assert_eq!(first_ok, Some(true));
    }

    #[test]
    fn wrong_side_first_tp_is_a_hard_defect() {
        let (kept, first_ok) = filter_tps(Direction::Buy, Some(3814.5), vec![3800.0, 3825.0]);
        assert_eq!(kept, vec![3825.0]);
        assert_eq!(first_ok, Some(false));
    }
}
