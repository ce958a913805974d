//! Rendering of actionable signals into the publishing template.

use common::models::{Entry, ExtractedSignal, TradeAction};

fn fmt_num(value: f64) -> String {
    let text = format!("{:.5}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text.is_empty() {
        (value as i64).to_string()
    } else {
        text.to_string()
    }
}

fn side_label(action: TradeAction) -> Option<&'static str> {
    if action.is_buy_side() {
        Some("COMPRAR")
    } else if action.is_sell_side() {
        Some("VENDER")
    } else {
        None
    }
}

/// Publishing template for a score-10 signal:
///
/// ```text
/// COMPRAR - XAUUSD - 3814.5
///
/// SL: 3809.5
///
/// TP1: 3820
/// TP2: 3825
/// ```
///
/// Special actions render as their bare action name; anything below score 10
/// renders nothing.
pub fn format_signal(signal: &ExtractedSignal) -> Option<String> {
    if !signal.is_actionable() {
        return None;
    }
    let action = signal.action?;
    if action.is_special() {
        return Some(action.as_str().to_string());
    }
    let side = side_label(action)?;

    let asset = signal
        .asset
        .clone()
        .unwrap_or_else(|| "#Divisa#".to_string());

    let entry_text = match &signal.entry {
        Entry::Range { low, high } => format!("({}-{})", fmt_num(*low), fmt_num(*high)),
        Entry::Price(p) => fmt_num(signal.resolved_entry.unwrap_or(*p)),
        _ => fmt_num(signal.resolved_entry?),
    };

    let sl = fmt_num(signal.sl?);

    let mut lines = vec![format!("{} - {} - {}", side, asset, entry_text), String::new()];
    lines.push(format!("SL: {}", sl));
    lines.push(String::new());
    for (idx, tp) in signal.take_profits.iter().enumerate() {
        lines.push(format!("TP{}: {}", idx + 1, fmt_num(*tp)));
    }

    Some(lines.join("\n"))
}
