//! Keyword families, compiled once and injected into the classifier.
//!
//! Alerts mix English, Spanish and Portuguese trading slang; every family
//! keeps both vocabularies. Alternation order matters where one keyword is a
//! prefix of another ("stop loss" before "stop", "take profit" before "take").

use regex::Regex;

pub struct Lexicon {
    pub sl: Regex,
    pub tp: Regex,
    pub buy: Regex,
    pub sell: Regex,
    pub buy_limit: Regex,
    pub buy_stop: Regex,
    pub sell_limit: Regex,
    pub sell_stop: Regex,
    /// Explicit entry keyword followed by a numeric token.
    pub entry_hint: Regex,
    /// "BUY/SELL [LIMIT|STOP] <number>" fallback when no entry keyword exists.
    pub fallback_entry: Regex,
    /// Lot-size words that disqualify a fallback number ("buy 2 lots").
    pub lot_tail: Regex,
    /// Two numbers joined by a canonical range separator.
    pub range_pair: Regex,
    pub zone: Regex,
    /// "TP: open / runner / por definir" — an explicitly open target.
    pub open_target: Regex,
    pub partial_close: Regex,
    pub close_all: Regex,
    /// Move-SL phrasings with the new level captured as group 1.
    pub move_sl: Vec<Regex>,
    pub stoplosses_plural: Regex,
    /// Phrases excluded from move-SL detection outright.
    pub move_sl_excludes: Vec<&'static str>,
    pub breakeven_words: Regex,
    /// Case-sensitive on purpose: "BE" only counts in uppercase.
    pub be_upper: Regex,
    /// Move-SL-to-entry/breakeven phrasings (no numeric level).
    pub move_to_entry: Regex,
}

const NUM_TOKEN: &str = r"([+-]?\d[\d .,k]*)";
const RANGE_SEP: &str = r"(?:/|-|\s+a\s+|\s+hasta\s+|\s+to\s+|\s+and\s+)";
const SL_REF: &str = r"(?:sl|stop\s*loss|stoploss|stop-loss|stop)(?:es)?";
const OWNER: &str = r"(?:(?:my|our|your|all|the|el|la|los)\s+)?";

impl Default for Lexicon {
    fn default() -> Self {
        let rx = |p: &str| Regex::new(p).unwrap();
        Self {
            sl: rx(r"(?i)\bsl\b|\bs/l\b|\bstop\s*loss\b|\bstop\b"),
            tp: rx(
                r"(?i)\btp\d*\b|\btargets?\b|\btake\s*profit\b|\bobjetivos?\b|\bmeta\b|\btake\b|\balvo\b",
            ),
            buy: rx(r"(?i)\bbuy\b|\blong\b|\bgo\s*long\b|\bbullish\b|\bcomprar\b|\bcompra\b"),
            sell: rx(r"(?i)\bsell\b|\bshort\b|\bgo\s*short\b|\bbearish\b|\bvender\b|\bventa\b"),
            buy_limit: rx(r"(?i)\bbuy\s+limit\b|\blimit\s+buy\b"),
            buy_stop: rx(r"(?i)\bbuy\s+stop\b|\bstop\s+buy\b"),
            sell_limit: rx(r"(?i)\bsell\s+limit\b|\blimit\s+sell\b"),
            sell_stop: rx(r"(?i)\bsell\s+stop\b|\bstop\s+sell\b"),
            entry_hint: rx(&format!(
                r"(?i)(?:@|\bentry\s*(?:price|precio)?\b|\bentrada\b|\bbuy\s*at\b|\bsell\s*at\b)\s*[:=\-]?\s*{NUM_TOKEN}"
            )),
            fallback_entry: rx(&format!(
                r"(?i)\b(buy|sell)\b(?:\s+(?:limit|stop))?\s*@?\s*{NUM_TOKEN}"
            )),
            lot_tail: rx(r"(?i)^\s*(?:lots?|lotes?)\b"),
            range_pair: rx(&format!(r"(?i){NUM_TOKEN}\s*{RANGE_SEP}\s*{NUM_TOKEN}")),
            zone: rx(
                r"(?i)\b(?:zone|zona|área|area|poi|supply|demand|entry\s*zone|buy\s*area|sell\s*area|range)\b",
            ),
            open_target: rx(
                r"(?i)(?:tp\d*|targets?|take\s*profit|objetivos?|meta)\s*[:=\-]?\s*(?:open|abierto|libre|runner|pendiente|por\s+definir|sin\s+definir|none)",
            ),
            partial_close: rx(
                r"(?i)\bpartials?\b|\bparcial(?:es)?\b|\bmitad\b|\basegurando\b|\basegurar\b|\basegurad\b|\baseguren\b|\bscale\s+out\b|\btrim\b|\breduce\s+position\b|\breducir\s+posici[oó]n\b|\breducid\b|\breducimos\b",
            ),
            close_all: rx(
                r"(?i)\bclose\s+(?:all|everything|now)\b|\bclosed\b|\bflatten(?:\s+all)?\b|\b(?:cerrar|cierra|cierren|cerrad)\s+(?:todo|todas(?:\s+las\s+(?:posiciones|[oó]rdenes))?|ya|ahora|posiciones|[oó]rdenes|operaciones)\b|\bcerrad\b|\bcierren\b|\banulamos\b|\banular\b|\banulen\b|\bsalir\s+de\s+todo\b|\bsalida\s+total\b",
            ),
            move_sl: vec![
                rx(&format!(
                    r"(?i)\b(?:temporarily\s+)?(?:move|moved|moving|shift(?:ing)?|set|update|change|adjust|ajusta|put|poner|llevar|subir|bajar|pasa|mover|ajustar)\s+{OWNER}{SL_REF}\s+(?:to|a|en)\s+([0-9]+(?:\.[0-9]+)?)"
                )),
                rx(&format!(
                    r"(?i)(?:^|\s){SL_REF}\s+to\s+([0-9]+(?:\.[0-9]+)?)"
                )),
                rx(r"(?i)\bmove\s+to\s+([0-9]+(?:\.[0-9]+)?)\s+(?:sl|stop\s*loss|stoploss)"),
            ],
            stoplosses_plural: rx(r"(?i)\bstoplosses\b"),
            move_sl_excludes: vec!["back to entry"],
            breakeven_words: rx(
                r"(?i)\bbreakeven\b|\bbreak-even\b|\bbreak\s+even\b|\bpunto\s+(?:de\s+)?equilibrio\b|\bsin\s+p[eé]rdidas\b|\bcero\s+p[eé]rdidas\b",
            ),
            be_upper: Regex::new(r"B\.E\.|BE").unwrap(),
            move_to_entry: rx(&format!(
                r"(?i)\b(?:move|moved|moving|set|put|adjust|ajusta|llevar|poner|subir|bajar|pasa|ajustar|mover)\s+{OWNER}{SL_REF}\s+(?:to|a|al|en)\s+(?:entry|entrada|be\b|breakeven|break\s+even|cero|zero|0\b)|{SL_REF}\s+(?:to|a|en)\s+(?:entry|entrada|be\b|breakeven|break\s+even|cero|zero|0\b)|{SL_REF}\s+al\s+punto\s+de\s+entrada|{SL_REF}\s+en\s+entrada|\bmove\s+to\s+(?:breakeven|break\s+even|be\b)|\bgo\s+to\s+(?:breakeven|break\s+even|be\b)|\bgo\s+(?:breakeven|break\s+even)\b|\bset\s+to\s+(?:breakeven|break\s+even|be\b)|\bmover\s+a\s+be\b|\bir\s+a\s+be\b|\bal\s+be\b"
            )),
        }
    }
}

impl Lexicon {
    pub fn has_sl_keyword(&self, text: &str) -> bool {
        self.sl.is_match(text)
    }

    pub fn has_tp_keyword(&self, text: &str) -> bool {
        self.tp.is_match(text)
    }
}
