//! Rule-based classification of free-text trading alerts.
//!
//! The engine is a pure function over its input text and the configuration
//! tables injected at construction; it holds no mutable state and can be
//! called concurrently from any number of workers.

pub mod assets;
pub mod extract;
pub mod format;
pub mod lexicon;
pub mod score;
pub mod special;
pub mod text;

pub use assets::AssetCatalog;
pub use format::format_signal;
pub use lexicon::Lexicon;

use common::models::{Classification, Direction, Entry, ExtractedSignal, TradeAction};

pub struct Classifier {
    catalog: AssetCatalog,
    lexicon: Lexicon,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            catalog: AssetCatalog::default(),
            lexicon: Lexicon::default(),
        }
    }

    /// Restricted-vocabulary construction for tests and special deployments.
    pub fn with_tables(catalog: AssetCatalog, lexicon: Lexicon) -> Self {
        Self { catalog, lexicon }
    }

    /// Classifies one message. Returns one signal per distinct asset found;
    /// noise and special actions yield exactly one entry.
    pub fn classify(&self, text: &str) -> Vec<ExtractedSignal> {
        if text.trim().is_empty() {
            return vec![ExtractedSignal::noise("empty message")];
        }

        let norm = text::normalize_for_search(text);
        let lower = norm.to_lowercase();

        // Special actions run first, in fixed priority, on the raw text:
        // separator canonicalization would destroy their "to"/"a" phrasings.
        if special::has_partial_close(&self.lexicon, text) {
            return vec![self.special_signal(TradeAction::PartialClose, &lower, None)];
        }
        if special::has_close_all(&self.lexicon, text) {
            return vec![self.special_signal(TradeAction::CloseAll, &lower, None)];
        }
        if let Some((action, level)) = special::detect_move_sl(&self.lexicon, text) {
            return vec![self.special_signal(action, &lower, Some(level))];
        }
        if special::has_breakeven(&self.lexicon, text) {
            return vec![self.special_signal(TradeAction::Breakeven, &lower, None)];
        }

        let assets = self.catalog.find(&lower);
        let valid = !assets.is_empty()
            && self.lexicon.has_sl_keyword(&lower)
            && self.lexicon.has_tp_keyword(&lower);

        let sl = extract::extract_sl(&lower, &self.lexicon);
        let tps = extract::extract_tps(&lower, &self.lexicon);

        let dir_explicit = score::explicit_direction(&lower, &self.lexicon);
        let dir_implicit = score::implicit_direction(sl, &tps);
        let direction = dir_explicit
            .or(dir_implicit)
            .unwrap_or(Direction::Indeterminate);

        let entry = extract::consolidate_entry(extract::entry_candidates(&lower, &self.lexicon));
        let action = score::detect_action(&lower, &self.lexicon, dir_explicit.or(dir_implicit));

        let resolved = score::resolve_entry(&entry, action);
        let (resolved, sl, tps, scale_note) = score::normalize_scale(direction, resolved, sl, &tps);
        let (tps, first_tp_ok) = score::filter_tps(direction, resolved, tps);

        let mut consistency = score::check_consistency(direction, resolved, sl, &tps);
        if first_tp_ok == Some(false) {
            // a malformed lead TP is a hard defect, not mere noise
            consistency = Some(false);
        }

        let mut notes: Vec<String> = Vec::new();
        if let (Some(e), Some(i)) = (dir_explicit, dir_implicit) {
            if e != i {
                notes.push(format!(
                    "explicit direction ({:?}) differs from implicit ({:?})",
                    e, i
                ));
            }
        }
        if !self.lexicon.has_sl_keyword(&lower) {
            notes.push("missing SL keyword".to_string());
        }
        if !self.lexicon.has_tp_keyword(&lower) {
            notes.push("missing TP keyword".to_string());
        }
        if assets.is_empty() {
            notes.push("no asset detected".to_string());
        }
        if let Some(note) = scale_note {
            notes.push(note);
        }

        let base = ExtractedSignal {
            classification: if valid {
                Classification::Valid
            } else {
                Classification::Noise
            },
            asset: assets.first().cloned(),
            action,
            direction,
            entry,
            resolved_entry: resolved,
            sl,
            take_profits: tps,
            consistency,
            score: 0,
            notes,
        };

        if !valid {
            let mut signal = base;
            signal.score = score::decide_score(&signal);
            return vec![signal];
        }

        assets
            .into_iter()
            .map(|asset| {
                let mut signal = base.clone();
                signal.asset = Some(asset);
                signal.score = score::decide_score(&signal);
                signal
            })
            .collect()
    }

    fn special_signal(
        &self,
        action: TradeAction,
        lower: &str,
        sl: Option<f64>,
    ) -> ExtractedSignal {
        let mut signal = ExtractedSignal {
            classification: Classification::Valid,
            asset: self.catalog.find(lower).into_iter().next(),
            action: Some(action),
            direction: Direction::Indeterminate,
            entry: Entry::NotFound,
            resolved_entry: None,
            sl,
            take_profits: Vec::new(),
            consistency: None,
            score: 0,
            notes: Vec::new(),
        };
        signal.score = score::decide_score(&signal);
        signal
    }
}
