use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    Valid,
    Noise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Buy,
    Sell,
    Indeterminate,
}

/// The concrete instruction a signal resolves to. The first six are regular
/// order types; the rest act on an already-open position and carry their own
/// minimal scoring rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
    BuyLimit,
    SellLimit,
    BuyStop,
    SellStop,
    Breakeven,
    PartialClose,
    CloseAll,
    MoveSl,
    MoveSlAll,
}

impl TradeAction {
    pub fn is_special(&self) -> bool {
        matches!(
            self,
            TradeAction::Breakeven
                | TradeAction::PartialClose
                | TradeAction::CloseAll
                | TradeAction::MoveSl
                | TradeAction::MoveSlAll
        )
    }

    pub fn is_buy_side(&self) -> bool {
        matches!(
            self,
            TradeAction::Buy | TradeAction::BuyLimit | TradeAction::BuyStop
        )
    }

    pub fn is_sell_side(&self) -> bool {
        matches!(
            self,
            TradeAction::Sell | TradeAction::SellLimit | TradeAction::SellStop
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
            TradeAction::BuyLimit => "BUY LIMIT",
            TradeAction::SellLimit => "SELL LIMIT",
            TradeAction::BuyStop => "BUY STOP",
            TradeAction::SellStop => "SELL STOP",
            TradeAction::Breakeven => "BREAKEVEN",
            TradeAction::PartialClose => "PARTIAL CLOSE",
            TradeAction::CloseAll => "CLOSE ALL",
            TradeAction::MoveSl => "MOVE SL",
            TradeAction::MoveSlAll => "MOVE SL ALL",
        }
    }

    /// Label written to the execution-queue row. The terminal's vocabulary for
    /// position actions is Spanish ("SL A <price>", "PARCIAL", "CERRAR").
    pub fn queue_label(&self) -> &'static str {
        match self {
            TradeAction::Breakeven => "BE",
            TradeAction::PartialClose => "PARCIAL",
            TradeAction::CloseAll => "CERRAR",
            TradeAction::MoveSl => "SL A",
            TradeAction::MoveSlAll => "SL TODOS",
            other => other.as_str(),
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry specification as written in the alert, before resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    Price(f64),
    Range { low: f64, high: f64 },
    /// More than one range or price was given; not resolvable to one fill level.
    Multiple(Vec<f64>),
    NotFound,
}

/// Classifier output for one asset found in one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedSignal {
    pub classification: Classification,
    pub asset: Option<String>,
    pub action: Option<TradeAction>,
    pub direction: Direction,
    pub entry: Entry,
    /// Entry usable for an order: a scalar price, or a range collapsed to the
    /// conservative bound for the action's side.
    pub resolved_entry: Option<f64>,
    pub sl: Option<f64>,
    /// Ordered as written, wrong-side values already filtered out.
    pub take_profits: Vec<f64>,
    /// None = not evaluable with the fields present (unknown, not false).
    pub consistency: Option<bool>,
    /// Binary confidence: 10 actionable, 0 everything else.
    pub score: u8,
    pub notes: Vec<String>,
}

impl ExtractedSignal {
    pub fn noise(note: impl Into<String>) -> Self {
        Self {
            classification: Classification::Noise,
            asset: None,
            action: None,
            direction: Direction::Indeterminate,
            entry: Entry::NotFound,
            resolved_entry: None,
            sl: None,
            take_profits: Vec::new(),
            consistency: None,
            score: 0,
            notes: vec![note.into()],
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.score == 10
    }
}
