//! Asset resolution over a static alias catalog.
//!
//! The catalog is immutable configuration injected into the classifier at
//! construction, so tests can run with a restricted vocabulary.

use once_cell::sync::Lazy;
use regex::Regex;

static PAIR_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Za-z]{3}/[A-Za-z]{3})\b").unwrap());
static CODE_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Za-z]{6})\b").unwrap());

/// Alias → canonical symbol table covering forex, indices, metals, energy,
/// gas and crypto, including emoji and hashtag spellings.
pub struct AssetCatalog {
    aliases: Vec<(&'static str, &'static str)>,
    weak_tokens: Vec<(&'static str, &'static str)>,
}

impl Default for AssetCatalog {
    fn default() -> Self {
        Self {
            aliases: vec![
                // Forex
                ("eurusd", "EURUSD"),
                ("eur/usd", "EURUSD"),
                ("gbpjpy", "GBPJPY"),
                ("gbp/jpy", "GBPJPY"),
                ("usdjpy", "USDJPY"),
                ("usd/jpy", "USDJPY"),
                ("audusd", "AUDUSD"),
                ("aud/usd", "AUDUSD"),
                ("nzdusd", "NZDUSD"),
                ("nzd/usd", "NZDUSD"),
                ("usdcad", "USDCAD"),
                ("usd/cad", "USDCAD"),
                ("chfjpy", "CHFJPY"),
                ("chf/jpy", "CHFJPY"),
                ("gbpusd", "GBPUSD"),
                ("gbp/usd", "GBPUSD"),
                ("eurjpy", "EURJPY"),
                ("eur/jpy", "EURJPY"),
                // US indices
                ("us30", "US30"),
                ("dj30", "US30"),
                ("dji", "US30"),
                ("dow jones", "US30"),
                ("ws30", "US30"),
                ("us100", "US100"),
                ("nas100", "US100"),
                ("ustech100", "US100"),
                ("ndx", "US100"),
                ("nasdaq", "US100"),
                ("spx", "US500"),
                ("sp500", "US500"),
                ("s&p", "US500"),
                ("us500", "US500"),
                ("es", "US500"),
                // Europe
                ("ger40", "DAX40"),
                ("dax40", "DAX40"),
                ("dax", "DAX40"),
                ("uk100", "FTSE100"),
                ("ftse100", "FTSE100"),
                ("ftse", "FTSE100"),
                ("fra40", "CAC40"),
                ("cac40", "CAC40"),
                ("cac", "CAC40"),
                ("es35", "IBEX35"),
                ("ibex35", "IBEX35"),
                ("ibex", "IBEX35"),
                // Asia
                ("jp225", "JP225"),
                ("nikkei225", "JP225"),
                ("nikkei", "JP225"),
                ("jpn225", "JP225"),
                ("hk50", "HK50"),
                ("hang seng", "HK50"),
                // Metals
                ("xauusd", "XAUUSD"),
                ("xau/usd", "XAUUSD"),
                ("gold", "XAUUSD"),
                ("oro", "XAUUSD"),
                ("🥇", "XAUUSD"),
                ("#gold", "XAUUSD"),
                ("xagusd", "XAGUSD"),
                ("xag/usd", "XAGUSD"),
                ("silver", "XAGUSD"),
                ("plata", "XAGUSD"),
                ("🥈", "XAGUSD"),
                ("#silver", "XAGUSD"),
                ("copper", "COPPER"),
                ("hg", "COPPER"),
                ("cu", "COPPER"),
                // Energy
                ("usoil", "USOIL"),
                ("wti", "USOIL"),
                ("cl", "USOIL"),
                ("crude", "USOIL"),
                ("crude oil", "USOIL"),
                ("oil", "USOIL"),
                ("brent", "UKOIL"),
                ("ukoil", "UKOIL"),
                // Gas
                ("ng", "NATGAS"),
                ("natural gas", "NATGAS"),
                ("gas", "NATGAS"),
                // Crypto
                ("btcusd", "BTCUSD"),
                ("btc/usdt", "BTCUSDT"),
                ("btc", "BTCUSD"),
                ("bitcoin", "BTCUSD"),
                ("₿", "BTCUSD"),
                ("#btc", "BTCUSD"),
                ("ethusd", "ETHUSD"),
                ("eth/usdt", "ETHUSDT"),
                ("eth", "ETHUSD"),
                ("ethereum", "ETHUSD"),
                ("#eth", "ETHUSD"),
                ("ltcusd", "LTCUSD"),
                ("xrpusd", "XRPUSD"),
                ("bnbusd", "BNBUSD"),
                ("adausd", "ADAUSD"),
                ("solusd", "SOLUSD"),
            ],
            weak_tokens: vec![("xau", "XAUUSD"), ("xag", "XAGUSD")],
        }
    }
}

impl AssetCatalog {
    pub fn new(
        aliases: Vec<(&'static str, &'static str)>,
        weak_tokens: Vec<(&'static str, &'static str)>,
    ) -> Self {
        Self {
            aliases,
            weak_tokens,
        }
    }

    /// All distinct canonical symbols present in `lowered`, first-seen order.
    pub fn find(&self, lowered: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        let mut push = |canon: &str, acc: &mut Vec<String>| {
            if !acc.iter().any(|c| c == canon) {
                acc.push(canon.to_string());
            }
        };

        for (alias, canon) in self.aliases.iter().chain(self.weak_tokens.iter()) {
            if alias_in_text(lowered, alias) {
                push(canon, &mut found);
            }
        }

        for rx in [&*PAIR_RX, &*CODE_RX] {
            for caps in rx.captures_iter(lowered) {
                let alias = caps.get(1).unwrap().as_str().to_lowercase();
                let canon = self
                    .aliases
                    .iter()
                    .find(|(a, _)| *a == alias)
                    .map(|(_, c)| (*c).to_string())
                    .unwrap_or_else(|| alias.to_uppercase());
                push(&canon, &mut found);
            }
        }

        found
    }
}

/// Alphanumeric aliases only match between non-alphanumeric boundaries, so
/// "es" never fires inside "latest". Aliases with punctuation, spaces or
/// emoji match as plain substrings.
fn alias_in_text(lowered: &str, alias: &str) -> bool {
    if !alias.chars().all(|c| c.is_ascii_alphanumeric()) {
        return lowered.contains(alias);
    }
    let bytes = lowered.as_bytes();
    for (start, _) in lowered.match_indices(alias) {
        let end = start + alias.len();
        let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let after_ok = end >= bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_aliases_respect_word_boundaries() {
        let catalog = AssetCatalog::default();
        assert!(
            !catalog
                .find("the latest news")
                .contains(&"US500".to_string())
        );
        assert_eq!(catalog.find("es looking bullish"), vec!["US500"]);
        assert!(!catalog.find("es35 long").contains(&"US500".to_string()));
    }

    #[test]
    fn emoji_and_hashtag_aliases_match() {
        let catalog = AssetCatalog::default();
        assert_eq!(catalog.find("🥇 buy now"), vec!["XAUUSD"]);
        assert_eq!(catalog.find("#btc pumping"), vec!["BTCUSD"]);
    }

    #[test]
    fn slash_pairs_and_six_letter_codes_resolve() {
        let catalog = AssetCatalog::default();
        assert_eq!(catalog.find("eur/usd setup"), vec!["EURUSD"]);
        assert_eq!(catalog.find("cadchf breakout"), vec!["CADCHF"]);
    }

    #[test]
    fn duplicate_spellings_collapse_to_one_symbol() {
        let catalog = AssetCatalog::default();
        assert_eq!(catalog.find("bitcoin #btc btcusd"), vec!["BTCUSD"]);
    }

    #[test]
    fn multiple_assets_keep_first_seen_order() {
        let catalog = AssetCatalog::default();
        assert_eq!(catalog.find("gold and silver"), vec!["XAUUSD", "XAGUSD"]);
    }
}
