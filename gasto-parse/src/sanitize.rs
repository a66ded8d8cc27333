//! Residual-description extraction: strip everything the other extractors
//! already claimed (amounts, entity names, temporal words) and keep the rest.

use once_cell::sync::Lazy;
use regex::Regex;

/// Substituted when stripping leaves nothing behind.
pub const FALLBACK_DESCRIPTION: &str = "Despesa";

/// Amount substrings are removed before the word-bounded passes below, so a
/// partially-eaten number can never corrupt an adjacent token.
static AMOUNT_STRIPPERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)r\$\s*\d{1,3}(?:\.\d{3})+,\d{2}",
        r"(?i)r\$\s*\d+[.,]\d{2}",
        r"\d+[.,]\d{2}",
        r"(?i)r\$\s*\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static ENTITY_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(bruna|max|uz|c6|nubank|itau|itaú|cartão|cartao)\b").unwrap()
});

static TEMPORAL_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(ontem|hoje|amanhã|amanha)\b").unwrap());

/// Strip recognized tokens from the raw text and return what is left,
/// whitespace-collapsed. Never returns an empty string.
pub fn sanitize(text: &str) -> String {
    let mut residual = text.to_string();

    for re in AMOUNT_STRIPPERS.iter() {
        residual = re.replace_all(&residual, "").into_owned();
    }
    residual = ENTITY_WORDS.replace_all(&residual, "").into_owned();
    residual = TEMPORAL_WORDS.replace_all(&residual, "").into_owned();

    let collapsed = residual.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        FALLBACK_DESCRIPTION.to_string()
    } else {
        collapsed
    }
}
