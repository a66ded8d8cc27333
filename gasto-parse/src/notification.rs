//! Bank push-notification pipeline, parallel to and independent of the
//! smart-input parser: an app-origin allowlist gate followed by amount,
//! establishment, and card-suffix extraction over title and body combined.
//!
//! Amount is mandatory here. A notification parse exists to auto-create a
//! transaction without user confirmation, so an amount-less result is
//! unusable and the whole parse yields `None`.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Package identifiers of banking and wallet apps whose notifications are
/// worth parsing. Static configuration data, extendable per install.
pub const DEFAULT_BANKING_APPS: &[&str] = &[
    "com.google.android.apps.walletnfcrel",
    "com.samsung.android.spay",
    "com.c6bank.app",
    "com.nu.production",
    "br.com.itau",
    "br.com.bradesco",
    "com.santander.app",
];

/// Substituted when stripping leaves no establishment text behind.
pub const UNKNOWN_ESTABLISHMENT: &str = "Estabelecimento não identificado";

// Notification amounts must carry decimal cents. A bare-integer fallback
// like the smart-input extractor's would read card suffixes as amounts.
static AMOUNT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)r\$\s*(\d{1,3}(?:\.\d{3})*,\d{2})",
        r"(?i)r\$\s*(\d+,\d{2})",
        r"(?i)valor\s*:?\s*r\$\s*(\d+,\d{2})",
        r"(\d{1,3}(?:\.\d{3})*,\d{2})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static AMOUNT_SUBSTRINGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)r\$\s*[\d.,]+").unwrap());

// Phrase entries come before their single-word prefixes so "compra aprovada"
// is consumed whole when present.
static BOILERPLATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        "compra aprovada",
        "compra",
        "aprovada",
        "aprovado",
        "débito",
        "crédito",
        "transação",
        "pagamento",
        "valor",
        "cartão",
        "cartao",
        "final",
        r"\d{4}",
    ]
    .iter()
    .map(|word| Regex::new(&format!("(?i){word}")).unwrap())
    .collect()
});

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:;.,!?\-]").unwrap());

static CARD_SUFFIX_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)final\s*(\d{4})",
        r"\*{4}\s*(\d{4})",
        r"(?i)cartão\s*.*?(\d{4})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Transaction candidate lifted from a single bank notification. The
/// timestamp is the capture time; the notification's own date is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedNotification {
    pub description: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub card_last4: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BankNotificationParser {
    origins: Vec<String>,
}

impl Default for BankNotificationParser {
    fn default() -> Self {
        Self {
            origins: DEFAULT_BANKING_APPS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl BankNotificationParser {
    /// Extend the allowlist with configured package identifiers.
    pub fn with_extra_origins(mut self, extra: impl IntoIterator<Item = String>) -> Self {
        self.origins.extend(extra);
        self
    }

    /// Origin gate: the package name must contain an allowlist entry. A hard
    /// filter, not a confidence signal.
    pub fn is_banking_origin(&self, origin: &str) -> bool {
        self.origins.iter().any(|app| origin.contains(app.as_str()))
    }

    pub fn parse(
        &self,
        title: &str,
        body: &str,
        origin: &str,
        now: DateTime<Utc>,
    ) -> Option<ParsedNotification> {
        if !self.is_banking_origin(origin) {
            return None;
        }

        let full = format!("{title} {body}");
        let amount = extract_notification_amount(&full)?;

        Some(ParsedNotification {
            description: extract_establishment(&full),
            amount,
            timestamp: now,
            card_last4: extract_card_last4(&full),
        })
    }
}

fn extract_notification_amount(text: &str) -> Option<f64> {
    for re in AMOUNT_PATTERNS.iter() {
        let Some(caps) = re.captures(text) else {
            continue;
        };
        let normalized = caps[1].replace('.', "").replace(',', ".");
        match normalized.parse::<f64>() {
            Ok(value) if value.is_finite() && value > 0.0 => return Some(value),
            _ => continue,
        }
    }
    None
}

fn extract_establishment(text: &str) -> String {
    let mut residual = AMOUNT_SUBSTRINGS.replace_all(text, "").into_owned();
    for re in BOILERPLATE.iter() {
        residual = re.replace_all(&residual, "").into_owned();
    }
    residual = PUNCTUATION.replace_all(&residual, " ").into_owned();

    let collapsed = residual.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        UNKNOWN_ESTABLISHMENT.to_string()
    } else {
        collapsed
    }
}

fn extract_card_last4(text: &str) -> Option<String> {
    CARD_SUFFIX_PATTERNS
        .iter()
        .find_map(|re| re.captures(text).map(|caps| caps[1].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_unknown_origin_is_rejected_regardless_of_text() {
        let parser = BankNotificationParser::default();
        let parsed = parser.parse("Banco", "Compra aprovada R$ 100,00", "com.unknown.app", now());
        assert_eq!(parsed, None);
    }

    #[test]
    fn test_gated_origin_without_amount_is_rejected() {
        let parser = BankNotificationParser::default();
        let parsed = parser.parse("Nubank", "sem nenhum recibo", "com.nu.production", now());
        assert_eq!(parsed, None);
    }

    #[test]
    fn test_origin_gate_uses_containment() {
        let parser = BankNotificationParser::default();
        assert!(parser.is_banking_origin("user.com.nu.production.debug"));
        assert!(!parser.is_banking_origin("com.nu"));

        let parser = parser.with_extra_origins(vec!["com.inter.app".to_string()]);
        assert!(parser.is_banking_origin("com.inter.app"));
    }

    #[test]
    fn test_purchase_notification_parses_establishment_and_amount() {
        let parser = BankNotificationParser::default();
        let parsed = parser
            .parse("C6 Bank", "Compra de R$ 18,90 no UBER aprovada", "com.c6bank.app", now())
            .unwrap();

        assert_eq!(parsed.amount, 18.9);
        assert_eq!(parsed.timestamp, now());
        assert_eq!(parsed.card_last4, None);
        assert!(parsed.description.contains("UBER"));
        assert!(!parsed.description.contains("Compra"));
        assert!(!parsed.description.contains("aprovada"));
        assert!(!parsed.description.contains("18,90"));
    }

    #[test]
    fn test_thousands_formatted_amount() {
        let parser = BankNotificationParser::default();
        let parsed = parser
            .parse("Itaú", "Compra de R$ 1.250,00 na FNAC aprovada", "br.com.itau", now())
            .unwrap();
        assert_eq!(parsed.amount, 1250.0);
    }

    #[test]
    fn test_card_suffix_variants() {
        let parser = BankNotificationParser::default();
        let origin = "com.c6bank.app";

        let parsed = parser
            .parse("C6", "Compra R$ 30,00 MERCADO cartão final 1234", origin, now())
            .unwrap();
        assert_eq!(parsed.card_last4.as_deref(), Some("1234"));

        let parsed = parser
            .parse("C6", "Compra R$ 30,00 MERCADO **** 4321", origin, now())
            .unwrap();
        assert_eq!(parsed.card_last4.as_deref(), Some("4321"));

        let parsed = parser
            .parse("C6", "Compra R$ 30,00 MERCADO cartão 9876", origin, now())
            .unwrap();
        assert_eq!(parsed.card_last4.as_deref(), Some("9876"));
    }

    #[test]
    fn test_placeholder_when_only_boilerplate_remains() {
        let parser = BankNotificationParser::default();
        let parsed = parser
            .parse("Compra aprovada", "R$ 50,00 cartão final 1234", "com.c6bank.app", now())
            .unwrap();

        assert_eq!(parsed.amount, 50.0);
        assert_eq!(parsed.description, UNKNOWN_ESTABLISHMENT);
        assert_eq!(parsed.card_last4.as_deref(), Some("1234"));
    }
}
