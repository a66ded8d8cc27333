//! Monetary amount extraction from free text.
//!
//! Brazilian formats: thousands separated by dots, cents after a comma
//! ("R$ 1.234,56"). Priority is an ordered pattern table, most specific
//! first, so a fully formatted currency value is never misread by a looser
//! pattern grabbing its prefix digits.

use once_cell::sync::Lazy;
use regex::Regex;

/// How to turn a pattern's capture groups into a value.
#[derive(Debug, Clone, Copy)]
enum Extract {
    /// Group 1 = integer part (may carry thousands dots), group 2 = cents.
    IntCents,
    /// Group 1 = whole currency units, no cents.
    IntOnly,
}

static AMOUNT_PATTERNS: Lazy<Vec<(Regex, Extract)>> = Lazy::new(|| {
    vec![
        // R$ 1.234,56
        (Regex::new(r"r\$\s*(\d{1,3}(?:\.\d{3})+),(\d{2})").unwrap(), Extract::IntCents),
        // R$ 22,50 or R$22.50
        (Regex::new(r"r\$\s*(\d+)[.,](\d{2})").unwrap(), Extract::IntCents),
        // 22,50 or 22.50
        (Regex::new(r"(\d+)[.,](\d{2})").unwrap(), Extract::IntCents),
        // 22
        (Regex::new(r"(\d+)").unwrap(), Extract::IntOnly),
    ]
});

/// Extract a monetary value from free text. First pattern that yields a
/// finite value > 0 wins; otherwise the next pattern is tried. None when
/// nothing matches, which is an expected outcome, not an error.
pub fn extract_amount(text: &str) -> Option<f64> {
    let cleaned = text.trim().to_lowercase();
    if cleaned.is_empty() {
        return None;
    }

    for (pattern, extract) in AMOUNT_PATTERNS.iter() {
        let Some(caps) = pattern.captures(&cleaned) else {
            continue;
        };
        let value = match extract {
            Extract::IntCents => {
                let int_part = caps[1].replace('.', "");
                format!("{}.{}", int_part, &caps[2]).parse::<f64>().ok()
            }
            Extract::IntOnly => caps[1].parse::<f64>().ok(),
        };
        match value {
            Some(v) if v.is_finite() && v > 0.0 => return Some(v),
            _ => continue,
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pattern priority: the thousands form must win over looser patterns.
    #[test]
    fn test_thousands_form_wins() {
        assert_eq!(extract_amount("R$ 1.234,56 compra"), Some(1234.56));
        assert_eq!(extract_amount("r$ 12.345.678,90"), Some(12_345_678.90));
    }

    #[test]
    fn test_currency_prefixed_decimal() {
        assert_eq!(extract_amount("R$ 22,50"), Some(22.50));
        assert_eq!(extract_amount("R$22.50 mercado"), Some(22.50));
    }

    #[test]
    fn test_bare_decimal_and_integer() {
        assert_eq!(extract_amount("123,45"), Some(123.45));
        assert_eq!(extract_amount("22.50 picolés"), Some(22.50));
        assert_eq!(extract_amount("42"), Some(42.0));
    }

    #[test]
    fn test_no_amount() {
        assert_eq!(extract_amount("abc"), None);
        assert_eq!(extract_amount(""), None);
        assert_eq!(extract_amount("   "), None);
    }

    /// A zero parse is no match; the next pattern still gets a chance.
    #[test]
    fn test_zero_falls_through() {
        assert_eq!(extract_amount("00,00"), None);
        assert_eq!(extract_amount("0"), None);
        // Pattern 3 sees "0,00" (zero), pattern 4 then finds the "5".
        assert_eq!(extract_amount("5 custou 0,00"), Some(5.0));
    }

    #[test]
    fn test_case_insensitive_prefix() {
        assert_eq!(extract_amount("r$ 9,90"), Some(9.90));
        assert_eq!(extract_amount("R$ 9,90"), Some(9.90));
    }
}
