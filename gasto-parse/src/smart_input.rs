//! Live-typing parser: composes the amount, entity, date, and description
//! extractors into one structured candidate with a coarse confidence level.
//!
//! Pure and synchronous. It runs on every keystroke, so there is no I/O and
//! no backend involvement here.

use chrono::{DateTime, Utc};
use gasto_core::{Card, DateResolver, User};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::amount::extract_amount;
use crate::entity::{match_card, match_user};
use crate::sanitize::sanitize;

/// How completely a parse identified the expected fields. High means amount,
/// card, and responsible party were all found; medium means exactly two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        };
        write!(f, "{label}")
    }
}

/// Structured candidate produced from one free-text input. Ephemeral: built
/// fresh on every input change and either submitted or discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedInput {
    pub amount: Option<f64>,
    pub card_id: Option<String>,
    pub user_id: Option<String>,
    pub description: String,
    pub date: DateTime<Utc>,
    pub confidence: Confidence,
}

#[derive(Debug, Default)]
pub struct SmartInputParser {
    dates: DateResolver,
}

impl SmartInputParser {
    pub fn new(dates: DateResolver) -> Self {
        Self { dates }
    }

    /// Run every extractor over the text and grade the result. Total: absent
    /// fields come back as None, never as an error.
    pub fn parse(
        &self,
        text: &str,
        cards: &[Card],
        users: &[User],
        now: DateTime<Utc>,
    ) -> ParsedInput {
        let amount = extract_amount(text);
        let card_id = match_card(text, cards);
        let user_id = match_user(text, users);
        let description = sanitize(text);
        let date = self
            .dates
            .parse_relative_expression(text, now)
            .unwrap_or(now);

        let detected = [amount.is_some(), card_id.is_some(), user_id.is_some()]
            .into_iter()
            .filter(|hit| *hit)
            .count();
        let confidence = match detected {
            3 => Confidence::High,
            2 => Confidence::Medium,
            _ => Confidence::Low,
        };

        ParsedInput {
            amount,
            card_id,
            user_id,
            description,
            date,
            confidence,
        }
    }
}
