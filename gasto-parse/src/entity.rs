//! Card and responsible-party matching by substring containment.
//!
//! Deliberately loose: containment over tokenization trades false positives
//! on short names for simplicity. Slice order is caller priority and ties go
//! to the first entry.

use gasto_core::{Card, User};

/// Brand nicknames tried when no card matched directly. The key must appear
/// in a card's name or owner for the alias to resolve to that card.
const CARD_ALIASES: &[(&str, &[&str])] = &[
    ("c6", &["c6", "c 6", "c-6"]),
    ("nubank", &["nubank", "nu", "roxo"]),
    ("itau", &["itau", "itaú", "laranja"]),
];

/// Find the card a text refers to: name, owner, or "name owner" containment
/// first, then the alias table. None is a common outcome, not an error.
pub fn match_card(text: &str, cards: &[Card]) -> Option<String> {
    let cleaned = text.trim().to_lowercase();
    if cleaned.is_empty() {
        return None;
    }

    for card in cards {
        let name = card.name.to_lowercase();
        let owner = card.owner.as_deref().unwrap_or_default().to_lowercase();

        if !name.is_empty() && cleaned.contains(&name) {
            return Some(card.id.clone());
        }
        if !owner.is_empty()
            && (cleaned.contains(&owner) || cleaned.contains(&format!("{name} {owner}")))
        {
            return Some(card.id.clone());
        }
    }

    for (key, variations) in CARD_ALIASES {
        if !variations.iter().any(|alias| cleaned.contains(alias)) {
            continue;
        }
        let hit = cards.iter().find(|c| {
            c.name.to_lowercase().contains(key)
                || c.owner
                    .as_deref()
                    .is_some_and(|o| o.to_lowercase().contains(key))
        });
        if let Some(card) = hit {
            return Some(card.id.clone());
        }
    }

    None
}

/// Find the responsible party a text mentions by display-name containment.
pub fn match_user(text: &str, users: &[User]) -> Option<String> {
    let cleaned = text.trim().to_lowercase();
    if cleaned.is_empty() {
        return None;
    }

    users
        .iter()
        .find(|u| {
            let name = u.name.to_lowercase();
            !name.is_empty() && cleaned.contains(&name)
        })
        .map(|u| u.id.clone())
}
