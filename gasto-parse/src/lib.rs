//! Rule-based extraction of structured expense candidates from free text and
//! bank push notifications.
//!
//! Two pipelines share the ordered-pattern style but not vocabulary:
//! [`SmartInputParser`] grades user-typed text with a confidence level, and
//! [`BankNotificationParser`] lifts transactions out of allowlisted banking
//! notifications. Everything here is pure and synchronous.

pub mod amount;
pub mod entity;
pub mod notification;
pub mod sanitize;
pub mod smart_input;

pub use amount::extract_amount;
pub use entity::{match_card, match_user};
pub use notification::{
    BankNotificationParser, ParsedNotification, DEFAULT_BANKING_APPS, UNKNOWN_ESTABLISHMENT,
};
pub use sanitize::{sanitize, FALLBACK_DESCRIPTION};
pub use smart_input::{Confidence, ParsedInput, SmartInputParser};
