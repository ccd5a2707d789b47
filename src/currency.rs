//! Currency conversion collaborator.
//!
//! Analytic operations that report sales in a requested currency go through
//! [`RateSource`]. The contract is a multiplicative rate per code pair,
//! identity when the codes match.

use crate::error::CurrencyError;

/// A source of currency conversion rates, keyed by ISO code pair.
pub trait RateSource: Send + Sync {
    /// Multiplicative rate such that `amount_from * rate = amount_to`.
    fn rate(&self, from: &str, to: &str) -> Result<f64, CurrencyError>;
}

/// Fixed in-memory rate table for CHF/USD/EUR.
///
/// Stands in for a live rate service; rates are indicative only.
pub struct StaticRates;

const RATES: &[(&str, &str, f64)] = &[
    ("USD", "EUR", 0.92),
    ("EUR", "USD", 1.09),
    ("USD", "CHF", 0.88),
    ("CHF", "USD", 1.14),
    ("EUR", "CHF", 0.96),
    ("CHF", "EUR", 1.04),
];

impl RateSource for StaticRates {
    fn rate(&self, from: &str, to: &str) -> Result<f64, CurrencyError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(1.0);
        }
        RATES
            .iter()
            .find(|(f, t, _)| f.eq_ignore_ascii_case(from) && t.eq_ignore_ascii_case(to))
            .map(|(_, _, r)| *r)
            .ok_or_else(|| CurrencyError::UnknownPair {
                from: from.to_string(),
                to: to.to_string(),
            })
    }
}
