//! Display currency attached to a financial state.

use serde::{Deserialize, Serialize};

/// Currency a user's figures are expressed in.
///
/// Amounts are never converted; switching currency only changes how the
/// same numbers are labelled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub symbol: String,
    pub name: String,
}

/// Built-in catalog: (ISO code, symbol, name).
const CATALOG: &[(&str, &str, &str)] = &[
    ("USD", "$", "US Dollar"),
    ("EUR", "€", "Euro"),
    ("GBP", "£", "British Pound"),
    ("JPY", "¥", "Japanese Yen"),
    ("CNY", "¥", "Chinese Yuan"),
    ("INR", "₹", "Indian Rupee"),
    ("CAD", "CA$", "Canadian Dollar"),
    ("AUD", "A$", "Australian Dollar"),
    ("CHF", "CHF", "Swiss Franc"),
    ("SGD", "S$", "Singapore Dollar"),
    ("PHP", "₱", "Philippine Peso"),
    ("IDR", "Rp", "Indonesian Rupiah"),
    ("MYR", "RM", "Malaysian Ringgit"),
    ("KRW", "₩", "South Korean Won"),
    ("BRL", "R$", "Brazilian Real"),
    ("MXN", "MX$", "Mexican Peso"),
    ("ZAR", "R", "South African Rand"),
    ("NGN", "₦", "Nigerian Naira"),
];

impl Currency {
    pub fn new(code: impl Into<String>, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            symbol: symbol.into(),
            name: name.into(),
        }
    }

    /// Resolve an ISO code through the built-in catalog.
    ///
    /// Unknown codes fall back to using the code itself as symbol and name.
    pub fn from_code(code: &str) -> Self {
        let normalized = code.trim().to_ascii_uppercase();
        match CATALOG.iter().find(|(c, _, _)| *c == normalized) {
            Some((c, symbol, name)) => Self::new(*c, *symbol, *name),
            None => Self::new(normalized.clone(), normalized.clone(), normalized),
        }
    }

    pub fn usd() -> Self {
        Self::from_code("USD")
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::usd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve_case_insensitively() {
        let eur = Currency::from_code(" eur ");
        assert_eq!(eur.code, "EUR");
        assert_eq!(eur.symbol, "€");
        assert_eq!(eur.name, "Euro");
    }

    #[test]
    fn unknown_code_labels_itself() {
        let c = Currency::from_code("xyz");
        assert_eq!(c, Currency::new("XYZ", "XYZ", "XYZ"));
    }
}
