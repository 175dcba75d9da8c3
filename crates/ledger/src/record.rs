//! Entity records held inside a [`FinancialState`](crate::FinancialState).

use serde::{Deserialize, Serialize};

use finscope_core::EntityId;

/// Asset or liability line: something with a current value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub id: EntityId,
    pub name: String,
    pub value: f64,
}

/// Recurring monthly expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: EntityId,
    pub name: String,
    pub amount: f64,
}

/// Recurring monthly income line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeLine {
    pub id: EntityId,
    pub name: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub income_type: IncomeType,
    pub quadrant: Option<Quadrant>,
}

impl IncomeLine {
    /// Passive and portfolio income both count toward financial freedom.
    pub fn is_freedom_income(&self) -> bool {
        matches!(self.income_type, IncomeType::Passive | IncomeType::Portfolio)
    }
}

/// Income kind.
///
/// Unrecognised kinds are kept verbatim; they count toward total income but
/// never toward passive income.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IncomeType {
    Earned,
    Passive,
    Portfolio,
    Other(String),
}

impl IncomeType {
    pub fn as_str(&self) -> &str {
        match self {
            IncomeType::Earned => "EARNED",
            IncomeType::Passive => "PASSIVE",
            IncomeType::Portfolio => "PORTFOLIO",
            IncomeType::Other(tag) => tag,
        }
    }
}

impl From<&str> for IncomeType {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "EARNED" => IncomeType::Earned,
            "PASSIVE" => IncomeType::Passive,
            "PORTFOLIO" => IncomeType::Portfolio,
            _ => IncomeType::Other(value.to_string()),
        }
    }
}

impl From<String> for IncomeType {
    fn from(value: String) -> Self {
        IncomeType::from(value.as_str())
    }
}

impl From<IncomeType> for String {
    fn from(value: IncomeType) -> Self {
        value.as_str().to_string()
    }
}

/// Cashflow quadrant classification of an income source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Quadrant {
    Employee,
    SelfEmployed,
    BusinessOwner,
    Investor,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::Employee,
        Quadrant::SelfEmployed,
        Quadrant::BusinessOwner,
        Quadrant::Investor,
    ];

    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "EMPLOYEE" => Some(Quadrant::Employee),
            "SELF_EMPLOYED" => Some(Quadrant::SelfEmployed),
            "BUSINESS_OWNER" => Some(Quadrant::BusinessOwner),
            "INVESTOR" => Some(Quadrant::Investor),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn income_type_keeps_unknown_tags() {
        assert_eq!(IncomeType::from("passive"), IncomeType::Passive);
        assert_eq!(IncomeType::from("ROYALTY"), IncomeType::Other("ROYALTY".into()));
        assert_eq!(String::from(IncomeType::Other("ROYALTY".into())), "ROYALTY");
    }

    #[test]
    fn quadrant_parses_wire_tags() {
        assert_eq!(Quadrant::parse("SELF_EMPLOYED"), Some(Quadrant::SelfEmployed));
        assert_eq!(Quadrant::parse("investor"), Some(Quadrant::Investor));
        assert_eq!(Quadrant::parse("LANDLORD"), None);
    }
}
