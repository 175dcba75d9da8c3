//! Closed vocabularies carried by every event.

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What happened to the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown action type: {0}")]
pub struct UnknownActionType(pub String);

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Create => "CREATE",
            ActionType::Update => "UPDATE",
            ActionType::Delete => "DELETE",
        }
    }

    /// CREATE and UPDATE both carry the entity's full post-change fields.
    pub fn is_upsert(&self) -> bool {
        matches!(self, ActionType::Create | ActionType::Update)
    }
}

impl core::fmt::Display for ActionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = UnknownActionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(ActionType::Create),
            "UPDATE" => Ok(ActionType::Update),
            "DELETE" => Ok(ActionType::Delete),
            other => Err(UnknownActionType(other.to_string())),
        }
    }
}

/// Which kind of entity the event documents.
///
/// Unrecognised tags are preserved in [`EntityType::Unknown`] so that newer
/// producers can log entity kinds older readers simply pass through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityType {
    Income,
    Expense,
    Asset,
    Liability,
    CashSavings,
    User,
    Unknown(String),
}

impl EntityType {
    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Income => "INCOME",
            EntityType::Expense => "EXPENSE",
            EntityType::Asset => "ASSET",
            EntityType::Liability => "LIABILITY",
            EntityType::CashSavings => "CASH_SAVINGS",
            EntityType::User => "USER",
            EntityType::Unknown(tag) => tag,
        }
    }
}

impl From<&str> for EntityType {
    fn from(value: &str) -> Self {
        match value {
            "INCOME" => EntityType::Income,
            "EXPENSE" => EntityType::Expense,
            "ASSET" => EntityType::Asset,
            "LIABILITY" => EntityType::Liability,
            "CASH_SAVINGS" => EntityType::CashSavings,
            "USER" => EntityType::User,
            other => EntityType::Unknown(other.to_string()),
        }
    }
}

impl From<String> for EntityType {
    fn from(value: String) -> Self {
        EntityType::from(value.as_str())
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.as_str().to_string()
    }
}

impl core::fmt::Display for EntityType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form refinement of the entity type.
///
/// For income events this is the income kind (`EARNED`, `PASSIVE`,
/// `PORTFOLIO`) or the `INCOME_STATEMENT` marker that producers emit for the
/// statement container itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitySubtype(String);

impl EntitySubtype {
    pub const INCOME_STATEMENT: &'static str = "INCOME_STATEMENT";

    pub fn new(subtype: impl Into<String>) -> Self {
        Self(subtype.into())
    }

    pub fn income_statement() -> Self {
        Self::new(Self::INCOME_STATEMENT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_income_statement(&self) -> bool {
        self.0 == Self::INCOME_STATEMENT
    }
}

impl From<&str> for EntitySubtype {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl core::fmt::Display for EntitySubtype {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
