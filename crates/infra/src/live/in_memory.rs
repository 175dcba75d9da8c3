use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockWriteGuard};

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::instrument;

use finscope_core::{Clock, Currency, EntityId, UserId};
use finscope_events::{EntitySubtype, EntityType, FinancialEvent, NewEvent};
use finscope_ledger::{BalanceRecord, ExpenseRecord, FinancialState, IncomeLine};

use super::{LiveStateError, LiveStateSource, UserAccount};
use crate::event_store::InMemoryEventStore;
use crate::point_in_time::QueryError;
use crate::snapshots::SnapshotManager;

#[derive(Debug, Clone, Serialize)]
struct CashRow {
    id: EntityId,
    amount: f64,
}

#[derive(Debug)]
struct LiveBook {
    account: UserAccount,
    assets: BTreeMap<EntityId, BalanceRecord>,
    liabilities: BTreeMap<EntityId, BalanceRecord>,
    income_lines: BTreeMap<EntityId, IncomeLine>,
    expenses: BTreeMap<EntityId, ExpenseRecord>,
    income_statements: BTreeSet<EntityId>,
    cash: Option<CashRow>,
}

impl LiveBook {
    fn new(account: UserAccount) -> Self {
        Self {
            account,
            assets: BTreeMap::new(),
            liabilities: BTreeMap::new(),
            income_lines: BTreeMap::new(),
            expenses: BTreeMap::new(),
            income_statements: BTreeSet::new(),
            cash: None,
        }
    }

    fn state(&self) -> FinancialState {
        FinancialState::from_parts(
            self.assets.clone(),
            self.liabilities.clone(),
            self.income_lines.clone(),
            self.expenses.clone(),
            self.cash.as_ref().map_or(0.0, |c| c.amount),
            self.account.preferred_currency.clone(),
        )
    }
}

/// In-memory producer side: live entity tables plus the event log.
///
/// Every mutation writes the live row and appends the event documenting it
/// under one write lock, so the two can never disagree. If the append fails
/// the row is left untouched.
pub struct InMemoryBook {
    books: RwLock<HashMap<UserId, LiveBook>>,
    events: Arc<InMemoryEventStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InMemoryBook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBook").finish_non_exhaustive()
    }
}

fn encode<T: Serialize>(row: &T) -> Result<JsonValue, LiveStateError> {
    serde_json::to_value(row).map_err(|e| LiveStateError::Encode(e.to_string()))
}

fn poisoned() -> LiveStateError {
    LiveStateError::Unavailable("lock poisoned".to_string())
}

impl InMemoryBook {
    pub fn new(events: Arc<InMemoryEventStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            events,
            clock,
        }
    }

    pub fn events(&self) -> &Arc<InMemoryEventStore> {
        &self.events
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<UserId, LiveBook>>, LiveStateError> {
        self.books.write().map_err(|_| poisoned())
    }

    /// Register a user. The account's history starts now.
    ///
    /// No snapshot is written; pair with
    /// [`SnapshotManager::create_genesis`] or use
    /// [`open_account_with_genesis`](Self::open_account_with_genesis).
    #[instrument(skip(self), fields(currency = %preferred_currency.code))]
    pub fn open_account(&self, preferred_currency: Currency) -> Result<UserAccount, LiveStateError> {
        let account = UserAccount {
            id: UserId::new(),
            created_at: self.clock.now(),
            preferred_currency,
        };

        let mut books = self.write()?;
        self.events.record(NewEvent::create(
            account.id,
            EntityType::User,
            EntityId::from(*account.id.as_uuid()),
            json!({ "currencyCode": account.preferred_currency.code }),
        ))?;
        books.insert(account.id, LiveBook::new(account.clone()));

        tracing::info!(user_id = %account.id, "account opened");
        Ok(account)
    }

    /// Register a user and checkpoint the creation month in one call.
    ///
    /// When the account opens exactly on a month boundary the genesis is
    /// deferred to the next backfill.
    pub async fn open_account_with_genesis(
        &self,
        preferred_currency: Currency,
        snapshots: &SnapshotManager,
    ) -> Result<UserAccount, QueryError> {
        let account = self.open_account(preferred_currency)?;
        snapshots.create_genesis(account.id).await?;
        Ok(account)
    }

    pub fn upsert_asset(
        &self,
        user_id: UserId,
        id: impl Into<EntityId>,
        name: impl Into<String>,
        value: f64,
    ) -> Result<FinancialEvent, LiveStateError> {
        let id = id.into();
        let row = BalanceRecord {
            id: id.clone(),
            name: name.into(),
            value,
        };
        self.upsert(user_id, EntityType::Asset, None, id, row, |b| &mut b.assets)
    }

    pub fn remove_asset(&self, user_id: UserId, id: impl Into<EntityId>) -> Result<FinancialEvent, LiveStateError> {
        self.remove(user_id, EntityType::Asset, None, id.into(), |b| &mut b.assets)
    }

    pub fn upsert_liability(
        &self,
        user_id: UserId,
        id: impl Into<EntityId>,
        name: impl Into<String>,
        value: f64,
    ) -> Result<FinancialEvent, LiveStateError> {
        let id = id.into();
        let row = BalanceRecord {
            id: id.clone(),
            name: name.into(),
            value,
        };
        self.upsert(user_id, EntityType::Liability, None, id, row, |b| &mut b.liabilities)
    }

    pub fn remove_liability(&self, user_id: UserId, id: impl Into<EntityId>) -> Result<FinancialEvent, LiveStateError> {
        self.remove(user_id, EntityType::Liability, None, id.into(), |b| &mut b.liabilities)
    }

    /// The income kind doubles as the event subtype.
    pub fn upsert_income(&self, user_id: UserId, line: IncomeLine) -> Result<FinancialEvent, LiveStateError> {
        let subtype = EntitySubtype::new(line.income_type.as_str());
        self.upsert(user_id, EntityType::Income, Some(subtype), line.id.clone(), line, |b| {
            &mut b.income_lines
        })
    }

    pub fn remove_income(&self, user_id: UserId, id: impl Into<EntityId>) -> Result<FinancialEvent, LiveStateError> {
        let id = id.into();
        let subtype = {
            let books = self.books.read().map_err(|_| poisoned())?;
            books
                .get(&user_id)
                .and_then(|b| b.income_lines.get(&id))
                .map(|line| EntitySubtype::new(line.income_type.as_str()))
        };
        self.remove(user_id, EntityType::Income, subtype, id, |b| &mut b.income_lines)
    }

    /// Record a structural income statement container. It never becomes an
    /// income line.
    pub fn add_income_statement(
        &self,
        user_id: UserId,
        id: impl Into<EntityId>,
        name: impl Into<String>,
    ) -> Result<FinancialEvent, LiveStateError> {
        let id = id.into();
        let mut books = self.write()?;
        let book = books.get_mut(&user_id).ok_or(LiveStateError::UnknownUser(user_id))?;

        let event = NewEvent::create(
            user_id,
            EntityType::Income,
            id.clone(),
            json!({ "id": id, "name": name.into() }),
        )
        .with_subtype(EntitySubtype::income_statement());
        let recorded = self.events.record(event)?;
        book.income_statements.insert(id);
        Ok(recorded)
    }

    pub fn upsert_expense(
        &self,
        user_id: UserId,
        id: impl Into<EntityId>,
        name: impl Into<String>,
        amount: f64,
    ) -> Result<FinancialEvent, LiveStateError> {
        let id = id.into();
        let row = ExpenseRecord {
            id: id.clone(),
            name: name.into(),
            amount,
        };
        self.upsert(user_id, EntityType::Expense, None, id, row, |b| &mut b.expenses)
    }

    pub fn remove_expense(&self, user_id: UserId, id: impl Into<EntityId>) -> Result<FinancialEvent, LiveStateError> {
        self.remove(user_id, EntityType::Expense, None, id.into(), |b| &mut b.expenses)
    }

    /// Cash savings is a single row per user: the first write creates it.
    pub fn set_cash_savings(&self, user_id: UserId, amount: f64) -> Result<FinancialEvent, LiveStateError> {
        let mut books = self.write()?;
        let book = books.get_mut(&user_id).ok_or(LiveStateError::UnknownUser(user_id))?;

        let (event, id) = match &book.cash {
            Some(existing) => {
                let after = CashRow {
                    id: existing.id.clone(),
                    amount,
                };
                let event = NewEvent::update(
                    user_id,
                    EntityType::CashSavings,
                    existing.id.clone(),
                    encode(existing)?,
                    encode(&after)?,
                );
                (event, existing.id.clone())
            }
            None => {
                let id = EntityId::from(uuid::Uuid::now_v7());
                let row = CashRow { id: id.clone(), amount };
                let event = NewEvent::create(user_id, EntityType::CashSavings, id.clone(), encode(&row)?);
                (event, id)
            }
        };

        let recorded = self.events.record(event)?;
        book.cash = Some(CashRow { id, amount });
        Ok(recorded)
    }

    /// Switch the preferred currency; existing amounts are not converted.
    pub fn change_currency(&self, user_id: UserId, code: &str) -> Result<FinancialEvent, LiveStateError> {
        let mut books = self.write()?;
        let book = books.get_mut(&user_id).ok_or(LiveStateError::UnknownUser(user_id))?;
        let next = Currency::from_code(code);

        let event = NewEvent::update(
            user_id,
            EntityType::User,
            EntityId::from(*user_id.as_uuid()),
            json!({ "currencyCode": book.account.preferred_currency.code }),
            json!({ "currencyCode": next.code }),
        );
        let recorded = self.events.record(event)?;
        book.account.preferred_currency = next;
        Ok(recorded)
    }

    fn upsert<T, F>(
        &self,
        user_id: UserId,
        entity_type: EntityType,
        subtype: Option<EntitySubtype>,
        id: EntityId,
        row: T,
        table: F,
    ) -> Result<FinancialEvent, LiveStateError>
    where
        T: Serialize,
        F: FnOnce(&mut LiveBook) -> &mut BTreeMap<EntityId, T>,
    {
        let mut books = self.write()?;
        let book = books.get_mut(&user_id).ok_or(LiveStateError::UnknownUser(user_id))?;
        let table = table(book);

        let after = encode(&row)?;
        let mut event = match table.get(&id) {
            Some(existing) => NewEvent::update(user_id, entity_type, id.clone(), encode(existing)?, after),
            None => NewEvent::create(user_id, entity_type, id.clone(), after),
        };
        if let Some(subtype) = subtype {
            event = event.with_subtype(subtype);
        }

        let recorded = self.events.record(event)?;
        table.insert(id, row);
        Ok(recorded)
    }

    fn remove<T, F>(
        &self,
        user_id: UserId,
        entity_type: EntityType,
        subtype: Option<EntitySubtype>,
        id: EntityId,
        table: F,
    ) -> Result<FinancialEvent, LiveStateError>
    where
        T: Serialize,
        F: FnOnce(&mut LiveBook) -> &mut BTreeMap<EntityId, T>,
    {
        let mut books = self.write()?;
        let book = books.get_mut(&user_id).ok_or(LiveStateError::UnknownUser(user_id))?;
        let table = table(book);

        let existing = table.get(&id).ok_or_else(|| LiveStateError::UnknownEntity {
            user_id,
            entity_id: id.clone(),
        })?;
        let mut event = NewEvent::delete(user_id, entity_type, id.clone(), encode(existing)?);
        if let Some(subtype) = subtype {
            event = event.with_subtype(subtype);
        }

        let recorded = self.events.record(event)?;
        table.remove(&id);
        Ok(recorded)
    }
}

#[async_trait::async_trait]
impl LiveStateSource for InMemoryBook {
    async fn account(&self, user_id: UserId) -> Result<Option<UserAccount>, LiveStateError> {
        let books = self.books.read().map_err(|_| poisoned())?;
        Ok(books.get(&user_id).map(|b| b.account.clone()))
    }

    async fn current_state(&self, user_id: UserId) -> Result<FinancialState, LiveStateError> {
        let books = self.books.read().map_err(|_| poisoned())?;
        books
            .get(&user_id)
            .map(LiveBook::state)
            .ok_or(LiveStateError::UnknownUser(user_id))
    }
}
